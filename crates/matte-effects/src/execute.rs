//! Replaying plans on the frames.
//!
//! The source matte is the coverage channel of the edit frame. Transforms write standalone planes
//! over either frame or over a plane carved from the scratch heap, and a pass never writes the
//! buffer it reads unless its transform has measured the whole source first.

use log::trace;
use matte_image::{
    Alpha, AlphaView, AlphaViewMut, Bounds, Carved, Frame, FrameBuffers, HeapRequest, ImageError,
    SampleLayout, ScratchHeap,
};
use matte_imgproc::buffer::{
    binarize, carve, clear_alpha, clear_alpha_chrome, copy_alpha, fill_alpha,
};
use matte_imgproc::filter::blur_alpha;
use matte_imgproc::heap::alpha_space;
use matte_imgproc::parallel::Workers;
use matte_imgproc::Outcome;

use crate::algorithm::{Algorithm, Pass, Tuning};
use crate::error::EffectError;
use crate::result::{EffectResult, EffectState, MatteStorage};
use crate::sizing::MattePlan;

/// A buffer a plane can live in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Edit,
    Temp,
    Scratch,
    /// The coverage of the source, once a pass has pulled it out of the edit frame.
    Extracted,
}

/// A rectangle of a plane living in a [`Slot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Placed {
    pub slot: Slot,
    /// Row stride of a standalone plane; `None` reads the interleaved channel of a frame.
    pub stride: Option<usize>,
    pub rect: Bounds,
}

enum Buf<'v> {
    Frame(&'v Frame),
    Samples(&'v [Alpha]),
}

enum BufMut<'v> {
    Frame(&'v mut Frame),
    Samples(&'v mut [Alpha]),
}

impl Placed {
    /// The `width x height` coverage channel of the edit frame.
    pub fn source(width: usize, height: usize) -> Self {
        Self {
            slot: Slot::Edit,
            stride: None,
            rect: Bounds::from_size(width as i32, height as i32),
        }
    }

    /// A standalone `width x height` plane with an even row stride.
    pub fn plane(slot: Slot, width: usize, height: usize) -> Self {
        Self {
            slot,
            stride: Some((width + 1) & !1),
            rect: Bounds::from_size(width as i32, height as i32),
        }
    }

    /// The rectangle `rect` of the same plane.
    pub fn at(self, rect: Bounds) -> Self {
        Self { rect, ..self }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.rect.width() as usize, self.rect.height() as usize)
    }

    fn extent(&self) -> (usize, usize) {
        (self.rect.right.max(0) as usize, self.rect.bottom.max(0) as usize)
    }

    fn view<'v>(&self, buf: Buf<'v>) -> Result<AlphaView<'v>, ImageError> {
        let (w, h) = self.extent();
        let full = match (buf, self.stride) {
            (Buf::Frame(frame), None) => frame.alpha(w, h)?,
            (Buf::Frame(frame), Some(stride)) => frame.plane(w, h, stride)?,
            (Buf::Samples(data), stride) => {
                AlphaView::new(data, w, h, stride.unwrap_or(w), SampleLayout::Plane)?
            }
        };
        full.sub_view(self.rect)
    }

    fn view_mut<'v>(&self, buf: BufMut<'v>) -> Result<AlphaViewMut<'v>, ImageError> {
        let (w, h) = self.extent();
        let full = match (buf, self.stride) {
            (BufMut::Frame(frame), None) => frame.alpha_mut(w, h)?,
            (BufMut::Frame(frame), Some(stride)) => frame.plane_mut(w, h, stride)?,
            (BufMut::Samples(data), stride) => {
                AlphaViewMut::new(data, w, h, stride.unwrap_or(w), SampleLayout::Plane)?
            }
        };
        full.into_sub_view(self.rect)
    }
}

struct Buffers<'a> {
    edit: &'a mut Frame,
    temp: &'a mut Frame,
    scratch: &'a mut [Alpha],
    extracted: &'a mut [Alpha],
}

impl Buffers<'_> {
    fn view(&self, p: Placed) -> Result<AlphaView<'_>, ImageError> {
        p.view(match p.slot {
            Slot::Edit => Buf::Frame(&*self.edit),
            Slot::Temp => Buf::Frame(&*self.temp),
            Slot::Scratch => Buf::Samples(&*self.scratch),
            Slot::Extracted => Buf::Samples(&*self.extracted),
        })
    }

    fn view_mut(&mut self, p: Placed) -> Result<AlphaViewMut<'_>, ImageError> {
        p.view_mut(match p.slot {
            Slot::Edit => BufMut::Frame(&mut *self.edit),
            Slot::Temp => BufMut::Frame(&mut *self.temp),
            Slot::Scratch => BufMut::Samples(&mut *self.scratch),
            Slot::Extracted => BufMut::Samples(&mut *self.extracted),
        })
    }

    /// Read `read` and write `write` at once; `None` when both live in the same buffer.
    fn apart(
        &mut self,
        read: Placed,
        write: Placed,
    ) -> Option<Result<(AlphaView<'_>, AlphaViewMut<'_>), ImageError>> {
        let (src, dst) = match (read.slot, write.slot) {
            (Slot::Edit, Slot::Temp) => (Buf::Frame(&*self.edit), BufMut::Frame(&mut *self.temp)),
            (Slot::Edit, Slot::Scratch) => {
                (Buf::Frame(&*self.edit), BufMut::Samples(&mut *self.scratch))
            }
            (Slot::Temp, Slot::Edit) => (Buf::Frame(&*self.temp), BufMut::Frame(&mut *self.edit)),
            (Slot::Temp, Slot::Scratch) => {
                (Buf::Frame(&*self.temp), BufMut::Samples(&mut *self.scratch))
            }
            (Slot::Scratch, Slot::Edit) => {
                (Buf::Samples(&*self.scratch), BufMut::Frame(&mut *self.edit))
            }
            (Slot::Scratch, Slot::Temp) => {
                (Buf::Samples(&*self.scratch), BufMut::Frame(&mut *self.temp))
            }
            (Slot::Extracted, Slot::Edit) => {
                (Buf::Samples(&*self.extracted), BufMut::Frame(&mut *self.edit))
            }
            (Slot::Extracted, Slot::Temp) => {
                (Buf::Samples(&*self.extracted), BufMut::Frame(&mut *self.temp))
            }
            (Slot::Extracted, Slot::Scratch) => {
                (Buf::Samples(&*self.extracted), BufMut::Samples(&mut *self.scratch))
            }
            _ => return None,
        };
        Some(read.view(src).and_then(|src| Ok((src, write.view_mut(dst)?))))
    }

    /// Read the interleaved source in `read`, writing its coverage to `extracted` and the
    /// transform to `write`; `None` unless `read` is in the edit frame and `write` elsewhere.
    #[allow(clippy::type_complexity)]
    fn extracting(
        &mut self,
        read: Placed,
        extracted: Placed,
        write: Placed,
    ) -> Option<Result<(AlphaView<'_>, AlphaViewMut<'_>, AlphaViewMut<'_>), ImageError>> {
        if read.slot != Slot::Edit || extracted.slot != Slot::Extracted {
            return None;
        }
        let dst = match write.slot {
            Slot::Temp => BufMut::Frame(&mut *self.temp),
            Slot::Scratch => BufMut::Samples(&mut *self.scratch),
            Slot::Edit | Slot::Extracted => return None,
        };
        let src = Buf::Frame(&*self.edit);
        let plane = BufMut::Samples(&mut *self.extracted);
        Some(read.view(src).and_then(|src| {
            Ok((src, extracted.view_mut(plane)?, write.view_mut(dst)?))
        }))
    }
}

/// Everything a plan needs while it runs.
pub(crate) struct Workspace<'a> {
    bufs: Buffers<'a>,
    heap: Carved<'a>,
    tuning: Tuning,
    workers: &'a dyn Workers,
    /// The source coverage, once extracted.
    source: Option<Placed>,
}

impl<'a> Workspace<'a> {
    /// `extracted` holds the source coverage for extremum passes reading the edit frame; an
    /// empty slice disables the extraction.
    pub fn new(
        edit: &'a mut Frame,
        temp: &'a mut Frame,
        scratch: &'a mut [Alpha],
        extracted: &'a mut [Alpha],
        heap: Carved<'a>,
        tuning: Tuning,
        workers: &'a dyn Workers,
    ) -> Self {
        Self {
            bufs: Buffers {
                edit,
                temp,
                scratch,
                extracted,
            },
            heap,
            tuning,
            workers,
            source: None,
        }
    }

    /// `p`, read from the extracted plane when it holds the source.
    fn reuse(&self, p: Placed) -> Placed {
        match self.source {
            Some(plane) if p.slot == Slot::Edit && p.stride.is_none() && plane.rect == p.rect => {
                plane
            }
            _ => p,
        }
    }

    /// The plane `pass` extracts `read` into, if it does.
    fn extraction(&self, pass: &Pass, read: Placed) -> Option<Placed> {
        let (w, h) = read.size();
        let fits = alpha_space(w, h) <= self.bufs.extracted.len();
        let interleaved = read.slot == Slot::Edit && read.stride.is_none();
        let at_origin = read.rect.left == 0 && read.rect.top == 0;
        (pass.extracts() && interleaved && at_origin && fits && self.source.is_none())
            .then(|| Placed::plane(Slot::Extracted, w, h))
    }

    /// Run `pass` from `read` into `write`, writing every sample of `write`.
    ///
    /// A uniform outcome is written out, and samples outside reported bounds are zeroed.
    pub fn run(
        &mut self,
        pass: &Pass,
        read: Placed,
        write: Placed,
    ) -> Result<Outcome, EffectError> {
        let workers = self.workers;
        let read = self.reuse(read);
        let outcome = if let Some(plane) = self.extraction(pass, read) {
            let outcome = {
                let (src, mut extracted, mut dst) = self
                    .bufs
                    .extracting(read, plane, write)
                    .ok_or(EffectError::Aliased(pass.algorithm))??;
                pass.run_extracting(
                    &src,
                    &mut extracted,
                    &mut dst,
                    self.tuning,
                    self.heap.reborrow(),
                    workers,
                )?
            };
            self.source = Some(plane);
            outcome
        } else if read.slot == write.slot {
            if !pass.algorithm.allows_buffer_overlap() {
                return Err(EffectError::Aliased(pass.algorithm));
            }
            let measured = {
                let src = self.bufs.view(read)?;
                pass.measure(&src, self.tuning, &mut *self.heap.words, workers)?
            };
            let mut dst = self.bufs.view_mut(write)?;
            measured.write(&mut dst, workers)?
        } else {
            let (src, mut dst) = self
                .bufs
                .apart(read, write)
                .ok_or(EffectError::Aliased(pass.algorithm))??;
            pass.run(&src, &mut dst, self.tuning, self.heap.reborrow(), workers)?
        };

        let mut dst = self.bufs.view_mut(write)?;
        if outcome.is_empty() {
            if outcome.fill != 0 {
                fill_alpha(&mut dst, outcome.fill);
            }
        } else {
            clear_alpha_chrome(&mut dst, outcome.bounds);
        }
        Ok(outcome)
    }

    /// Run `passes` from `read`, the last one writing `target`.
    ///
    /// Pass `i` of the others writes a plane at the origin of `slot_of(i)`. Returns `None` once a
    /// pass leaves nothing to transform further.
    pub fn chain(
        &mut self,
        algorithm: Algorithm,
        passes: &[Pass],
        read: Placed,
        target: Placed,
        slot_of: impl Fn(usize) -> Slot,
    ) -> Result<Option<Outcome>, EffectError> {
        if passes.is_empty() {
            return self.copy(algorithm, read, target).map(Some);
        }
        let mut read = read;
        for (i, pass) in passes.iter().enumerate() {
            let write = if i + 1 == passes.len() {
                target
            } else {
                let (w, h) = read.size();
                let (w, h) = pass.output_size(w, h);
                Placed::plane(slot_of(i), w, h)
            };
            let outcome = self.run(pass, read, write)?;
            if outcome == Outcome::EMPTY {
                trace!("pass {i} of {} left nothing", passes.len());
                return Ok(if i + 1 == passes.len() { Some(outcome) } else { None });
            }
            if i + 1 == passes.len() {
                return Ok(Some(outcome));
            }
            read = write;
        }
        Ok(None)
    }

    /// The transform-free pass, a copy or, for thresholded families, a binarization.
    pub fn copy(
        &mut self,
        algorithm: Algorithm,
        read: Placed,
        write: Placed,
    ) -> Result<Outcome, EffectError> {
        let read = self.reuse(read);
        let (src, mut dst) = self
            .bufs
            .apart(read, write)
            .ok_or(EffectError::Aliased(algorithm))??;
        if algorithm.is_binary() {
            binarize(&src, &mut dst, self.tuning.thresh, self.workers)?;
        } else {
            copy_alpha(&src, &mut dst, self.workers)?;
        }
        Ok(Outcome::within(write.rect.translate(-write.rect.left, -write.rect.top)))
    }

    /// Subtract `hole` from `line`, both the same size.
    pub fn carve(
        &mut self,
        algorithm: Algorithm,
        line: Placed,
        hole: Placed,
        hole_outcome: Outcome,
    ) -> Result<(), EffectError> {
        if hole_outcome == Outcome::EMPTY {
            return Ok(());
        }
        let hole = self.reuse(hole);
        let (hole, mut line) = self
            .bufs
            .apart(hole, line)
            .ok_or(EffectError::Aliased(algorithm))??;
        if hole_outcome.is_empty() {
            clear_alpha(&mut line);
        } else {
            carve(&mut line, &hole, self.workers)?;
        }
        Ok(())
    }

    /// Blur the content of `plane` inside `bounds` and zero everything else.
    ///
    /// `plane` must cover the whole plane from its origin. Returns the bounds of the blurred
    /// content.
    pub fn finish(
        &mut self,
        plane: Placed,
        bounds: Bounds,
        blur_px: i32,
    ) -> Result<Bounds, EffectError> {
        let workers = self.workers;
        let mut view = self.bufs.view_mut(plane)?;
        let bd = blur_alpha(&mut view, bounds, blur_px, workers)?;
        clear_alpha_chrome(&mut view, bd);
        Ok(bd)
    }
}

/// Samples of the plane the first pass extracts the source into, if it does.
pub(crate) fn extraction_space(first: Option<&Pass>, src: (usize, usize)) -> usize {
    match first {
        Some(pass) if pass.extracts() => alpha_space(src.0, src.1),
        _ => 0,
    }
}

/// Fail unless a `width x height` source fits the frames.
pub(crate) fn check_source(frames: &FrameBuffers, src: (usize, usize)) -> Result<(), EffectError> {
    let (line, rows) = (frames.edit().line(), frames.edit().rows());
    if src.0 > line || src.1 > rows {
        return Err(EffectError::SourceTooLarge(src.0, src.1, line, rows));
    }
    Ok(())
}

/// Where a canvas grown by `displace` goes, holding content grown by `natural`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    /// Canvas size.
    pub canvas: (usize, usize),
    /// Offset of the canvas in the plane.
    pub origin: usize,
    /// Offset of the content in the plane.
    pub content: usize,
    /// Plane size, holding both.
    pub plane: (usize, usize),
}

impl Layout {
    /// `None` when the canvas collapses.
    pub fn new(src: (usize, usize), displace: i32, natural: i32) -> Option<Self> {
        let (w, h) = (src.0 as i64, src.1 as i64);
        let (fw, fh) = (w + 2 * displace as i64, h + 2 * displace as i64);
        if fw <= 0 || fh <= 0 {
            return None;
        }
        let diff = displace - natural;
        let origin = (-diff).max(0) as usize;
        let content = diff.max(0) as usize;
        let (fw, fh) = (fw as usize, fh as usize);
        Some(Self {
            canvas: (fw, fh),
            origin,
            content,
            plane: (fw + 2 * origin, fh + 2 * origin),
        })
    }

    /// The whole plane in `slot`.
    pub fn plane_in(&self, slot: Slot) -> Placed {
        Placed::plane(slot, self.plane.0, self.plane.1)
    }

    /// A `width x height` content rectangle of the plane in `slot`, shifted by `inset` on both
    /// axes.
    pub fn content_in(&self, slot: Slot, width: usize, height: usize, inset: usize) -> Placed {
        let at = (self.content + inset) as i32;
        self.plane_in(slot)
            .at(Bounds::new(at, at, at + width as i32, at + height as i32))
    }

    /// The result of a plane whose content ended within `bd`.
    pub fn result(&self, displace: i32, bd: Bounds, stride: usize) -> EffectResult {
        let (w, h) = self.canvas;
        let o = self.origin as i32;
        let bounds = bd
            .translate(-o, -o)
            .intersect(&Bounds::from_size(w as i32, h as i32));
        if bounds.is_empty() {
            return EffectResult::empty(displace, w, h);
        }
        EffectResult {
            state: EffectState::Normal,
            displace,
            width: w,
            height: h,
            bounds,
            storage: MatteStorage::Plane {
                stride,
                origin: self.origin,
            },
        }
    }
}

/// Run a matte plan, leaving the matte in the temporary frame.
///
/// The intermediate of a two-pass plan lives in the temporary frame when the plan allows overlap
/// and in a plane carved from `heap` otherwise.
///
/// # Errors
///
/// If the source does not fit the frames, the heap is too small for the plan or a transform
/// fails.
pub(crate) fn run_matte(
    frames: &mut FrameBuffers,
    heap: &mut ScratchHeap,
    workers: &dyn Workers,
    src: (usize, usize),
    plan: &MattePlan,
    tuning: Tuning,
) -> Result<EffectResult, EffectError> {
    check_source(frames, src)?;
    let displace = plan.displace;
    let Some(layout) = Layout::new(src, displace, plan.natural_displace()) else {
        return Ok(EffectResult::zero_sized(displace));
    };
    if plan.collapsed || src.0 == 0 || src.1 == 0 {
        return Ok(EffectResult::empty(displace, layout.canvas.0, layout.canvas.1));
    }

    let mut sizes = vec![src];
    for pass in &plan.passes {
        let (w, h) = sizes[sizes.len() - 1];
        sizes.push(pass.output_size(w, h));
    }
    let (lw, lh) = sizes[sizes.len() - 1];
    if lw == 0 || lh == 0 {
        return Ok(EffectResult::empty(displace, layout.canvas.0, layout.canvas.1));
    }

    let mid_slot = if plan.overlap { Slot::Temp } else { Slot::Scratch };
    let staged = plan.passes.len() > 1 && mid_slot == Slot::Scratch;
    let scratch_len = if staged {
        alpha_space(sizes[1].0, sizes[1].1)
    } else {
        0
    };
    let extract_len = extraction_space(plan.passes.first(), src);
    let req = plan
        .passes
        .iter()
        .zip(&sizes)
        .map(|(pass, &(w, h))| pass.heap(w, h))
        .fold(HeapRequest::NONE, HeapRequest::max)
        + HeapRequest::alphas(scratch_len + extract_len);
    let mut carved = heap.carve(req)?;
    let scratch = carved.take_alphas(scratch_len)?;
    let extracted = carved.take_alphas(extract_len)?;
    let (edit, temp) = frames.split_mut();
    let mut ws = Workspace::new(edit, temp, scratch, extracted, carved, tuning, workers);

    let target = layout.content_in(Slot::Temp, lw, lh, 0);
    let last = plan.passes.len().saturating_sub(1);
    let slot_of = |i: usize| if i == last { Slot::Temp } else { mid_slot };
    let outcome = ws.chain(
        plan.algorithm,
        &plan.passes,
        Placed::source(src.0, src.1),
        target,
        slot_of,
    )?;
    let outcome = match outcome {
        Some(outcome) if outcome != Outcome::EMPTY => outcome,
        _ => return Ok(EffectResult::empty(displace, layout.canvas.0, layout.canvas.1)),
    };
    let bounds = if outcome.is_empty() {
        target.rect
    } else {
        let at = layout.content as i32;
        outcome.bounds.translate(at, at)
    };

    let plane = layout.plane_in(Slot::Temp);
    let bd = ws.finish(plane, bounds, plan.blur_px)?;
    let stride = plane.stride.unwrap_or(layout.plane.0);
    Ok(layout.result(displace, bd, stride))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasLimits;
    use crate::sizing::{plan_inflate_first, Sizing};
    use matte_image::MAX_ALPHA;
    use matte_imgproc::parallel::ExecutionStrategy;
    use matte_imgproc::Sense;

    #[test]
    fn test_layout() {
        let layout = Layout::new((10, 8), 3, 5);
        assert_eq!(
            layout,
            Some(Layout {
                canvas: (16, 14),
                origin: 2,
                content: 0,
                plane: (20, 18),
            })
        );
        let layout = Layout::new((10, 8), 3, 1);
        assert!(layout.is_some_and(|l| l.origin == 0 && l.content == 2 && l.plane == (16, 14)));
        assert_eq!(Layout::new((10, 8), -4, -4), None);
    }

    fn square_source(
        frames: &mut FrameBuffers,
        size: usize,
        inset: usize,
    ) -> Result<(), EffectError> {
        let mut alpha = frames.edit_mut().alpha_mut(size, size)?;
        for y in inset..size - inset {
            for x in inset..size - inset {
                alpha.set(x, y, MAX_ALPHA);
            }
        }
        Ok(())
    }

    #[test]
    fn test_run_matte_places_content() -> Result<(), EffectError> {
        for alg in [Algorithm::Max, Algorithm::MaxFast] {
            let mut frames = FrameBuffers::new(40, 40);
            let mut heap = ScratchHeap::with_capacity(1 << 20);
            square_source(&mut frames, 10, 3)?;

            let plan = MattePlan {
                algorithm: alg,
                passes: vec![Pass::new(alg, Sense::Inflate, 20)],
                overlap: false,
                blur_px: 0,
                displace: 3,
                collapsed: false,
            };
            let res = run_matte(
                &mut frames,
                &mut heap,
                &ExecutionStrategy::Serial,
                (10, 10),
                &plan,
                Tuning::from_param_a(500),
            )?;
            assert_eq!(res.state, EffectState::Normal, "{alg}");
            assert_eq!((res.width, res.height), (16, 16), "{alg}");
            // a 4x4 square grown by 2 and centred on a canvas grown by 3.
            assert_eq!(res.bounds, Bounds::new(4, 4, 12, 12), "{alg}");
            let matte = res.matte(&frames)?;
            assert_eq!(matte.get(0, 0), 0, "{alg}");
            assert_eq!(matte.get(8, 8), MAX_ALPHA, "{alg}");
            assert_eq!(matte.get(4, 8), MAX_ALPHA, "{alg}");
            assert_eq!(matte.get(3, 8), 0, "{alg}");
        }
        Ok(())
    }

    #[test]
    fn test_extremum_pass_extracts_source() -> Result<(), EffectError> {
        let workers = ExecutionStrategy::Serial;
        for alg in [Algorithm::Max, Algorithm::MaxFast] {
            let mut frames = FrameBuffers::new(16, 16);
            let mut heap = ScratchHeap::with_capacity(1 << 16);
            square_source(&mut frames, 8, 2)?;
            let pass = Pass::new(alg, Sense::Inflate, 20);
            let extract_len = extraction_space(Some(&pass), (8, 8));
            assert_eq!(extract_len, 64, "{alg}");

            let mut carved = heap.carve(pass.heap(8, 8) + HeapRequest::alphas(extract_len))?;
            let scratch = carved.take_alphas(0)?;
            let extracted = carved.take_alphas(extract_len)?;
            let (edit, temp) = frames.split_mut();
            let tuning = Tuning::from_param_a(500);
            let mut ws = Workspace::new(edit, temp, scratch, extracted, carved, tuning, &workers);

            let source = Placed::source(8, 8);
            let (w, h) = pass.output_size(8, 8);
            let outcome = ws.run(&pass, source, Placed::plane(Slot::Temp, w, h))?;
            assert_ne!(outcome, Outcome::EMPTY, "{alg}");
            assert_eq!(ws.reuse(source).slot, Slot::Extracted, "{alg}");

            // later reads of the source see the extracted coverage, not the edit frame.
            fill_alpha(&mut ws.bufs.view_mut(source)?, 0);
            let copy = Placed::plane(Slot::Temp, 8, 8);
            ws.copy(alg, source, copy)?;
            let copied = ws.bufs.view(copy)?;
            assert_eq!(copied.get(1, 1), 0, "{alg}");
            assert_eq!(copied.get(2, 2), MAX_ALPHA, "{alg}");
            assert_eq!(copied.get(5, 5), MAX_ALPHA, "{alg}");
            assert_eq!(copied.get(6, 5), 0, "{alg}");
        }
        Ok(())
    }

    #[test]
    fn test_bin_pass_reads_edit_frame() -> Result<(), EffectError> {
        let mut frames = FrameBuffers::new(16, 16);
        let mut heap = ScratchHeap::with_capacity(1 << 16);
        square_source(&mut frames, 8, 2)?;
        let pass = Pass::new(Algorithm::Bin, Sense::Inflate, 20);
        assert_eq!(extraction_space(Some(&pass), (8, 8)), 0);
        let mut carved = heap.carve(pass.heap(8, 8))?;
        let scratch = carved.take_alphas(0)?;
        let extracted = carved.take_alphas(0)?;
        let (edit, temp) = frames.split_mut();
        let workers = ExecutionStrategy::Serial;
        let tuning = Tuning::from_param_a(500);
        let mut ws = Workspace::new(edit, temp, scratch, extracted, carved, tuning, &workers);
        let source = Placed::source(8, 8);
        let (w, h) = pass.output_size(8, 8);
        ws.run(&pass, source, Placed::plane(Slot::Temp, w, h))?;
        assert_eq!(ws.reuse(source), source);
        Ok(())
    }

    #[test]
    fn test_two_pass_staging() -> Result<(), EffectError> {
        let limits = CanvasLimits::new((40, 40), (48, 48));
        for alg in [Algorithm::Bin, Algorithm::Max, Algorithm::Sum] {
            let mut frames = FrameBuffers::new(40, 40);
            let mut heap = ScratchHeap::with_capacity(1 << 20);
            square_source(&mut frames, 12, 3)?;
            let Sizing::Planned(plan) = plan_inflate_first(alg, 30, 20, 0, (12, 12), &limits)
            else {
                panic!("{alg}: expected a plan");
            };
            assert_eq!(plan.passes.len(), 2, "{alg}");
            let res = run_matte(
                &mut frames,
                &mut heap,
                &ExecutionStrategy::Parallel,
                (12, 12),
                &plan,
                Tuning::from_param_a(500),
            )?;
            assert_eq!(res.state, EffectState::Normal, "{alg}");
            assert_eq!(res.displace, 3);
            let matte = res.matte(&frames)?;
            let c = res.width / 2;
            assert!(matte.get(c, c) > 0, "{alg}");
            assert_eq!(matte.get(0, 0), 0, "{alg}");
        }
        Ok(())
    }

    #[test]
    fn test_zero_source_is_empty() -> Result<(), EffectError> {
        let mut frames = FrameBuffers::new(20, 20);
        let mut heap = ScratchHeap::with_capacity(1 << 16);
        let plan = MattePlan {
            algorithm: Algorithm::Bin,
            passes: vec![Pass::new(Algorithm::Bin, Sense::Inflate, 30)],
            overlap: true,
            blur_px: 0,
            displace: 3,
            collapsed: false,
        };
        let res = run_matte(
            &mut frames,
            &mut heap,
            &ExecutionStrategy::Serial,
            (10, 10),
            &plan,
            Tuning::from_param_a(500),
        )?;
        assert_eq!(res.state, EffectState::Empty);
        assert_eq!((res.displace, res.width), (3, 16));
        assert!(res.bounds.is_empty());
        Ok(())
    }

    #[test]
    fn test_source_too_large() {
        let mut frames = FrameBuffers::new(8, 8);
        let mut heap = ScratchHeap::with_capacity(1 << 16);
        let plan = MattePlan {
            algorithm: Algorithm::Max,
            passes: vec![],
            overlap: false,
            blur_px: 0,
            displace: 0,
            collapsed: false,
        };
        let res = run_matte(
            &mut frames,
            &mut heap,
            &ExecutionStrategy::Serial,
            (9, 4),
            &plan,
            Tuning::from_param_a(500),
        );
        assert_eq!(res, Err(EffectError::SourceTooLarge(9, 4, 8, 8)));
    }
}
