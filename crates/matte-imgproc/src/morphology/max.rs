//! Exact grayscale dilation and erosion: the maximum or minimum of the samples inside the disk.
//!
//! Every band slides a bucket histogram of the window over its rows. The extremum is found with
//! a cursor that starts at the last known extremum and walks towards the populated buckets, so
//! each pixel costs one arc of updates plus the distance the extremum actually moved.

use log::trace;
use matte_image::{Alpha, AlphaView, AlphaViewMut, Carved, MAX_ALPHA};

use crate::arc::HalfArcTable;
use crate::buffer::copy_alpha;
use crate::error::{check_size, MorphError};
use crate::parallel::Workers;

use super::masking::classify;
use super::window::{sweep, DiskAccumulator};
use super::{identity, Outcome, Sense};

const BUCKETS: usize = MAX_ALPHA as usize + 1;

/// Sample counts by coverage value.
pub(crate) struct Histogram {
    buckets: Vec<u32>,
    cursor: usize,
    sense: Sense,
}

impl Histogram {
    pub(crate) fn new(sense: Sense) -> Self {
        let mut hist = Self {
            buckets: vec![0; BUCKETS],
            cursor: 0,
            sense,
        };
        hist.clear();
        hist
    }
}

impl DiskAccumulator for Histogram {
    fn clear(&mut self) {
        self.buckets.fill(0);
        self.cursor = match self.sense {
            Sense::Inflate => 0,
            Sense::Deflate => MAX_ALPHA as usize,
        };
    }

    #[inline]
    fn add(&mut self, a: Alpha) {
        let i = a as usize;
        self.buckets[i] += 1;
        match self.sense {
            Sense::Inflate => self.cursor = self.cursor.max(i),
            Sense::Deflate => self.cursor = self.cursor.min(i),
        }
    }

    #[inline]
    fn remove(&mut self, a: Alpha) {
        self.buckets[a as usize] -= 1;
    }

    fn set_uniform(&mut self, a: Alpha, area: i64) {
        self.buckets.fill(0);
        self.buckets[a as usize] = area as u32;
        self.cursor = a as usize;
    }

    #[inline]
    fn value(&mut self) -> Alpha {
        // the cursor never sits on the wrong side of the extremum, only on an emptied bucket.
        match self.sense {
            Sense::Inflate => {
                while self.cursor > 0 && self.buckets[self.cursor] == 0 {
                    self.cursor -= 1;
                }
            }
            Sense::Deflate => {
                while self.cursor < MAX_ALPHA as usize && self.buckets[self.cursor] == 0 {
                    self.cursor += 1;
                }
            }
        }
        self.cursor as Alpha
    }
}

fn transform(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    size_sq: i64,
    sense: Sense,
    mut heap: Carved<'_>,
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    let arc = HalfArcTable::new(size_sq);
    let size = arc.size() as usize;
    if size == 0 {
        return identity(src, dst, None, workers);
    }
    let (out_w, out_h) = sense.output_size(src.width(), src.height(), size);
    check_size((dst.width(), dst.height()), (out_w, out_h))?;
    if out_w == 0 || out_h == 0 {
        return Ok(Outcome::EMPTY);
    }
    let cells = heap.take_masks(out_w * out_h)?;
    let columns = heap.take_masks(src.width() * out_h)?;
    let masks = classify(src, size, sense, cells, columns, workers)?;
    sweep(src, &arc, sense, &masks, dst, workers, || Histogram::new(sense))
}

/// Dilate `src` into `dst` by the disk of squared radius `size_sq`.
///
/// # Arguments
///
/// * `src` - The source plane, `w x h`.
/// * `dst` - The destination plane, `(w + 2s) x (h + 2s)` with `s = floor(sqrt(size_sq))`.
/// * `size_sq` - The squared-radius budget.
/// * `heap` - Scratch sized after [`heap::max`](crate::heap::max).
/// * `workers` - The parallel-for.
///
/// # Errors
///
/// If `dst` has the wrong size, the scratch is short or the workers fail.
///
/// # Examples
///
/// ```
/// use matte_image::{AlphaPlane, ScratchHeap, MAX_ALPHA};
/// use matte_imgproc::heap;
/// use matte_imgproc::morphology::max;
/// use matte_imgproc::parallel::ExecutionStrategy;
/// use matte_imgproc::Sense;
///
/// let mut src = AlphaPlane::new(3, 3);
/// src.set(1, 1, 2000);
/// let mut dst = AlphaPlane::new(5, 5);
/// let mut heap = ScratchHeap::with_capacity(1 << 16);
/// let carved = heap.carve(heap::max(3, 3, 1, Sense::Inflate)).unwrap();
/// let outcome = max::inflate(&src.view(), &mut dst.view_mut(), 1, carved, &ExecutionStrategy::Serial).unwrap();
/// assert_eq!(dst.get(2, 1), 2000);
/// assert_eq!(dst.get(1, 1), 0);
/// assert_eq!(outcome.bounds.width(), 3);
/// ```
pub fn inflate(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    size_sq: i64,
    heap: Carved<'_>,
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    trace!("max inflate {}x{} by {size_sq}", src.width(), src.height());
    transform(src, dst, size_sq, Sense::Inflate, heap, workers)
}

/// Erode `src` into `dst` by the disk of squared radius `size_sq`.
///
/// `dst` is `(w - 2s) x (h - 2s)`. See [`inflate`].
///
/// # Errors
///
/// If `dst` has the wrong size, the scratch is short or the workers fail.
pub fn deflate(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    size_sq: i64,
    heap: Carved<'_>,
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    trace!("max deflate {}x{} by {size_sq}", src.width(), src.height());
    transform(src, dst, size_sq, Sense::Deflate, heap, workers)
}

/// Dilate the coverage channel of interleaved pixels.
///
/// The channel is first extracted into `extracted`, a `w x h` plane left for later passes, and
/// dilated from there.
///
/// # Errors
///
/// If a plane has the wrong size, the scratch is short or the workers fail.
pub fn inflate_extracting(
    src: &AlphaView,
    extracted: &mut AlphaViewMut,
    dst: &mut AlphaViewMut,
    size_sq: i64,
    heap: Carved<'_>,
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    copy_alpha(src, extracted, workers)?;
    inflate(&extracted.as_view(), dst, size_sq, heap, workers)
}

/// Erode the coverage channel of interleaved pixels. See [`inflate_extracting`].
///
/// # Errors
///
/// If a plane has the wrong size, the scratch is short or the workers fail.
pub fn deflate_extracting(
    src: &AlphaView,
    extracted: &mut AlphaViewMut,
    dst: &mut AlphaViewMut,
    size_sq: i64,
    heap: Carved<'_>,
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    copy_alpha(src, extracted, workers)?;
    deflate(&extracted.as_view(), dst, size_sq, heap, workers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::ArcTable;
    use crate::parallel::ExecutionStrategy;
    use matte_image::{AlphaPlane, Bounds, Frame, ScratchHeap};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute(src: &AlphaView, size_sq: i64, sense: Sense) -> AlphaPlane {
        let arc = ArcTable::quarter(size_sq);
        let s = arc.size() as i32;
        let (w, h) = sense.output_size(src.width(), src.height(), arc.size());
        let shift = sense.center_shift(arc.size());
        let mut out = AlphaPlane::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let (cx, cy) = (x as i32 + shift, y as i32 + shift);
                let mut v = match sense {
                    Sense::Inflate => 0,
                    Sense::Deflate => MAX_ALPHA,
                };
                for dy in -s..=s {
                    for dx in -arc.get(dy)..=arc.get(dy) {
                        let a = src.sample(cx + dx, cy + dy);
                        v = match sense {
                            Sense::Inflate => v.max(a),
                            Sense::Deflate => v.min(a),
                        };
                    }
                }
                out.set(x, y, v);
            }
        }
        out
    }

    fn run(src: &AlphaView, size_sq: i64, sense: Sense) -> Result<(AlphaPlane, Outcome), MorphError> {
        let size = ArcTable::quarter(size_sq).size();
        let (w, h) = sense.output_size(src.width(), src.height(), size);
        let mut dst = AlphaPlane::new(w, h);
        let mut heap = ScratchHeap::with_capacity(1 << 20);
        let carved = heap.carve(crate::heap::max(src.width(), src.height(), size_sq, sense))?;
        let outcome = match sense {
            Sense::Inflate => inflate(src, &mut dst.view_mut(), size_sq, carved, &ExecutionStrategy::Fixed(3))?,
            Sense::Deflate => deflate(src, &mut dst.view_mut(), size_sq, carved, &ExecutionStrategy::Fixed(3))?,
        };
        Ok((dst, outcome))
    }

    #[test]
    fn test_histogram_cursor() {
        let mut hist = Histogram::new(Sense::Inflate);
        hist.add(10);
        hist.add(300);
        hist.add(20);
        assert_eq!(hist.value(), 300);
        hist.remove(300);
        assert_eq!(hist.value(), 20);

        let mut hist = Histogram::new(Sense::Deflate);
        hist.set_uniform(MAX_ALPHA, 5);
        hist.remove(MAX_ALPHA);
        hist.add(7);
        assert_eq!(hist.value(), 7);
        hist.remove(7);
        assert_eq!(hist.value(), MAX_ALPHA);
    }

    #[test]
    fn test_matches_brute_force() -> Result<(), MorphError> {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..12 {
            let (w, h) = (rng.random_range(1..17), rng.random_range(1..17));
            let mut plane = AlphaPlane::new(w, h);
            for y in 0..h {
                for x in 0..w {
                    let a = match rng.random_range(0..3) {
                        0 => 0,
                        1 => MAX_ALPHA,
                        _ => rng.random_range(0..=MAX_ALPHA),
                    };
                    plane.set(x, y, a);
                }
            }
            for size_sq in [1, 2, 5, 8, 10] {
                for sense in [Sense::Inflate, Sense::Deflate] {
                    let (got, _) = run(&plane.view(), size_sq, sense)?;
                    assert_eq!(got, brute(&plane.view(), size_sq, sense), "{w}x{h} {size_sq} {sense:?}");
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_zero_budget_is_identity() -> Result<(), MorphError> {
        let plane = AlphaPlane::from_vec(2, 2, vec![1, 2, 3, 4])?;
        let (got, outcome) = run(&plane.view(), 0, Sense::Deflate)?;
        assert_eq!(got, plane);
        assert_eq!(outcome.bounds, Bounds::new(0, 0, 2, 2));
        Ok(())
    }

    #[test]
    fn test_full_erosion_is_uniform() -> Result<(), MorphError> {
        let plane = AlphaPlane::filled(8, 8, MAX_ALPHA);
        let (got, outcome) = run(&plane.view(), 4, Sense::Deflate)?;
        assert_eq!(outcome, Outcome::FULL);
        assert!(got.as_slice().iter().all(|&a| a == MAX_ALPHA));
        Ok(())
    }

    #[test]
    fn test_extracting_keeps_plane() -> Result<(), MorphError> {
        let mut frame = Frame::new(4, 4);
        frame.alpha_mut(4, 4)?.set(1, 2, 1500);
        let mut extracted = AlphaPlane::new(4, 4);
        let mut dst = AlphaPlane::new(6, 6);
        let mut heap = ScratchHeap::with_capacity(1 << 12);
        let carved = heap.carve(crate::heap::max(4, 4, 1, Sense::Inflate))?;
        let outcome = inflate_extracting(
            &frame.alpha(4, 4)?,
            &mut extracted.view_mut(),
            &mut dst.view_mut(),
            1,
            carved,
            &ExecutionStrategy::Serial,
        )?;
        assert_eq!(extracted.get(1, 2), 1500);
        assert_eq!(dst.get(2, 3), 1500);
        assert_eq!(outcome.bounds, Bounds::new(1, 2, 4, 5));
        Ok(())
    }
}
