//! Grayscale dilation and erosion with a cached extremum.
//!
//! Every row keeps the current extremum and how many more steps the sample holding it stays
//! inside the disk. While that duration lasts only the samples entering along the leading arc
//! are inspected; once it runs out the whole disk is scanned again. Both scans stop as soon as
//! they meet the absolute extremum and constant cells restart the cache with a fixed duration, so
//! the output is close to, but not always exactly, the one of
//! [`max`](super::max).

use log::trace;
use matte_image::{Alpha, AlphaView, AlphaViewMut, Carved, Mask, MAX_ALPHA};

use crate::arc::HalfArcTable;
use crate::buffer::copy_alpha;
use crate::error::{check_size, MorphError};
use crate::parallel::{par_bands, Workers};

use super::masking::classify;
use super::{fold_outcome, identity, Coverage, Outcome, RowCoverage, Sense};

/// Ordering of samples by how extreme they are for a sense.
#[derive(Clone, Copy)]
struct Extremum(Sense);

impl Extremum {
    /// The value nothing can beat.
    #[inline]
    fn bound(self) -> Alpha {
        match self.0 {
            Sense::Inflate => MAX_ALPHA,
            Sense::Deflate => 0,
        }
    }

    /// The value everything beats or ties.
    #[inline]
    fn worst(self) -> Alpha {
        match self.0 {
            Sense::Inflate => 0,
            Sense::Deflate => MAX_ALPHA,
        }
    }

    #[inline]
    fn beats(self, a: Alpha, b: Alpha) -> bool {
        match self.0 {
            Sense::Inflate => a > b,
            Sense::Deflate => a < b,
        }
    }

    #[inline]
    fn pick(self, a: Alpha, b: Alpha) -> Alpha {
        if self.beats(b, a) {
            b
        } else {
            a
        }
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
    if masks.bounds().is_empty() {
        dst.fill(0);
        return Ok(Outcome::EMPTY);
    }

    let s = size as i32;
    let shift = sense.center_shift(size);
    let ext = Extremum(sense);
    let arc = &arc;
    let masks = &masks;
    let parts = par_bands(workers, dst.reborrow(), |y0, mut band| {
        let mut cov = Coverage::default();
        for y in 0..band.height() {
            let oy = y0 + y;
            let cy = oy as i32 + shift;
            let mut row = band.row_mut(y);
            let mut row_cov = RowCoverage::default();
            let mut curr = ext.worst();
            let mut dur = -1;
            for x in 0..out_w {
                let cx = x as i32 + shift;
                let out = match masks.get(x, oy) {
                    Mask::Zero => {
                        curr = 0;
                        dur = 2 * s;
                        curr
                    }
                    Mask::Full => {
                        curr = MAX_ALPHA;
                        dur = 2 * s;
                        curr
                    }
                    Mask::Gray => {
                        dur -= 1;
                        if dur >= 0 {
                            // the leading arc, from the centre row outwards.
                            for dy in (-s..=0).rev().chain(1..=s) {
                                let dx = arc.get(dy);
                                let a = src.sample(cx + dx, cy + dy);
                                if !ext.beats(curr, a) && (ext.beats(a, curr) || 2 * dx > dur) {
                                    curr = a;
                                    dur = 2 * dx;
                                    if curr == ext.bound() {
                                        break;
                                    }
                                }
                            }
                            curr
                        } else {
                            // rescan: samples leaving on the next step only serve this pixel.
                            curr = ext.worst();
                            let mut expiring = ext.worst();
                            'disk: for dy in -s..=s {
                                let secant = arc.get(dy);
                                for dx in -secant..=secant {
                                    let a = src.sample(cx + dx, cy + dy);
                                    let d = secant + dx;
                                    if d > 0 {
                                        if ext.beats(a, curr) || (a == curr && d > dur) {
                                            curr = a;
                                            dur = d;
                                            if curr == ext.bound() {
                                                break 'disk;
                                            }
                                        }
                                    } else {
                                        expiring = ext.pick(expiring, a);
                                    }
                                }
                            }
                            ext.pick(curr, expiring)
                        }
                    }
                };
                row.set(x, out);
                row_cov.see(x, out);
            }
            cov.add_row(oy, row_cov);
        }
        cov
    })?;
    Ok(fold_outcome(parts, sense, out_w, out_h))
}

/// Dilate `src` into `dst` by the disk of squared radius `size_sq`, approximately.
///
/// Same geometry and scratch as [`max::inflate`](super::max::inflate).
///
/// # Errors
///
/// If `dst` has the wrong size, the scratch is short or the workers fail.
pub fn inflate(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    size_sq: i64,
    heap: Carved<'_>,
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    trace!("max_fast inflate {}x{} by {size_sq}", src.width(), src.height());
    transform(src, dst, size_sq, Sense::Inflate, heap, workers)
}

/// Erode `src` into `dst` by the disk of squared radius `size_sq`, approximately.
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
    trace!("max_fast deflate {}x{} by {size_sq}", src.width(), src.height());
    transform(src, dst, size_sq, Sense::Deflate, heap, workers)
}

/// Dilate the coverage channel of interleaved pixels, leaving it extracted in `extracted`.
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

/// Erode the coverage channel of interleaved pixels, leaving it extracted in `extracted`.
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
    use crate::morphology::max;
    use crate::parallel::ExecutionStrategy;
    use matte_image::{AlphaPlane, Bounds, ScratchHeap};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    type Transform = fn(
        &AlphaView,
        &mut AlphaViewMut,
        i64,
        Carved<'_>,
        &dyn Workers,
    ) -> Result<Outcome, MorphError>;

    fn run(f: Transform, src: &AlphaView, size_sq: i64, sense: Sense) -> Result<AlphaPlane, MorphError> {
        let size = ArcTable::quarter(size_sq).size();
        let (w, h) = sense.output_size(src.width(), src.height(), size);
        let mut dst = AlphaPlane::new(w, h);
        let mut heap = ScratchHeap::with_capacity(1 << 20);
        let carved = heap.carve(crate::heap::max_fast(src.width(), src.height(), size_sq, sense))?;
        f(src, &mut dst.view_mut(), size_sq, carved, &ExecutionStrategy::Parallel)?;
        Ok(dst)
    }

    #[test]
    fn test_single_pixel() -> Result<(), MorphError> {
        let mut src = AlphaPlane::new(5, 5);
        src.set(2, 2, 3000);
        let mut dst = AlphaPlane::new(9, 9);
        let mut heap = ScratchHeap::with_capacity(1 << 12);
        let carved = heap.carve(crate::heap::max_fast(5, 5, 4, Sense::Inflate))?;
        let outcome = inflate(&src.view(), &mut dst.view_mut(), 4, carved, &ExecutionStrategy::Serial)?;
        assert_eq!(outcome.bounds, Bounds::new(2, 2, 7, 7));
        assert_eq!(dst.get(4, 2), 3000);
        assert_eq!(dst.get(3, 3), 3000);
        assert_eq!(dst.get(3, 2), 0);
        Ok(())
    }

    #[test]
    fn test_mostly_agrees_with_exact() -> Result<(), MorphError> {
        let mut rng = StdRng::seed_from_u64(21);
        let (w, h) = (24, 20);
        let mut plane = AlphaPlane::new(w, h);
        for y in 0..h {
            for x in 0..w {
                plane.set(x, y, rng.random_range(0..=MAX_ALPHA));
            }
        }
        for size_sq in [2, 5, 10] {
            let fast = run(inflate, &plane.view(), size_sq, Sense::Inflate)?;
            let exact = run(max::inflate, &plane.view(), size_sq, Sense::Inflate)?;
            let same = fast
                .as_slice()
                .iter()
                .zip(exact.as_slice())
                .filter(|(a, b)| a == b)
                .count();
            assert!(same * 10 >= fast.as_slice().len() * 9, "{same} of {}", fast.as_slice().len());

            let fast = run(deflate, &plane.view(), size_sq, Sense::Deflate)?;
            let exact = run(max::deflate, &plane.view(), size_sq, Sense::Deflate)?;
            let same = fast
                .as_slice()
                .iter()
                .zip(exact.as_slice())
                .filter(|(a, b)| a == b)
                .count();
            assert!(same * 10 >= fast.as_slice().len() * 9, "{same} of {}", fast.as_slice().len());
        }
        Ok(())
    }

    #[test]
    fn test_saturated_samples_match_exact() -> Result<(), MorphError> {
        let mut rng = StdRng::seed_from_u64(5);
        let (w, h) = (20, 16);
        for _ in 0..4 {
            let mut plane = AlphaPlane::new(w, h);
            for y in 0..h {
                for x in 0..w {
                    let a = match rng.random_range(0..10) {
                        0..=2 => MAX_ALPHA,
                        3..=4 => 0,
                        _ => rng.random_range(1..MAX_ALPHA),
                    };
                    plane.set(x, y, a);
                }
            }
            for size_sq in [2, 5, 10, 20] {
                let fast = run(inflate, &plane.view(), size_sq, Sense::Inflate)?;
                let exact = run(max::inflate, &plane.view(), size_sq, Sense::Inflate)?;
                assert_eq!(fast.as_slice(), exact.as_slice(), "inflate {size_sq}");
                let fast = run(deflate, &plane.view(), size_sq, Sense::Deflate)?;
                let exact = run(max::deflate, &plane.view(), size_sq, Sense::Deflate)?;
                assert_eq!(fast.as_slice(), exact.as_slice(), "deflate {size_sq}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_empty_source() -> Result<(), MorphError> {
        let src = AlphaPlane::new(10, 10);
        let dst = run(inflate, &src.view(), 9, Sense::Inflate)?;
        assert!(dst.as_slice().iter().all(|&a| a == 0));
        Ok(())
    }
}
