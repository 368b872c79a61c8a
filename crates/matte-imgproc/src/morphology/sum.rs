//! Coverage-proportional dilation and erosion.
//!
//! The destination is the sum of the samples inside the disk, scaled so that a sum of `cap`
//! reads as fully opaque. The cap grows with the radius and a caller-supplied rate, so a thin
//! shape grows into a soft halo while a solid one grows a crisp edge.
//!
//! Erosion is the dual: the sum of the missing coverage is scaled the same way and subtracted
//! from opacity. It runs on a copy of the source framed by one transparent pixel, so the edges of
//! the source erode like any other boundary.

use log::trace;
use matte_image::{Alpha, AlphaView, AlphaViewMut, Bounds, Carved, SampleLayout, MAX_ALPHA};

use crate::arc::{isqrt, ArcTable, HalfArcTable};
use crate::buffer::copy_alpha;
use crate::error::{check_size, MorphError};
use crate::parallel::Workers;

use super::masking::classify;
use super::window::{sweep, DiskAccumulator};
use super::{identity, Outcome, Sense};

/// Denominator of the cap rate.
pub const DEN_CAP_RATE: i64 = 4096;

const LOG2_NUMER: u32 = 43;
const LOG2_SHIFT: u32 = 31;

/// The window sum that reads as fully opaque.
///
/// # Arguments
///
/// * `size_sq` - The squared-radius budget.
/// * `rate` - How fast the cap grows with the radius, in units of [`DEN_CAP_RATE`].
///
/// # Returns
///
/// `MAX_ALPHA + (2 sqrt(2 sqrt(size_sq) - 1) - 1) * rate * MAX_ALPHA / DEN_CAP_RATE`, clamped to
/// `[1, area * MAX_ALPHA]` where `area` is the number of pixels of the disk.
pub fn sum_cap(size_sq: i64, rate: i64) -> i64 {
    let area = ArcTable::quarter(size_sq).area();
    let root = (size_sq.max(0) as f64).sqrt();
    let grow = (2.0 * (2.0 * root - 1.0).max(0.0).sqrt() - 1.0) * rate as f64 * MAX_ALPHA as f64
        / DEN_CAP_RATE as f64;
    (MAX_ALPHA as i64 + grow as i64).clamp(1, area * MAX_ALPHA as i64)
}

/// Running window sum.
struct WindowSum {
    sum: i64,
    cap: i64,
    numer: i64,
    full: i64,
    sense: Sense,
}

impl WindowSum {
    fn new(cap: i64, area: i64, sense: Sense) -> Self {
        Self {
            sum: 0,
            cap,
            numer: (1i64 << LOG2_NUMER) / cap,
            full: area * MAX_ALPHA as i64,
            sense,
        }
    }

    #[inline]
    fn scale(&self, s: i64) -> Alpha {
        if s >= self.cap {
            MAX_ALPHA
        } else {
            ((s * self.numer + (1i64 << LOG2_SHIFT) - 1) >> LOG2_SHIFT) as Alpha
        }
    }
}

impl DiskAccumulator for WindowSum {
    fn clear(&mut self) {
        self.sum = 0;
    }

    #[inline]
    fn add(&mut self, a: Alpha) {
        self.sum += a as i64;
    }

    #[inline]
    fn remove(&mut self, a: Alpha) {
        self.sum -= a as i64;
    }

    fn set_uniform(&mut self, a: Alpha, area: i64) {
        self.sum = a as i64 * area;
    }

    #[inline]
    fn value(&mut self) -> Alpha {
        match self.sense {
            Sense::Inflate => self.scale(self.sum),
            Sense::Deflate => MAX_ALPHA - self.scale(self.full - self.sum),
        }
    }
}

/// Margin of the destination for the budget `size_sq`.
///
/// Erosion loses one pixel less than the disk radius, the transparent frame taking the first.
pub fn margin(size_sq: i64, sense: Sense) -> usize {
    let size = isqrt(size_sq) as usize;
    match sense {
        Sense::Inflate => size,
        Sense::Deflate => size.saturating_sub(1),
    }
}

/// Dilate `src` into `dst` in proportion to the coverage inside the disk.
///
/// # Arguments
///
/// * `src` - The source plane, `w x h`.
/// * `dst` - The destination plane, `(w + 2s) x (h + 2s)` with `s = floor(sqrt(size_sq))`.
/// * `size_sq` - The squared-radius budget.
/// * `rate` - The cap rate, see [`sum_cap`].
/// * `heap` - Scratch sized after [`heap::sum`](crate::heap::sum).
/// * `workers` - The parallel-for.
///
/// # Errors
///
/// If `dst` has the wrong size, the scratch is short or the workers fail.
pub fn inflate(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    size_sq: i64,
    rate: i64,
    mut heap: Carved<'_>,
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    trace!("sum inflate {}x{} by {size_sq}", src.width(), src.height());
    let arc = HalfArcTable::new(size_sq);
    let size = arc.size() as usize;
    if size == 0 {
        return identity(src, dst, None, workers);
    }
    let (out_w, out_h) = Sense::Inflate.output_size(src.width(), src.height(), size);
    check_size((dst.width(), dst.height()), (out_w, out_h))?;
    let cells = heap.take_masks(out_w * out_h)?;
    let columns = heap.take_masks(src.width() * out_h)?;
    let masks = classify(src, size, Sense::Inflate, cells, columns, workers)?;
    let (cap, area) = (sum_cap(size_sq, rate), arc.area());
    sweep(src, &arc, Sense::Inflate, &masks, dst, workers, || {
        WindowSum::new(cap, area, Sense::Inflate)
    })
}

/// Erode `src` into `dst` in proportion to the missing coverage inside the disk.
///
/// `dst` is `(w - 2m) x (h - 2m)` with `m` the [`margin`] of `size_sq`.
///
/// # Errors
///
/// If `dst` has the wrong size, the scratch is short or the workers fail.
pub fn deflate(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    size_sq: i64,
    rate: i64,
    mut heap: Carved<'_>,
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    trace!("sum deflate {}x{} by {size_sq}", src.width(), src.height());
    let arc = HalfArcTable::new(size_sq);
    let size = arc.size() as usize;
    if size == 0 {
        return identity(src, dst, None, workers);
    }
    let (w, h) = (src.width(), src.height());
    let m = margin(size_sq, Sense::Deflate);
    let (out_w, out_h) = Sense::Deflate.output_size(w, h, m);
    check_size((dst.width(), dst.height()), (out_w, out_h))?;
    if out_w == 0 || out_h == 0 {
        return Ok(Outcome::EMPTY);
    }

    let (bw, bh) = (w + 2, h + 2);
    let framed = heap.take_alphas(bw * bh)?;
    let mut framed = AlphaViewMut::new(framed, bw, bh, bw, SampleLayout::Plane)?;
    // the frame must read as transparent whatever the heap held.
    framed.row_mut(0).fill(0);
    framed.row_mut(bh - 1).fill(0);
    for y in 1..bh - 1 {
        let mut row = framed.row_mut(y);
        row.set(0, 0);
        row.set(bw - 1, 0);
    }
    let interior = Bounds::new(1, 1, w as i32 + 1, h as i32 + 1);
    copy_alpha(src, &mut framed.sub_view_mut(interior)?, workers)?;

    let framed = framed.as_view();
    let cells = heap.take_masks(out_w * out_h)?;
    let columns = heap.take_masks(bw * out_h)?;
    let masks = classify(&framed, size, Sense::Deflate, cells, columns, workers)?;
    let (cap, area) = (sum_cap(size_sq, rate), arc.area());
    sweep(&framed, &arc, Sense::Deflate, &masks, dst, workers, || {
        WindowSum::new(cap, area, Sense::Deflate)
    })
}
