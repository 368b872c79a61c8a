//! Threshold-based dilation and erosion.
//!
//! A source pixel is on when its coverage exceeds the threshold. The transform is a separable
//! distance transform in two passes:
//!
//! 1. every source column records, for each destination row, the vertical distance from the
//!    disk centre to the nearest on pixel (nearest off pixel when eroding), capped one past the
//!    radius;
//! 2. every destination row combines those distances with the arc table: a source column at
//!    horizontal offset `dx` with vertical distance `v` reaches the centre iff `|dx| <= arc[v]`.
//!
//! The first pass fully reads the source into the heap words before the second writes anything,
//! so the destination may overlap the source. [`measure_inflate`] and [`measure_deflate`] run
//! the first pass and release the source; [`Distances::write`] runs the second.

use log::trace;
use matte_image::{Alpha, AlphaView, AlphaViewMut, Bounds, MAX_ALPHA};

use crate::arc::ArcTable;
use crate::error::{check_size, MorphError};
use crate::parallel::{par_bands, par_chunk_bands, Workers};

use super::{fold_outcome, Coverage, Outcome, RowCoverage, Sense};

/// The vertical distances of a measured source, ready to be written out.
#[derive(Debug)]
pub struct Distances<'h> {
    words: &'h [i32],
    arc: ArcTable,
    sense: Sense,
    src_w: usize,
    src_h: usize,
    out_w: usize,
    out_h: usize,
    any_on: bool,
}

/// Scan one column forward then backward, keeping the distance to the nearest marked row.
///
/// `marked(y)` tests the source row `y`; rows outside `0..src_h` are marked iff `outside`.
/// The destination index `i` corresponds to the source row `i + shift`.
fn column_distances<M: Fn(usize) -> bool>(
    column: &mut [i32],
    shift: i32,
    src_h: usize,
    cap: i32,
    outside: bool,
    marked: M,
) -> bool {
    let is_marked = |y: i32| {
        if y < 0 || y as usize >= src_h {
            outside
        } else {
            marked(y as usize)
        }
    };
    let mut any = false;
    let n = column.len() as i32;

    // seed with the rows above the first destination row.
    let mut d = cap;
    for y in (shift - cap).max(-1)..shift {
        d = if is_marked(y) { 0 } else { (d + 1).min(cap) };
    }
    for i in 0..n {
        let m = is_marked(i + shift);
        any |= m && (0..src_h as i32).contains(&(i + shift));
        d = if m { 0 } else { (d + 1).min(cap) };
        column[i as usize] = d;
    }

    let mut d = cap;
    let last = n - 1 + shift;
    for y in ((last + 1)..=(last + cap).min(src_h as i32)).rev() {
        d = if is_marked(y) { 0 } else { (d + 1).min(cap) };
    }
    for i in (0..n).rev() {
        d = if is_marked(i + shift) { 0 } else { (d + 1).min(cap) };
        let slot = &mut column[i as usize];
        *slot = (*slot).min(d);
    }
    any
}

fn measure<'h>(
    src: &AlphaView,
    thresh: Alpha,
    size_sq: i64,
    sense: Sense,
    words: &'h mut [i32],
    workers: &dyn Workers,
) -> Result<Distances<'h>, MorphError> {
    let arc = ArcTable::quarter(size_sq);
    let size = arc.size();
    let (src_w, src_h) = (src.width(), src.height());
    let (out_w, out_h) = sense.output_size(src_w, src_h, size);
    let need = src_w * out_h;
    if words.len() < need {
        return Err(MorphError::SizeMismatch(words.len(), 1, need, 1));
    }
    let words = &mut words[..need];
    let cap = size as i32 + 1;
    let shift = sense.center_shift(size);

    let any_on = if out_w == 0 || out_h == 0 {
        false
    } else {
        par_chunk_bands(workers, words, out_h, |c0, group| {
            let mut any_on = false;
            for (k, column) in group.chunks_mut(out_h).enumerate() {
                let x = c0 + k;
                any_on |= match sense {
                    Sense::Inflate => {
                        column_distances(column, shift, src_h, cap, false, |y| {
                            src.get(x, y) > thresh
                        })
                    }
                    // off pixels are marked, so an unmarked column still has on pixels.
                    Sense::Deflate => {
                        column_distances(column, shift, src_h, cap, true, |y| {
                            src.get(x, y) <= thresh
                        });
                        column.iter().any(|&d| d > 0)
                    }
                };
            }
            any_on
        })?
        .into_iter()
        .any(|on| on)
    };

    Ok(Distances {
        words,
        arc,
        sense,
        src_w,
        src_h,
        out_w,
        out_h,
        any_on,
    })
}

/// Run the first pass of a dilation of `src` by the budget `size_sq`.
///
/// # Arguments
///
/// * `src` - The source plane.
/// * `thresh` - Pixels with coverage above `thresh` are on.
/// * `size_sq` - The squared-radius budget.
/// * `words` - Scratch sized after [`heap::bin`](crate::heap::bin).
/// * `workers` - The parallel-for.
///
/// # Errors
///
/// If the scratch is short or the workers fail.
pub fn measure_inflate<'h>(
    src: &AlphaView,
    thresh: Alpha,
    size_sq: i64,
    words: &'h mut [i32],
    workers: &dyn Workers,
) -> Result<Distances<'h>, MorphError> {
    trace!("bin inflate {}x{} by {size_sq}", src.width(), src.height());
    measure(src, thresh, size_sq, Sense::Inflate, words, workers)
}

/// Run the first pass of an erosion of `src` by the budget `size_sq`.
///
/// Rows outside the source count as off. See [`measure_inflate`].
///
/// # Errors
///
/// If the scratch is short or the workers fail.
pub fn measure_deflate<'h>(
    src: &AlphaView,
    thresh: Alpha,
    size_sq: i64,
    words: &'h mut [i32],
    workers: &dyn Workers,
) -> Result<Distances<'h>, MorphError> {
    trace!("bin deflate {}x{} by {size_sq}", src.width(), src.height());
    measure(src, thresh, size_sq, Sense::Deflate, words, workers)
}

impl Distances<'_> {
    /// Size of the destination [`Distances::write`] expects.
    pub fn output_size(&self) -> (usize, usize) {
        (self.out_w, self.out_h)
    }

    /// Run the second pass into `dst`.
    ///
    /// A dilation of a source without any on pixel writes nothing and reports an empty outcome.
    ///
    /// # Errors
    ///
    /// If `dst` has the wrong size or the workers fail.
    pub fn write(self, dst: &mut AlphaViewMut, workers: &dyn Workers) -> Result<Outcome, MorphError> {
        check_size((dst.width(), dst.height()), (self.out_w, self.out_h))?;
        if self.out_w == 0 || self.out_h == 0 {
            return Ok(Outcome::EMPTY);
        }
        let size = self.arc.size();
        if !self.any_on && size > 0 {
            return Ok(Outcome::EMPTY);
        }

        let shift = self.sense.center_shift(size);
        let (src_w, out_h) = (self.src_w, self.out_h);
        let (words, arc, sense) = (self.words, &self.arc, self.sense);
        // inflating marks on pixels, deflating marks off pixels.
        let (hit, miss) = match sense {
            Sense::Inflate => (MAX_ALPHA, 0),
            Sense::Deflate => (0, MAX_ALPHA),
        };
        let parts = par_bands(workers, dst.reborrow(), |y0, mut band| {
            let mut cov = Coverage::default();
            for y in 0..band.height() {
                let oy = y0 + y;
                let mut row = band.row_mut(y);
                let width = row.width();
                let dist = |xs: i32| words[xs as usize * out_h + oy];

                // forward: the furthest right reach of the columns left of the centre, seeded
                // with the source columns left of the first centre.
                let mut reach = (0..shift.clamp(0, src_w as i32))
                    .map(|cx| cx + arc.get(dist(cx)))
                    .fold(i32::MIN, i32::max);
                for x in 0..width {
                    let cx = x as i32 + shift;
                    if (0..src_w as i32).contains(&cx) {
                        reach = reach.max(cx + arc.get(dist(cx)));
                    }
                    row.set(x, if reach >= cx { hit } else { miss });
                }

                // backward: the furthest left reach of the columns right of the centre.
                let mut reach = ((width as i32 + shift).max(0)..src_w as i32)
                    .map(|cx| cx - arc.get(dist(cx)))
                    .fold(i32::MAX, i32::min);
                let mut row_cov = RowCoverage::default();
                for x in (0..width).rev() {
                    let cx = x as i32 + shift;
                    if (0..src_w as i32).contains(&cx) {
                        reach = reach.min(cx - arc.get(dist(cx)));
                    }
                    if reach <= cx {
                        row.set(x, hit);
                    }
                    row_cov.see(x, row.get(x));
                }
                cov.add_row(oy, row_cov);
            }
            cov
        })?;

        if size == 0 {
            return Ok(Outcome::within(Bounds::from_size(
                self.src_w as i32,
                self.src_h as i32,
            )));
        }
        Ok(fold_outcome(parts, sense, self.out_w, self.out_h))
    }
}

/// Dilate `src` into a disjoint `dst`, [`measure_inflate`] then [`Distances::write`].
///
/// # Errors
///
/// If `dst` has the wrong size, the scratch is short or the workers fail.
///
/// # Examples
///
/// ```
/// use matte_image::{AlphaPlane, Bounds, MAX_ALPHA};
/// use matte_imgproc::morphology::bin;
/// use matte_imgproc::parallel::ExecutionStrategy;
///
/// let mut src = AlphaPlane::new(4, 4);
/// src.set(1, 1, MAX_ALPHA);
/// let mut dst = AlphaPlane::new(8, 8);
/// let mut words = vec![0; 4 * 8];
/// let outcome = bin::inflate(&src.view(), &mut dst.view_mut(), 0, 4, &mut words, &ExecutionStrategy::Serial).unwrap();
/// assert_eq!(outcome.bounds, Bounds::new(1, 1, 6, 6));
/// ```
pub fn inflate(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    thresh: Alpha,
    size_sq: i64,
    words: &mut [i32],
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    measure_inflate(src, thresh, size_sq, words, workers)?.write(dst, workers)
}

/// Erode `src` into a disjoint `dst`, [`measure_deflate`] then [`Distances::write`].
///
/// # Errors
///
/// If `dst` has the wrong size, the scratch is short or the workers fail.
pub fn deflate(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    thresh: Alpha,
    size_sq: i64,
    words: &mut [i32],
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    measure_deflate(src, thresh, size_sq, words, workers)?.write(dst, workers)
}
