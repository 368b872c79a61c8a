//! Threshold-based dilation and erosion with radii in half pixels.
//!
//! Every pixel is treated as `2 x 2` sub-pixels, source and destination alike, and the disk is
//! measured in sub-pixel units: the budget `size_sq2` is the squared radius in half pixels. A
//! destination pixel covers `1024` per sub-pixel the disk reaches, so radii ending in a half
//! pixel grow an anti-aliased rim one pixel wide instead of snapping to whole pixels.
//!
//! The passes follow [`bin`](super::bin), with two vertical distances per destination row, one
//! for the upper and one for the lower sub-row. The source is fully consumed before the
//! destination is written, so both may share memory.

use log::trace;
use matte_image::{Alpha, AlphaView, AlphaViewMut, Bounds, MAX_ALPHA};

use crate::arc::{isqrt, ArcTable};
use crate::error::{check_size, MorphError};
use crate::parallel::{par_bands, par_chunk_bands, Workers};

use super::{fold_outcome, Coverage, Outcome, RowCoverage, Sense};

/// Coverage of one sub-pixel.
const SUB_ALPHA: Alpha = MAX_ALPHA / 4;

/// Margin of the destination for the budget `size_sq2`, in whole pixels.
///
/// Dilation rounds the half-pixel radius up, erosion rounds it down.
pub fn margin(size_sq2: i64, sense: Sense) -> usize {
    let size2 = isqrt(size_sq2) as usize;
    match sense {
        Sense::Inflate => (size2 + 1) >> 1,
        Sense::Deflate => size2 >> 1,
    }
}

/// The half-pixel vertical distances of a measured source.
#[derive(Debug)]
pub struct HalfDistances<'h> {
    words: &'h [i32],
    arc: ArcTable,
    sense: Sense,
    margin: usize,
    src_w: usize,
    src_h: usize,
    out_w: usize,
    out_h: usize,
    any_on: bool,
}

/// Vertical half distances of one column, interleaved upper then lower per destination row.
///
/// `up` and `down` count whole rows to the nearest marked row at or above, at or below the
/// centre; `unreached` means none within reach.
fn column_half_distances<M: Fn(i32) -> bool>(
    column: &mut [i32],
    shift: i32,
    unreached: i32,
    cap: i32,
    marked: M,
) {
    let n = (column.len() / 2) as i32;
    let step = |k: i32, y: i32| {
        if marked(y) {
            0
        } else {
            (k + 1).min(unreached)
        }
    };

    let mut up = unreached;
    for y in (shift - unreached).max(-1)..shift {
        up = step(up, y);
    }
    for i in 0..n {
        up = step(up, i + shift);
        column[2 * i as usize] = up;
    }

    let mut down = unreached;
    let last = n - 1 + shift;
    for y in ((last + 1)..=(last + unreached)).rev() {
        down = step(down, y);
    }
    for i in (0..n).rev() {
        down = step(down, i + shift);
        let up = column[2 * i as usize];
        let upper = (if up == 0 { 0 } else { 2 * up - 1 }).min(2 * down);
        let lower = (2 * up).min(if down == 0 { 0 } else { 2 * down - 1 });
        column[2 * i as usize] = upper.min(cap);
        column[2 * i as usize + 1] = lower.min(cap);
    }
}

fn measure<'h>(
    src: &AlphaView,
    thresh: Alpha,
    size_sq2: i64,
    sense: Sense,
    words: &'h mut [i32],
    workers: &dyn Workers,
) -> Result<HalfDistances<'h>, MorphError> {
    let arc = ArcTable::quarter(size_sq2);
    let size2 = arc.size() as i32;
    let margin = margin(size_sq2, sense);
    let (src_w, src_h) = (src.width(), src.height());
    let (out_w, out_h) = sense.output_size(src_w, src_h, margin);
    let need = 2 * src_w * out_h;
    if words.len() < need {
        return Err(MorphError::SizeMismatch(words.len(), 1, need, 1));
    }
    let words = &mut words[..need];
    let shift = sense.center_shift(margin);
    let unreached = (size2 + 1) / 2 + 1;
    let cap = size2 + 1;

    let any_on = if out_w == 0 || out_h == 0 {
        false
    } else {
        par_chunk_bands(workers, words, 2 * out_h, |c0, group| {
            let mut any_on = false;
            for (k, column) in group.chunks_mut(2 * out_h).enumerate() {
                let x = c0 + k;
                let inside = |y: i32| y >= 0 && (y as usize) < src_h;
                match sense {
                    Sense::Inflate => column_half_distances(column, shift, unreached, cap, |y| {
                        inside(y) && src.get(x, y as usize) > thresh
                    }),
                    Sense::Deflate => column_half_distances(column, shift, unreached, cap, |y| {
                        !inside(y) || src.get(x, y as usize) <= thresh
                    }),
                }
                any_on |= (0..src_h).any(|y| src.get(x, y) > thresh);
            }
            any_on
        })?
        .into_iter()
        .any(|on| on)
    };

    Ok(HalfDistances {
        words,
        arc,
        sense,
        margin,
        src_w,
        src_h,
        out_w,
        out_h,
        any_on,
    })
}

/// Run the first pass of a dilation of `src` by the half-pixel budget `size_sq2`.
///
/// # Arguments
///
/// * `src` - The source plane.
/// * `thresh` - Pixels with coverage above `thresh` are on.
/// * `size_sq2` - The squared radius in half pixels.
/// * `words` - Scratch sized after [`heap::bin2x`](crate::heap::bin2x).
/// * `workers` - The parallel-for.
///
/// # Errors
///
/// If the scratch is short or the workers fail.
pub fn measure_inflate<'h>(
    src: &AlphaView,
    thresh: Alpha,
    size_sq2: i64,
    words: &'h mut [i32],
    workers: &dyn Workers,
) -> Result<HalfDistances<'h>, MorphError> {
    trace!("bin2x inflate {}x{} by {size_sq2}", src.width(), src.height());
    measure(src, thresh, size_sq2, Sense::Inflate, words, workers)
}

/// Run the first pass of an erosion of `src` by the half-pixel budget `size_sq2`.
///
/// Rows and columns just outside the source count as off.
///
/// # Errors
///
/// If the scratch is short or the workers fail.
pub fn measure_deflate<'h>(
    src: &AlphaView,
    thresh: Alpha,
    size_sq2: i64,
    words: &'h mut [i32],
    workers: &dyn Workers,
) -> Result<HalfDistances<'h>, MorphError> {
    trace!("bin2x deflate {}x{} by {size_sq2}", src.width(), src.height());
    measure(src, thresh, size_sq2, Sense::Deflate, words, workers)
}

/// Sub-pixel bit of column `i` and sub-row `j`.
#[inline]
fn bit(i: i32, j: usize) -> u8 {
    1 << (2 * j + i as usize)
}

impl HalfDistances<'_> {
    /// Size of the destination [`HalfDistances::write`] expects.
    pub fn output_size(&self) -> (usize, usize) {
        (self.out_w, self.out_h)
    }

    /// Run the second pass into `dst`.
    ///
    /// # Errors
    ///
    /// If `dst` has the wrong size or the workers fail.
    pub fn write(self, dst: &mut AlphaViewMut, workers: &dyn Workers) -> Result<Outcome, MorphError> {
        check_size((dst.width(), dst.height()), (self.out_w, self.out_h))?;
        if self.out_w == 0 || self.out_h == 0 {
            return Ok(Outcome::EMPTY);
        }
        let size2 = self.arc.size();
        if !self.any_on && self.sense == Sense::Inflate && size2 > 0 {
            return Ok(Outcome::EMPTY);
        }

        let shift = self.sense.center_shift(self.margin);
        let (src_w, out_h, sense) = (self.src_w as i32, self.out_h, self.sense);
        let (words, arc) = (self.words, &self.arc);
        // the columns just outside the source are off pixels when eroding.
        let edge = match sense {
            Sense::Inflate => None,
            Sense::Deflate => Some(arc.get(0)),
        };
        let parts = par_bands(workers, dst.reborrow(), |y0, mut band| {
            let mut cov = Coverage::default();
            let mut bits = vec![0u8; band.width()];
            for y in 0..band.height() {
                let oy = y0 + y;
                let mut row = band.row_mut(y);
                let width = row.width();
                let chord = |xs: i32, j: usize| arc.get(words[xs as usize * 2 * out_h + 2 * oy + j]);

                let mut reach = match edge {
                    Some(a) => [a - 2; 2],
                    None => [i32::MIN; 2],
                };
                // source columns left of the first centre.
                for cx in 0..shift.clamp(0, src_w) {
                    for (j, r) in reach.iter_mut().enumerate() {
                        let a = chord(cx, j);
                        if a >= 0 {
                            *r = (*r).max(2 * cx + a);
                        }
                    }
                }
                for x in 0..width {
                    let cx = x as i32 + shift;
                    let mut b = 0;
                    for (j, r) in reach.iter_mut().enumerate() {
                        if (0..src_w).contains(&cx) {
                            let a = chord(cx, j);
                            if a >= 0 {
                                *r = (*r).max(2 * cx + a);
                            }
                        }
                        for i in 0..2 {
                            if *r >= 2 * cx + i - 1 {
                                b |= bit(i, j);
                            }
                        }
                    }
                    bits[x] = b;
                }

                let mut reach = match edge {
                    Some(a) => [2 * src_w - a; 2],
                    None => [i32::MAX; 2],
                };
                // source columns right of the last centre.
                for cx in (width as i32 + shift).max(0)..src_w {
                    for (j, r) in reach.iter_mut().enumerate() {
                        let a = chord(cx, j);
                        if a >= 0 {
                            *r = (*r).min(2 * cx - a);
                        }
                    }
                }
                let mut row_cov = RowCoverage::default();
                for x in (0..width).rev() {
                    let cx = x as i32 + shift;
                    let mut b = bits[x];
                    for (j, r) in reach.iter_mut().enumerate() {
                        if (0..src_w).contains(&cx) {
                            let a = chord(cx, j);
                            if a >= 0 {
                                *r = (*r).min(2 * cx - a);
                            }
                        }
                        for i in 0..2 {
                            if *r <= 2 * cx + i {
                                b |= bit(i, j);
                            }
                        }
                    }
                    let count = b.count_ones() as Alpha;
                    let a = match sense {
                        Sense::Inflate => SUB_ALPHA * count,
                        Sense::Deflate => MAX_ALPHA - SUB_ALPHA * count,
                    };
                    row.set(x, a);
                    row_cov.see(x, a);
                }
                cov.add_row(oy, row_cov);
            }
            cov
        })?;

        if size2 == 0 {
            return Ok(Outcome::within(Bounds::from_size(
                self.src_w as i32,
                self.src_h as i32,
            )));
        }
        Ok(fold_outcome(parts, sense, self.out_w, self.out_h))
    }
}

/// Dilate `src` into a disjoint `dst`, [`measure_inflate`] then [`HalfDistances::write`].
///
/// # Errors
///
/// If `dst` has the wrong size, the scratch is short or the workers fail.
pub fn inflate(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    thresh: Alpha,
    size_sq2: i64,
    words: &mut [i32],
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    measure_inflate(src, thresh, size_sq2, words, workers)?.write(dst, workers)
}

/// Erode `src` into a disjoint `dst`, [`measure_deflate`] then [`HalfDistances::write`].
///
/// # Errors
///
/// If `dst` has the wrong size, the scratch is short or the workers fail.
pub fn deflate(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    thresh: Alpha,
    size_sq2: i64,
    words: &mut [i32],
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    measure_deflate(src, thresh, size_sq2, words, workers)?.write(dst, workers)
}
