use matte_image::{clamp_alpha, Alpha, AlphaPlane, AlphaViewMut, Bounds};

use crate::error::MorphError;
use crate::parallel::{par_bands, par_chunk_bands, Workers};

/// Denominator of blur widths: `DEN_BLUR_PX` is one pixel.
pub const DEN_BLUR_PX: i32 = 4096;

const LOG2_TAP: u32 = 13;
const TAP: i64 = 1 << LOG2_TAP;

/// Pixels a blur of width `px` adds on every side of its input.
///
/// # Examples
///
/// ```
/// use matte_imgproc::filter::{blur_displace, DEN_BLUR_PX};
///
/// assert_eq!(blur_displace(0), 0);
/// assert_eq!(blur_displace(DEN_BLUR_PX), 1);
/// assert_eq!(blur_displace(2 * DEN_BLUR_PX), 1);
/// assert_eq!(blur_displace(2 * DEN_BLUR_PX + 1), 2);
/// ```
pub fn blur_displace(px: i32) -> i32 {
    if px > 0 {
        ((px - 1) >> LOG2_TAP) + 1
    } else {
        0
    }
}

/// A box of half-width `px / 2` pixels whose outermost taps carry the fractional part.
#[derive(Clone, Copy, Debug)]
struct BoxKernel {
    full: i64,
    frac: i64,
    total: i64,
}

impl BoxKernel {
    fn new(px: i32) -> Self {
        let px = px.max(0) as i64;
        let full = px >> LOG2_TAP;
        let frac = px & (TAP - 1);
        Self {
            full,
            frac,
            total: TAP * (2 * full + 1) + 2 * frac,
        }
    }

    /// The kernel centred on `c`, `prefix[i]` being the sum of the first `i` samples.
    ///
    /// Samples outside the line count as transparent.
    #[inline]
    fn apply(&self, prefix: &[i64], c: i64) -> Alpha {
        let n = prefix.len() as i64 - 1;
        let at = |i: i64| prefix[i.clamp(0, n) as usize];
        let (lo, hi) = (c - self.full, c + self.full + 1);
        let inner = at(hi) - at(lo);
        let edge = (at(lo) - at(lo - 1)) + (at(hi + 1) - at(hi));
        ((TAP * inner + self.frac * edge + self.total / 2) / self.total) as Alpha
    }
}

/// Blur the content of `plane` inside `bd` with a box of width `px`.
///
/// The result is shifted by [`blur_displace`] so that it covers
/// `bd.inflate_br(2 * d, 2 * d)`, which is overwritten entirely.
///
/// # Arguments
///
/// * `plane` - The plane holding the content, large enough for the grown rectangle.
/// * `bd` - The rectangle holding the content. Samples outside it count as transparent.
/// * `px` - The blur width in units of [`DEN_BLUR_PX`].
/// * `workers` - The parallel-for.
///
/// # Returns
///
/// The rectangle now holding the content.
///
/// # Errors
///
/// If the grown rectangle does not fit the plane or the workers fail.
///
/// # Examples
///
/// ```
/// use matte_image::{AlphaPlane, Bounds, MAX_ALPHA};
/// use matte_imgproc::filter::blur_alpha;
/// use matte_imgproc::parallel::ExecutionStrategy;
///
/// let mut plane = AlphaPlane::new(4, 4);
/// plane.set(0, 0, MAX_ALPHA);
/// let bd = blur_alpha(
///     &mut plane.view_mut(),
///     Bounds::new(0, 0, 1, 1),
///     8192,
///     &ExecutionStrategy::Serial,
/// )
/// .unwrap();
/// assert_eq!(bd, Bounds::new(0, 0, 3, 3));
/// assert_eq!(plane.get(1, 1), 455);
/// ```
pub fn blur_alpha(
    plane: &mut AlphaViewMut,
    bd: Bounds,
    px: i32,
    workers: &dyn Workers,
) -> Result<Bounds, MorphError> {
    let d = blur_displace(px);
    if d == 0 || bd.is_empty() {
        return Ok(bd);
    }
    let out = bd.inflate_br(2 * d, 2 * d);
    let mut region = plane.sub_view_mut(out)?;
    let kernel = BoxKernel::new(px);
    let (bw, bh) = (bd.width() as usize, bd.height() as usize);
    let ow = region.width();
    let d = d as i64;

    // horizontal pass, one output row per input row.
    let mut rows = AlphaPlane::new(ow, bh);
    {
        let src = region.as_view();
        par_bands(workers, rows.view_mut(), |y0, mut band| {
            let mut prefix = vec![0i64; bw + 1];
            for y in 0..band.height() {
                for x in 0..bw {
                    prefix[x + 1] = prefix[x] + clamp_alpha(src.get(x, y0 + y)) as i64;
                }
                let mut row = band.row_mut(y);
                for x in 0..ow {
                    row.set(x, kernel.apply(&prefix, x as i64 - d));
                }
            }
        })?;
    }

    // column-major prefix sums of the horizontal pass.
    let mut columns = vec![0i64; ow * (bh + 1)];
    {
        let rows = &rows;
        par_chunk_bands(workers, &mut columns, bh + 1, |x0, group| {
            for (i, prefix) in group.chunks_mut(bh + 1).enumerate() {
                for y in 0..bh {
                    prefix[y + 1] = prefix[y] + rows.get(x0 + i, y) as i64;
                }
            }
        })?;
    }

    let columns = &columns;
    par_bands(workers, region, |y0, mut band| {
        for y in 0..band.height() {
            let c = (y0 + y) as i64 - d;
            let mut row = band.row_mut(y);
            for x in 0..ow {
                let prefix = &columns[x * (bh + 1)..(x + 1) * (bh + 1)];
                row.set(x, kernel.apply(prefix, c));
            }
        }
    })?;
    Ok(out)
}
