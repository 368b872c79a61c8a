use matte_image::{clamp_alpha, Alpha, AlphaView, AlphaViewMut, Bounds, MAX_ALPHA};

use crate::error::{check_size, MorphError};
use crate::parallel::{par_bands, Workers};

fn same_size(src: &AlphaView, dst: &AlphaViewMut) -> Result<(), MorphError> {
    check_size(
        (dst.width(), dst.height()),
        (src.width(), src.height()),
    )
}

/// Copy the coverage of `src` into `dst`, clamping every sample.
///
/// Either side may be a standalone plane or an interleaved channel.
///
/// # Errors
///
/// If the sizes differ or the workers fail.
pub fn copy_alpha(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    workers: &dyn Workers,
) -> Result<(), MorphError> {
    same_size(src, dst)?;
    par_bands(workers, dst.reborrow(), |y0, mut band| {
        for y in 0..band.height() {
            let mut row = band.row_mut(y);
            for x in 0..row.width() {
                row.set(x, clamp_alpha(src.get(x, y0 + y)));
            }
        }
    })?;
    Ok(())
}

/// Write `MAX_ALPHA` where `src > thresh` and zero elsewhere.
///
/// # Errors
///
/// If the sizes differ or the workers fail.
pub fn binarize(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    thresh: Alpha,
    workers: &dyn Workers,
) -> Result<(), MorphError> {
    same_size(src, dst)?;
    par_bands(workers, dst.reborrow(), |y0, mut band| {
        for y in 0..band.height() {
            let mut row = band.row_mut(y);
            for x in 0..row.width() {
                let on = src.get(x, y0 + y) > thresh;
                row.set(x, if on { MAX_ALPHA } else { 0 });
            }
        }
    })?;
    Ok(())
}

/// Zero every sample of `dst`.
pub fn clear_alpha(dst: &mut AlphaViewMut) {
    dst.fill(0);
}

/// Set every sample of `dst` to `value`, clamped to `[0, MAX_ALPHA]`.
pub fn fill_alpha(dst: &mut AlphaViewMut, value: Alpha) {
    dst.fill(clamp_alpha(value));
}

/// Zero every sample of `dst` outside `keep`.
pub fn clear_alpha_chrome(dst: &mut AlphaViewMut, keep: Bounds) {
    let keep = keep.intersect(&Bounds::from_size(dst.width() as i32, dst.height() as i32));
    if keep.is_empty() {
        dst.fill(0);
        return;
    }
    let (l, r) = (keep.left as usize, keep.right as usize);
    for y in 0..dst.height() {
        let mut row = dst.row_mut(y);
        if (y as i32) < keep.top || (y as i32) >= keep.bottom {
            row.fill(0);
        } else {
            let w = row.width();
            row.fill_span(0, l, 0);
            row.fill_span(r, w, 0);
        }
    }
}

/// Subtract `hole` from `dst`, saturating at transparency.
///
/// # Errors
///
/// If the sizes differ or the workers fail.
pub fn carve(
    dst: &mut AlphaViewMut,
    hole: &AlphaView,
    workers: &dyn Workers,
) -> Result<(), MorphError> {
    same_size(hole, dst)?;
    par_bands(workers, dst.reborrow(), |y0, mut band| {
        for y in 0..band.height() {
            let mut row = band.row_mut(y);
            for x in 0..row.width() {
                let a = row.get(x) - clamp_alpha(hole.get(x, y0 + y));
                row.set(x, a.max(0));
            }
        }
    })?;
    Ok(())
}
