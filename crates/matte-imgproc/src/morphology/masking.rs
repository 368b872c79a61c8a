//! Constancy classification of the square neighbourhood of every output pixel.
//!
//! The neighbourhood of an output pixel is the `(2s + 1) x (2s + 1)` square centred on its
//! source pixel, which contains the whole disk. A cell is [`Mask::Zero`] when every sample of that
//! square is transparent, [`Mask::Full`] when every sample is opaque, and [`Mask::Gray`] otherwise.
//! Samples outside the source count as transparent.
//!
//! Classification is separable: the first pass classifies the vertical span of every source
//! column, the second combines the column classes horizontally.

use matte_image::{AlphaView, Bounds, Mask, MAX_ALPHA};

use crate::error::MorphError;
use crate::parallel::{par_chunk_bands, Workers};

use super::Sense;

/// Mask cells of one destination, row-major.
#[derive(Clone, Copy, Debug)]
pub struct MaskPlane<'h> {
    cells: &'h [Mask],
    width: usize,
    height: usize,
    bounds: Bounds,
    all_full: bool,
}

impl<'h> MaskPlane<'h> {
    /// Width of the classified destination.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the classified destination.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The class of the destination pixel `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Mask {
        self.cells[y * self.width + x]
    }

    /// Tightest rectangle holding every cell that is not [`Mask::Zero`].
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Whether every cell is [`Mask::Full`].
    pub fn all_full(&self) -> bool {
        self.all_full
    }

    /// The cells, row-major.
    pub fn as_slice(&self) -> &'h [Mask] {
        self.cells
    }
}

/// Mask cells needed to classify a `width x height` source for a radius of `size`.
///
/// One cell per destination pixel plus one per source column and destination row.
pub fn heap_cells(width: usize, height: usize, size: usize, sense: Sense) -> usize {
    let (out_w, out_h) = sense.output_size(width, height, size);
    out_w * out_h + width * out_h
}

/// Source offset of the first sample of the window of destination index `0`.
#[inline]
fn window_offset(size: usize, sense: Sense) -> i32 {
    match sense {
        Sense::Inflate => -2 * size as i32,
        Sense::Deflate => 0,
    }
}

/// Classify every window `[i + off, i + off + span]` of a line of `src_len` samples.
///
/// `class_of` reports whether the sample is non-transparent and whether it is non-opaque.
fn classify_line<P, W>(out_len: usize, span: usize, off: i32, src_len: usize, class_of: P, mut write: W)
where
    P: Fn(usize) -> (bool, bool),
    W: FnMut(usize, Mask),
{
    let span = span as i32;
    let mut last_nonzero = i32::MIN;
    let mut last_nonfull = i32::MIN;
    let mut next = off;
    for i in 0..out_len {
        let start = i as i32 + off;
        let end = start + span;
        while next <= end {
            if next < 0 || next as usize >= src_len {
                last_nonfull = next;
            } else {
                let (nonzero, nonfull) = class_of(next as usize);
                if nonzero {
                    last_nonzero = next;
                }
                if nonfull {
                    last_nonfull = next;
                }
            }
            next += 1;
        }
        let mask = if last_nonzero < start {
            Mask::Zero
        } else if last_nonfull < start {
            Mask::Full
        } else {
            Mask::Gray
        };
        write(i, mask);
    }
}

/// Classify the neighbourhood of every destination pixel of a transform of `src`.
///
/// # Arguments
///
/// * `src` - The source plane.
/// * `size` - The radius of the disk.
/// * `sense` - The direction of the transform, which fixes the destination geometry.
/// * `cells` - Scratch receiving one cell per destination pixel.
/// * `columns` - Scratch for the vertical pass, one cell per source column and destination row.
/// * `workers` - The parallel-for running both passes.
///
/// # Errors
///
/// If a scratch slice is too short or the workers fail.
pub fn classify<'h>(
    src: &AlphaView,
    size: usize,
    sense: Sense,
    cells: &'h mut [Mask],
    columns: &mut [Mask],
    workers: &dyn Workers,
) -> Result<MaskPlane<'h>, MorphError> {
    let (w, h) = (src.width(), src.height());
    let (out_w, out_h) = sense.output_size(w, h, size);
    if cells.len() < out_w * out_h {
        return Err(MorphError::SizeMismatch(cells.len(), 1, out_w * out_h, 1));
    }
    if columns.len() < w * out_h {
        return Err(MorphError::SizeMismatch(columns.len(), 1, w * out_h, 1));
    }
    let cells = &mut cells[..out_w * out_h];
    let off = window_offset(size, sense);
    let span = 2 * size;

    if out_w == 0 || out_h == 0 {
        return Ok(MaskPlane {
            cells,
            width: out_w,
            height: out_h,
            bounds: Bounds::EMPTY,
            all_full: false,
        });
    }

    // columns[x * out_h + y] classifies the vertical window of source column x for row y.
    let columns = &mut columns[..w * out_h];
    par_chunk_bands(workers, columns, out_h, |c0, group| {
        for (k, column) in group.chunks_mut(out_h).enumerate() {
            let x = c0 + k;
            classify_line(
                out_h,
                span,
                off,
                h,
                |y| {
                    let a = src.get(x, y);
                    (a > 0, a < MAX_ALPHA)
                },
                |y, m| column[y] = m,
            );
        }
    })?;

    let columns = &*columns;
    let parts = par_chunk_bands(workers, cells, out_w, |r0, group| {
        let mut xs: Option<(i32, i32)> = None;
        let mut ys: Option<(i32, i32)> = None;
        let mut all_full = true;
        for (k, row) in group.chunks_mut(out_w).enumerate() {
            let y = r0 + k;
            let mut row_xs: Option<(i32, i32)> = None;
            classify_line(
                out_w,
                span,
                off,
                w,
                |x| {
                    let m = columns[x * out_h + y];
                    (m != Mask::Zero, m != Mask::Full)
                },
                |x, m| {
                    row[x] = m;
                    if m != Mask::Zero {
                        let x = x as i32;
                        row_xs = Some(row_xs.map_or((x, x), |(a, b)| (a.min(x), b.max(x))));
                    }
                    all_full &= m == Mask::Full;
                },
            );
            if row_xs.is_some() {
                xs = matte_image::unite_spans(xs, row_xs);
                ys = matte_image::unite_spans(ys, Some((y as i32, y as i32)));
            }
        }
        (xs, ys, all_full)
    })?;

    let (xs, ys, all_full) = parts.into_iter().fold(
        (None, None, true),
        |(xs, ys, full), (pxs, pys, pfull)| {
            (
                matte_image::unite_spans(xs, pxs),
                matte_image::unite_spans(ys, pys),
                full && pfull,
            )
        },
    );

    Ok(MaskPlane {
        cells,
        width: out_w,
        height: out_h,
        bounds: Bounds::from_closed_spans(xs, ys),
        all_full,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::ExecutionStrategy;
    use matte_image::AlphaPlane;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force(src: &AlphaView, size: usize, sense: Sense, x: usize, y: usize) -> Mask {
        let s = size as i32;
        let (cx, cy) = (
            x as i32 + sense.center_shift(size),
            y as i32 + sense.center_shift(size),
        );
        let (mut any_on, mut any_off) = (false, false);
        for dy in -s..=s {
            for dx in -s..=s {
                let a = src.sample(cx + dx, cy + dy);
                any_on |= a > 0;
                any_off |= a < MAX_ALPHA;
            }
        }
        match (any_on, any_off) {
            (false, _) => Mask::Zero,
            (true, false) => Mask::Full,
            _ => Mask::Gray,
        }
    }

    #[test]
    fn test_matches_brute_force() -> Result<(), MorphError> {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let (w, h) = (rng.random_range(1..14), rng.random_range(1..14));
            let mut plane = AlphaPlane::new(w, h);
            for y in 0..h {
                for x in 0..w {
                    let a = match rng.random_range(0..4) {
                        0 | 1 => 0,
                        2 => MAX_ALPHA,
                        _ => rng.random_range(1..MAX_ALPHA),
                    };
                    plane.set(x, y, a);
                }
            }
            for size in 0..4 {
                for sense in [Sense::Inflate, Sense::Deflate] {
                    let (out_w, out_h) = sense.output_size(w, h, size);
                    let mut cells = vec![Mask::Gray; heap_cells(w, h, size, sense)];
                    let (cells, columns) = cells.split_at_mut(out_w * out_h);
                    let view = plane.view();
                    let masks = classify(
                        &view,
                        size,
                        sense,
                        cells,
                        columns,
                        &ExecutionStrategy::Fixed(3),
                    )?;
                    for y in 0..out_h {
                        for x in 0..out_w {
                            assert_eq!(
                                masks.get(x, y),
                                brute_force(&view, size, sense, x, y),
                                "{w}x{h} size {size} {sense:?} at ({x}, {y})"
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_bounds_and_full_flag() -> Result<(), MorphError> {
        let mut plane = AlphaPlane::new(6, 6);
        plane.set(2, 3, 100);
        let mut cells = vec![Mask::Zero; heap_cells(6, 6, 1, Sense::Inflate)];
        let (cells, columns) = cells.split_at_mut(64);
        let masks = classify(
            &plane.view(),
            1,
            Sense::Inflate,
            cells,
            columns,
            &ExecutionStrategy::Serial,
        )?;
        assert_eq!(masks.bounds(), Bounds::new(2, 3, 5, 6));
        assert!(!masks.all_full());

        let plane = AlphaPlane::filled(5, 5, MAX_ALPHA);
        let mut cells = vec![Mask::Zero; heap_cells(5, 5, 1, Sense::Deflate)];
        let (cells, columns) = cells.split_at_mut(9);
        let masks = classify(
            &plane.view(),
            1,
            Sense::Deflate,
            cells,
            columns,
            &ExecutionStrategy::Serial,
        )?;
        assert!(masks.all_full());
        Ok(())
    }

    #[test]
    fn test_short_scratch() {
        let plane = AlphaPlane::new(4, 4);
        let mut cells = vec![Mask::Zero; 3];
        let mut columns = vec![Mask::Zero; 64];
        let res = classify(
            &plane.view(),
            1,
            Sense::Inflate,
            &mut cells,
            &mut columns,
            &ExecutionStrategy::Serial,
        );
        assert!(res.is_err());
    }
}
