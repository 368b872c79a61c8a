//! Dilation and erosion of coverage planes by a disk.
//!
//! Every transform maps a `w x h` source to a destination whose size depends on the radius
//! `s = floor(sqrt(size_sq))` of the structuring element:
//!
//! * inflating writes `(w + 2s) x (h + 2s)` pixels, the destination pixel `(x, y)` being centred
//!   on the source pixel `(x - s, y - s)`; samples outside the source count as transparent.
//! * deflating writes `(w - 2s) x (h - 2s)` pixels, the destination pixel `(x, y)` being centred
//!   on the source pixel `(x + s, y + s)`.
//!
//! A zero budget copies the source as-is and reports the whole plane as its bounds.

use matte_image::{unite_spans, Alpha, AlphaView, AlphaViewMut, Bounds, MAX_ALPHA};

use crate::buffer;
use crate::error::{check_size, MorphError};
use crate::parallel::Workers;

/// threshold-based dilation and erosion.
pub mod bin;

/// threshold-based dilation and erosion at half-pixel radius resolution.
pub mod bin2x;

/// per-cell constancy classification used to skip constant regions.
pub mod masking;

/// exact grayscale dilation and erosion.
pub mod max;

/// cached-extremum grayscale dilation and erosion.
pub mod max_fast;

/// coverage-proportional dilation and erosion.
pub mod sum;

mod window;

/// Direction of a transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sense {
    /// Dilation, growing the canvas.
    Inflate,
    /// Erosion, shrinking the canvas.
    Deflate,
}

impl Sense {
    /// Destination size for a `width x height` source and a radius of `size` pixels.
    ///
    /// Deflating saturates at zero.
    pub fn output_size(self, width: usize, height: usize, size: usize) -> (usize, usize) {
        match self {
            Sense::Inflate => (width + 2 * size, height + 2 * size),
            Sense::Deflate => (
                width.saturating_sub(2 * size),
                height.saturating_sub(2 * size),
            ),
        }
    }

    /// Offset from a destination coordinate to the source coordinate at the disk centre.
    #[inline]
    pub(crate) fn center_shift(self, size: usize) -> i32 {
        match self {
            Sense::Inflate => -(size as i32),
            Sense::Deflate => size as i32,
        }
    }
}

/// What a transform wrote.
///
/// Outside `bounds`, the destination must be read as `fill`. An empty `bounds` means the whole
/// destination is uniformly `fill`: transparent, or fully opaque after an erosion that found
/// nothing to erode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Outcome {
    /// Tightest rectangle holding non-transparent output.
    pub bounds: Bounds,
    /// Value of every sample outside `bounds`.
    pub fill: Alpha,
}

impl Outcome {
    /// Uniformly transparent output.
    pub const EMPTY: Outcome = Outcome {
        bounds: Bounds::EMPTY,
        fill: 0,
    };

    /// Uniformly opaque output.
    pub const FULL: Outcome = Outcome {
        bounds: Bounds::EMPTY,
        fill: MAX_ALPHA,
    };

    /// Output with content inside `bounds` and transparency elsewhere.
    pub const fn within(bounds: Bounds) -> Outcome {
        Outcome { bounds, fill: 0 }
    }

    /// Whether the output is uniform.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

/// Content tracking of one band of written output.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Coverage {
    xs: Option<(i32, i32)>,
    ys: Option<(i32, i32)>,
    all_full: bool,
}

impl Default for Coverage {
    fn default() -> Self {
        Self {
            xs: None,
            ys: None,
            all_full: true,
        }
    }
}

impl Coverage {
    /// Record one written row.
    #[inline]
    pub(crate) fn add_row(&mut self, y: usize, row: RowCoverage) {
        if let Some(span) = row.xs {
            self.xs = unite_spans(self.xs, Some(span));
            self.ys = unite_spans(self.ys, Some((y as i32, y as i32)));
        }
        self.all_full &= row.all_full;
    }

    pub(crate) fn merge(self, other: Coverage) -> Coverage {
        Coverage {
            xs: unite_spans(self.xs, other.xs),
            ys: unite_spans(self.ys, other.ys),
            all_full: self.all_full && other.all_full,
        }
    }

    /// The outcome of a pass that wrote `width x height` pixels.
    pub(crate) fn outcome(self, sense: Sense, width: usize, height: usize) -> Outcome {
        if width == 0 || height == 0 {
            return Outcome::EMPTY;
        }
        if sense == Sense::Deflate && self.all_full {
            return Outcome::FULL;
        }
        Outcome::within(Bounds::from_closed_spans(self.xs, self.ys))
    }
}

/// Content tracking of one written row.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RowCoverage {
    xs: Option<(i32, i32)>,
    all_full: bool,
}

impl Default for RowCoverage {
    fn default() -> Self {
        Self {
            xs: None,
            all_full: true,
        }
    }
}

impl RowCoverage {
    #[inline]
    pub(crate) fn see(&mut self, x: usize, a: Alpha) {
        if a != 0 {
            let x = x as i32;
            self.xs = Some(match self.xs {
                Some((x0, x1)) => (x0.min(x), x1.max(x)),
                None => (x, x),
            });
        }
        self.all_full &= a == MAX_ALPHA;
    }

    /// Record `[x0, x1)` written with `a`.
    #[inline]
    pub(crate) fn see_span(&mut self, x0: usize, x1: usize, a: Alpha) {
        if x0 < x1 {
            self.see(x0, a);
            self.see(x1 - 1, a);
        }
    }
}

/// Fold per-band coverages into one outcome.
pub(crate) fn fold_outcome(
    parts: Vec<Coverage>,
    sense: Sense,
    width: usize,
    height: usize,
) -> Outcome {
    parts
        .into_iter()
        .fold(Coverage::default(), Coverage::merge)
        .outcome(sense, width, height)
}

/// The transform by a zero budget: a copy, optionally thresholded.
pub(crate) fn identity(
    src: &AlphaView,
    dst: &mut AlphaViewMut,
    thresh: Option<Alpha>,
    workers: &dyn Workers,
) -> Result<Outcome, MorphError> {
    check_size(
        (dst.width(), dst.height()),
        (src.width(), src.height()),
    )?;
    match thresh {
        Some(t) => buffer::binarize(src, dst, t, workers)?,
        None => buffer::copy_alpha(src, dst, workers)?,
    }
    if src.width() == 0 || src.height() == 0 {
        return Ok(Outcome::EMPTY);
    }
    Ok(Outcome::within(Bounds::from_size(
        src.width() as i32,
        src.height() as i32,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_size() {
        assert_eq!(Sense::Inflate.output_size(4, 3, 2), (8, 7));
        assert_eq!(Sense::Deflate.output_size(9, 7, 2), (5, 3));
        assert_eq!(Sense::Deflate.output_size(3, 7, 2), (0, 3));
    }

    #[test]
    fn test_coverage_outcome() {
        let mut cov = Coverage::default();
        let mut row = RowCoverage::default();
        row.see(2, 0);
        row.see(3, 100);
        row.see(5, MAX_ALPHA);
        cov.add_row(4, row);
        let mut row = RowCoverage::default();
        row.see(1, 7);
        cov.add_row(6, row);
        assert_eq!(
            cov.outcome(Sense::Inflate, 8, 8),
            Outcome::within(Bounds::new(1, 4, 6, 7))
        );
        assert_eq!(Coverage::default().outcome(Sense::Inflate, 3, 3), Outcome::EMPTY);
    }

    #[test]
    fn test_all_full_deflate_is_uniform() {
        let mut cov = Coverage::default();
        let mut row = RowCoverage::default();
        row.see_span(0, 4, MAX_ALPHA);
        cov.add_row(0, row);
        assert_eq!(cov.outcome(Sense::Deflate, 4, 1), Outcome::FULL);
        assert_eq!(
            cov.outcome(Sense::Inflate, 4, 1),
            Outcome::within(Bounds::new(0, 0, 4, 1))
        );
    }
}
