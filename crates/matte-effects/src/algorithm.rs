//! Run-time selection of the transform family.
//!
//! Every effect runs the same call shapes (inflate, deflate, sizing) whatever the family, so the
//! family is a closed enum and each operation is one `match`.

use log::trace;
use matte_image::{Alpha, AlphaView, AlphaViewMut, Carved, HeapRequest, MAX_ALPHA};
use matte_imgproc::arc::isqrt;
use matte_imgproc::buffer::copy_alpha;
use matte_imgproc::heap;
use matte_imgproc::morphology::bin::Distances;
use matte_imgproc::morphology::bin2x::HalfDistances;
use matte_imgproc::morphology::sum::DEN_CAP_RATE;
use matte_imgproc::morphology::{bin, bin2x, max, max_fast, sum};
use matte_imgproc::parallel::Workers;
use matte_imgproc::{MorphError, Outcome, Sense};

use crate::params::{DEN_SIZE, MAX_PARAM_A};

/// A family of disk transforms.
///
/// # Examples
///
/// ```
/// use matte_effects::Algorithm;
///
/// // sizes are in tenths of a pixel.
/// assert_eq!(Algorithm::Max.inflate_radius(25), 2);
/// assert_eq!(Algorithm::Bin2x.inflate_radius(25), 3);
/// assert_eq!(Algorithm::Sum.deflate_radius(25), 1);
/// assert!(Algorithm::Bin.allows_buffer_overlap());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Algorithm {
    /// Thresholded, whole-pixel radii.
    Bin,
    /// Thresholded, half-pixel radii.
    #[default]
    Bin2x,
    /// Exact grayscale extremum.
    Max,
    /// Approximate grayscale extremum with a cached duration.
    MaxFast,
    /// Coverage-proportional sum.
    Sum,
}

impl Algorithm {
    /// Every family, in declaration order.
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Bin,
        Algorithm::Bin2x,
        Algorithm::Max,
        Algorithm::MaxFast,
        Algorithm::Sum,
    ];

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Short lowercase name, as used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Bin => "bin",
            Algorithm::Bin2x => "bin2x",
            Algorithm::Max => "max",
            Algorithm::MaxFast => "max_fast",
            Algorithm::Sum => "sum",
        }
    }

    /// Pixels gained on every side by dilating with the raw size `size_raw`.
    pub const fn inflate_radius(self, size_raw: i32) -> i32 {
        if size_raw <= 0 {
            return 0;
        }
        match self {
            Algorithm::Bin2x => (size_raw + DEN_SIZE / 2) / DEN_SIZE,
            _ => size_raw / DEN_SIZE,
        }
    }

    /// Pixels lost on every side by eroding with the raw size `size_raw`.
    pub const fn deflate_radius(self, size_raw: i32) -> i32 {
        if size_raw <= 0 {
            return 0;
        }
        match self {
            Algorithm::Sum => {
                let r = size_raw / DEN_SIZE - 1;
                if r > 0 {
                    r
                } else {
                    0
                }
            }
            _ => size_raw / DEN_SIZE,
        }
    }

    /// The smallest raw size that does anything for this family.
    pub const fn min_effective_size(self) -> i32 {
        match self {
            Algorithm::Bin2x => DEN_SIZE / 2,
            _ => DEN_SIZE,
        }
    }

    /// Squared-radius budget of the raw size `size_raw`, in the units the transform expects.
    ///
    /// Half-pixel transforms take the budget in squared half pixels.
    pub fn budget(self, size_raw: i32) -> i64 {
        let n = size_raw.max(0) as i64;
        let den = DEN_SIZE as i64;
        match self {
            Algorithm::Bin2x => 4 * n * n / (den * den),
            _ => n * n / (den * den),
        }
    }

    /// Margin the transform actually gains or loses for `budget`.
    pub fn margin(self, budget: i64, sense: Sense) -> usize {
        match self {
            Algorithm::Bin2x => bin2x::margin(budget, sense),
            Algorithm::Sum => sum::margin(budget, sense),
            _ => isqrt(budget) as usize,
        }
    }

    /// Whether a two-pass intermediate may share memory with the final destination.
    ///
    /// Thresholded transforms read their whole source before writing; the others read source
    /// neighbourhoods while writing.
    pub const fn allows_buffer_overlap(self) -> bool {
        matches!(self, Algorithm::Bin | Algorithm::Bin2x)
    }

    /// Whether the output only holds `0` and `MAX_ALPHA`.
    pub const fn is_binary(self) -> bool {
        self.allows_buffer_overlap()
    }

    /// The transform running a pass of a chain.
    ///
    /// Chained intermediate passes of the half-pixel family run on whole pixels; only the pass
    /// writing the final shape resolves half pixels.
    pub const fn pass_kernel(self, is_final: bool) -> Algorithm {
        match self {
            Algorithm::Bin2x if !is_final => Algorithm::Bin,
            other => other,
        }
    }

    /// Scratch of one transform of a `width x height` source.
    pub fn heap(self, width: usize, height: usize, budget: i64, sense: Sense) -> HeapRequest {
        match self {
            Algorithm::Bin => heap::bin(width, height, budget, sense),
            Algorithm::Bin2x => heap::bin2x(width, height, budget, sense),
            Algorithm::Max => heap::max(width, height, budget, sense),
            Algorithm::MaxFast => heap::max_fast(width, height, budget, sense),
            Algorithm::Sum => heap::sum(width, height, budget, sense),
        }
    }

    /// Scratch enough for a two-pass effect whose planes all fit `width x height`.
    ///
    /// Covers the transform of either sense plus, when the intermediate cannot share the
    /// destination frame, the intermediate plane itself. Extremum transforms also hold the
    /// coverage they extract from the source.
    pub fn heap_bound(self, width: usize, height: usize) -> HeapRequest {
        let px = width * height;
        let framed = (width + 2) * (height + 2);
        let transform = match self {
            Algorithm::Bin => HeapRequest::words(px),
            Algorithm::Bin2x => HeapRequest::words(2 * px),
            Algorithm::Max | Algorithm::MaxFast => {
                HeapRequest::masks(2 * px) + HeapRequest::alphas(heap::alpha_space(width, height))
            }
            Algorithm::Sum => HeapRequest::new(0, 2 * framed, framed),
        };
        if self.allows_buffer_overlap() {
            transform
        } else {
            transform + HeapRequest::alphas(heap::alpha_space(width, height))
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-family tuning derived from the rate parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tuning {
    /// Coverage above which a pixel is on, for thresholded transforms.
    pub thresh: Alpha,
    /// Cap rate of coverage-proportional transforms.
    pub rate: i64,
}

impl Tuning {
    /// Map `param_a` in `[0, MAX_PARAM_A]` onto the threshold and the cap rate.
    ///
    /// # Examples
    ///
    /// ```
    /// use matte_effects::algorithm::Tuning;
    ///
    /// let t = Tuning::from_param_a(500);
    /// assert_eq!(t.thresh, 2047);
    /// assert_eq!(t.rate, 2048);
    /// ```
    pub fn from_param_a(param_a: i32) -> Self {
        let a = param_a.clamp(0, MAX_PARAM_A);
        Self {
            thresh: ((MAX_ALPHA as i32 - 1) * a / MAX_PARAM_A) as Alpha,
            rate: DEN_CAP_RATE * a as i64 / MAX_PARAM_A as i64,
        }
    }
}

/// One transform of a plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pass {
    /// The transform to run.
    pub algorithm: Algorithm,
    /// Whether it grows or shrinks.
    pub sense: Sense,
    /// The raw size, in units of [`DEN_SIZE`].
    pub size_raw: i32,
}

/// The first half of a thresholded transform, holding nothing of its source.
pub(crate) enum Measured<'h> {
    Whole(Distances<'h>),
    Half(HalfDistances<'h>),
}

impl Measured<'_> {
    pub(crate) fn write(
        self,
        dst: &mut AlphaViewMut,
        workers: &dyn Workers,
    ) -> Result<Outcome, MorphError> {
        match self {
            Measured::Whole(d) => d.write(dst, workers),
            Measured::Half(d) => d.write(dst, workers),
        }
    }
}

impl Pass {
    /// A pass of `algorithm` in `sense` by `size_raw`.
    pub const fn new(algorithm: Algorithm, sense: Sense, size_raw: i32) -> Self {
        Self {
            algorithm,
            sense,
            size_raw,
        }
    }

    /// The squared-radius budget handed to the transform.
    pub fn budget(&self) -> i64 {
        self.algorithm.budget(self.size_raw)
    }

    /// Pixels gained or lost on every side.
    pub fn margin(&self) -> usize {
        self.algorithm.margin(self.budget(), self.sense)
    }

    /// Signed growth of the canvas on every side.
    pub fn growth(&self) -> i32 {
        match self.sense {
            Sense::Inflate => self.margin() as i32,
            Sense::Deflate => -(self.margin() as i32),
        }
    }

    /// Destination size for a `width x height` source.
    pub fn output_size(&self, width: usize, height: usize) -> (usize, usize) {
        self.sense.output_size(width, height, self.margin())
    }

    /// Scratch of this pass on a `width x height` source.
    pub fn heap(&self, width: usize, height: usize) -> HeapRequest {
        self.algorithm
            .heap(width, height, self.budget(), self.sense)
    }

    /// Run the pass from `src` into a disjoint `dst`.
    ///
    /// # Errors
    ///
    /// If `dst` has the wrong size, the scratch is short or the workers fail.
    pub fn run(
        &self,
        src: &AlphaView,
        dst: &mut AlphaViewMut,
        tuning: Tuning,
        heap: Carved<'_>,
        workers: &dyn Workers,
    ) -> Result<Outcome, MorphError> {
        trace!(
            "{} {:?} {}x{} by {}",
            self.algorithm,
            self.sense,
            src.width(),
            src.height(),
            self.size_raw
        );
        let budget = self.budget();
        match (self.algorithm, self.sense) {
            (Algorithm::Bin | Algorithm::Bin2x, _) => {
                self.measure(src, tuning, heap.words, workers)?.write(dst, workers)
            }
            (Algorithm::Max, Sense::Inflate) => max::inflate(src, dst, budget, heap, workers),
            (Algorithm::Max, Sense::Deflate) => max::deflate(src, dst, budget, heap, workers),
            (Algorithm::MaxFast, Sense::Inflate) => {
                max_fast::inflate(src, dst, budget, heap, workers)
            }
            (Algorithm::MaxFast, Sense::Deflate) => {
                max_fast::deflate(src, dst, budget, heap, workers)
            }
            (Algorithm::Sum, Sense::Inflate) => {
                sum::inflate(src, dst, budget, tuning.rate, heap, workers)
            }
            (Algorithm::Sum, Sense::Deflate) => {
                sum::deflate(src, dst, budget, tuning.rate, heap, workers)
            }
        }
    }

    /// Whether the pass pulls an interleaved source out into a plane before transforming it.
    pub const fn extracts(&self) -> bool {
        matches!(self.algorithm, Algorithm::Max | Algorithm::MaxFast)
    }

    /// Run the pass from the interleaved `src`, leaving its coverage in `extracted`.
    ///
    /// # Errors
    ///
    /// If a plane has the wrong size, the scratch is short or the workers fail.
    pub fn run_extracting(
        &self,
        src: &AlphaView,
        extracted: &mut AlphaViewMut,
        dst: &mut AlphaViewMut,
        tuning: Tuning,
        heap: Carved<'_>,
        workers: &dyn Workers,
    ) -> Result<Outcome, MorphError> {
        let budget = self.budget();
        match (self.algorithm, self.sense) {
            (Algorithm::Max, Sense::Inflate) => {
                max::inflate_extracting(src, extracted, dst, budget, heap, workers)
            }
            (Algorithm::Max, Sense::Deflate) => {
                max::deflate_extracting(src, extracted, dst, budget, heap, workers)
            }
            (Algorithm::MaxFast, Sense::Inflate) => {
                max_fast::inflate_extracting(src, extracted, dst, budget, heap, workers)
            }
            (Algorithm::MaxFast, Sense::Deflate) => {
                max_fast::deflate_extracting(src, extracted, dst, budget, heap, workers)
            }
            _ => {
                copy_alpha(src, extracted, workers)?;
                self.run(&extracted.as_view(), dst, tuning, heap, workers)
            }
        }
    }

    /// Read `src` into `words` for a thresholded pass, so the destination may reuse its memory.
    pub(crate) fn measure<'h>(
        &self,
        src: &AlphaView,
        tuning: Tuning,
        words: &'h mut [i32],
        workers: &dyn Workers,
    ) -> Result<Measured<'h>, MorphError> {
        let budget = self.budget();
        let thresh = tuning.thresh;
        Ok(match (self.algorithm, self.sense) {
            (Algorithm::Bin2x, Sense::Inflate) => {
                Measured::Half(bin2x::measure_inflate(src, thresh, budget, words, workers)?)
            }
            (Algorithm::Bin2x, Sense::Deflate) => {
                Measured::Half(bin2x::measure_deflate(src, thresh, budget, words, workers)?)
            }
            (_, Sense::Inflate) => {
                Measured::Whole(bin::measure_inflate(src, thresh, budget, words, workers)?)
            }
            (_, Sense::Deflate) => {
                Measured::Whole(bin::measure_deflate(src, thresh, budget, words, workers)?)
            }
        })
    }
}
