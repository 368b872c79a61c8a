//! Pass planning of the matte effects.
//!
//! A plan turns a signed size, a secondary size and a blur width into at most two transforms, the
//! blur and the final displacement of the canvas. Planning never touches pixels; the executor
//! replays a plan on the frames.

use log::{debug, warn};
use matte_imgproc::filter::{blur_displace, DEN_BLUR_PX};
use matte_imgproc::Sense;

use crate::algorithm::{Algorithm, Pass};
use crate::config::CanvasLimits;
use crate::params::DEN_SIZE;

/// The verdict of a planner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sizing<P> {
    /// The request fits the ceilings, possibly after clamping.
    Planned(P),
    /// The request changes nothing.
    NoOp,
    /// No clamped form of the request fits the ceilings.
    Invalid,
}

impl<P> Sizing<P> {
    /// The plan, if any.
    pub fn planned(self) -> Option<P> {
        match self {
            Sizing::Planned(plan) => Some(plan),
            _ => None,
        }
    }
}

/// A resolved chain of transforms over one matte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MattePlan {
    /// The transform family; also decides the copy of a pass-less plan.
    pub algorithm: Algorithm,
    /// Transforms to run in order, at most two.
    pub passes: Vec<Pass>,
    /// Whether the intermediate of a two-pass plan may live in the destination frame.
    pub overlap: bool,
    /// Blur width, in units of [`DEN_BLUR_PX`].
    pub blur_px: i32,
    /// Signed growth of the output canvas on every side.
    pub displace: i32,
    /// Whether the shape vanishes before any pixel is touched.
    pub collapsed: bool,
}

impl MattePlan {
    fn new(algorithm: Algorithm, passes: Vec<Pass>, blur_px: i32, displace: i32) -> Self {
        Self {
            algorithm,
            overlap: algorithm.allows_buffer_overlap(),
            passes,
            blur_px,
            displace,
            collapsed: false,
        }
    }

    /// Pixels the blur adds on every side.
    pub fn blur_displace(&self) -> i32 {
        blur_displace(self.blur_px)
    }

    /// Signed growth of the pixels the plan actually produces, before placement on the canvas.
    pub fn natural_displace(&self) -> i32 {
        self.passes.iter().map(Pass::growth).sum::<i32>() + self.blur_displace()
    }

    /// Whether the plan only copies the source.
    pub fn is_copy(&self) -> bool {
        self.passes.is_empty() && self.blur_px == 0 && self.displace == 0
    }
}

/// Raw blur width to blur units.
pub(crate) fn blur_px(blur_raw: i32) -> i32 {
    blur_raw.max(0) * DEN_BLUR_PX / DEN_SIZE
}

/// The two transforms of a grow-then-shrink request and the displacements they imply.
#[derive(Clone, Copy, Debug)]
struct InflateSpec {
    grow: i32,
    shrink: i32,
    passes: [Option<Pass>; 2],
}

fn inflate_spec(algorithm: Algorithm, sum: i32, neg: i32) -> InflateSpec {
    let inflate = |alg: Algorithm| Pass::new(alg, Sense::Inflate, sum);
    let deflate = |alg: Algorithm| Pass::new(alg, Sense::Deflate, neg);
    match algorithm {
        Algorithm::Bin2x => {
            let two_pass = neg >= DEN_SIZE / 2;
            let first = if two_pass { Algorithm::Bin } else { Algorithm::Bin2x };
            let grow = first.inflate_radius(sum);
            InflateSpec {
                grow,
                shrink: if two_pass { Algorithm::Bin2x.deflate_radius(neg) } else { 0 },
                passes: [
                    (grow > 0).then(|| inflate(first)),
                    two_pass.then(|| deflate(Algorithm::Bin2x)),
                ],
            }
        }
        Algorithm::Sum => {
            let raw = algorithm.inflate_radius(sum);
            let two_pass = neg >= DEN_SIZE;
            // both sides of a shrinking sum keep one pixel of the inverted frame.
            let extra = two_pass as i32;
            InflateSpec {
                grow: raw + extra,
                shrink: if two_pass { algorithm.deflate_radius(neg) + extra } else { 0 },
                passes: [
                    (raw > 0).then(|| inflate(algorithm)),
                    two_pass.then(|| deflate(algorithm)),
                ],
            }
        }
        _ => {
            let grow = algorithm.inflate_radius(sum);
            let shrink = algorithm.deflate_radius(neg);
            InflateSpec {
                grow,
                shrink,
                passes: [
                    (grow > 0).then(|| inflate(algorithm)),
                    (shrink > 0).then(|| deflate(algorithm)),
                ],
            }
        }
    }
}

/// Upper bound on clamp iterations; every iteration lowers a size by at least `DEN_SIZE`.
pub(crate) const MAX_CLAMP_STEPS: usize = 2 * (crate::params::MAX_SIZE / DEN_SIZE) as usize + 2;

/// Plan a matte grown by `size`, with `neg` grown then shrunk back, then blurred.
///
/// The clamp loop checks the largest plane against the working canvas of `algorithm` and the
/// output canvas against the final ceiling. While either is exceeded it lowers `neg` first, then
/// `size`, by the excess.
///
/// # Arguments
///
/// * `algorithm` - The transform family.
/// * `size` - The raw growth, at least `0`.
/// * `neg` - The raw size grown and shrunk back, at least `0`.
/// * `blur` - The raw blur width, clamped to `size`.
/// * `src` - The source size.
/// * `limits` - The canvas ceilings.
///
/// # Examples
///
/// ```
/// use matte_effects::sizing::{plan_inflate_first, Sizing};
/// use matte_effects::{Algorithm, CanvasLimits};
///
/// let limits = CanvasLimits::new((100, 100), (100, 100));
/// let plan = plan_inflate_first(Algorithm::Max, 200, 0, 0, (40, 40), &limits)
///     .planned()
///     .unwrap();
/// assert_eq!(plan.passes.len(), 1);
/// assert_eq!(plan.displace, 20);
///
/// // 40 + 2 * 40 exceeds the ceilings, the size comes down to 30 pixels.
/// let plan = plan_inflate_first(Algorithm::Max, 400, 0, 0, (40, 40), &limits)
///     .planned()
///     .unwrap();
/// assert_eq!(plan.displace, 30);
/// ```
pub fn plan_inflate_first(
    algorithm: Algorithm,
    size: i32,
    neg: i32,
    blur: i32,
    src: (usize, usize),
    limits: &CanvasLimits,
) -> Sizing<MattePlan> {
    if size <= 0 && neg <= 0 {
        return Sizing::Invalid;
    }
    let (mut size, mut neg) = (size.max(0), neg.max(0));
    let (mem_w, mem_h) = limits.working(algorithm);
    let (max_w, max_h) = limits.max_final();
    let (w, h) = (src.0 as i64, src.1 as i64);
    let excess = |d: i32, lim_w: usize, lim_h: usize| -> i64 {
        let d = 2 * d as i64;
        (w + d - lim_w as i64).max(h + d - lim_h as i64)
    };

    for step in 0..MAX_CLAMP_STEPS {
        let blur = blur.clamp(0, size);
        let sum = size - blur / 2 + neg;
        let spec = inflate_spec(algorithm, sum, neg);
        let px = blur_px(blur);
        let bd = blur_displace(px);
        let displace = (size + DEN_SIZE / 2) / DEN_SIZE;
        let natural = spec.grow - spec.shrink + bd;

        let mut diff = excess(spec.grow.max(natural).max(displace), mem_w, mem_h);
        if diff <= 0 {
            diff = excess(natural.max(displace), max_w, max_h);
            if diff <= 0 {
                let passes: Vec<Pass> = spec.passes.into_iter().flatten().collect();
                debug!(
                    "{algorithm} inflate-first: {} pass(es), displace {displace}, blur {blur} after {step} clamp(s)",
                    passes.len()
                );
                let plan = MattePlan::new(algorithm, passes, px, displace);
                if plan.is_copy() && !algorithm.is_binary() {
                    return Sizing::NoOp;
                }
                return Sizing::Planned(plan);
            }
        }

        let cut = ((diff + 1) >> 1).min(i32::MAX as i64 / DEN_SIZE as i64) as i32 * DEN_SIZE;
        if neg > 0 {
            warn!("{algorithm}: {}x{} exceeds the canvas, shrink size {neg} cut by {cut}", w, h);
            neg = (neg - cut).max(0);
        } else if size > 0 {
            warn!("{algorithm}: {}x{} exceeds the canvas, size {size} cut by {cut}", w, h);
            size = (size - cut).max(0);
        } else {
            break;
        }
    }
    warn!("{algorithm}: no border of a {}x{} source fits the canvas", w, h);
    Sizing::Invalid
}

/// The two transforms of a shrink-then-grow request.
#[derive(Clone, Copy, Debug)]
struct DeflateSpec {
    shrink: i32,
    grow: i32,
    passes: [Option<Pass>; 2],
}

fn deflate_spec(algorithm: Algorithm, sum: i32, neg: i32) -> DeflateSpec {
    let deflate = |alg: Algorithm| Pass::new(alg, Sense::Deflate, sum);
    let inflate = |alg: Algorithm| Pass::new(alg, Sense::Inflate, neg);
    match algorithm {
        Algorithm::Bin2x => {
            let two_pass = neg >= DEN_SIZE / 2;
            let first = if two_pass { Algorithm::Bin } else { Algorithm::Bin2x };
            let min_sum = if two_pass { DEN_SIZE } else { DEN_SIZE / 2 };
            DeflateSpec {
                shrink: first.deflate_radius(sum),
                grow: Algorithm::Bin2x.inflate_radius(neg),
                passes: [
                    (sum >= min_sum).then(|| deflate(first)),
                    two_pass.then(|| inflate(Algorithm::Bin2x)),
                ],
            }
        }
        Algorithm::Sum => DeflateSpec {
            shrink: algorithm.deflate_radius(sum),
            grow: algorithm.inflate_radius(neg),
            passes: [
                (sum >= DEN_SIZE).then(|| deflate(algorithm)),
                (neg >= DEN_SIZE).then(|| inflate(algorithm)),
            ],
        },
        _ => {
            let shrink = algorithm.deflate_radius(sum);
            let grow = algorithm.inflate_radius(neg);
            DeflateSpec {
                shrink,
                grow,
                passes: [
                    (shrink > 0).then(|| deflate(algorithm)),
                    (grow > 0).then(|| inflate(algorithm)),
                ],
            }
        }
    }
}

/// Plan a matte shrunk by `size + neg`, grown back by `neg`, then blurred.
///
/// The canvas shrinks by the net displacement of the passes, or with `tame` by whole pixels of
/// `size - blur` whatever the transforms do; the rest of the displacement is absorbed by the
/// placement on the canvas.
///
/// # Arguments
///
/// * `algorithm` - The transform family.
/// * `size` - The raw net shrink, at least `0`.
/// * `neg` - The raw size shrunk then grown back, at least `0`.
/// * `blur` - The raw blur width, clamped to `size`.
/// * `tame` - Whether the canvas follows the requested rather than the produced shrink.
/// * `src` - The source size.
/// * `limits` - The canvas ceilings.
pub fn plan_deflate_first(
    algorithm: Algorithm,
    size: i32,
    neg: i32,
    blur: i32,
    tame: bool,
    src: (usize, usize),
    limits: &CanvasLimits,
) -> Sizing<MattePlan> {
    if size <= 0 && neg <= 0 {
        return Sizing::Invalid;
    }
    let (size, neg) = (size.max(0), neg.max(0));
    let blur = blur.clamp(0, size);
    let sum = size - blur / 2 + neg;
    let spec = deflate_spec(algorithm, sum, neg);
    let passes: Vec<Pass> = spec.passes.into_iter().flatten().collect();
    if passes.is_empty() {
        debug!("{algorithm} deflate-first: nothing to run");
        if algorithm.is_binary() {
            return Sizing::Planned(MattePlan::new(algorithm, passes, 0, 0));
        }
        return Sizing::NoOp;
    }

    let px = blur_px(blur);
    let bd = blur_displace(px);
    let displace = spec.shrink - spec.grow - bd;
    let result = if tame {
        (sum + blur / 2 - neg - blur).max(0) / DEN_SIZE
    } else {
        displace.max(0)
    };

    let (w, h) = src;
    let mut plan = MattePlan::new(algorithm, passes, px, -result);
    if 2 * spec.shrink as i64 >= w.min(h) as i64 {
        debug!("{algorithm} deflate-first: {w}x{h} collapses under {}", spec.shrink);
        plan.collapsed = true;
        return Sizing::Planned(plan);
    }

    let (mem_w, mem_h) = limits.working(algorithm);
    let widest = (-displace).max(spec.grow - spec.shrink).max(0) as usize;
    if w + 2 * widest > mem_w || h + 2 * widest > mem_h {
        warn!("{algorithm}: a {w}x{h} source does not fit the working canvas");
        return Sizing::Invalid;
    }
    debug!(
        "{algorithm} deflate-first: {} pass(es), displace {}, natural {}",
        plan.passes.len(),
        plan.displace,
        -displace
    );
    Sizing::Planned(plan)
}
