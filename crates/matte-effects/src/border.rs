use log::debug;
use matte_image::{FrameBuffers, ScratchHeap};

use crate::algorithm::{Algorithm, Tuning};
use crate::config::CanvasLimits;
use crate::error::EffectError;
use crate::execute::run_matte;
use crate::params::{BorderParams, DEN_SIZE};
use crate::result::EffectResult;
use crate::sizing::{plan_deflate_first, plan_inflate_first, MattePlan, Sizing};

/// Raw size added to a border so whole-pixel sizes round up.
const SIZE_LIFT: i32 = DEN_SIZE / 2 - 1;

/// Plan a border of a `width x height` source.
///
/// A positive size grows the matte, inflating by `size + neg_size` and deflating back by
/// `neg_size`; a negative one shrinks it, deflating first. The blur width is a per-mille of the
/// border size.
pub fn plan_border(
    algorithm: Algorithm,
    params: &BorderParams,
    src: (usize, usize),
    limits: &CanvasLimits,
) -> Sizing<MattePlan> {
    let p = params.clamped();
    if p.size == 0 {
        return Sizing::NoOp;
    }
    let blur = p.blur_raw();
    let lifted = if p.size > 0 {
        p.size + SIZE_LIFT
    } else {
        p.size - SIZE_LIFT
    };
    debug!("border {algorithm}: size {} lifted to {lifted}, blur {blur}", p.size);
    if lifted > 0 {
        plan_inflate_first(algorithm, lifted, p.neg_size, blur, src, limits)
    } else {
        plan_deflate_first(algorithm, -lifted, p.neg_size, blur, false, src, limits)
    }
}

/// Grow or shrink the matte in the edit frame by a border.
///
/// The bordered matte is written to the temporary frame; the edit frame is only read.
///
/// # Arguments
///
/// * `frames` - The frames, the source matte being the coverage of the edit frame.
/// * `heap` - The scratch memory.
/// * `limits` - The canvas ceilings.
/// * `src` - The size of the source.
/// * `algorithm` - The transform family.
/// * `params` - The border parameters, clamped before use.
///
/// # Returns
///
/// Where the matte was written, its displacement and its bounds.
///
/// # Errors
///
/// If the source does not fit the frames or the heap is smaller than the limits assume.
///
/// # Examples
///
/// ```
/// use matte_effects::{border, Algorithm, BorderParams, EffectState, EngineConfig};
/// use matte_image::MAX_ALPHA;
///
/// let config = EngineConfig::new(64, 64);
/// let limits = config.resolve();
/// let mut frames = config.frame_buffers();
/// let mut heap = config.scratch_heap();
/// frames.edit_mut().alpha_mut(16, 16)?.set(8, 8, MAX_ALPHA);
///
/// let params = BorderParams { size: 30, ..Default::default() };
/// let res = border(&mut frames, &mut heap, &limits, (16, 16), Algorithm::Max, &params)?;
/// assert_eq!(res.state, EffectState::Normal);
/// assert_eq!(res.displace, 3);
/// assert_eq!(res.matte(&frames)?.get(11 + 3, 11), MAX_ALPHA);
/// # Ok::<(), matte_effects::EffectError>(())
/// ```
pub fn border(
    frames: &mut FrameBuffers,
    heap: &mut ScratchHeap,
    limits: &CanvasLimits,
    src: (usize, usize),
    algorithm: Algorithm,
    params: &BorderParams,
) -> Result<EffectResult, EffectError> {
    let tuning = Tuning::from_param_a(params.param_a);
    match plan_border(algorithm, params, src, limits) {
        Sizing::Planned(plan) => run_matte(frames, heap, limits.strategy(), src, &plan, tuning),
        Sizing::NoOp => Ok(EffectResult::unchanged(src.0, src.1)),
        Sizing::Invalid => Ok(EffectResult::invalid(src.0, src.1)),
    }
}
