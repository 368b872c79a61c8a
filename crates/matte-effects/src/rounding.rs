use log::debug;
use matte_image::{
    clamp_alpha, Alpha, Bounds, FrameBuffers, ScratchHeap, LOG2_MAX_ALPHA, MAX_ALPHA,
};
use matte_imgproc::parallel::{par_bands, Workers};
use matte_imgproc::MorphError;

use crate::algorithm::{Algorithm, Tuning};
use crate::config::CanvasLimits;
use crate::error::EffectError;
use crate::execute::{check_source, run_matte};
use crate::params::{RoundingParams, MAX_TRANSP};
use crate::result::{EffectResult, EffectState, MatteStorage};
use crate::sizing::{plan_deflate_first, MattePlan, Sizing};

/// Coverage kept where the rounding removes the shape.
fn kept_alpha(transp: i32) -> i32 {
    MAX_ALPHA as i32 * (MAX_TRANSP - transp.clamp(0, MAX_TRANSP)) / MAX_TRANSP
}

/// Plan the rounded matte of a `width x height` source.
///
/// The shape is shrunk by `shrink` plus the lifted radius, then grown back by the lifted radius,
/// which rounds its convex corners.
pub fn plan_rounding(
    algorithm: Algorithm,
    params: &RoundingParams,
    src: (usize, usize),
    limits: &CanvasLimits,
) -> Sizing<MattePlan> {
    let p = params.clamped();
    if !p.crop && kept_alpha(p.transp) >= MAX_ALPHA as i32 {
        return Sizing::NoOp;
    }
    let radius = p.lifted_radius();
    if radius <= 0 && p.shrink <= 0 && p.blur <= 0 {
        return Sizing::NoOp;
    }
    plan_deflate_first(
        algorithm,
        p.shrink + p.blur,
        radius,
        p.blur,
        p.crop,
        src,
        limits,
    )
}

/// Round the corners of the image in the edit frame.
///
/// Without crop, the coverage the rounded matte removes fades to `1 - transp`, in place. With
/// crop, the canvas shrinks by the requested shrink, the coverage outside the rounded matte goes
/// entirely and the cropped pixels end up in the edit frame.
///
/// # Errors
///
/// If the source does not fit the frames or the heap is smaller than the limits assume.
pub fn rounding(
    frames: &mut FrameBuffers,
    heap: &mut ScratchHeap,
    limits: &CanvasLimits,
    src: (usize, usize),
    algorithm: Algorithm,
    params: &RoundingParams,
) -> Result<EffectResult, EffectError> {
    check_source(frames, src)?;
    let p = params.clamped();
    let plan = match plan_rounding(algorithm, &p, src, limits) {
        Sizing::Planned(plan) => plan,
        Sizing::NoOp => return Ok(EffectResult::unchanged(src.0, src.1)),
        Sizing::Invalid => return Ok(EffectResult::invalid(src.0, src.1)),
    };
    let workers = limits.strategy();
    let tuning = Tuning::from_param_a(p.param_a);
    let matte = run_matte(frames, heap, workers, src, &plan, tuning)?;
    debug!(
        "rounding {algorithm}: matte {:?} {}x{}, displace {}",
        matte.state, matte.width, matte.height, matte.displace
    );
    if p.crop {
        crop(frames, src, &matte, workers)
    } else {
        fade(frames, src, &matte, kept_alpha(p.transp), workers)
    }
}

fn fade(
    frames: &mut FrameBuffers,
    src: (usize, usize),
    matte: &EffectResult,
    kept: i32,
    workers: &dyn Workers,
) -> Result<EffectResult, EffectError> {
    let d = -matte.displace;
    let (edit, temp) = frames.split_mut();
    let plane = match matte.state {
        EffectState::Normal => matte.plane_in(temp)?,
        _ => None,
    };
    let bounds = matte.bounds;
    par_bands(workers, edit.alpha_mut(src.0, src.1)?, |y0, mut band| {
        for y in 0..band.height() {
            let my = (y0 + y) as i32 - d;
            let mut row = band.row_mut(y);
            for x in 0..row.width() {
                let mx = x as i32 - d;
                let m = match &plane {
                    Some(plane) if bounds.contains(mx, my) => {
                        clamp_alpha(plane.get(mx as usize, my as usize)) as i32
                    }
                    _ => 0,
                };
                let a = clamp_alpha(row.get(x)) as i32;
                if a > m {
                    row.set(x, (m + (((a - m) * kept) >> LOG2_MAX_ALPHA)) as Alpha);
                }
            }
        }
    })
    .map_err(MorphError::from)?;
    Ok(EffectResult {
        state: EffectState::Normal,
        ..EffectResult::unchanged(src.0, src.1)
    })
}

fn crop(
    frames: &mut FrameBuffers,
    src: (usize, usize),
    matte: &EffectResult,
    workers: &dyn Workers,
) -> Result<EffectResult, EffectError> {
    let (cw, ch) = (matte.width, matte.height);
    match matte.state {
        EffectState::Normal => {}
        EffectState::Empty => {
            frames.edit_mut().alpha_mut(cw, ch)?.fill(0);
            return Ok(*matte);
        }
        _ => return Ok(*matte),
    }

    let d = (-matte.displace).max(0) as usize;
    let (edit, temp) = frames.split_mut();
    {
        let Some(plane) = matte.plane_in(temp)? else {
            return Ok(EffectResult::empty(matte.displace, cw, ch));
        };
        let bounds = matte.bounds;
        let canvas = Bounds::new(d as i32, d as i32, (d + cw) as i32, (d + ch) as i32);
        let alpha = edit.alpha_mut(src.0, src.1)?.into_sub_view(canvas)?;
        par_bands(workers, alpha, |y0, mut band| {
            for y in 0..band.height() {
                let my = (y0 + y) as i32;
                let mut row = band.row_mut(y);
                for x in 0..row.width() {
                    let m = if bounds.contains(x as i32, my) {
                        clamp_alpha(plane.get(x, my as usize))
                    } else {
                        0
                    };
                    row.set(x, clamp_alpha(row.get(x)).min(m));
                }
            }
        })
        .map_err(MorphError::from)?;
    }

    // the canvas moves to the frame origin through the temporary frame.
    let line = edit.line();
    for y in 0..ch {
        let from = 4 * ((y + d) * line + d);
        let to = 4 * y * line;
        temp.as_slice_mut()[to..to + 4 * cw]
            .copy_from_slice(&edit.as_slice()[from..from + 4 * cw]);
    }
    frames.swap();
    Ok(EffectResult {
        state: EffectState::Normal,
        displace: matte.displace,
        width: cw,
        height: ch,
        bounds: matte.bounds,
        storage: MatteStorage::Interleaved,
    })
}
