//! A line drawn at a distance from the matte's edge.
//!
//! Up to three passes move the edge to the line's distance, rounding convex and concave corners
//! on the way. A fourth pass gives the line its width, and the shape it grew from (or the shape it
//! shrinks to) is carved out of it. The canvas grows by the requested distance and thickness in
//! whole pixels whatever the passes produce.

use log::{debug, warn};
use matte_image::{Bounds, FrameBuffers, HeapRequest, ScratchHeap};
use matte_imgproc::filter::blur_displace;
use matte_imgproc::parallel::Workers;
use matte_imgproc::{Outcome, Sense};

use crate::algorithm::{Algorithm, Pass, Tuning};
use crate::config::CanvasLimits;
use crate::error::EffectError;
use crate::execute::{check_source, extraction_space, Layout, Placed, Slot, Workspace};
use crate::params::{OutlineParams, PassOrder, DEN_SIZE, MAX_SIZE, MIN_THICKNESS};
use crate::result::EffectResult;
use crate::sizing::{blur_px, Sizing, MAX_CLAMP_STEPS};

/// Passes and displacements of an outline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlinePlan {
    /// The transform family.
    pub algorithm: Algorithm,
    /// Passes moving the edge to the line, in order.
    pub passes: Vec<Pass>,
    /// The pass giving the line its width, outward when inflating.
    pub line: Option<Pass>,
    /// Blur width in units of `DEN_BLUR_PX`.
    pub blur_px: i32,
    /// Growth of the content on every side, blur included.
    pub natural: i32,
    /// Growth of the canvas on every side.
    pub displace: i32,
    /// Whether the line is known to come out transparent.
    pub empty: bool,
    /// Whether the shape shrinks to nothing.
    pub collapsed: bool,
}

/// Displacement ceilings of a source.
struct Reach {
    max_working: i32,
    max_final: i32,
    min: i32,
}

enum Attempt {
    Fits(OutlinePlan),
    TrimDistance(i32),
    TrimThickness(i32),
}

/// Canvas growth of an outline, in whole pixels.
fn canvas_displace(distance: i32, thickness: i32) -> i32 {
    let line = if thickness >= 0 {
        (thickness + DEN_SIZE - 1) / DEN_SIZE
    } else {
        0
    };
    (distance + DEN_SIZE - 1).div_euclid(DEN_SIZE) + line
}

/// The pass of a signed step, `None` when the step does nothing.
fn step(algorithm: Algorithm, size_raw: i32, is_final: bool) -> Option<Pass> {
    let kernel = algorithm.pass_kernel(is_final);
    if size_raw.abs() < kernel.min_effective_size() {
        return None;
    }
    let sense = if size_raw > 0 {
        Sense::Inflate
    } else {
        Sense::Deflate
    };
    Some(Pass::new(kernel, sense, size_raw.abs()))
}

/// Signed cumulative sizes of the edge passes, differentiated into steps.
fn edge_steps(p: &OutlineParams, distance: i32) -> [i32; 3] {
    let mut sizes = if distance >= 0 {
        [
            -(p.pos_rad - distance).max(0),
            p.neg_rad + distance,
            distance,
        ]
    } else {
        [
            distance - p.pos_rad,
            (p.neg_rad + distance).max(0),
            distance,
        ]
    };
    if p.order == PassOrder::DeflateOnce || (p.order != PassOrder::InflateOnce && distance < 0) {
        sizes.swap(0, 1);
    }
    // drop cycles that return where they started.
    if sizes[1] == 0 {
        sizes[1] = sizes[0];
    }
    if sizes[0] == sizes[2] {
        sizes[0] = 0;
    }
    for i in (1..3).rev() {
        sizes[i] -= sizes[i - 1];
    }
    sizes
}

fn attempt(
    algorithm: Algorithm,
    p: &OutlineParams,
    distance: i32,
    thickness: i32,
    reach: &Reach,
) -> Attempt {
    let blur = p.blur.clamp(0, ((thickness.abs() >> 1) - DEN_SIZE).max(0));
    let sign = if thickness >= 0 { 1 } else { -1 };
    let adj_distance = distance + sign * (blur >> 1);
    let adj_thickness = thickness - sign * blur;

    let sizes = edge_steps(p, adj_distance);
    let mut steps = [None; 3];
    let mut is_final = true;
    for i in (0..3).rev() {
        steps[i] = step(algorithm, sizes[i], is_final);
        is_final &= steps[i].is_none();
    }

    let mut natural = 0;
    let mut empty = false;
    let mut passes = Vec::with_capacity(3);
    for pass in steps.into_iter().flatten() {
        natural += pass.growth();
        passes.push(pass);
        match pass.sense {
            Sense::Inflate if natural > reach.max_working => {
                return Attempt::TrimDistance(natural - reach.max_working);
            }
            Sense::Deflate if natural < reach.min => empty = true,
            _ => {}
        }
    }

    let mut line = None;
    if thickness > MIN_THICKNESS {
        match step(algorithm, adj_thickness, true) {
            Some(pass) if pass.sense == Sense::Deflate => {
                if natural + pass.growth() >= reach.min {
                    line = Some(pass);
                }
            }
            Some(pass) => {
                natural += pass.growth();
                line = Some(pass);
                if natural > reach.max_working {
                    return Attempt::TrimThickness(natural - reach.max_working);
                }
            }
            // a zero-width line.
            None => empty = true,
        }
    }

    let blur_px = blur_px(blur);
    natural += blur_displace(blur_px);
    let displace = canvas_displace(distance, thickness);
    let widest = natural.max(displace);
    if widest > reach.max_final {
        return Attempt::TrimDistance(widest - reach.max_final);
    }
    Attempt::Fits(OutlinePlan {
        algorithm,
        passes,
        line,
        blur_px,
        natural,
        displace,
        empty,
        collapsed: natural < reach.min,
    })
}

/// Plan an outline of a `width x height` source.
///
/// A request whose growth exceeds the ceilings is trimmed: the distance when the edge passes or
/// the final canvas do not fit, the thickness when the line width does not.
pub fn plan_outline(
    algorithm: Algorithm,
    params: &OutlineParams,
    src: (usize, usize),
    limits: &CanvasLimits,
) -> Sizing<OutlinePlan> {
    let p = params.clamped();
    let (w, h) = (src.0 as i32, src.1 as i32);
    let (mw, mh) = limits.working(algorithm);
    let (fw, fh) = limits.max_final();
    let reach = Reach {
        max_working: (mw as i32 - w).min(mh as i32 - h) >> 1,
        max_final: (fw as i32 - w).min(fh as i32 - h) >> 1,
        min: -(w.min(h) >> 1),
    };
    if reach.max_working < 0 || reach.max_final < 0 {
        warn!("outline {algorithm}: a {w}x{h} source exceeds the canvas ceilings");
        return Sizing::Invalid;
    }

    let (mut distance, mut thickness) = (p.distance, p.thickness);
    for _ in 0..MAX_CLAMP_STEPS {
        match attempt(algorithm, &p, distance, thickness, &reach) {
            Attempt::Fits(plan) => {
                debug!(
                    "outline {algorithm}: {} pass(es), line {:?}, natural {}, displace {}",
                    plan.passes.len(),
                    plan.line.map(|l| l.sense),
                    plan.natural,
                    plan.displace
                );
                return Sizing::Planned(plan);
            }
            Attempt::TrimDistance(diff) => {
                distance -= diff * DEN_SIZE;
                warn!("outline {algorithm}: distance clamped to {distance}");
                if distance < -MAX_SIZE {
                    return Sizing::Invalid;
                }
            }
            Attempt::TrimThickness(diff) => {
                thickness = (thickness - diff * DEN_SIZE).max(0);
                warn!("outline {algorithm}: thickness clamped to {thickness}");
            }
        }
    }
    Sizing::Invalid
}

/// Draw an outline of the matte in the edit frame.
///
/// The line is written to the temporary frame as a standalone plane. The edit frame holds
/// intermediate planes afterwards, so its pixels are lost.
///
/// # Arguments
///
/// * `frames` - The frames, the source matte being the coverage of the edit frame.
/// * `heap` - The scratch memory.
/// * `limits` - The canvas ceilings.
/// * `src` - The size of the source.
/// * `algorithm` - The transform family.
/// * `params` - The outline parameters, clamped before use.
///
/// # Errors
///
/// If the source does not fit the frames or the heap is smaller than the limits assume.
///
/// # Examples
///
/// ```
/// use matte_effects::{outline, Algorithm, EffectState, EngineConfig, OutlineParams};
/// use matte_image::MAX_ALPHA;
///
/// let config = EngineConfig::new(64, 64);
/// let limits = config.resolve();
/// let mut frames = config.frame_buffers();
/// let mut heap = config.scratch_heap();
/// frames.edit_mut().alpha_mut(16, 16)?.fill(MAX_ALPHA);
///
/// let params = OutlineParams { thickness: 20, ..Default::default() };
/// let res = outline(&mut frames, &mut heap, &limits, (16, 16), Algorithm::Bin, &params)?;
/// assert_eq!(res.state, EffectState::Normal);
/// assert_eq!((res.displace, res.width), (2, 20));
/// let matte = res.matte(&frames)?;
/// assert_eq!(matte.get(1, 10), MAX_ALPHA);
/// assert_eq!(matte.get(10, 10), 0);
/// # Ok::<(), matte_effects::EffectError>(())
/// ```
pub fn outline(
    frames: &mut FrameBuffers,
    heap: &mut ScratchHeap,
    limits: &CanvasLimits,
    src: (usize, usize),
    algorithm: Algorithm,
    params: &OutlineParams,
) -> Result<EffectResult, EffectError> {
    check_source(frames, src)?;
    let p = params.clamped();
    if src.0 == 0 || src.1 == 0 {
        return Ok(EffectResult::unchanged(src.0, src.1));
    }
    let lost = (-p.distance - p.thickness.max(0)) / DEN_SIZE;
    if src.0.min(src.1) as i64 <= 2 * lost as i64 {
        let displace = canvas_displace(p.distance, p.thickness);
        return Ok(EffectResult::zero_sized(displace));
    }

    let plan = match plan_outline(algorithm, &p, src, limits) {
        Sizing::Planned(plan) => plan,
        Sizing::NoOp => return Ok(EffectResult::unchanged(src.0, src.1)),
        Sizing::Invalid => return Ok(EffectResult::invalid(src.0, src.1)),
    };
    if plan.collapsed {
        return Ok(EffectResult::zero_sized(plan.displace));
    }
    let Some(layout) = Layout::new(src, plan.displace, plan.natural) else {
        return Ok(EffectResult::zero_sized(plan.displace));
    };
    let (cw, ch) = layout.canvas;
    if plan.empty {
        return Ok(EffectResult::empty(plan.displace, cw, ch));
    }
    let tuning = Tuning::from_param_a(p.param_a);
    run_outline(frames, heap, limits.strategy(), src, &plan, &layout, tuning)
}

/// Pass `i` writes the temporary frame when `i` is even and the edit frame otherwise.
fn slot_of(i: usize) -> Slot {
    if i % 2 == 0 {
        Slot::Temp
    } else {
        Slot::Edit
    }
}

fn other(slot: Slot) -> Slot {
    if slot == Slot::Temp {
        Slot::Edit
    } else {
        Slot::Temp
    }
}

fn run_outline(
    frames: &mut FrameBuffers,
    heap: &mut ScratchHeap,
    workers: &dyn Workers,
    src: (usize, usize),
    plan: &OutlinePlan,
    layout: &Layout,
    tuning: Tuning,
) -> Result<EffectResult, EffectError> {
    let empty = EffectResult::empty(plan.displace, layout.canvas.0, layout.canvas.1);
    let n = plan.passes.len();
    let mut sizes = vec![src];
    for pass in &plan.passes {
        let (w, h) = sizes[sizes.len() - 1];
        sizes.push(pass.output_size(w, h));
    }
    let edge = sizes[n];
    let outward = plan.line.filter(|l| l.sense == Sense::Inflate);
    let inward = plan.line.filter(|l| l.sense == Sense::Deflate);
    let (line_size, line_slot) = match outward {
        Some(pass) => (pass.output_size(edge.0, edge.1), slot_of(n)),
        None => (edge, slot_of(n.saturating_sub(1))),
    };
    if edge.0 == 0 || edge.1 == 0 || line_size.0 == 0 || line_size.1 == 0 {
        return Ok(empty);
    }

    // the first pass reading the source, the line itself without chained passes.
    let first = plan.passes.first().copied().or(outward);
    let extract_len = extraction_space(first.as_ref(), src);
    let req = plan
        .passes
        .iter()
        .zip(&sizes)
        .map(|(pass, &(w, h))| pass.heap(w, h))
        .chain(outward.map(|pass| pass.heap(edge.0, edge.1)))
        .chain(inward.map(|pass| pass.heap(line_size.0, line_size.1)))
        .fold(HeapRequest::NONE, HeapRequest::max)
        + HeapRequest::alphas(extract_len);
    let mut carved = heap.carve(req)?;
    let scratch = carved.take_alphas(0)?;
    let extracted = carved.take_alphas(extract_len)?;
    let (edit, temp) = frames.split_mut();
    let mut ws = Workspace::new(edit, temp, scratch, extracted, carved, tuning, workers);

    let source = Placed::source(src.0, src.1);
    let target = layout.content_in(line_slot, line_size.0, line_size.1, 0);
    let outcome = if let Some(pass) = outward {
        let (shape, shape_outcome) = if n == 0 {
            let full = Bounds::from_size(src.0 as i32, src.1 as i32);
            (source, Outcome::within(full))
        } else {
            let shape = Placed::plane(slot_of(n - 1), edge.0, edge.1);
            match ws.chain(plan.algorithm, &plan.passes, source, shape, slot_of)? {
                Some(outcome) if outcome != Outcome::EMPTY => (shape, outcome),
                _ => return Ok(empty),
            }
        };
        let outcome = ws.run(&pass, shape, target)?;
        if outcome == Outcome::EMPTY {
            return Ok(empty);
        }
        let t = pass.margin() as i32;
        let inner = target.at(target.rect.inflate(-t, -t));
        ws.carve(plan.algorithm, inner, shape, shape_outcome)?;
        outcome
    } else {
        let outcome = match ws.chain(plan.algorithm, &plan.passes, source, target, slot_of)? {
            Some(outcome) if outcome != Outcome::EMPTY => outcome,
            _ => return Ok(empty),
        };
        if let Some(pass) = inward {
            let (hw, hh) = pass.output_size(line_size.0, line_size.1);
            if hw > 0 && hh > 0 {
                let hole = Placed::plane(other(line_slot), hw, hh);
                let hole_outcome = ws.run(&pass, target, hole)?;
                let t = pass.margin() as i32;
                let inner = target.at(target.rect.inflate(-t, -t));
                ws.carve(plan.algorithm, inner, hole, hole_outcome)?;
            }
        }
        outcome
    };

    let bounds = if outcome.is_empty() {
        target.rect
    } else {
        outcome.bounds.translate(target.rect.left, target.rect.top)
    };
    let plane = layout.plane_in(line_slot);
    let bd = ws.finish(plane, bounds, plan.blur_px)?;
    if line_slot == Slot::Edit {
        frames.swap();
    }
    let stride = plane.stride.unwrap_or(layout.plane.0);
    Ok(layout.result(plan.displace, bd, stride))
}
