//! Serpentine sliding of a disk window over a plane.
//!
//! Each band is walked row by row, alternating direction, so the window only ever moves by one
//! pixel and is updated with the samples entering and leaving along the arc of the disk.

use matte_image::{Alpha, AlphaView, AlphaViewMut, Mask, MAX_ALPHA};

use crate::arc::HalfArcTable;
use crate::error::{check_size, MorphError};
use crate::parallel::{par_bands, Workers};

use super::masking::MaskPlane;
use super::{fold_outcome, Coverage, Outcome, RowCoverage, Sense};

/// A summary of the samples inside the disk window.
pub(crate) trait DiskAccumulator {
    /// Forget every sample.
    fn clear(&mut self);

    /// Account for a sample entering the window.
    fn add(&mut self, a: Alpha);

    /// Account for a sample leaving the window.
    fn remove(&mut self, a: Alpha);

    /// Reset to a window of `area` samples all equal to `a`.
    fn set_uniform(&mut self, a: Alpha, area: i64);

    /// The destination value for the current window.
    fn value(&mut self) -> Alpha;
}

/// What the accumulator currently describes.
#[derive(Clone, Copy, Debug)]
enum State {
    /// Nothing usable.
    Invalid,
    /// A window of constant samples, not yet loaded into the accumulator.
    Uniform(Alpha),
    /// The window around the current centre.
    Live,
}

struct Walker<'a, A> {
    src: &'a AlphaView<'a>,
    arc: &'a HalfArcTable,
    area: i64,
    acc: A,
    state: State,
    cx: i32,
    cy: i32,
}

impl<A: DiskAccumulator> Walker<'_, A> {
    fn rebuild(&mut self, cx: i32, cy: i32) {
        self.acc.clear();
        let s = self.arc.size();
        for dy in -s..=s {
            let a = self.arc.get(dy);
            for dx in -a..=a {
                self.acc.add(self.src.sample(cx + dx, cy + dy));
            }
        }
    }

    /// Move the loaded window from the current centre to its neighbour `(cx, cy)`.
    fn slide(&mut self, cx: i32, cy: i32) {
        let s = self.arc.size();
        let (ox, oy) = (self.cx, self.cy);
        if cy == oy + 1 {
            for dx in -s..=s {
                let a = self.arc.get(dx);
                self.acc.remove(self.src.sample(ox + dx, oy - a));
                self.acc.add(self.src.sample(ox + dx, cy + a));
            }
        } else if cx == ox + 1 {
            for dy in -s..=s {
                let a = self.arc.get(dy);
                self.acc.remove(self.src.sample(ox - a, oy + dy));
                self.acc.add(self.src.sample(cx + a, oy + dy));
            }
        } else if cx + 1 == ox {
            for dy in -s..=s {
                let a = self.arc.get(dy);
                self.acc.remove(self.src.sample(ox + a, oy + dy));
                self.acc.add(self.src.sample(cx - a, oy + dy));
            }
        } else {
            self.rebuild(cx, cy);
        }
    }

    /// The destination value centred on `(cx, cy)` with neighbourhood class `mask`.
    fn visit(&mut self, cx: i32, cy: i32, mask: Mask) -> Alpha {
        let value = match mask {
            Mask::Zero | Mask::Full => {
                let v = if mask == Mask::Zero { 0 } else { MAX_ALPHA };
                self.state = State::Uniform(v);
                v
            }
            Mask::Gray => {
                match self.state {
                    State::Invalid => self.rebuild(cx, cy),
                    State::Uniform(v) => {
                        self.acc.set_uniform(v, self.area);
                        self.slide(cx, cy);
                    }
                    State::Live => self.slide(cx, cy),
                }
                self.state = State::Live;
                self.acc.value()
            }
        };
        self.cx = cx;
        self.cy = cy;
        value
    }
}

/// Write every destination pixel of a masked disk transform of `src`.
///
/// The destination pixel `(x, y)` receives the accumulator value of the disk centred on the
/// source pixel shifted by the radius as `sense` dictates. Constant cells of `masks` are written
/// directly without touching the accumulator.
pub(crate) fn sweep<A, F>(
    src: &AlphaView,
    arc: &HalfArcTable,
    sense: Sense,
    masks: &MaskPlane,
    dst: &mut AlphaViewMut,
    workers: &dyn Workers,
    make: F,
) -> Result<Outcome, MorphError>
where
    A: DiskAccumulator,
    F: Fn() -> A + Sync,
{
    let (out_w, out_h) = (masks.width(), masks.height());
    check_size((dst.width(), dst.height()), (out_w, out_h))?;
    if masks.bounds().is_empty() {
        dst.fill(0);
        return Ok(Outcome::EMPTY);
    }
    if masks.all_full() {
        dst.fill(MAX_ALPHA);
        let mut cov = Coverage::default();
        for y in 0..out_h {
            let mut row = RowCoverage::default();
            row.see_span(0, out_w, MAX_ALPHA);
            cov.add_row(y, row);
        }
        return Ok(cov.outcome(sense, out_w, out_h));
    }

    let shift = sense.center_shift(arc.size() as usize);
    let area = arc.area();
    let parts = par_bands(workers, dst.reborrow(), |y0, mut band| {
        let mut walker = Walker {
            src,
            arc,
            area,
            acc: make(),
            state: State::Invalid,
            cx: 0,
            cy: 0,
        };
        let mut cov = Coverage::default();
        for y in 0..band.height() {
            let oy = y0 + y;
            let cy = oy as i32 + shift;
            let mut row = band.row_mut(y);
            let mut row_cov = RowCoverage::default();
            let mut column = |x: usize, walker: &mut Walker<'_, A>| {
                let a = walker.visit(x as i32 + shift, cy, masks.get(x, oy));
                row.set(x, a);
                row_cov.see(x, a);
            };
            if y % 2 == 0 {
                (0..out_w).for_each(|x| column(x, &mut walker));
            } else {
                (0..out_w).rev().for_each(|x| column(x, &mut walker));
            }
            cov.add_row(oy, row_cov);
        }
        cov
    })?;
    Ok(fold_outcome(parts, sense, out_w, out_h))
}
