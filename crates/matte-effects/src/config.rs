use log::debug;
use matte_image::{FrameBuffers, ScratchHeap};
use matte_imgproc::arc::isqrt;
use matte_imgproc::heap::alpha_space;
use matte_imgproc::parallel::ExecutionStrategy;

use crate::algorithm::Algorithm;

/// Extra pixels of every frame row beyond the largest final width.
pub const FRAME_PAD_X: usize = 8;

/// Extra frame rows beyond the largest final height.
pub const FRAME_PAD_Y: usize = 4;

/// Bytes of a frame able to hold a `max_w x max_h` canvas of interleaved pixels.
pub const fn frame_bytes(max_w: usize, max_h: usize) -> usize {
    8 * ((max_w + FRAME_PAD_X) * (max_h + FRAME_PAD_Y) - 4)
}

/// Engine-wide limits and execution settings.
///
/// # Examples
///
/// ```
/// use matte_effects::{Algorithm, EngineConfig};
///
/// let config = EngineConfig::new(640, 480);
/// let limits = config.resolve();
/// let (w, h) = limits.working(Algorithm::Max);
/// assert!(Algorithm::Max.heap_bound(w, h).bytes() <= config.memory);
/// assert_eq!(limits.max_final(), (640, 480));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Largest canvas an effect may produce.
    pub max_final: (usize, usize),
    /// Capacity of the scratch heap, in bytes.
    pub memory: usize,
    /// How the transforms split their work.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub strategy: ExecutionStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(2048, 2048)
    }
}

impl EngineConfig {
    /// A configuration for canvases up to `max_w x max_h`, with a scratch heap the size of a
    /// frame.
    pub fn new(max_w: usize, max_h: usize) -> Self {
        Self {
            max_final: (max_w, max_h),
            memory: frame_bytes(max_w, max_h),
            strategy: ExecutionStrategy::default(),
        }
    }

    /// Set the scratch heap capacity.
    pub fn with_memory(mut self, memory: usize) -> Self {
        self.memory = memory;
        self
    }

    /// Set the execution strategy.
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The pair of frames every effect ping-pongs between.
    pub fn frame_buffers(&self) -> FrameBuffers {
        let (w, h) = self.max_final;
        FrameBuffers::new(w + FRAME_PAD_X, h + FRAME_PAD_Y)
    }

    /// The scratch heap the effects carve from.
    pub fn scratch_heap(&self) -> ScratchHeap {
        ScratchHeap::with_capacity(self.memory)
    }

    /// Samples a frame holds when read as a standalone plane.
    fn frame_samples(&self) -> usize {
        let (w, h) = self.max_final;
        4 * (w + FRAME_PAD_X) * (h + FRAME_PAD_Y)
    }

    /// Starting point of the working canvas search, square unless the final ceiling forbids.
    fn candidate(&self, pixels: usize) -> (usize, usize) {
        let (max_w, max_h) = self.max_final;
        let side = isqrt(pixels as i64) as usize & !3;
        if side < max_w {
            let w = (max_w + 3) & !3;
            (w, (pixels / w + 3) & !3)
        } else if side < max_h {
            let h = (max_h + 3) & !3;
            ((pixels / h + 3) & !3, h)
        } else {
            (side, side)
        }
    }

    /// Largest working canvas of `algorithm`.
    ///
    /// Shrinks the candidate four pixels at a time until a plane of that size fits a frame and
    /// the heap bound of `algorithm` fits the scratch memory.
    fn working(&self, algorithm: Algorithm) -> (usize, usize) {
        let samples = self.frame_samples();
        let per_px = algorithm.heap_bound(4, 4).bytes().div_ceil(16).max(1);
        let (mut w, mut h) = self.candidate(self.memory / per_px);
        while w > 0
            && h > 0
            && (alpha_space(w, h) > samples || algorithm.heap_bound(w, h).bytes() > self.memory)
        {
            w = w.saturating_sub(4);
            h = h.saturating_sub(4);
        }
        (w, h)
    }

    /// Compute the canvas ceilings of every algorithm.
    pub fn resolve(&self) -> CanvasLimits {
        let working = Algorithm::ALL.map(|alg| self.working(alg));
        for alg in Algorithm::ALL {
            let (w, h) = working[alg.index()];
            debug!("{alg}: working canvas up to {w}x{h}");
        }
        CanvasLimits {
            max_final: self.max_final,
            working,
            strategy: self.strategy,
        }
    }
}

/// Canvas ceilings resolved from an [`EngineConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanvasLimits {
    max_final: (usize, usize),
    working: [(usize, usize); Algorithm::ALL.len()],
    strategy: ExecutionStrategy,
}

impl CanvasLimits {
    /// Limits with explicit ceilings, the same working canvas for every algorithm.
    pub fn new(max_final: (usize, usize), working: (usize, usize)) -> Self {
        Self {
            max_final,
            working: [working; Algorithm::ALL.len()],
            strategy: ExecutionStrategy::default(),
        }
    }

    /// Set the execution strategy.
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Largest canvas an effect may produce.
    pub fn max_final(&self) -> (usize, usize) {
        self.max_final
    }

    /// Largest canvas any pass of `algorithm` may touch.
    pub fn working(&self, algorithm: Algorithm) -> (usize, usize) {
        self.working[algorithm.index()]
    }

    /// How the transforms split their work.
    pub fn strategy(&self) -> &ExecutionStrategy {
        &self.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_working_fits_memory() {
        let config = EngineConfig::new(320, 240);
        let limits = config.resolve();
        for alg in Algorithm::ALL {
            let (w, h) = limits.working(alg);
            assert_eq!(w % 4, 0);
            assert_eq!(h % 4, 0);
            assert!(w > 0 && h > 0, "{alg}");
            assert!(alg.heap_bound(w, h).bytes() <= config.memory, "{alg}");
            assert!(alpha_space(w, h) <= 4 * 328 * 244, "{alg}");
        }
    }

    #[test]
    fn test_small_memory() {
        let limits = EngineConfig::new(100, 100).with_memory(4096).resolve();
        let (w, h) = limits.working(Algorithm::Sum);
        assert!(Algorithm::Sum.heap_bound(w, h).bytes() <= 4096);
    }
}
