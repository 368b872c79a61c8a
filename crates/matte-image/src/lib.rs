#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// fixed-point coverage samples.
pub mod alpha;

/// axis-aligned half-open rectangles.
pub mod bounds;

/// Error types for the image module.
pub mod error;

/// interleaved pixel frames and the edit/temp double buffer.
pub mod frame;

/// per-cell constancy classification.
pub mod mask;

/// single-channel views over coverage samples.
pub mod plane;

/// caller-owned scratch memory carved into typed slices.
pub mod scratch;

pub use crate::alpha::{clamp_alpha, Alpha, LOG2_MAX_ALPHA, MAX_ALPHA};
pub use crate::bounds::{unite_spans, Bounds};
pub use crate::error::ImageError;
pub use crate::frame::{Frame, FrameBuffers, PixelYca};
pub use crate::mask::Mask;
pub use crate::plane::{AlphaPlane, AlphaRowMut, AlphaView, AlphaViewMut, SampleLayout};
pub use crate::scratch::{Carved, HeapRequest, ScratchHeap};
