#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// structuring-element arc tables.
pub mod arc;

/// elementary operations on coverage planes.
pub mod buffer;

/// Error types for the imgproc module.
pub mod error;

/// coverage filtering module.
pub mod filter;

/// scratch memory requirements of every transform.
pub mod heap;

/// dilation and erosion algorithms.
pub mod morphology;

/// module containing parallization utilities.
pub mod parallel;

pub use crate::error::MorphError;
pub use crate::morphology::{Outcome, Sense};
