//! Filter operations
//!
//! This module provides the filters applied to coverage planes after a transform.

/// Box blur operations
mod box_blur;
pub use box_blur::*;
