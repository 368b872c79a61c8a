#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// transform families and their passes.
pub mod algorithm;

/// grown and shrunk copies of the matte.
pub mod border;

/// engine configuration and canvas ceilings.
pub mod config;

/// Error types for the effects module.
pub mod error;

mod execute;

/// lines drawn at a distance from the matte's edge.
pub mod outline;

/// fixed-point effect parameters.
pub mod params;

/// what an effect call produced.
pub mod result;

/// rounded corners cut out of the matte.
pub mod rounding;

/// pass planning and the clamp loop.
pub mod sizing;

pub use crate::algorithm::{Algorithm, Pass, Tuning};
pub use crate::border::{border, plan_border};
pub use crate::config::{CanvasLimits, EngineConfig};
pub use crate::error::EffectError;
pub use crate::outline::{outline, plan_outline, OutlinePlan};
pub use crate::params::{BorderParams, OutlineParams, PassOrder, RoundingParams};
pub use crate::result::{EffectResult, EffectState, MatteStorage};
pub use crate::rounding::{plan_rounding, rounding};
pub use crate::sizing::{plan_deflate_first, plan_inflate_first, MattePlan, Sizing};
