use matte_image::ImageError;
use matte_imgproc::MorphError;

use crate::algorithm::Algorithm;

/// Errors that can occur while running an effect.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum EffectError {
    /// The source is larger than the frames can hold.
    #[error("source {0}x{1} does not fit frames of {2}x{3} pixels")]
    SourceTooLarge(usize, usize, usize, usize),

    /// A transform was asked to read and write the same buffer.
    #[error("{0} cannot write the buffer it reads")]
    Aliased(Algorithm),

    /// A transform failed.
    #[error(transparent)]
    Morph(#[from] MorphError),

    /// A plane geometry or scratch error.
    #[error(transparent)]
    Image(#[from] ImageError),
}
