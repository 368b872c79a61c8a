use matte_image::ImageError;

use crate::parallel::ParallelError;

/// Errors that can occur while transforming a plane.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MorphError {
    /// The destination plane does not have the size the transform produces.
    #[error("destination is {0}x{1}, expected {2}x{3}")]
    SizeMismatch(usize, usize, usize, usize),

    /// A plane geometry or scratch error.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// A worker dispatch error.
    #[error(transparent)]
    Parallel(#[from] ParallelError),
}

/// Check that `dst` has the expected size.
pub(crate) fn check_size(
    dst: (usize, usize),
    expected: (usize, usize),
) -> Result<(), MorphError> {
    if dst != expected {
        return Err(MorphError::SizeMismatch(
            dst.0, dst.1, expected.0, expected.1,
        ));
    }
    Ok(())
}
