/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    /// Error when the plane has a zero or negative dimension where one is required.
    #[error("Invalid plane size ({0}x{1})")]
    InvalidPlaneSize(usize, usize),

    /// Error when the stride cannot hold a full row.
    #[error("Stride ({0}) is smaller than the row extent ({1})")]
    InvalidStride(usize, usize),

    /// Error when the backing slice is too short for the described plane.
    #[error("Data length ({0}) does not match the plane extent ({1})")]
    InvalidDataLength(usize, usize),

    /// Error when a sub-region does not lie inside its parent plane.
    #[error("Region [{0}, {1}, {2}, {3}) is out of the plane")]
    RegionOutOfPlane(i32, i32, i32, i32),

    /// Error when the scratch heap cannot satisfy a request.
    #[error("Scratch heap exhausted: requested {0} bytes, capacity {1} bytes")]
    HeapExhausted(usize, usize),
}
