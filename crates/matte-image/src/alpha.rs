/// A coverage sample in 12-bit fixed point.
///
/// The valid range is `[0, MAX_ALPHA]`. Planes may transiently hold values outside of it;
/// every algorithm clamps on read.
pub type Alpha = i16;

/// Number of fractional bits of a coverage sample.
pub const LOG2_MAX_ALPHA: u32 = 12;

/// Fully opaque coverage.
pub const MAX_ALPHA: Alpha = 1 << LOG2_MAX_ALPHA;

/// Clamp a sample to the valid coverage range.
///
/// # Examples
///
/// ```
/// use matte_image::{clamp_alpha, MAX_ALPHA};
///
/// assert_eq!(clamp_alpha(-3), 0);
/// assert_eq!(clamp_alpha(5000), MAX_ALPHA);
/// assert_eq!(clamp_alpha(1234), 1234);
/// ```
#[inline]
pub fn clamp_alpha(a: Alpha) -> Alpha {
    a.clamp(0, MAX_ALPHA)
}
