#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use matte_image as image;

#[doc(inline)]
pub use matte_imgproc as imgproc;

#[doc(inline)]
pub use matte_effects as effects;
