//! Effect parameters as fixed-point tracks.
//!
//! Sizes are raw integers in units of `1 / DEN_SIZE` pixel. Every parameter struct clamps itself
//! onto its track ranges with `clamped()`; the effects always run on clamped values.

/// Denominator of every raw size.
pub const DEN_SIZE: i32 = 10;

/// Upper end of the rate parameter `param_a`.
pub const MAX_PARAM_A: i32 = 1000;

/// Upper end of the transparency tracks.
pub const MAX_TRANSP: i32 = 1000;

/// Upper end of the border blur track, a per-mille of the border size.
pub const MAX_BORDER_BLUR: i32 = 1000;

/// Upper end of every size track.
pub const MAX_SIZE: i32 = 5000;

/// Lower end of the outline thickness track; a thickness at or below it draws no line width.
pub const MIN_THICKNESS: i32 = -5000;

/// Upper end of the outline blur track.
pub const MAX_OUTLINE_BLUR: i32 = 1000;

/// A grown (or, when negative, shrunk) copy of the matte.
///
/// # Examples
///
/// ```
/// use matte_effects::BorderParams;
///
/// let p = BorderParams { size: 9000, blur: -3, ..Default::default() }.clamped();
/// assert_eq!((p.size, p.blur, p.param_a), (5000, 0, 500));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BorderParams {
    /// Signed border size, growing when positive.
    pub size: i32,
    /// Extra size grown then shrunk back, rounding concave corners.
    pub neg_size: i32,
    /// Blur width, in per-mille of the border size.
    pub blur: i32,
    /// Threshold or cap rate of the transform.
    pub param_a: i32,
}

impl Default for BorderParams {
    fn default() -> Self {
        Self {
            size: 50,
            neg_size: 0,
            blur: 0,
            param_a: 500,
        }
    }
}

impl BorderParams {
    /// The parameters clamped onto their tracks.
    pub fn clamped(self) -> Self {
        Self {
            size: self.size.clamp(-MAX_SIZE, MAX_SIZE),
            neg_size: self.neg_size.clamp(0, MAX_SIZE),
            blur: self.blur.clamp(0, MAX_BORDER_BLUR),
            param_a: self.param_a.clamp(0, MAX_PARAM_A),
        }
    }

    /// The blur width in raw size units.
    ///
    /// The per-mille maps onto the part of the size beyond one pixel, and borders of at most one
    /// pixel never blur.
    pub fn blur_raw(&self) -> i32 {
        let size = self.size.abs();
        if self.blur == 0 || size <= DEN_SIZE {
            return 0;
        }
        ((size - DEN_SIZE - 1).max(0) * (self.blur - 1)) / (MAX_BORDER_BLUR - 1) + 1
    }
}

/// Rounded corners cut out of the matte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RoundingParams {
    /// Corner radius.
    pub radius: i32,
    /// Size the shape is shrunk by before rounding.
    pub shrink: i32,
    /// Transparency of what the rounding removes, `MAX_TRANSP` removing it entirely.
    pub transp: i32,
    /// Blur width, in raw size units.
    pub blur: i32,
    /// Threshold or cap rate of the transform.
    pub param_a: i32,
    /// Whether the canvas shrinks along with the shape.
    pub crop: bool,
}

impl Default for RoundingParams {
    fn default() -> Self {
        Self {
            radius: 320,
            shrink: 0,
            transp: MAX_TRANSP,
            blur: 0,
            param_a: 500,
            crop: false,
        }
    }
}

impl RoundingParams {
    /// The parameters clamped onto their tracks.
    pub fn clamped(self) -> Self {
        Self {
            radius: self.radius.clamp(0, MAX_SIZE),
            shrink: self.shrink.clamp(0, MAX_SIZE),
            transp: self.transp.clamp(0, MAX_TRANSP),
            blur: self.blur.clamp(0, MAX_SIZE),
            param_a: self.param_a.clamp(0, MAX_PARAM_A),
            crop: self.crop,
        }
    }

    /// The radius lifted by a little under half a pixel, so whole-pixel radii look smooth.
    pub fn lifted_radius(&self) -> i32 {
        if self.radius == 0 {
            0
        } else {
            self.radius + (DEN_SIZE / 2 - 1)
        }
    }
}

/// Which way the outline's first passes run when the curvature radii call for both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PassOrder {
    /// Deflate first when the distance is positive, inflate first otherwise.
    #[default]
    Auto,
    /// Deflate, then inflate, then settle.
    InflateOnce,
    /// Inflate, then deflate, then settle.
    DeflateOnce,
}

/// A line drawn at a distance from the matte's edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OutlineParams {
    /// Signed distance of the line from the edge, outward when positive.
    pub distance: i32,
    /// Signed line width, grown outward when positive.
    pub thickness: i32,
    /// Curvature radius of convex corners.
    pub pos_rad: i32,
    /// Curvature radius of concave corners.
    pub neg_rad: i32,
    /// Blur width, in raw size units.
    pub blur: i32,
    /// Threshold or cap rate of the transform.
    pub param_a: i32,
    /// Order of the first passes.
    pub order: PassOrder,
}

impl Default for OutlineParams {
    fn default() -> Self {
        Self {
            distance: 0,
            thickness: 30,
            pos_rad: 0,
            neg_rad: 0,
            blur: 0,
            param_a: 500,
            order: PassOrder::Auto,
        }
    }
}

impl OutlineParams {
    /// The parameters clamped onto their tracks.
    pub fn clamped(self) -> Self {
        Self {
            distance: self.distance.clamp(-MAX_SIZE, MAX_SIZE),
            thickness: self.thickness.clamp(MIN_THICKNESS, MAX_SIZE),
            pos_rad: self.pos_rad.clamp(0, MAX_SIZE),
            neg_rad: self.neg_rad.clamp(0, MAX_SIZE),
            blur: self.blur.clamp(0, MAX_OUTLINE_BLUR),
            param_a: self.param_a.clamp(0, MAX_PARAM_A),
            order: self.order,
        }
    }

    /// Whether the thickness asks for no line width, filling the whole shape.
    pub fn is_filled(&self) -> bool {
        self.thickness <= MIN_THICKNESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_blur_raw() {
        let p = BorderParams {
            size: 10,
            blur: 1000,
            ..Default::default()
        };
        assert_eq!(p.blur_raw(), 0);
        let p = BorderParams {
            size: -1011,
            blur: 1000,
            ..Default::default()
        };
        assert_eq!(p.blur_raw(), 1001);
        let p = BorderParams {
            size: 1011,
            blur: 1,
            ..Default::default()
        };
        assert_eq!(p.blur_raw(), 1);
        let p = BorderParams {
            size: 1011,
            blur: 0,
            ..Default::default()
        };
        assert_eq!(p.blur_raw(), 0);
    }

    #[test]
    fn test_clamped() {
        let p = OutlineParams {
            thickness: -9999,
            blur: 4000,
            ..Default::default()
        }
        .clamped();
        assert_eq!(p.thickness, MIN_THICKNESS);
        assert_eq!(p.blur, MAX_OUTLINE_BLUR);
        assert!(p.is_filled());

        let r = RoundingParams {
            radius: -1,
            transp: 2000,
            ..Default::default()
        }
        .clamped();
        assert_eq!((r.radius, r.transp), (0, MAX_TRANSP));
        assert_eq!(r.lifted_radius(), 0);
        assert_eq!(RoundingParams::default().lifted_radius(), 324);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_params_from_json() -> Result<(), serde_json::Error> {
        let p: BorderParams = serde_json::from_str(r#"{ "size": -30 }"#)?;
        assert_eq!(
            p,
            BorderParams {
                size: -30,
                ..Default::default()
            }
        );
        let o: OutlineParams = serde_json::from_str(r#"{ "order": "deflate_once" }"#)?;
        assert_eq!(o.order, PassOrder::DeflateOnce);
        assert_eq!(o.thickness, OutlineParams::default().thickness);
        Ok(())
    }
}
