use matte_image::{AlphaView, Bounds, Frame, FrameBuffers, ImageError};

/// How an effect call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectState {
    /// The output holds content inside the reported bounds.
    Normal,
    /// The output is uniformly transparent; the displacement is still valid.
    Empty,
    /// The parameters ask for nothing; the source is the output.
    Unchanged,
    /// The output canvas collapsed to nothing.
    ZeroSized,
    /// No clamped request fits the canvas ceilings.
    Invalid,
}

/// Where the output coverage lives in the frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatteStorage {
    /// The coverage channel of the interleaved pixels of the edit frame.
    Interleaved,
    /// A standalone plane over the temporary frame, the canvas starting at `(origin, origin)`.
    Plane {
        /// Row stride of the plane, in samples.
        stride: usize,
        /// Offset of the canvas on both axes.
        origin: usize,
    },
}

/// What an effect produced.
///
/// `displace` is the signed number of pixels the canvas grew by on every side; a shrinking
/// effect reports a negative value. `bounds` is relative to the output canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EffectResult {
    /// How the call ended.
    pub state: EffectState,
    /// Signed growth of the canvas on every side.
    pub displace: i32,
    /// Width of the output canvas.
    pub width: usize,
    /// Height of the output canvas.
    pub height: usize,
    /// Tightest rectangle of non-transparent output.
    pub bounds: Bounds,
    /// Where the coverage was written.
    pub storage: MatteStorage,
}

impl EffectResult {
    /// The source left as-is.
    pub(crate) fn unchanged(width: usize, height: usize) -> Self {
        Self {
            state: EffectState::Unchanged,
            displace: 0,
            width,
            height,
            bounds: Bounds::from_size(width as i32, height as i32),
            storage: MatteStorage::Interleaved,
        }
    }

    /// A request none of whose clamped forms fits.
    pub(crate) fn invalid(width: usize, height: usize) -> Self {
        Self {
            state: EffectState::Invalid,
            bounds: Bounds::EMPTY,
            ..Self::unchanged(width, height)
        }
    }

    /// A canvas that collapsed.
    pub(crate) fn zero_sized(displace: i32) -> Self {
        Self {
            state: EffectState::ZeroSized,
            displace,
            width: 0,
            height: 0,
            bounds: Bounds::EMPTY,
            storage: MatteStorage::Interleaved,
        }
    }

    /// A transparent `width x height` canvas displaced by `displace`.
    pub(crate) fn empty(displace: i32, width: usize, height: usize) -> Self {
        Self {
            state: EffectState::Empty,
            displace,
            width,
            height,
            bounds: Bounds::EMPTY,
            storage: MatteStorage::Interleaved,
        }
    }

    /// Whether the output holds no content.
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// The output coverage.
    ///
    /// Only a [`EffectState::Normal`] or [`EffectState::Unchanged`] result guarantees the
    /// samples; the other states report their uniform content through `state` alone.
    ///
    /// # Errors
    ///
    /// If the frames are smaller than the canvas, which only happens with other frames than the
    /// effect ran on.
    pub fn matte<'a>(&self, frames: &'a FrameBuffers) -> Result<AlphaView<'a>, ImageError> {
        match self.plane_in(frames.temp())? {
            Some(plane) => Ok(plane),
            None => frames.edit().alpha(self.width, self.height),
        }
    }

    /// The canvas of a plane result over `temp`, `None` for interleaved storage.
    pub(crate) fn plane_in<'a>(
        &self,
        temp: &'a Frame,
    ) -> Result<Option<AlphaView<'a>>, ImageError> {
        let MatteStorage::Plane { stride, origin } = self.storage else {
            return Ok(None);
        };
        let (w, h) = (origin + self.width, origin + self.height);
        let canvas = Bounds::new(origin as i32, origin as i32, w as i32, h as i32);
        Ok(Some(temp.plane(w, h, stride)?.sub_view(canvas)?))
    }
}
