use crate::alpha::Alpha;
use crate::error::ImageError;
use crate::plane::{AlphaView, AlphaViewMut, SampleLayout};

/// A pixel with luma, two chroma channels and coverage, in that order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelYca {
    /// Luma.
    pub y: i16,
    /// Blue-difference chroma.
    pub cb: i16,
    /// Red-difference chroma.
    pub cr: i16,
    /// Coverage.
    pub a: Alpha,
}

/// A fixed-capacity buffer of interleaved pixels.
///
/// The same memory can be read either as interleaved pixels, with a row pitch of `line` pixels,
/// or as a standalone coverage plane with any stride that fits the buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<Alpha>,
    line: usize,
    rows: usize,
}

impl Frame {
    /// A transparent frame of `rows` rows of `line` pixels each.
    pub fn new(line: usize, rows: usize) -> Self {
        Self {
            data: vec![0; 4 * line * rows],
            line,
            rows,
        }
    }

    /// Row pitch in pixels when read as interleaved pixels.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Number of rows of interleaved pixels.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Total capacity in samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame has no capacity at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The interleaved pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> PixelYca {
        let i = 4 * (y * self.line + x);
        PixelYca {
            y: self.data[i],
            cb: self.data[i + 1],
            cr: self.data[i + 2],
            a: self.data[i + 3],
        }
    }

    /// Overwrite the interleaved pixel at `(x, y)`.
    pub fn set_pixel(&mut self, x: usize, y: usize, px: PixelYca) {
        let i = 4 * (y * self.line + x);
        self.data[i..i + 4].copy_from_slice(&[px.y, px.cb, px.cr, px.a]);
    }

    fn check_pixels(&self, width: usize, height: usize) -> Result<(), ImageError> {
        if width > self.line || height > self.rows {
            return Err(ImageError::InvalidPlaneSize(width, height));
        }
        Ok(())
    }

    /// The coverage channel of the top-left `width x height` interleaved pixels.
    ///
    /// # Errors
    ///
    /// If the region does not fit the frame.
    pub fn alpha(&self, width: usize, height: usize) -> Result<AlphaView<'_>, ImageError> {
        self.check_pixels(width, height)?;
        AlphaView::new(
            self.data.get(3..).unwrap_or(&[]),
            width,
            height,
            4 * self.line,
            SampleLayout::Interleaved,
        )
    }

    /// The mutable coverage channel of the top-left `width x height` interleaved pixels.
    ///
    /// # Errors
    ///
    /// If the region does not fit the frame.
    pub fn alpha_mut(
        &mut self,
        width: usize,
        height: usize,
    ) -> Result<AlphaViewMut<'_>, ImageError> {
        self.check_pixels(width, height)?;
        let stride = 4 * self.line;
        AlphaViewMut::new(
            self.data.get_mut(3..).unwrap_or(&mut []),
            width,
            height,
            stride,
            SampleLayout::Interleaved,
        )
    }

    /// The frame memory read as a standalone plane.
    ///
    /// # Errors
    ///
    /// If the plane does not fit the frame.
    pub fn plane(
        &self,
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<AlphaView<'_>, ImageError> {
        AlphaView::new(&self.data, width, height, stride, SampleLayout::Plane)
    }

    /// The frame memory written as a standalone plane.
    ///
    /// # Errors
    ///
    /// If the plane does not fit the frame.
    pub fn plane_mut(
        &mut self,
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<AlphaViewMut<'_>, ImageError> {
        AlphaViewMut::new(&mut self.data, width, height, stride, SampleLayout::Plane)
    }

    /// The raw samples.
    pub fn as_slice(&self) -> &[Alpha] {
        &self.data
    }

    /// The raw samples.
    pub fn as_slice_mut(&mut self) -> &mut [Alpha] {
        &mut self.data
    }
}

/// The edit and temporary frames of one processing call.
///
/// The edit frame holds the current image and the temporary frame receives the next one.
/// Reading one while writing the other goes through [`FrameBuffers::split`], so the borrow
/// checker rules out aliasing. [`FrameBuffers::swap`] hands the roles over once a pass is done.
///
/// # Examples
///
/// ```
/// use matte_image::{FrameBuffers, MAX_ALPHA};
///
/// let mut frames = FrameBuffers::new(4, 4);
/// frames.temp_mut().as_slice_mut()[0] = MAX_ALPHA;
/// frames.swap();
/// assert_eq!(frames.edit().as_slice()[0], MAX_ALPHA);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffers {
    edit: Frame,
    temp: Frame,
}

impl FrameBuffers {
    /// Two transparent frames of identical capacity.
    pub fn new(line: usize, rows: usize) -> Self {
        Self {
            edit: Frame::new(line, rows),
            temp: Frame::new(line, rows),
        }
    }

    /// The current image.
    pub fn edit(&self) -> &Frame {
        &self.edit
    }

    /// The current image.
    pub fn edit_mut(&mut self) -> &mut Frame {
        &mut self.edit
    }

    /// The frame receiving the next image.
    pub fn temp(&self) -> &Frame {
        &self.temp
    }

    /// The frame receiving the next image.
    pub fn temp_mut(&mut self) -> &mut Frame {
        &mut self.temp
    }

    /// Borrow the edit frame for reading and the temporary frame for writing at once.
    pub fn split(&mut self) -> (&Frame, &mut Frame) {
        (&self.edit, &mut self.temp)
    }

    /// Borrow both frames for writing at once, edit first.
    pub fn split_mut(&mut self) -> (&mut Frame, &mut Frame) {
        (&mut self.edit, &mut self.temp)
    }

    /// Exchange the roles of both frames.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.edit, &mut self.temp);
    }
}
