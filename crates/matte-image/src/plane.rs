use crate::alpha::{clamp_alpha, Alpha};
use crate::bounds::Bounds;
use crate::error::ImageError;

/// How coverage samples are laid out along a row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SampleLayout {
    /// A standalone single-channel plane, one sample per pixel.
    #[default]
    Plane,
    /// The coverage channel of a four-channel pixel, one sample every fourth element.
    Interleaved,
}

impl SampleLayout {
    /// Distance in elements between two horizontally adjacent samples.
    #[inline]
    pub const fn step(self) -> usize {
        match self {
            SampleLayout::Plane => 1,
            SampleLayout::Interleaved => 4,
        }
    }
}

/// Number of elements spanned by a plane, from its first sample to its last one.
#[inline]
fn extent(width: usize, height: usize, stride: usize, step: usize) -> usize {
    if width == 0 || height == 0 {
        0
    } else {
        (height - 1) * stride + (width - 1) * step + 1
    }
}

fn validate(
    len: usize,
    width: usize,
    height: usize,
    stride: usize,
    layout: SampleLayout,
) -> Result<(), ImageError> {
    let step = layout.step();
    if width > 0 && height > 1 && stride < (width - 1) * step + 1 {
        return Err(ImageError::InvalidStride(stride, (width - 1) * step + 1));
    }
    let need = extent(width, height, stride, step);
    if len < need {
        return Err(ImageError::InvalidDataLength(len, need));
    }
    Ok(())
}

fn region_offset(
    bd: &Bounds,
    width: usize,
    height: usize,
    stride: usize,
    step: usize,
) -> Result<usize, ImageError> {
    if bd.left < 0
        || bd.top < 0
        || bd.right < bd.left
        || bd.bottom < bd.top
        || bd.right as usize > width
        || bd.bottom as usize > height
    {
        return Err(ImageError::RegionOutOfPlane(
            bd.left, bd.top, bd.right, bd.bottom,
        ));
    }
    Ok(bd.top as usize * stride + bd.left as usize * step)
}

/// A read-only view over coverage samples.
///
/// The sample at `(x, y)` lives at `data[y * stride + x * layout.step()]`.
#[derive(Clone, Copy, Debug)]
pub struct AlphaView<'a> {
    data: &'a [Alpha],
    width: usize,
    height: usize,
    stride: usize,
    layout: SampleLayout,
}

impl<'a> AlphaView<'a> {
    /// Create a view over `data`.
    ///
    /// # Arguments
    ///
    /// * `data` - The backing samples, starting at the sample `(0, 0)`.
    /// * `width` - The width of the plane in pixels.
    /// * `height` - The height of the plane in pixels.
    /// * `stride` - The distance in elements between two rows.
    /// * `layout` - Whether samples are standalone or interleaved.
    ///
    /// # Errors
    ///
    /// If the stride is shorter than a row, or `data` does not reach the last sample.
    pub fn new(
        data: &'a [Alpha],
        width: usize,
        height: usize,
        stride: usize,
        layout: SampleLayout,
    ) -> Result<Self, ImageError> {
        validate(data.len(), width, height, stride, layout)?;
        Ok(Self {
            data,
            width,
            height,
            stride,
            layout,
        })
    }

    /// Width of the view in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the view in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance in elements between two rows.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Sample layout of the view.
    #[inline]
    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    /// Whether the samples are the coverage channel of interleaved pixels.
    #[inline]
    pub fn is_interleaved(&self) -> bool {
        self.layout == SampleLayout::Interleaved
    }

    /// The raw sample at `(x, y)`.
    ///
    /// PRECONDITION: `x < width` and `y < height`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Alpha {
        self.data[y * self.stride + x * self.layout.step()]
    }

    /// The sample at `(x, y)` clamped to the coverage range, or zero outside of the view.
    #[inline]
    pub fn sample(&self, x: i32, y: i32) -> Alpha {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            0
        } else {
            clamp_alpha(self.get(x as usize, y as usize))
        }
    }

    /// A view restricted to `bd`.
    ///
    /// # Errors
    ///
    /// If `bd` is not inside the view.
    pub fn sub_view(&self, bd: Bounds) -> Result<AlphaView<'a>, ImageError> {
        let offset = region_offset(
            &bd,
            self.width,
            self.height,
            self.stride,
            self.layout.step(),
        )?;
        let (width, height) = (bd.width() as usize, bd.height() as usize);
        let data = if width == 0 || height == 0 {
            &self.data[..0]
        } else {
            &self.data[offset..]
        };
        Ok(AlphaView {
            data,
            width,
            height,
            stride: self.stride,
            layout: self.layout,
        })
    }

    /// Copy the view into an owned plane, clamping every sample.
    pub fn to_plane(&self) -> AlphaPlane {
        let mut data = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            data.extend((0..self.width).map(|x| clamp_alpha(self.get(x, y))));
        }
        AlphaPlane {
            data,
            width: self.width,
            height: self.height,
        }
    }
}

/// A mutable view over coverage samples.
#[derive(Debug)]
pub struct AlphaViewMut<'a> {
    data: &'a mut [Alpha],
    width: usize,
    height: usize,
    stride: usize,
    layout: SampleLayout,
}

impl<'a> AlphaViewMut<'a> {
    /// Create a mutable view over `data`.
    ///
    /// # Errors
    ///
    /// If the stride is shorter than a row, or `data` does not reach the last sample.
    pub fn new(
        data: &'a mut [Alpha],
        width: usize,
        height: usize,
        stride: usize,
        layout: SampleLayout,
    ) -> Result<Self, ImageError> {
        validate(data.len(), width, height, stride, layout)?;
        Ok(Self {
            data,
            width,
            height,
            stride,
            layout,
        })
    }

    /// Width of the view in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the view in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance in elements between two rows.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Sample layout of the view.
    #[inline]
    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    /// The raw sample at `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Alpha {
        self.data[y * self.stride + x * self.layout.step()]
    }

    /// Overwrite the sample at `(x, y)`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: Alpha) {
        self.data[y * self.stride + x * self.layout.step()] = value;
    }

    /// Borrow as a read-only view.
    pub fn as_view(&self) -> AlphaView<'_> {
        AlphaView {
            data: &*self.data,
            width: self.width,
            height: self.height,
            stride: self.stride,
            layout: self.layout,
        }
    }

    /// Reborrow with a shorter lifetime.
    pub fn reborrow(&mut self) -> AlphaViewMut<'_> {
        AlphaViewMut {
            data: &mut *self.data,
            width: self.width,
            height: self.height,
            stride: self.stride,
            layout: self.layout,
        }
    }

    /// A mutable view restricted to `bd`.
    ///
    /// # Errors
    ///
    /// If `bd` is not inside the view.
    pub fn sub_view_mut(&mut self, bd: Bounds) -> Result<AlphaViewMut<'_>, ImageError> {
        self.reborrow().into_sub_view(bd)
    }

    /// Consume the view, keeping only `bd`.
    ///
    /// # Errors
    ///
    /// If `bd` is not inside the view.
    pub fn into_sub_view(self, bd: Bounds) -> Result<AlphaViewMut<'a>, ImageError> {
        let offset = region_offset(
            &bd,
            self.width,
            self.height,
            self.stride,
            self.layout.step(),
        )?;
        let (width, height) = (bd.width() as usize, bd.height() as usize);
        let data = self.data;
        let data = if width == 0 || height == 0 {
            &mut data[..0]
        } else {
            &mut data[offset..]
        };
        Ok(AlphaViewMut {
            data,
            width,
            height,
            stride: self.stride,
            layout: self.layout,
        })
    }

    /// A mutable accessor for row `y`.
    pub fn row_mut(&mut self, y: usize) -> AlphaRowMut<'_> {
        let step = self.layout.step();
        let start = y * self.stride;
        let len = extent(self.width, 1, self.stride, step);
        AlphaRowMut {
            data: &mut self.data[start..start + len],
            width: self.width,
            step,
        }
    }

    /// Set every sample of the view to `value`.
    pub fn fill(&mut self, value: Alpha) {
        for y in 0..self.height {
            self.row_mut(y).fill(value);
        }
    }

    /// Split the view into at most `bands` horizontal bands of contiguous rows.
    ///
    /// Each band is returned with the index of its first row.
    pub fn split_bands(self, bands: usize) -> Vec<(usize, AlphaViewMut<'a>)> {
        let n = bands.clamp(1, self.height.max(1));
        let mut out = Vec::with_capacity(n);
        let mut rest = self.data;
        let mut y0 = 0;
        for i in 0..n {
            let y1 = self.height * (i + 1) / n;
            let take = if i + 1 == n {
                rest.len()
            } else {
                ((y1 - y0) * self.stride).min(rest.len())
            };
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(take);
            rest = tail;
            out.push((
                y0,
                AlphaViewMut {
                    data: head,
                    width: self.width,
                    height: y1 - y0,
                    stride: self.stride,
                    layout: self.layout,
                },
            ));
            y0 = y1;
        }
        out
    }
}

/// One row of a mutable view.
#[derive(Debug)]
pub struct AlphaRowMut<'a> {
    data: &'a mut [Alpha],
    width: usize,
    step: usize,
}

impl AlphaRowMut<'_> {
    /// Width of the row in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// The raw sample at `x`.
    #[inline]
    pub fn get(&self, x: usize) -> Alpha {
        self.data[x * self.step]
    }

    /// Overwrite the sample at `x`.
    #[inline]
    pub fn set(&mut self, x: usize, value: Alpha) {
        self.data[x * self.step] = value;
    }

    /// Set the samples `[x0, x1)` to `value`.
    pub fn fill_span(&mut self, x0: usize, x1: usize, value: Alpha) {
        if self.step == 1 {
            self.data[x0..x1].fill(value);
        } else {
            for x in x0..x1 {
                self.data[x * self.step] = value;
            }
        }
    }

    /// Set every sample of the row to `value`.
    pub fn fill(&mut self, value: Alpha) {
        self.fill_span(0, self.width, value);
    }
}

/// An owned, tightly packed coverage plane.
///
/// # Examples
///
/// ```
/// use matte_image::{AlphaPlane, MAX_ALPHA};
///
/// let mut plane = AlphaPlane::new(3, 2);
/// plane.set(1, 1, MAX_ALPHA);
/// assert_eq!(plane.view().get(1, 1), MAX_ALPHA);
/// assert_eq!(plane.as_slice().len(), 6);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlphaPlane {
    data: Vec<Alpha>,
    width: usize,
    height: usize,
}

impl AlphaPlane {
    /// A transparent plane.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0)
    }

    /// A plane with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: Alpha) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Wrap row-major samples.
    ///
    /// # Errors
    ///
    /// If `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<Alpha>) -> Result<Self, ImageError> {
        if data.len() != width * height {
            return Err(ImageError::InvalidDataLength(data.len(), width * height));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Width of the plane in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the plane in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The sample at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Alpha {
        self.data[y * self.width + x]
    }

    /// Overwrite the sample at `(x, y)`.
    pub fn set(&mut self, x: usize, y: usize, value: Alpha) {
        self.data[y * self.width + x] = value;
    }

    /// The samples in row-major order.
    pub fn as_slice(&self) -> &[Alpha] {
        &self.data
    }

    /// The samples in row-major order.
    pub fn as_slice_mut(&mut self) -> &mut [Alpha] {
        &mut self.data
    }

    /// Consume the plane into its samples.
    pub fn into_vec(self) -> Vec<Alpha> {
        self.data
    }

    /// A read-only view over the whole plane.
    pub fn view(&self) -> AlphaView<'_> {
        AlphaView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
            layout: SampleLayout::Plane,
        }
    }

    /// A mutable view over the whole plane.
    pub fn view_mut(&mut self) -> AlphaViewMut<'_> {
        AlphaViewMut {
            data: &mut self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
            layout: SampleLayout::Plane,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alpha::MAX_ALPHA;

    #[test]
    fn test_view_rejects_short_data() {
        let data = vec![0; 10];
        let res = AlphaView::new(&data, 4, 3, 4, SampleLayout::Plane);
        assert_eq!(res.err(), Some(ImageError::InvalidDataLength(10, 12)));
    }

    #[test]
    fn test_view_rejects_narrow_stride() {
        let data = vec![0; 64];
        let res = AlphaView::new(&data, 4, 3, 12, SampleLayout::Interleaved);
        assert_eq!(res.err(), Some(ImageError::InvalidStride(12, 13)));
    }

    #[test]
    fn test_interleaved_access() -> Result<(), ImageError> {
        // two pixels per row, four channels each, alpha last.
        let data: Vec<Alpha> = vec![1, 2, 3, 10, 4, 5, 6, 20, 7, 8, 9, 30, 1, 1, 1, 40];
        let view = AlphaView::new(&data[3..], 2, 2, 8, SampleLayout::Interleaved)?;
        assert_eq!(view.get(0, 0), 10);
        assert_eq!(view.get(1, 0), 20);
        assert_eq!(view.get(0, 1), 30);
        assert_eq!(view.get(1, 1), 40);
        Ok(())
    }

    #[test]
    fn test_sample_clamps_and_pads() {
        let plane = AlphaPlane::from_vec(2, 1, vec![-5, 9000]).unwrap();
        let view = plane.view();
        assert_eq!(view.sample(0, 0), 0);
        assert_eq!(view.sample(1, 0), MAX_ALPHA);
        assert_eq!(view.sample(-1, 0), 0);
        assert_eq!(view.sample(0, 1), 0);
    }

    #[test]
    fn test_sub_view() -> Result<(), ImageError> {
        let plane = AlphaPlane::from_vec(3, 3, (0..9).collect())?;
        let sub = plane.view().sub_view(Bounds::new(1, 1, 3, 3))?;
        assert_eq!((sub.width(), sub.height()), (2, 2));
        assert_eq!(sub.get(0, 0), 4);
        assert_eq!(sub.get(1, 1), 8);
        assert!(plane.view().sub_view(Bounds::new(0, 0, 4, 1)).is_err());
        Ok(())
    }

    #[test]
    fn test_split_bands_cover_all_rows() {
        let mut plane = AlphaPlane::new(3, 7);
        let bands = plane.view_mut().split_bands(3);
        assert_eq!(bands.len(), 3);
        let rows: usize = bands.iter().map(|(_, b)| b.height()).sum();
        assert_eq!(rows, 7);
        for (y0, mut band) in bands {
            for y in 0..band.height() {
                band.row_mut(y).fill((y0 + y) as Alpha);
            }
        }
        for y in 0..7 {
            assert_eq!(plane.get(2, y), y as Alpha);
        }
    }

    #[test]
    fn test_row_fill_span_interleaved() -> Result<(), ImageError> {
        let mut data = vec![0; 16];
        let mut view = AlphaViewMut::new(&mut data[3..], 4, 1, 16, SampleLayout::Interleaved)?;
        view.row_mut(0).fill_span(1, 3, 7);
        assert_eq!(data, vec![0, 0, 0, 0, 0, 0, 0, 7, 0, 0, 0, 7, 0, 0, 0, 0]);
        Ok(())
    }
}
