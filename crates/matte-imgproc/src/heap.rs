//! Scratch memory each transform carves from the heap.
//!
//! Callers size their [`ScratchHeap`](matte_image::ScratchHeap) with these formulas before
//! running a transform; the transforms carve exactly what is listed here.

use matte_image::HeapRequest;

use crate::arc::isqrt;
use crate::morphology::masking::heap_cells;
use crate::morphology::{bin2x, Sense};

/// Samples of a frame buffer needed to hold a `width x height` plane.
///
/// Rows are padded to an even width.
///
/// # Examples
///
/// ```
/// use matte_imgproc::heap::alpha_space;
///
/// assert_eq!(alpha_space(3, 2), 8);
/// assert_eq!(alpha_space(4, 2), 8);
/// ```
pub fn alpha_space(width: usize, height: usize) -> usize {
    ((width + 1) & !1) * height
}

/// Scratch of a threshold transform of a `width x height` plane.
///
/// One word per source column and destination row.
pub fn bin(width: usize, height: usize, size_sq: i64, sense: Sense) -> HeapRequest {
    let size = isqrt(size_sq) as usize;
    let (_, out_h) = sense.output_size(width, height, size);
    HeapRequest::words(width * out_h)
}

/// Scratch of a half-pixel threshold transform of a `width x height` plane.
///
/// Two words per source column and destination row.
pub fn bin2x(width: usize, height: usize, size_sq2: i64, sense: Sense) -> HeapRequest {
    let (_, out_h) = sense.output_size(width, height, bin2x::margin(size_sq2, sense));
    HeapRequest::words(2 * width * out_h)
}

/// Scratch of an extremum transform of a `width x height` plane: the mask cells of the
/// destination. The extracting variants take their plane of [`alpha_space`] from the caller.
pub fn max(width: usize, height: usize, size_sq: i64, sense: Sense) -> HeapRequest {
    let size = isqrt(size_sq) as usize;
    if size == 0 {
        return HeapRequest::NONE;
    }
    HeapRequest::masks(heap_cells(width, height, size, sense))
}

/// Scratch of a cached-extremum transform, identical to [`max`].
pub fn max_fast(width: usize, height: usize, size_sq: i64, sense: Sense) -> HeapRequest {
    max(width, height, size_sq, sense)
}

/// Scratch of a coverage-proportional transform of a `width x height` plane.
///
/// Erosion also needs the source framed by one transparent pixel on every side.
pub fn sum(width: usize, height: usize, size_sq: i64, sense: Sense) -> HeapRequest {
    let size = isqrt(size_sq) as usize;
    if size == 0 {
        return HeapRequest::NONE;
    }
    match sense {
        Sense::Inflate => HeapRequest::masks(heap_cells(width, height, size, sense)),
        Sense::Deflate => {
            let (bw, bh) = (width + 2, height + 2);
            HeapRequest::new(0, heap_cells(bw, bh, size, sense), bw * bh)
        }
    }
}
