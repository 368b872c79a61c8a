use crate::alpha::Alpha;
use crate::error::ImageError;
use crate::mask::Mask;

/// The amount of scratch memory one transform needs, by element type.
///
/// # Examples
///
/// ```
/// use matte_image::HeapRequest;
///
/// let req = HeapRequest::new(10, 4, 3) + HeapRequest::alphas(5);
/// assert_eq!(req, HeapRequest::new(10, 4, 8));
/// assert_eq!(req.bytes(), 10 * 4 + 4 + 8 * 2);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HeapRequest {
    /// Number of 32-bit words.
    pub words: usize,
    /// Number of mask cells.
    pub masks: usize,
    /// Number of coverage samples.
    pub alphas: usize,
}

impl HeapRequest {
    /// A request for nothing.
    pub const NONE: HeapRequest = HeapRequest::new(0, 0, 0);

    /// Create a request from its three counts.
    pub const fn new(words: usize, masks: usize, alphas: usize) -> Self {
        Self {
            words,
            masks,
            alphas,
        }
    }

    /// A request for `n` 32-bit words only.
    pub const fn words(n: usize) -> Self {
        Self::new(n, 0, 0)
    }

    /// A request for `n` mask cells only.
    pub const fn masks(n: usize) -> Self {
        Self::new(0, n, 0)
    }

    /// A request for `n` coverage samples only.
    pub const fn alphas(n: usize) -> Self {
        Self::new(0, 0, n)
    }

    /// Size of the request in bytes.
    pub const fn bytes(&self) -> usize {
        self.words * std::mem::size_of::<i32>()
            + self.masks * std::mem::size_of::<Mask>()
            + self.alphas * std::mem::size_of::<Alpha>()
    }

    /// The element-wise maximum, enough for either request on its own.
    pub fn max(self, other: HeapRequest) -> HeapRequest {
        HeapRequest::new(
            self.words.max(other.words),
            self.masks.max(other.masks),
            self.alphas.max(other.alphas),
        )
    }
}

impl std::ops::Add for HeapRequest {
    type Output = HeapRequest;

    fn add(self, rhs: HeapRequest) -> HeapRequest {
        HeapRequest::new(
            self.words + rhs.words,
            self.masks + rhs.masks,
            self.alphas + rhs.alphas,
        )
    }
}

/// Caller-owned scratch memory with a fixed byte budget.
///
/// The pools grow on demand up to the budget and are reused across calls. Their content is
/// unspecified when carved; consumers initialise what they read.
#[derive(Clone, Debug, Default)]
pub struct ScratchHeap {
    capacity: usize,
    words: Vec<i32>,
    masks: Vec<Mask>,
    alphas: Vec<Alpha>,
}

impl ScratchHeap {
    /// A heap that can serve requests of up to `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// The byte budget.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `req` fits within the budget.
    pub fn fits(&self, req: &HeapRequest) -> bool {
        req.bytes() <= self.capacity
    }

    /// Carve typed slices sized after `req`.
    ///
    /// # Errors
    ///
    /// If the request exceeds the byte budget.
    pub fn carve(&mut self, req: HeapRequest) -> Result<Carved<'_>, ImageError> {
        if !self.fits(&req) {
            return Err(ImageError::HeapExhausted(req.bytes(), self.capacity));
        }
        if self.words.len() < req.words {
            self.words.resize(req.words, 0);
        }
        if self.masks.len() < req.masks {
            self.masks.resize(req.masks, Mask::Zero);
        }
        if self.alphas.len() < req.alphas {
            self.alphas.resize(req.alphas, 0);
        }
        Ok(Carved {
            words: &mut self.words[..req.words],
            masks: &mut self.masks[..req.masks],
            alphas: &mut self.alphas[..req.alphas],
        })
    }
}

/// Typed slices carved from a [`ScratchHeap`].
#[derive(Debug, Default)]
pub struct Carved<'h> {
    /// 32-bit words.
    pub words: &'h mut [i32],
    /// Mask cells.
    pub masks: &'h mut [Mask],
    /// Coverage samples.
    pub alphas: &'h mut [Alpha],
}

fn take_front<'h, T>(pool: &mut &'h mut [T], n: usize) -> Result<&'h mut [T], ImageError> {
    if n > pool.len() {
        return Err(ImageError::HeapExhausted(
            n * std::mem::size_of::<T>(),
            pool.len() * std::mem::size_of::<T>(),
        ));
    }
    let (head, tail) = std::mem::take(pool).split_at_mut(n);
    *pool = tail;
    Ok(head)
}

impl<'h> Carved<'h> {
    /// Reborrow every pool with a shorter lifetime.
    pub fn reborrow(&mut self) -> Carved<'_> {
        Carved {
            words: &mut *self.words,
            masks: &mut *self.masks,
            alphas: &mut *self.alphas,
        }
    }

    /// Detach the first `n` words.
    ///
    /// # Errors
    ///
    /// If fewer than `n` words remain.
    pub fn take_words(&mut self, n: usize) -> Result<&'h mut [i32], ImageError> {
        take_front(&mut self.words, n)
    }

    /// Detach the first `n` mask cells.
    ///
    /// # Errors
    ///
    /// If fewer than `n` cells remain.
    pub fn take_masks(&mut self, n: usize) -> Result<&'h mut [Mask], ImageError> {
        take_front(&mut self.masks, n)
    }

    /// Detach the first `n` coverage samples.
    ///
    /// # Errors
    ///
    /// If fewer than `n` samples remain.
    pub fn take_alphas(&mut self, n: usize) -> Result<&'h mut [Alpha], ImageError> {
        take_front(&mut self.alphas, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_bytes() {
        assert_eq!(HeapRequest::NONE.bytes(), 0);
        assert_eq!(HeapRequest::words(3).bytes(), 12);
        assert_eq!(HeapRequest::masks(3).bytes(), 3);
        assert_eq!(HeapRequest::alphas(3).bytes(), 6);
        assert_eq!(
            HeapRequest::new(1, 9, 2).max(HeapRequest::new(4, 1, 2)),
            HeapRequest::new(4, 9, 2)
        );
    }

    #[test]
    fn test_carve_within_budget() -> Result<(), ImageError> {
        let mut heap = ScratchHeap::with_capacity(64);
        let mut carved = heap.carve(HeapRequest::new(8, 8, 8))?;
        let a = carved.take_words(5)?;
        let b = carved.take_words(3)?;
        a[4] = 1;
        b[0] = 2;
        assert!(carved.take_words(1).is_err());
        assert_eq!(carved.masks.len(), 8);
        assert_eq!(carved.alphas.len(), 8);
        Ok(())
    }

    #[test]
    fn test_carve_over_budget() {
        let mut heap = ScratchHeap::with_capacity(15);
        let res = heap.carve(HeapRequest::words(4));
        assert_eq!(res.err(), Some(ImageError::HeapExhausted(16, 15)));
    }

    #[test]
    fn test_carve_reuses_pools() -> Result<(), ImageError> {
        let mut heap = ScratchHeap::with_capacity(1 << 10);
        heap.carve(HeapRequest::alphas(100))?.alphas[99] = 7;
        let carved = heap.carve(HeapRequest::alphas(10))?;
        assert_eq!(carved.alphas.len(), 10);
        Ok(())
    }
}
