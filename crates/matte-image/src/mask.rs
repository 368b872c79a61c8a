/// Classification of the structuring-element neighbourhood around one output cell.
///
/// The classifier looks at the square that contains the disk. Every sample of that square
/// being exactly zero gives `Zero`, every sample being exactly full gives `Full`, anything
/// else gives `Gray`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mask {
    /// Every sample in the neighbourhood is transparent.
    #[default]
    Zero,
    /// Every sample in the neighbourhood is fully opaque.
    Full,
    /// Mixed content, evaluated per pixel.
    Gray,
}

impl Mask {
    /// Whether the neighbourhood is known to be constant.
    #[inline]
    pub const fn is_constant(self) -> bool {
        !matches!(self, Mask::Gray)
    }
}
