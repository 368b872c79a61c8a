/// An axis-aligned half-open rectangle `[left, right) x [top, bottom)`.
///
/// A transform reports the region holding non-default content as a `Bounds`;
/// everything outside it is the default fill value.
///
/// # Examples
///
/// ```
/// use matte_image::Bounds;
///
/// let bd = Bounds::new(1, 2, 5, 4);
/// assert_eq!(bd.width(), 4);
/// assert_eq!(bd.height(), 2);
/// assert!(!bd.is_empty());
/// assert!(Bounds::EMPTY.is_empty());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    /// Inclusive left edge.
    pub left: i32,
    /// Inclusive top edge.
    pub top: i32,
    /// Exclusive right edge.
    pub right: i32,
    /// Exclusive bottom edge.
    pub bottom: i32,
}

impl Bounds {
    /// The canonical empty rectangle.
    pub const EMPTY: Bounds = Bounds::new(0, 0, 0, 0);

    /// Create a rectangle from its four edges.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The rectangle `[0, width) x [0, height)`.
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Horizontal extent, negative when the rectangle is inverted.
    #[inline]
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Vertical extent, negative when the rectangle is inverted.
    #[inline]
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Whether the rectangle covers no pixel.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Translate by `(dx, dy)`.
    pub const fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    /// Grow by `dx` on the left and right, and by `dy` on the top and bottom.
    pub const fn inflate(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.left - dx,
            self.top - dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    /// Move the top-left corner outwards by `(dx, dy)`.
    pub const fn inflate_tl(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.left - dx, self.top - dy, self.right, self.bottom)
    }

    /// Move the bottom-right corner outwards by `(dx, dy)`.
    pub const fn inflate_br(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.left, self.top, self.right + dx, self.bottom + dy)
    }

    /// Smallest rectangle containing both. Empty operands are ignored.
    pub fn union(&self, other: &Bounds) -> Bounds {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => Bounds::EMPTY,
            (true, false) => *other,
            (false, true) => *self,
            (false, false) => Bounds::new(
                self.left.min(other.left),
                self.top.min(other.top),
                self.right.max(other.right),
                self.bottom.max(other.bottom),
            ),
        }
    }

    /// Overlap of both rectangles, `EMPTY` if they are disjoint.
    pub fn intersect(&self, other: &Bounds) -> Bounds {
        let bd = Bounds::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        if bd.is_empty() {
            Bounds::EMPTY
        } else {
            bd
        }
    }

    /// Whether `(x, y)` lies inside.
    #[inline]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// Build a rectangle from two closed intervals `[x0, x1]` and `[y0, y1]`.
    ///
    /// `None` on either axis gives `EMPTY`.
    pub fn from_closed_spans(xs: Option<(i32, i32)>, ys: Option<(i32, i32)>) -> Bounds {
        match (xs, ys) {
            (Some((x0, x1)), Some((y0, y1))) if x0 <= x1 && y0 <= y1 => {
                Bounds::new(x0, y0, x1 + 1, y1 + 1)
            }
            _ => Bounds::EMPTY,
        }
    }
}

/// Unite two closed intervals, treating `None` as the empty interval.
#[inline]
pub fn unite_spans(a: Option<(i32, i32)>, b: Option<(i32, i32)>) -> Option<(i32, i32)> {
    match (a, b) {
        (Some((a0, a1)), Some((b0, b1))) => Some((a0.min(b0), a1.max(b1))),
        (None, b) => b,
        (a, None) => a,
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}
