//! Half-chord tables approximating a Euclidean disk.
//!
//! For a squared-radius budget `S`, `arc[d] = floor(sqrt(S - d*d))` for every offset `|d| <= size`
//! with `size = floor(sqrt(S))`. The pixel `(dx, dy)` belongs to the disk iff `|dx| <= arc[dy]`.

/// Exact integer square root, `floor(sqrt(n))`, with `0` for negative input.
///
/// # Examples
///
/// ```
/// use matte_imgproc::arc::isqrt;
///
/// assert_eq!(isqrt(0), 0);
/// assert_eq!(isqrt(15), 3);
/// assert_eq!(isqrt(16), 4);
/// assert_eq!(isqrt(-4), 0);
/// ```
pub fn isqrt(n: i64) -> i64 {
    if n <= 0 {
        return 0;
    }
    let mut r = (n as f64).sqrt() as i64;
    while r * r > n {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= n {
        r += 1;
    }
    r
}

/// The quarter table: `arc[d]` for `d` in `0..=size`.
///
/// # Examples
///
/// ```
/// use matte_imgproc::arc::ArcTable;
///
/// let arc = ArcTable::quarter(4);
/// assert_eq!(arc.size(), 2);
/// assert_eq!(arc.as_slice(), &[2, 1, 0]);
/// assert_eq!(arc.area(), 13);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArcTable {
    budget: i64,
    arc: Vec<i32>,
}

impl ArcTable {
    /// Build the table for the squared-radius `budget`. Negative budgets act as zero.
    pub fn quarter(budget: i64) -> Self {
        let budget = budget.max(0);
        let size = isqrt(budget);
        let arc = (0..=size).map(|d| isqrt(budget - d * d) as i32).collect();
        Self { budget, arc }
    }

    /// The squared-radius budget the table was built for.
    pub fn budget(&self) -> i64 {
        self.budget
    }

    /// The radius, `floor(sqrt(budget))`.
    #[inline]
    pub fn size(&self) -> usize {
        self.arc.len() - 1
    }

    /// Half-chord at offset `d`, or `-1` when `|d|` exceeds the radius.
    #[inline]
    pub fn get(&self, d: i32) -> i32 {
        self.arc.get(d.unsigned_abs() as usize).copied().unwrap_or(-1)
    }

    /// The entries for `d` in `0..=size`.
    pub fn as_slice(&self) -> &[i32] {
        &self.arc
    }

    /// Whether `(dx, dy)` lies inside the disk.
    #[inline]
    pub fn contains(&self, dx: i32, dy: i32) -> bool {
        dx.abs() <= self.get(dy)
    }

    /// Number of pixels inside the disk.
    pub fn area(&self) -> i64 {
        let rest: i64 = self.arc[1..].iter().map(|&a| 2 * a as i64 + 1).sum();
        2 * self.arc[0] as i64 + 1 + 2 * rest
    }
}

/// The half table: `arc[d]` for signed `d` in `-size..=size`.
///
/// Built by walking the odd numbers down from `budget`, so each entry costs one square root of a
/// shrinking remainder instead of one subtraction of `d*d`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HalfArcTable {
    size: i32,
    arc: Vec<i32>,
}

impl HalfArcTable {
    /// Build the table for the squared-radius `budget`. Negative budgets act as zero.
    pub fn new(budget: i64) -> Self {
        let budget = budget.max(0);
        let size = isqrt(budget) as i32;
        let mut arc = vec![0; 2 * size as usize + 1];
        let center = size as usize;
        arc[center] = size;
        // budget - i*i, from i = 1 on: subtract 1, 3, 5, ...
        let (mut rest, mut odd) = (budget - 1, 3);
        let mut i = 1;
        while rest >= 0 && i <= size as usize {
            let a = isqrt(rest) as i32;
            arc[center + i] = a;
            arc[center - i] = a;
            rest -= odd;
            odd += 2;
            i += 1;
        }
        Self { size, arc }
    }

    /// The radius, `floor(sqrt(budget))`.
    #[inline]
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Half-chord at signed offset `d`.
    ///
    /// PRECONDITION: `|d| <= size`.
    #[inline]
    pub fn get(&self, d: i32) -> i32 {
        self.arc[(d + self.size) as usize]
    }

    /// The entries for `d` in `-size..=size`.
    pub fn as_slice(&self) -> &[i32] {
        &self.arc
    }

    /// Number of pixels inside the disk.
    pub fn area(&self) -> i64 {
        self.arc.iter().map(|&a| 2 * a as i64 + 1).sum()
    }
}
