//! Rectangles and region-of-interest math.
//!
//! A [`Rect`] describes the sub-area of the full image a consumer
//! currently needs rendered. The cache stage leans on
//! [`Rect::contains_rect`]: a cached image stays valid only while
//! every subsequently requested region fits inside the region it was
//! rendered for.
//!
//! # Coordinate System
//!
//! Standard image convention: origin (0, 0) at the top-left corner,
//! X increasing to the right, Y increasing downward. Left/top edges
//! are inclusive, right/bottom edges exclusive.

/// A rectangle defined by origin (x, y) and dimensions (width, height).
///
/// # Example
///
/// ```rust
/// use rawflow_core::Rect;
///
/// let rect = Rect::new(10, 20, 100, 50);
/// assert_eq!(rect.right(), 110);
/// assert_eq!(rect.bottom(), 70);
/// assert!(rect.contains(15, 25));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// X coordinate of the left edge (inclusive)
    pub x: u32,
    /// Y coordinate of the top edge (inclusive)
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Creates a new rectangle with the given origin and dimensions.
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle at origin (0, 0) with the given dimensions.
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Returns the X coordinate of the right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Returns the Y coordinate of the bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Returns the area of the rectangle in pixels.
    #[inline]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if the rectangle has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns `true` if the point (px, py) is inside this rectangle.
    #[inline]
    pub const fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Returns `true` if `other` lies entirely within this rectangle.
    ///
    /// An empty `other` is contained by anything. This is the cache
    /// validity test: a stored region satisfies a request only when
    /// the requested region is fully covered.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rawflow_core::Rect;
    ///
    /// let stored = Rect::new(0, 0, 200, 200);
    /// assert!(stored.contains_rect(&Rect::new(50, 50, 100, 100)));
    /// assert!(!stored.contains_rect(&Rect::new(150, 150, 100, 100)));
    /// ```
    #[inline]
    pub const fn contains_rect(&self, other: &Rect) -> bool {
        if other.is_empty() {
            return true;
        }
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns the intersection of two rectangles, or `None` if they
    /// do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x1 < x2 && y1 < y2 {
            Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
        } else {
            None
        }
    }

    /// Returns the smallest rectangle covering both inputs.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Clamps this rectangle to fit within `bounds`.
    ///
    /// Returns an empty rectangle when there is no overlap.
    pub fn clamped_to(&self, bounds: &Rect) -> Rect {
        self.intersect(bounds).unwrap_or_default()
    }
}
