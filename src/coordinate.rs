//! Coordinate value types shared by every layer.
//!
//! A *position* is an offset into one layer's current visible ordering and is
//! only meaningful relative to that layer. An *index* identifies a row or
//! column in the underlying data and survives reordering.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Offset into a layer's visible ordering (`0..count`).
pub type Position = usize;

/// Stable identity of a row or column in the data source.
pub type Index = usize;

/// Pixel offset or extent.
pub type Pixel = i32;

/// The two dimensions of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal dimension (columns, x, width)
    Column,
    /// Vertical dimension (rows, y, height)
    Row,
}

impl Axis {
    /// Both axes, columns first.
    pub const ALL: [Axis; 2] = [Axis::Column, Axis::Row];

    /// The perpendicular axis.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Column => Self::Row,
            Self::Row => Self::Column,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column => f.write_str("column"),
            Self::Row => f.write_str("row"),
        }
    }
}

/// Half-open range of positions `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Create a range; an inverted range collapses to empty at `start`.
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Range covering exactly one position.
    #[must_use]
    pub fn single(position: Position) -> Self {
        Self::new(position, position + 1)
    }

    /// Empty range marking an insertion point.
    #[must_use]
    pub fn empty_at(position: Position) -> Self {
        Self::new(position, position)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, position: Position) -> bool {
        position >= self.start && position < self.end
    }

    /// Overlapping part of two ranges, `None` when they are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &Range) -> Option<Range> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Range { start, end })
    }

    /// Range moved up by `delta` positions.
    #[must_use]
    pub fn offset(&self, delta: usize) -> Range {
        Range::new(self.start + delta, self.end + delta)
    }

    pub fn iter(&self) -> std::ops::Range<Position> {
        self.start..self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Sort, de-duplicate and group positions into maximal contiguous ranges.
pub fn group_contiguous(positions: impl IntoIterator<Item = Position>) -> Vec<Range> {
    let mut sorted: Vec<Position> = positions.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<Range> = Vec::new();
    for position in sorted {
        if let Some(last) = ranges.last_mut() {
            if last.end == position {
                last.end += 1;
                continue;
            }
        }
        ranges.push(Range::single(position));
    }
    ranges
}

/// Sorted, disjoint union of `ranges`; overlapping or touching ranges merge.
pub fn merge_ranges(ranges: impl IntoIterator<Item = Range>) -> Vec<Range> {
    let mut sorted: Vec<Range> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
    sorted.sort_unstable_by_key(|r| r.start);

    let mut merged: Vec<Range> = Vec::with_capacity(sorted.len());
    for range in sorted {
        if let Some(last) = merged.last_mut() {
            if range.start <= last.end {
                last.end = last.end.max(range.end);
                continue;
            }
        }
        merged.push(range);
    }
    merged
}

/// Smallest range covering every range in the list.
pub fn bounding_range(ranges: &[Range]) -> Option<Range> {
    let start = ranges.iter().map(|r| r.start).min()?;
    let end = ranges.iter().map(|r| r.end).max()?;
    Some(Range::new(start, end))
}

/// Pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: Pixel,
    pub y: Pixel,
    pub width: Pixel,
    pub height: Pixel,
}

impl Rectangle {
    #[must_use]
    pub const fn new(x: Pixel, y: Pixel, width: Pixel, height: Pixel) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Start coordinate along `axis` (x for columns, y for rows).
    pub fn origin(&self, axis: Axis) -> Pixel {
        match axis {
            Axis::Column => self.x,
            Axis::Row => self.y,
        }
    }

    /// Extent along `axis` (width for columns, height for rows).
    pub fn extent(&self, axis: Axis) -> Pixel {
        match axis {
            Axis::Column => self.width,
            Axis::Row => self.height,
        }
    }

    pub fn contains(&self, x: Pixel, y: Pixel) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }

    /// Overlap of two rectangles; empty rectangles have zero extent.
    #[must_use]
    pub fn intersection(&self, other: &Rectangle) -> Rectangle {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);
        Rectangle::new(x, y, (right - x).max(0), (bottom - y).max(0))
    }
}

/// Saturating conversion of a count into pixel space.
pub fn to_pixel(value: usize) -> Pixel {
    Pixel::try_from(value).unwrap_or(Pixel::MAX)
}

/// Find the position containing `pixel` (binary search).
///
/// `start_of(p)` must be monotonically non-decreasing and `start_of(count)`
/// must be the total extent. Zero-sized elements never contain a pixel.
pub fn position_by_pixel(
    pixel: Pixel,
    count: usize,
    start_of: impl Fn(Position) -> Pixel,
) -> Option<Position> {
    if pixel < 0 || count == 0 || pixel < start_of(0) || pixel >= start_of(count) {
        return None;
    }
    // Largest position whose start is <= pixel
    let (mut low, mut high) = (0, count);
    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if start_of(mid) <= pixel {
            low = mid;
        } else {
            high = mid;
        }
    }
    Some(low)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_group_contiguous() {
        let ranges = group_contiguous([5, 1, 2, 3, 2, 8, 9]);
        assert_eq!(
            ranges,
            vec![Range::new(1, 4), Range::new(5, 6), Range::new(8, 10)]
        );
        assert!(group_contiguous([]).is_empty());
    }

    #[test]
    fn test_merge_ranges() {
        let merged = merge_ranges([
            Range::new(8, 10),
            Range::new(1, 3),
            Range::new(2, 5),
            Range::new(5, 6),
            Range::empty_at(20),
        ]);
        assert_eq!(merged, vec![Range::new(1, 6), Range::new(8, 10)]);
        assert!(merge_ranges([]).is_empty());
    }

    #[test]
    fn test_range_basics() {
        let r = Range::new(3, 7);
        assert_eq!(r.len(), 4);
        assert!(r.contains(3));
        assert!(!r.contains(7));
        assert_eq!(r.intersection(&Range::new(5, 10)), Some(Range::new(5, 7)));
        assert_eq!(r.intersection(&Range::new(7, 10)), None);
        assert!(Range::new(4, 2).is_empty());
        assert_eq!(r.offset(2), Range::new(5, 9));
    }

    #[test]
    fn test_position_by_pixel_uniform() {
        let start = |p: Position| to_pixel(p) * 10;
        assert_eq!(position_by_pixel(0, 5, start), Some(0));
        assert_eq!(position_by_pixel(9, 5, start), Some(0));
        assert_eq!(position_by_pixel(10, 5, start), Some(1));
        assert_eq!(position_by_pixel(49, 5, start), Some(4));
        assert_eq!(position_by_pixel(50, 5, start), None);
        assert_eq!(position_by_pixel(-1, 5, start), None);
        assert_eq!(position_by_pixel(0, 0, start), None);
    }

    #[test]
    fn test_position_by_pixel_skips_zero_sized() {
        // sizes [10, 0, 10]
        let starts = [0, 10, 10, 20];
        let start = |p: Position| starts[p];
        assert_eq!(position_by_pixel(10, 3, start), Some(2));
        assert_eq!(position_by_pixel(9, 3, start), Some(0));
    }

    #[test]
    fn test_rectangle_intersection() {
        let a = Rectangle::new(0, 0, 100, 50);
        let b = Rectangle::new(40, 20, 100, 100);
        assert_eq!(a.intersection(&b), Rectangle::new(40, 20, 60, 30));
        assert_eq!(a.extent(Axis::Row), 50);
        assert!(a.contains(99, 49));
        assert!(!a.contains(100, 0));
    }
}
