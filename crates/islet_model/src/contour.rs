//! Skyline contour used during packing.
//!
//! A [`Contour`] tracks the top profile of the blocks placed so far as a
//! sorted vector of disjoint segments. Packing asks for the maximum height
//! over an x-interval to find the lowest legal y for the next block, then
//! inserts the block's top edge. Binary search keeps queries at O(log n);
//! inserts splice a small window of the vector.
//!
//! The same structure doubles as the vertical contour (x-extent per
//! y-interval); `start`/`end`/`height` are axis-agnostic.

use serde::{Deserialize, Serialize};

/// One horizontal run of the skyline: `[start, end)` at `height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContourSegment {
    /// Inclusive start coordinate.
    pub start: i32,
    /// Exclusive end coordinate; always greater than `start`.
    pub end: i32,
    /// Height of the profile over `[start, end)`.
    pub height: i32,
}

impl ContourSegment {
    /// Creates a segment.
    pub fn new(start: i32, end: i32, height: i32) -> Self {
        Self { start, end, height }
    }
}

/// A 1-D skyline of placed blocks.
///
/// Invariants after every public mutation: segments are sorted by `start`,
/// pairwise disjoint, and no two contiguous segments share a height.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Contour {
    segments: Vec<ContourSegment>,
    max_coordinate: i32,
    max_height: i32,
}

impl Contour {
    /// Creates an empty contour.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all segments and resets the running maxima.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.max_coordinate = 0;
        self.max_height = 0;
    }

    /// Inserts `[start, end)` at `height`, clipping or replacing whatever the
    /// interval overlaps so the new height applies to the whole interval.
    ///
    /// Contiguous same-height neighbors are coalesced. A degenerate interval
    /// (`start >= end`) is ignored.
    pub fn add_segment(&mut self, start: i32, end: i32, height: i32) {
        if start >= end {
            return;
        }
        self.max_coordinate = self.max_coordinate.max(end);
        self.max_height = self.max_height.max(height);

        // First segment reaching past `start`, first segment starting at or
        // past `end`: everything in between overlaps the new interval.
        let lo = self.segments.partition_point(|s| s.end <= start);
        let hi = self.segments.partition_point(|s| s.start < end);

        let mut replacement = Vec::with_capacity(3);
        if lo < hi && self.segments[lo].start < start {
            let s = self.segments[lo];
            replacement.push(ContourSegment::new(s.start, start, s.height));
        }
        replacement.push(ContourSegment::new(start, end, height));
        if lo < hi && self.segments[hi - 1].end > end {
            let s = self.segments[hi - 1];
            replacement.push(ContourSegment::new(end, s.end, s.height));
        }

        self.segments.splice(lo..hi, replacement);
        self.coalesce_around(lo);
    }

    /// Merges contiguous equal-height segments in a small window around the
    /// splice point.
    fn coalesce_around(&mut self, index: usize) {
        let mut i = index.saturating_sub(1);
        while i + 1 < self.segments.len() {
            if i > index + 3 {
                break;
            }
            let (a, b) = (self.segments[i], self.segments[i + 1]);
            if a.end == b.start && a.height == b.height {
                self.segments[i].end = b.end;
                self.segments.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    /// Maximum height over segments overlapping `[start, end)`, or 0 if none.
    pub fn get_height(&self, start: i32, end: i32) -> i32 {
        if start >= end || self.segments.is_empty() {
            return 0;
        }
        let lo = self.segments.partition_point(|s| s.end <= start);
        let mut height = 0;
        for s in &self.segments[lo..] {
            if s.start >= end {
                break;
            }
            height = height.max(s.height);
        }
        height
    }

    /// The ordered segment list.
    pub fn segments(&self) -> &[ContourSegment] {
        &self.segments
    }

    /// Point-wise maximum merge with another contour.
    ///
    /// The result covers every coordinate covered by either input, at the
    /// greater of the two heights.
    pub fn merge(&mut self, other: &Contour) {
        if other.segments.is_empty() {
            return;
        }
        if self.segments.is_empty() {
            *self = other.clone();
            return;
        }

        let mut bounds: Vec<i32> = self
            .segments
            .iter()
            .chain(other.segments.iter())
            .flat_map(|s| [s.start, s.end])
            .collect();
        bounds.sort_unstable();
        bounds.dedup();

        let mut merged = Contour::new();
        for win in bounds.windows(2) {
            let (a, b) = (win[0], win[1]);
            let ours = self.cover_at(a);
            let theirs = other.cover_at(a);
            let height = match (ours, theirs) {
                (Some(h1), Some(h2)) => Some(h1.max(h2)),
                (Some(h), None) | (None, Some(h)) => Some(h),
                (None, None) => None,
            };
            if let Some(h) = height {
                merged.add_segment(a, b, h);
            }
        }

        merged.max_coordinate = self.max_coordinate.max(other.max_coordinate);
        merged.max_height = self.max_height.max(other.max_height);
        *self = merged;
    }

    /// Height of the segment covering `x`, or `None` if no segment covers it.
    fn cover_at(&self, x: i32) -> Option<i32> {
        let lo = self.segments.partition_point(|s| s.end <= x);
        let s = self.segments.get(lo)?;
        (s.start <= x).then_some(s.height)
    }

    /// The largest `end` coordinate ever inserted (reset by [`clear`](Self::clear)).
    pub fn max_coordinate(&self) -> i32 {
        self.max_coordinate
    }

    /// The largest height ever inserted (reset by [`clear`](Self::clear)).
    pub fn max_height(&self) -> i32 {
        self.max_height
    }

    /// Returns `true` if the contour has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Checks the structural invariants; used by debug assertions and tests.
    pub fn check_invariants(&self) -> bool {
        self.segments.windows(2).all(|w| {
            w[0].start < w[0].end
                && w[0].end <= w[1].start
                && !(w[0].end == w[1].start && w[0].height == w[1].height)
        }) && self.segments.iter().all(|s| s.start < s.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_contour() {
        let c = Contour::new();
        assert!(c.is_empty());
        assert_eq!(c.get_height(0, 100), 0);
        assert_eq!(c.max_coordinate(), 0);
        assert_eq!(c.max_height(), 0);
    }

    #[test]
    fn degenerate_insert_is_noop() {
        let mut c = Contour::new();
        c.add_segment(5, 5, 10);
        c.add_segment(7, 3, 10);
        assert!(c.is_empty());
    }

    #[test]
    fn single_segment() {
        let mut c = Contour::new();
        c.add_segment(0, 4, 3);
        assert_eq!(c.segments(), &[ContourSegment::new(0, 4, 3)]);
        assert_eq!(c.get_height(0, 4), 3);
        assert_eq!(c.get_height(4, 8), 0);
        assert!(c.check_invariants());
    }

    #[test]
    fn insert_covers_height_query() {
        let mut c = Contour::new();
        c.add_segment(2, 6, 5);
        assert!(c.get_height(2, 6) >= 5);
        assert!(c.get_height(0, 3) >= 5);
        assert_eq!(c.get_height(0, 2), 0);
    }

    #[test]
    fn overlapping_insert_clips_left_and_right() {
        let mut c = Contour::new();
        c.add_segment(0, 10, 2);
        c.add_segment(3, 7, 9);
        assert_eq!(
            c.segments(),
            &[
                ContourSegment::new(0, 3, 2),
                ContourSegment::new(3, 7, 9),
                ContourSegment::new(7, 10, 2),
            ]
        );
        assert!(c.check_invariants());
        assert_eq!(c.get_height(0, 3), 2);
        assert_eq!(c.get_height(3, 7), 9);
        assert_eq!(c.get_height(0, 10), 9);
    }

    #[test]
    fn insert_replaces_fully_covered_segments() {
        let mut c = Contour::new();
        c.add_segment(0, 2, 1);
        c.add_segment(2, 4, 7);
        c.add_segment(4, 6, 3);
        c.add_segment(1, 5, 4);
        assert_eq!(
            c.segments(),
            &[
                ContourSegment::new(0, 1, 1),
                ContourSegment::new(1, 5, 4),
                ContourSegment::new(5, 6, 3),
            ]
        );
        assert!(c.check_invariants());
    }

    #[test]
    fn adjacent_same_height_coalesce() {
        let mut c = Contour::new();
        c.add_segment(0, 3, 4);
        c.add_segment(3, 6, 4);
        assert_eq!(c.segments(), &[ContourSegment::new(0, 6, 4)]);

        c.add_segment(6, 9, 2);
        assert_eq!(c.segments().len(), 2);
        assert!(c.check_invariants());
    }

    #[test]
    fn gap_prevents_coalescing() {
        let mut c = Contour::new();
        c.add_segment(0, 2, 4);
        c.add_segment(5, 7, 4);
        assert_eq!(c.segments().len(), 2);
        assert_eq!(c.get_height(2, 5), 0);
    }

    #[test]
    fn running_maxima() {
        let mut c = Contour::new();
        c.add_segment(0, 10, 3);
        c.add_segment(2, 4, 8);
        assert_eq!(c.max_coordinate(), 10);
        assert_eq!(c.max_height(), 8);
        c.clear();
        assert_eq!(c.max_coordinate(), 0);
        assert_eq!(c.max_height(), 0);
    }

    #[test]
    fn merge_takes_pointwise_max() {
        let mut a = Contour::new();
        a.add_segment(0, 4, 2);
        a.add_segment(4, 8, 6);

        let mut b = Contour::new();
        b.add_segment(2, 6, 4);

        a.merge(&b);
        assert!(a.check_invariants());
        assert_eq!(a.get_height(0, 2), 2);
        assert_eq!(a.get_height(2, 4), 4);
        assert_eq!(a.get_height(4, 8), 6);
    }

    #[test]
    fn merge_covers_disjoint_regions() {
        let mut a = Contour::new();
        a.add_segment(0, 2, 1);
        let mut b = Contour::new();
        b.add_segment(5, 8, 3);
        a.merge(&b);
        assert_eq!(a.get_height(0, 2), 1);
        assert_eq!(a.get_height(5, 8), 3);
        assert_eq!(a.get_height(2, 5), 0);
        assert_eq!(a.max_coordinate(), 8);
    }

    #[test]
    fn merge_into_empty_copies() {
        let mut a = Contour::new();
        let mut b = Contour::new();
        b.add_segment(1, 3, 2);
        a.merge(&b);
        assert_eq!(a.segments(), b.segments());
    }

    #[test]
    fn packing_pattern() {
        // Place three blocks the way the packer does: query then insert top.
        let mut c = Contour::new();
        c.add_segment(0, i32::MAX, 0);

        // 4x2 block at x=0
        let y = c.get_height(0, 4);
        assert_eq!(y, 0);
        c.add_segment(0, 4, y + 2);

        // 3x5 block at x=4
        let y = c.get_height(4, 7);
        assert_eq!(y, 0);
        c.add_segment(4, 7, y + 5);

        // 6x1 block at x=0 lands on top of the first two
        let y = c.get_height(0, 6);
        assert_eq!(y, 5);
        c.add_segment(0, 6, y + 1);

        assert!(c.check_invariants());
        assert_eq!(c.get_height(0, 6), 6);
        assert_eq!(c.get_height(6, 7), 5);
    }
}
