//! Rigid rectangular placement modules.

use crate::ids::ModuleId;
use serde::{Deserialize, Serialize};

/// A rigid rectangular block to be placed.
///
/// The original dimensions `(w0, h0)` never change; a 90° rotation only
/// toggles the [`rotated`](Self::rotated) flag and the effective
/// [`width`](Self::width)/[`height`](Self::height) swap accordingly.
/// Coordinates are assigned by packing and are always non-negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// The unique ID of this module in the floorplan catalog.
    pub id: ModuleId,
    /// Human-readable module name from the input file.
    pub name: String,
    /// Original width before any rotation.
    w0: i32,
    /// Original height before any rotation.
    h0: i32,
    /// Whether the module is rotated 90°.
    rotated: bool,
    /// Placed lower-left x (0 before the first pack).
    pub x: i32,
    /// Placed lower-left y (0 before the first pack).
    pub y: i32,
}

impl Module {
    /// Creates an unplaced, unrotated module.
    pub fn new(name: impl Into<String>, w0: i32, h0: i32) -> Self {
        Self {
            id: ModuleId::from_raw(0),
            name: name.into(),
            w0,
            h0,
            rotated: false,
            x: 0,
            y: 0,
        }
    }

    /// Effective width under the current orientation.
    pub fn width(&self) -> i32 {
        if self.rotated {
            self.h0
        } else {
            self.w0
        }
    }

    /// Effective height under the current orientation.
    pub fn height(&self) -> i32 {
        if self.rotated {
            self.w0
        } else {
            self.h0
        }
    }

    /// Original width, ignoring rotation.
    pub fn original_width(&self) -> i32 {
        self.w0
    }

    /// Original height, ignoring rotation.
    pub fn original_height(&self) -> i32 {
        self.h0
    }

    /// Area in square units; invariant under rotation.
    pub fn area(&self) -> i64 {
        self.w0 as i64 * self.h0 as i64
    }

    /// Returns whether the module is rotated 90°.
    pub fn rotated(&self) -> bool {
        self.rotated
    }

    /// Toggles the 90° rotation flag.
    ///
    /// Coordinates are left untouched; the next pack recomputes them.
    pub fn rotate(&mut self) {
        self.rotated = !self.rotated;
    }

    /// Sets the rotation flag to an explicit value (used by the mirror pass).
    pub fn set_rotated(&mut self, rotated: bool) {
        self.rotated = rotated;
    }

    /// Places the lower-left corner, clamping negative coordinates to zero.
    pub fn set_position(&mut self, x: i32, y: i32) {
        self.x = x.max(0);
        self.y = y.max(0);
    }

    /// The x-coordinate of the right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width()
    }

    /// The y-coordinate of the top edge.
    pub fn top(&self) -> i32 {
        self.y + self.height()
    }

    /// Axis-aligned overlap test against another module.
    pub fn overlaps(&self, other: &Module) -> bool {
        if self.right() <= other.x || other.right() <= self.x {
            return false;
        }
        if self.top() <= other.y || other.top() <= self.y {
            return false;
        }
        true
    }

    /// Area of the overlap region, 0 when disjoint.
    pub fn overlap_area(&self, other: &Module) -> i64 {
        if !self.overlaps(other) {
            return 0;
        }
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.top().min(other.top()) - self.y.max(other.y);
        w as i64 * h as i64
    }

    /// Manhattan distance between the nearest edges; 0 when overlapping.
    pub fn distance(&self, other: &Module) -> i32 {
        if self.overlaps(other) {
            return 0;
        }
        let dx = if self.right() <= other.x {
            other.x - self.right()
        } else if other.right() <= self.x {
            self.x - other.right()
        } else {
            0
        };
        let dy = if self.top() <= other.y {
            other.y - self.top()
        } else if other.top() <= self.y {
            self.y - other.top()
        } else {
            0
        };
        dx + dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_dimensions_follow_rotation() {
        let mut m = Module::new("A", 4, 2);
        assert_eq!(m.width(), 4);
        assert_eq!(m.height(), 2);
        m.rotate();
        assert_eq!(m.width(), 2);
        assert_eq!(m.height(), 4);
        assert_eq!(m.original_width(), 4);
        assert_eq!(m.original_height(), 2);
    }

    #[test]
    fn rotate_twice_is_identity() {
        let mut m = Module::new("A", 3, 5);
        m.rotate();
        m.rotate();
        assert!(!m.rotated());
        assert_eq!(m.width(), 3);
        assert_eq!(m.height(), 5);
    }

    #[test]
    fn area_invariant_under_rotation() {
        let mut m = Module::new("A", 3, 5);
        let before = m.area();
        m.rotate();
        assert_eq!(m.area(), before);
    }

    #[test]
    fn set_position_clamps_negative() {
        let mut m = Module::new("A", 1, 1);
        m.set_position(-3, 7);
        assert_eq!((m.x, m.y), (0, 7));
        m.set_position(2, -1);
        assert_eq!((m.x, m.y), (2, 0));
    }

    #[test]
    fn overlap_detection() {
        let mut a = Module::new("A", 4, 4);
        let mut b = Module::new("B", 4, 4);
        a.set_position(0, 0);
        b.set_position(2, 2);
        assert!(a.overlaps(&b));
        assert_eq!(a.overlap_area(&b), 4);

        b.set_position(4, 0);
        assert!(!a.overlaps(&b));
        assert_eq!(a.overlap_area(&b), 0);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let mut a = Module::new("A", 2, 3);
        let mut b = Module::new("B", 2, 3);
        a.set_position(0, 0);
        b.set_position(2, 0);
        assert!(!a.overlaps(&b));
        assert_eq!(a.distance(&b), 0);
    }

    #[test]
    fn manhattan_distance() {
        let mut a = Module::new("A", 2, 2);
        let mut b = Module::new("B", 2, 2);
        a.set_position(0, 0);
        b.set_position(5, 6);
        assert_eq!(a.distance(&b), (5 - 2) + (6 - 2));
    }

    #[test]
    fn edges() {
        let mut m = Module::new("A", 3, 2);
        m.set_position(1, 4);
        assert_eq!(m.right(), 4);
        assert_eq!(m.top(), 6);
    }

    #[test]
    fn serde_roundtrip() {
        let mut m = Module::new("opamp", 6, 3);
        m.rotate();
        m.set_position(10, 20);
        let json = serde_json::to_string(&m).unwrap();
        let back: Module = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "opamp");
        assert!(back.rotated());
        assert_eq!((back.x, back.y), (10, 20));
        assert_eq!(back.width(), 3);
    }
}
