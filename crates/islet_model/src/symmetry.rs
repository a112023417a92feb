//! Symmetry constraints: mirror pairs and self-symmetric modules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The orientation of a symmetry axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Members mirror left/right across a vertical line.
    Vertical,
    /// Members mirror bottom/top across a horizontal line.
    Horizontal,
}

impl Axis {
    /// Returns the other axis orientation.
    pub fn flipped(self) -> Axis {
        match self {
            Axis::Vertical => Axis::Horizontal,
            Axis::Horizontal => Axis::Vertical,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Vertical => write!(f, "Vertical"),
            Axis::Horizontal => write!(f, "Horizontal"),
        }
    }
}

/// A pair of distinct modules that must mirror each other across the group
/// axis. Both members must have identical original dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymmetryPair {
    /// First member name.
    pub a: String,
    /// Second member name.
    pub b: String,
}

impl SymmetryPair {
    /// Creates a pair.
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    /// The representative member: the lexicographically greater name.
    ///
    /// The choice is deterministic so that re-running the placer on the same
    /// input reproduces the same initial tree.
    pub fn representative(&self) -> &str {
        if self.a > self.b {
            &self.a
        } else {
            &self.b
        }
    }

    /// The non-representative member, produced by mirroring after packing.
    pub fn mirrored(&self) -> &str {
        if self.a > self.b {
            &self.b
        } else {
            &self.a
        }
    }

    /// Returns the partner of `name`, or `None` if `name` is not a member.
    pub fn partner_of(&self, name: &str) -> Option<&str> {
        if name == self.a {
            Some(&self.b)
        } else if name == self.b {
            Some(&self.a)
        } else {
            None
        }
    }

    /// Returns whether `name` is one of the two members.
    pub fn contains(&self, name: &str) -> bool {
        name == self.a || name == self.b
    }
}

/// A symmetry group: an axis, mirror pairs, and self-symmetric modules.
///
/// A module appears in at most one group. Self-symmetric modules straddle
/// the axis and are always their own representatives.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SymmetryGroup {
    /// Group name from the input file; also the HB*-tree node name.
    pub name: String,
    /// Axis orientation; flipped by the convert-symmetry-type perturbation.
    pub axis: Axis,
    /// Mirror pairs of distinct module names.
    pub pairs: Vec<SymmetryPair>,
    /// Self-symmetric module names.
    pub self_symmetric: Vec<String>,
}

impl SymmetryGroup {
    /// Creates an empty group with the given axis.
    pub fn new(name: impl Into<String>, axis: Axis) -> Self {
        Self {
            name: name.into(),
            axis,
            pairs: Vec::new(),
            self_symmetric: Vec::new(),
        }
    }

    /// Returns whether `name` belongs to this group (pair member or self-symmetric).
    pub fn contains(&self, name: &str) -> bool {
        self.self_symmetric.iter().any(|s| s == name)
            || self.pairs.iter().any(|p| p.contains(name))
    }

    /// Returns whether `name` is self-symmetric in this group.
    pub fn is_self_symmetric(&self, name: &str) -> bool {
        self.self_symmetric.iter().any(|s| s == name)
    }

    /// Iterates over all member names (pair members first, then self-symmetric).
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.pairs
            .iter()
            .flat_map(|p| [p.a.as_str(), p.b.as_str()])
            .chain(self.self_symmetric.iter().map(|s| s.as_str()))
    }

    /// Number of modules in the group.
    pub fn member_count(&self) -> usize {
        self.pairs.len() * 2 + self.self_symmetric.len()
    }

    /// Finds the pair containing `name`, if any.
    pub fn pair_of(&self, name: &str) -> Option<&SymmetryPair> {
        self.pairs.iter().find(|p| p.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_flip() {
        assert_eq!(Axis::Vertical.flipped(), Axis::Horizontal);
        assert_eq!(Axis::Horizontal.flipped(), Axis::Vertical);
        assert_eq!(Axis::Vertical.flipped().flipped(), Axis::Vertical);
    }

    #[test]
    fn representative_is_lexicographic_greater() {
        let p = SymmetryPair::new("inn", "inp");
        assert_eq!(p.representative(), "inp");
        assert_eq!(p.mirrored(), "inn");

        let q = SymmetryPair::new("b2", "a1");
        assert_eq!(q.representative(), "b2");
        assert_eq!(q.mirrored(), "a1");
    }

    #[test]
    fn partner_lookup() {
        let p = SymmetryPair::new("x", "y");
        assert_eq!(p.partner_of("x"), Some("y"));
        assert_eq!(p.partner_of("y"), Some("x"));
        assert_eq!(p.partner_of("z"), None);
    }

    #[test]
    fn group_membership() {
        let mut g = SymmetryGroup::new("sg1", Axis::Vertical);
        g.pairs.push(SymmetryPair::new("a", "b"));
        g.self_symmetric.push("c".to_string());

        assert!(g.contains("a"));
        assert!(g.contains("b"));
        assert!(g.contains("c"));
        assert!(!g.contains("d"));
        assert!(g.is_self_symmetric("c"));
        assert!(!g.is_self_symmetric("a"));
        assert_eq!(g.member_count(), 3);
    }

    #[test]
    fn member_names_cover_everything() {
        let mut g = SymmetryGroup::new("sg1", Axis::Horizontal);
        g.pairs.push(SymmetryPair::new("a", "b"));
        g.self_symmetric.push("c".to_string());
        let names: Vec<&str> = g.member_names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn pair_of_finds_pair() {
        let mut g = SymmetryGroup::new("sg1", Axis::Vertical);
        g.pairs.push(SymmetryPair::new("a", "b"));
        g.pairs.push(SymmetryPair::new("c", "d"));
        assert_eq!(g.pair_of("d").unwrap().a, "c");
        assert!(g.pair_of("x").is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let mut g = SymmetryGroup::new("sg1", Axis::Vertical);
        g.pairs.push(SymmetryPair::new("a", "b"));
        let json = serde_json::to_string(&g).unwrap();
        let back: SymmetryGroup = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "sg1");
        assert_eq!(back.axis, Axis::Vertical);
        assert_eq!(back.pairs.len(), 1);
    }
}
