//! Core data model for the Islet analog placer.
//!
//! Defines the geometric and constraint-side vocabulary shared by the whole
//! toolchain: rectangular [`Module`]s, mirror-[`SymmetryGroup`]s, the
//! [`Floorplan`] catalog that owns all modules, and the [`Contour`] skyline
//! used during packing.

#![warn(missing_docs)]

pub mod contour;
pub mod floorplan;
pub mod ids;
pub mod module;
pub mod symmetry;

pub use contour::{Contour, ContourSegment};
pub use floorplan::Floorplan;
pub use ids::{GroupId, ModuleId};
pub use module::Module;
pub use symmetry::{Axis, SymmetryGroup, SymmetryPair};
