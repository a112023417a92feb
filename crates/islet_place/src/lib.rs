//! Placement engine for the Islet analog placer.
//!
//! This crate takes a parsed [`Floorplan`](islet_model::Floorplan) plus its
//! symmetry groups and finds non-overlapping integer positions and
//! orientations that minimize the bounding-box area, honoring every mirror
//! constraint exactly. The encoding is hierarchical:
//!
//! 1. **ASF-B*-tree** — one per symmetry group, built from *representative*
//!    modules only; packing it and running a mirror pass yields a symmetric
//!    island by construction.
//! 2. **HB*-tree** — the outer tree composing non-symmetric modules and the
//!    symmetry islands, with contour nodes exposing each island's skyline.
//! 3. **Simulated annealing** — perturbs both trees (rotate / relocate /
//!    swap / change-representative / convert-symmetry-type) under an
//!    adaptive operator schedule until the temperature floor or the
//!    watchdog ends the search.
//!
//! The [`PlacementSolver`] facade wires the pieces together:
//!
//! ```ignore
//! let mut solver = PlacementSolver::new(options);
//! solver.load_problem(floorplan, groups)?;
//! solver.solve(&sink)?;
//! solver.finalize_solution(&sink);
//! writer::write_placement(path, solver.solution_plan(), solver.area())?;
//! ```

#![warn(missing_docs)]

pub mod placement;
pub mod solver;
pub mod tree;
pub mod validate;

pub use placement::adaptive::AdaptivePerturbation;
pub use placement::anneal::{AnnealParams, AnnealStats, SimulatedAnnealing};
pub use placement::cost::PlacementCost;
pub use placement::moves::{Move, MoveKind, MovePool};
pub use solver::{BestSnapshot, PlacementSolver, SolverOptions};
pub use tree::asf::AsfBStarTree;
pub use tree::hb::HbStarTree;
