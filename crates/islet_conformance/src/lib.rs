//! Conformance test helpers for the Islet placer.
//!
//! Provides a shared pipeline function that parses problem text, runs the
//! full solver (build trees → anneal → finalize), and returns a structured
//! result for assertion in integration tests.

#![warn(missing_docs)]

use islet_diagnostics::{Diagnostic, DiagnosticSink};
use islet_model::Floorplan;
use islet_place::{AnnealParams, PlacementCost, PlacementSolver, SolverOptions};
use std::sync::Arc;

/// Result of running the parse → solve → finalize pipeline.
pub struct PlacementResult {
    /// The finalized placement.
    pub plan: Floorplan,
    /// The reported bounding-box area.
    pub area: i64,
    /// All diagnostics emitted during the run.
    pub diagnostics: Vec<Diagnostic>,
}

impl PlacementResult {
    /// Looks up a placed module's `(x, y, rotated)` by name.
    pub fn module(&self, name: &str) -> (i32, i32, bool) {
        let id = self.plan.id_of(name).unwrap_or_else(|| {
            panic!("module '{name}' missing from result");
        });
        let m = &self.plan[id];
        (m.x, m.y, m.rotated())
    }

    /// Asserts that no two modules overlap.
    pub fn assert_no_overlaps(&self) {
        let modules: Vec<_> = self.plan.modules().collect();
        for (i, a) in modules.iter().enumerate() {
            for b in &modules[i + 1..] {
                assert!(
                    !a.overlaps(b),
                    "{} at ({},{}) {}x{} overlaps {} at ({},{}) {}x{}",
                    a.name,
                    a.x,
                    a.y,
                    a.width(),
                    a.height(),
                    b.name,
                    b.x,
                    b.y,
                    b.width(),
                    b.height()
                );
            }
        }
    }

    /// Asserts that every coordinate is non-negative.
    pub fn assert_non_negative(&self) {
        for m in self.plan.modules() {
            assert!(m.x >= 0 && m.y >= 0, "{} at ({},{})", m.name, m.x, m.y);
        }
    }
}

/// Annealing parameters small enough for fast deterministic tests.
pub fn test_params() -> AnnealParams {
    AnnealParams {
        initial_temperature: 200.0,
        final_temperature: 5.0,
        cooling_rate: 0.6,
        moves_per_temperature: 60,
        no_improvement_limit: 3,
        min_initial_temperature: 10.0,
        max_initial_temperature: 2000.0,
    }
}

/// Parses problem text and runs the full solver with a fixed seed.
pub fn solve_text(input: &str, seed: u64) -> PlacementResult {
    solve_text_weighted(input, seed, 1.0)
}

/// Like [`solve_text`], with an explicit area-ratio weight.
pub fn solve_text_weighted(input: &str, seed: u64, area_ratio: f64) -> PlacementResult {
    let sink = Arc::new(DiagnosticSink::new());
    let (plan, groups) = islet_io::parse_problem_str(input, &sink).expect("input parses");

    let mut solver = PlacementSolver::new(SolverOptions {
        anneal: test_params(),
        cost: PlacementCost::from_area_ratio(area_ratio),
        seed,
        ..SolverOptions::default()
    });
    solver.load_problem(plan, groups).expect("problem loads");
    solver.solve(&sink).expect("solver runs");
    solver.finalize_solution(&sink);

    PlacementResult {
        area: solver.area(),
        plan: solver.solution_plan().clone(),
        diagnostics: sink.take_all(),
    }
}
