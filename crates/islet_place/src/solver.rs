//! The placement solver facade.
//!
//! Wires the pieces together for the CLI: build the initial HB*-tree from
//! the parsed problem, run simulated annealing under the watchdog, keep
//! whichever of the initial and annealed solutions is better, and finalize
//! the result for the writer.

use crate::placement::anneal::{AnnealParams, AnnealStats, SimulatedAnnealing};
use crate::placement::cost::PlacementCost;
use crate::tree::hb::HbStarTree;
use crate::validate;
use islet_common::{InternalError, IsletResult, TimeoutFlag};
use islet_diagnostics::{Diagnostic, DiagnosticSink};
use islet_model::{Floorplan, SymmetryGroup};
use std::sync::{Arc, Mutex};

/// An independently serializable copy of the best solution found so far.
///
/// Published by the annealer on every improvement so the emergency
/// finalizer can write output without touching the live tree.
#[derive(Debug, Clone)]
pub struct BestSnapshot {
    /// Bounding-box area of the snapshot.
    pub area: i64,
    /// The placed modules.
    pub plan: Floorplan,
}

/// Everything the solver needs besides the problem itself.
#[derive(Debug, Clone, Copy)]
pub struct SolverOptions {
    /// Annealing schedule parameters.
    pub anneal: AnnealParams,
    /// Cost-function weights.
    pub cost: PlacementCost,
    /// Initial perturbation-operator probabilities, in operator order.
    pub probabilities: [f64; 5],
    /// RNG seed for reproducible runs.
    pub seed: u64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            anneal: AnnealParams::default(),
            cost: PlacementCost::default(),
            probabilities: [0.3, 0.3, 0.3, 0.05, 0.05],
            seed: 0,
        }
    }
}

/// The top-level placement solver.
pub struct PlacementSolver {
    options: SolverOptions,
    tree: Option<HbStarTree>,
    timeout: Option<TimeoutFlag>,
    snapshot_slot: Arc<Mutex<Option<BestSnapshot>>>,
    stats: Option<AnnealStats>,
    total_area: i64,
}

impl PlacementSolver {
    /// Creates a solver with the given options.
    pub fn new(options: SolverOptions) -> Self {
        Self {
            options,
            tree: None,
            timeout: None,
            snapshot_slot: Arc::new(Mutex::new(None)),
            stats: None,
            total_area: 0,
        }
    }

    /// Loads the problem and builds the initial HB*-tree.
    pub fn load_problem(
        &mut self,
        plan: Floorplan,
        groups: Vec<SymmetryGroup>,
    ) -> IsletResult<()> {
        self.tree = Some(HbStarTree::new(plan, groups)?);
        Ok(())
    }

    /// Installs the watchdog flag polled during the search.
    pub fn set_timeout_flag(&mut self, flag: TimeoutFlag) {
        self.timeout = Some(flag);
    }

    /// The shared slot the emergency finalizer reads the best snapshot from.
    pub fn snapshot_slot(&self) -> Arc<Mutex<Option<BestSnapshot>>> {
        Arc::clone(&self.snapshot_slot)
    }

    /// Runs the search: pack the initial tree, anneal, and keep the better
    /// of the two solutions.
    pub fn solve(&mut self, sink: &Arc<DiagnosticSink>) -> IsletResult<()> {
        let tree = self
            .tree
            .as_mut()
            .ok_or_else(|| InternalError::new("solve called before load_problem"))?;

        tree.pack(sink)?;
        let initial = tree.clone();
        let initial_area = tree.area();
        self.total_area = initial_area;
        {
            let mut guard = self.snapshot_slot.lock().unwrap();
            *guard = Some(BestSnapshot {
                area: initial_area,
                plan: initial.plan().clone(),
            });
        }

        // Nothing to search over, or the deadline already passed: the packed
        // initial tree is the answer.
        let trivial = initial.plan().module_count() < 2;
        let already_out = self.timeout.as_ref().is_some_and(|f| f.timed_out());
        if trivial || already_out {
            if already_out {
                sink.emit(Diagnostic::note(
                    "timeout reached before annealing started, keeping initial placement",
                ));
            }
            return Ok(());
        }

        let mut sa = SimulatedAnnealing::new(
            initial.clone(),
            self.options.anneal,
            self.options.cost,
            self.options.seed,
            Arc::clone(sink),
        )?;
        sa.set_perturbation_probabilities(self.options.probabilities);
        if let Some(flag) = &self.timeout {
            sa.set_timeout_flag(flag.clone());
        }
        sa.set_snapshot_slot(Arc::clone(&self.snapshot_slot));

        sa.run()?;
        self.stats = Some(sa.stats());
        let best = sa.into_best();

        // The annealer validates its best solution, but a repaired placement
        // can still lose to the untouched initial one.
        let keep_best = best.area() > 0 && (initial_area <= 0 || best.area() <= initial_area);
        if let Some(slot) = self.tree.as_mut() {
            if keep_best {
                self.total_area = best.area();
                *slot = best;
            } else {
                sink.emit(Diagnostic::note(
                    "initial placement was better than the annealed result, keeping it",
                ));
                self.total_area = initial_area;
                *slot = initial;
            }
        }
        Ok(())
    }

    /// Final cleanup before writing: repair any residual overlap, anchor the
    /// placement at the origin, and settle the reported area.
    pub fn finalize_solution(&mut self, sink: &DiagnosticSink) {
        let Some(tree) = self.tree.as_mut() else {
            self.total_area = 0;
            return;
        };
        let fixes = validate::fix_overlaps(tree.plan_mut(), sink);
        if fixes > 0 {
            tree.recompute_area(sink);
        }
        tree.plan_mut().normalize_origin();
        self.total_area = tree.plan().bounding_area();

        let mut guard = self.snapshot_slot.lock().unwrap();
        *guard = Some(BestSnapshot {
            area: self.total_area,
            plan: tree.plan().clone(),
        });
    }

    /// The solution's bounding-box area.
    pub fn area(&self) -> i64 {
        self.total_area
    }

    /// The placed modules of the solution.
    ///
    /// # Panics
    ///
    /// Panics if no problem was loaded.
    pub fn solution_plan(&self) -> &Floorplan {
        self.tree
            .as_ref()
            .map(|t| t.plan())
            .expect("no problem loaded")
    }

    /// Statistics from the annealing run, if one happened.
    pub fn stats(&self) -> Option<AnnealStats> {
        self.stats
    }
}
