//! Simulated annealing over the HB*-tree.
//!
//! Starting from the packed initial tree, the annealer repeatedly proposes a
//! perturbation, repacks, and accepts or rejects the move with the
//! Metropolis criterion. The temperature falls geometrically, with an extra
//! halving after a run of stagnant levels; the search ends at the
//! temperature floor or when the watchdog flag fires, whichever comes first.
//! The best tree seen so far is kept as a deep clone and republished to a
//! shared snapshot slot so the emergency finalizer can serialize it at any
//! moment.

use crate::placement::adaptive::AdaptivePerturbation;
use crate::placement::cost::{star_wirelength, PlacementCost};
use crate::placement::moves::{MoveId, MoveKind, MovePool};
use crate::solver::BestSnapshot;
use crate::tree::hb::HbStarTree;
use crate::validate;
use islet_common::{IsletResult, TimeoutFlag};
use islet_diagnostics::{Diagnostic, DiagnosticSink};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Number of random moves sampled to derive the starting temperature.
const TEMPERATURE_SAMPLES: usize = 500;

/// Target acceptance probability for an average uphill move at the start.
const INITIAL_ACCEPTANCE: f64 = 0.8;

/// Iterations between adaptive-probability updates.
const ADAPT_INTERVAL: u64 = 100;

/// Iterations between watchdog polls inside a temperature level.
const TIMEOUT_POLL_INTERVAL: u32 = 100;

/// Extra cooling factor applied after a stagnant streak.
const STAGNATION_COOLING: f64 = 0.5;

/// Tunable parameters of the annealing schedule.
#[derive(Debug, Clone, Copy)]
pub struct AnnealParams {
    /// Fallback starting temperature when sampling finds no usable deltas.
    pub initial_temperature: f64,
    /// The loop ends when the temperature falls to or below this value.
    pub final_temperature: f64,
    /// Geometric cooling factor per level.
    pub cooling_rate: f64,
    /// Moves proposed per temperature level.
    pub moves_per_temperature: u32,
    /// Stagnant levels tolerated before the extra cooling kicks in.
    pub no_improvement_limit: u32,
    /// Lower clamp for the sampled starting temperature.
    pub min_initial_temperature: f64,
    /// Upper clamp for the sampled starting temperature.
    pub max_initial_temperature: f64,
}

impl Default for AnnealParams {
    fn default() -> Self {
        Self {
            initial_temperature: 1000.0,
            final_temperature: 1.0,
            cooling_rate: 0.85,
            moves_per_temperature: 250,
            no_improvement_limit: 3,
            min_initial_temperature: 100.0,
            max_initial_temperature: 10_000.0,
        }
    }
}

/// Counters describing a finished annealing run.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnealStats {
    /// Moves proposed across all levels.
    pub total_iterations: u64,
    /// Accepted moves.
    pub accepted_moves: u64,
    /// Rejected (undone) moves.
    pub rejected_moves: u64,
    /// Accepted moves that did not improve on the best solution.
    pub no_improvement_count: u64,
}

struct LevelOutcome {
    improved: bool,
    timed_out: bool,
}

/// The annealing search state.
pub struct SimulatedAnnealing {
    current: HbStarTree,
    best: HbStarTree,
    current_cost: i64,
    best_cost: i64,
    params: AnnealParams,
    cost_fn: PlacementCost,
    rng: StdRng,
    adaptive: AdaptivePerturbation,
    pool: MovePool,
    accepted_history: Vec<MoveId>,
    stats: AnnealStats,
    temperature: f64,
    timeout: Option<TimeoutFlag>,
    snapshot_slot: Option<Arc<Mutex<Option<BestSnapshot>>>>,
    sink: Arc<DiagnosticSink>,
}

impl SimulatedAnnealing {
    /// Packs the initial tree, snapshots it as the best-so-far, and samples
    /// the starting temperature.
    pub fn new(
        mut initial: HbStarTree,
        params: AnnealParams,
        cost_fn: PlacementCost,
        seed: u64,
        sink: Arc<DiagnosticSink>,
    ) -> IsletResult<Self> {
        initial.pack(&sink)?;
        let current_cost = cost_fn.cost(initial.area(), star_wirelength(initial.plan()));
        let best = initial.clone();

        let mut sa = Self {
            current: initial,
            best,
            current_cost,
            best_cost: current_cost,
            params,
            cost_fn,
            rng: StdRng::seed_from_u64(seed),
            adaptive: AdaptivePerturbation::new(),
            pool: MovePool::new(),
            accepted_history: Vec::new(),
            stats: AnnealStats::default(),
            temperature: params.initial_temperature,
            timeout: None,
            snapshot_slot: None,
            sink,
        };
        sa.initialize_temperature()?;
        Ok(sa)
    }

    /// Installs the watchdog flag the loop polls.
    pub fn set_timeout_flag(&mut self, flag: TimeoutFlag) {
        self.timeout = Some(flag);
    }

    /// Installs the shared slot that receives every new best snapshot.
    pub fn set_snapshot_slot(&mut self, slot: Arc<Mutex<Option<BestSnapshot>>>) {
        self.snapshot_slot = Some(slot);
        self.publish_best();
    }

    /// Overrides the initial operator probabilities.
    pub fn set_perturbation_probabilities(&mut self, probs: [f64; 5]) {
        self.adaptive = AdaptivePerturbation::with_probabilities(probs);
    }

    /// The best cost found so far.
    pub fn best_cost(&self) -> i64 {
        self.best_cost
    }

    /// The run statistics so far.
    pub fn stats(&self) -> AnnealStats {
        self.stats
    }

    /// Per-operator statistic rows for verbose reporting.
    pub fn operator_stats(&self) -> Vec<(&'static str, u64, u64)> {
        self.adaptive.stat_rows()
    }

    /// Consumes the annealer, returning the best tree found.
    pub fn into_best(self) -> HbStarTree {
        self.best
    }

    fn timed_out(&self) -> bool {
        self.timeout.as_ref().is_some_and(|f| f.timed_out())
    }

    fn cost_of_current(&self) -> i64 {
        self.cost_fn
            .cost(self.current.area(), star_wirelength(self.current.plan()))
    }

    fn publish_best(&self) {
        if let Some(slot) = &self.snapshot_slot {
            let mut guard = slot.lock().unwrap();
            *guard = Some(BestSnapshot {
                area: self.best.area(),
                plan: self.best.plan().clone(),
            });
        }
    }

    /// Samples random moves to estimate the average cost delta and sets
    /// `T0 = -avg / ln(p)` so an average uphill move starts out accepted
    /// with probability `p`, clamped to the configured range.
    fn initialize_temperature(&mut self) -> IsletResult<()> {
        let mut total_delta = 0.0;
        let mut valid_samples = 0u32;

        for _ in 0..TEMPERATURE_SAMPLES {
            let Some(id) = self.generate_move() else {
                continue;
            };
            let cost_before = self.cost_of_current();
            if !self.apply_move(id) {
                self.pool.release(id);
                continue;
            }
            self.current.pack(&self.sink)?;
            let cost_after = self.cost_of_current();
            self.undo_move(id)?;
            self.current.pack(&self.sink)?;
            self.pool.release(id);

            let delta = cost_after.abs_diff(cost_before);
            if delta > 0 && delta < i64::MAX as u64 / 2 {
                total_delta += delta as f64;
                valid_samples += 1;
            }
        }

        let avg_delta = if valid_samples > 0 {
            total_delta / valid_samples as f64
        } else {
            self.params.initial_temperature
        };
        let derived = -avg_delta / INITIAL_ACCEPTANCE.ln();
        self.temperature = derived.clamp(
            self.params.min_initial_temperature,
            self.params.max_initial_temperature,
        );
        Ok(())
    }

    /// Runs the annealing loop to the temperature floor (or the watchdog).
    pub fn run(&mut self) -> IsletResult<()> {
        let mut temperature = self.temperature;
        let mut stagnant_levels = 0u32;

        while temperature > self.params.final_temperature {
            if self.timed_out() {
                self.note_timeout(temperature);
                self.validate_best();
                return Ok(());
            }

            let outcome = self.process_temperature(temperature)?;
            if outcome.timed_out {
                self.note_timeout(temperature);
                self.validate_best();
                return Ok(());
            }

            if outcome.improved {
                stagnant_levels = 0;
            } else {
                stagnant_levels += 1;
                if stagnant_levels >= self.params.no_improvement_limit {
                    temperature *= STAGNATION_COOLING;
                    stagnant_levels = 0;
                }
            }
            temperature *= self.params.cooling_rate;
        }

        self.validate_best();
        Ok(())
    }

    fn note_timeout(&self, temperature: f64) {
        self.sink.emit(Diagnostic::note(format!(
            "timeout reached at temperature {temperature:.1}, returning best solution found"
        )));
    }

    /// Proposes and disposes one level's worth of moves.
    fn process_temperature(&mut self, temperature: f64) -> IsletResult<LevelOutcome> {
        let mut improved = false;

        for id in self.accepted_history.drain(..) {
            self.pool.release(id);
        }

        for i in 0..self.params.moves_per_temperature {
            if i % TIMEOUT_POLL_INTERVAL == 0 && self.timed_out() {
                return Ok(LevelOutcome {
                    improved,
                    timed_out: true,
                });
            }

            let Some(id) = self.generate_move() else {
                continue;
            };
            let kind = match self.pool.get(id).kind {
                Some(kind) => kind,
                None => continue,
            };
            self.adaptive.record_attempt(kind);
            self.stats.total_iterations += 1;

            let cost_before = self.current_cost;
            if !self.apply_move(id) {
                self.pool.release(id);
                continue;
            }
            self.current.pack(&self.sink)?;
            let cost_after = self.cost_of_current();
            let delta = cost_after.saturating_sub(cost_before);

            if self.accept_move(delta, temperature) {
                self.current_cost = cost_after;
                self.stats.accepted_moves += 1;
                self.accepted_history.push(id);

                if cost_after < cost_before {
                    self.adaptive
                        .record_success(kind, (cost_before - cost_after) as f64);
                }
                if cost_after < self.best_cost {
                    self.best = self.current.clone();
                    self.best_cost = cost_after;
                    self.publish_best();
                    improved = true;
                } else {
                    self.stats.no_improvement_count += 1;
                }
            } else {
                self.undo_move(id)?;
                self.current.pack(&self.sink)?;
                self.pool.release(id);
                self.stats.rejected_moves += 1;
            }

            if self.stats.total_iterations % ADAPT_INTERVAL == 0 {
                self.adaptive.update_probabilities();
            }
        }

        Ok(LevelOutcome {
            improved,
            timed_out: false,
        })
    }

    /// Metropolis criterion.
    fn accept_move(&mut self, delta: i64, temperature: f64) -> bool {
        if delta <= 0 {
            return true;
        }
        let probability = (-(delta as f64) / temperature).exp();
        self.rng.gen::<f64>() < probability
    }

    /// Picks an operator and operands; retries a few times before giving up.
    fn generate_move(&mut self) -> Option<MoveId> {
        for _ in 0..5 {
            let kind = self.adaptive.select(&mut self.rng);
            match kind {
                MoveKind::Rotate => {
                    let names = self.current.representative_module_names();
                    if names.is_empty() {
                        continue;
                    }
                    let name = &names[self.rng.gen_range(0..names.len())];
                    return Some(self.pool.create(MoveKind::Rotate, name, "", false));
                }
                MoveKind::Relocate | MoveKind::Swap => {
                    let names = self.current.outer_node_names();
                    if names.len() < 2 {
                        continue;
                    }
                    let a = self.rng.gen_range(0..names.len());
                    let b = self.rng.gen_range(0..names.len());
                    if a == b {
                        continue;
                    }
                    let as_left = kind == MoveKind::Relocate && self.rng.gen_bool(0.5);
                    return Some(self.pool.create(kind, &names[a], &names[b], as_left));
                }
                MoveKind::ChangeRep => {
                    let groups = self.current.group_names();
                    if groups.is_empty() {
                        continue;
                    }
                    let group = &groups[self.rng.gen_range(0..groups.len())];
                    let Some(pairs) = self.current.group_pairs(group) else {
                        continue;
                    };
                    if pairs.is_empty() {
                        continue;
                    }
                    let pair = &pairs[self.rng.gen_range(0..pairs.len())];
                    let member = if self.rng.gen_bool(0.5) {
                        pair.a.clone()
                    } else {
                        pair.b.clone()
                    };
                    return Some(self.pool.create(MoveKind::ChangeRep, group, &member, false));
                }
                MoveKind::ConvertSym => {
                    let groups = self.current.group_names();
                    if groups.is_empty() {
                        continue;
                    }
                    let group = &groups[self.rng.gen_range(0..groups.len())];
                    return Some(self.pool.create(MoveKind::ConvertSym, group, "", false));
                }
            }
        }
        None
    }

    /// Applies a move, capturing whatever state its undo needs.
    fn apply_move(&mut self, id: MoveId) -> bool {
        let (kind, param1, param2, as_left) = {
            let mv = self.pool.get(id);
            let Some(kind) = mv.kind else {
                return false;
            };
            (kind, mv.param1.clone(), mv.param2.clone(), mv.as_left)
        };

        match kind {
            MoveKind::Rotate => self.current.rotate_module(&param1),
            MoveKind::Relocate => {
                if let Some((parent, was_left)) = self.current.parent_info(&param1) {
                    let mv = self.pool.get_mut(id);
                    mv.original_parent.clear();
                    if let Some(parent) = parent {
                        mv.original_parent.push_str(&parent);
                    }
                    mv.was_left_child = was_left;
                }
                self.current.move_node(&param1, &param2, as_left)
            }
            MoveKind::Swap => self.current.swap_nodes(&param1, &param2),
            MoveKind::ChangeRep => {
                if let Some(rep) = self.current.representative_name_of(&param1, &param2) {
                    let mv = self.pool.get_mut(id);
                    mv.original_representative.clear();
                    mv.original_representative.push_str(&rep);
                }
                self.current.change_representative(&param1, &param2)
            }
            MoveKind::ConvertSym => {
                let axis = self.current.group_axis(&param1);
                self.pool.get_mut(id).original_axis = axis;
                self.current.convert_symmetry_type(&param1)
            }
        }
    }

    /// Undoes an applied move via its symmetric inverse or captured state.
    ///
    /// When the captured state no longer applies (the original parent was a
    /// contour node recycled by a skeleton rebuild), the current tree is
    /// restored from the best-so-far clone instead.
    fn undo_move(&mut self, id: MoveId) -> IsletResult<()> {
        let (kind, param1, param2, original_parent, was_left, original_rep) = {
            let mv = self.pool.get(id);
            let Some(kind) = mv.kind else {
                return Ok(());
            };
            (
                kind,
                mv.param1.clone(),
                mv.param2.clone(),
                mv.original_parent.clone(),
                mv.was_left_child,
                mv.original_representative.clone(),
            )
        };

        let undone = match kind {
            MoveKind::Rotate => self.current.rotate_module(&param1),
            MoveKind::Relocate => {
                !original_parent.is_empty()
                    && self.current.move_node(&param1, &original_parent, was_left)
            }
            MoveKind::Swap => self.current.swap_nodes(&param1, &param2),
            MoveKind::ChangeRep => match self.current.representative_name_of(&param1, &param2) {
                Some(rep) if rep != original_rep => {
                    self.current.change_representative(&param1, &param2)
                }
                Some(_) => true,
                None => false,
            },
            MoveKind::ConvertSym => self.current.convert_symmetry_type(&param1),
        };

        if !undone {
            self.sink.emit(Diagnostic::warning(format!(
                "could not undo {} move, restoring from best solution",
                kind.name()
            )));
            self.current = self.best.clone();
            self.current_cost = self.best_cost;
        }
        Ok(())
    }

    /// Final overlap sweep over the best solution before handing it out.
    fn validate_best(&mut self) {
        let fixes = validate::fix_overlaps(self.best.plan_mut(), &self.sink);
        if fixes > 0 {
            self.best.recompute_area(&self.sink);
            self.publish_best();
        }
    }
}
