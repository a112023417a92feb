//! Adaptive perturbation scheduling.
//!
//! Each operator's attempt count, success count (accepted moves that
//! strictly decreased the cost), and average improvement feed a periodic
//! probability update. Operators that keep paying off are selected more
//! often; every operator keeps a floor probability so the search never
//! abandons a move class entirely, and the counters decay so the schedule
//! tracks a changing cost landscape.

use crate::placement::moves::MoveKind;
use rand::Rng;

/// Initial selection probabilities, in [`MoveKind::ALL`] order.
const INITIAL_PROBS: [f64; 5] = [0.3, 0.3, 0.3, 0.05, 0.05];

/// Per-operator probability floors.
const MIN_PROBS: [f64; 5] = [0.1, 0.3, 0.1, 0.02, 0.02];

/// Blend factor between the old schedule and the freshly derived one.
const LEARNING_RATE: f64 = 0.1;

/// Multiplicative decay applied to the counters after each update.
const DECAY: f64 = 0.7;

/// Relative weight of the raw success rate vs. the improvement-weighted rate.
const RATE_SHARE: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default)]
struct OperatorStats {
    attempts: f64,
    successes: f64,
    total_improvement: f64,
}

impl OperatorStats {
    fn success_rate(&self) -> f64 {
        if self.attempts > 0.0 {
            self.successes / self.attempts
        } else {
            0.0
        }
    }

    fn average_improvement(&self) -> f64 {
        if self.successes > 0.0 {
            self.total_improvement / self.successes
        } else {
            0.0
        }
    }
}

/// Operator selection probabilities with success-driven adaptation.
#[derive(Debug, Clone)]
pub struct AdaptivePerturbation {
    probs: [f64; 5],
    stats: [OperatorStats; 5],
}

impl AdaptivePerturbation {
    /// Creates the schedule with the default initial probabilities.
    pub fn new() -> Self {
        Self::with_probabilities(INITIAL_PROBS)
    }

    /// Creates the schedule from explicit initial probabilities, normalized
    /// to sum to 1 (the defaults are used if they sum to zero or less).
    pub fn with_probabilities(probs: [f64; 5]) -> Self {
        let sum: f64 = probs.iter().sum();
        let probs = if sum <= 0.0 {
            INITIAL_PROBS
        } else {
            probs.map(|p| p / sum)
        };
        Self {
            probs,
            stats: [OperatorStats::default(); 5],
        }
    }

    /// The current probability of an operator.
    pub fn probability(&self, kind: MoveKind) -> f64 {
        self.probs[kind.index()]
    }

    /// Selects an operator by roulette over the current probabilities.
    pub fn select(&self, rng: &mut impl Rng) -> MoveKind {
        let mut roll: f64 = rng.gen();
        for kind in MoveKind::ALL {
            let p = self.probs[kind.index()];
            if roll < p {
                return kind;
            }
            roll -= p;
        }
        MoveKind::ConvertSym
    }

    /// Records one attempted move of the given kind.
    pub fn record_attempt(&mut self, kind: MoveKind) {
        self.stats[kind.index()].attempts += 1.0;
    }

    /// Records a success: an accepted move that strictly decreased the cost
    /// by `improvement`.
    pub fn record_success(&mut self, kind: MoveKind, improvement: f64) {
        let s = &mut self.stats[kind.index()];
        s.successes += 1.0;
        s.total_improvement += improvement;
    }

    /// Re-derives the schedule from the counters.
    ///
    /// Each operator's weight blends its share of the total success rate
    /// with its share of the improvement-weighted success rate, floored at
    /// the per-operator minimum, renormalized, and blended into the current
    /// schedule at the learning rate. Counters decay afterwards.
    pub fn update_probabilities(&mut self) {
        let rates: [f64; 5] = std::array::from_fn(|i| self.stats[i].success_rate());
        let weighted: [f64; 5] =
            std::array::from_fn(|i| rates[i] * self.stats[i].average_improvement());
        let rate_sum: f64 = rates.iter().sum();
        let weighted_sum: f64 = weighted.iter().sum();

        if rate_sum > 0.0 {
            let mut fresh: [f64; 5] = std::array::from_fn(|i| {
                let rate_share = RATE_SHARE * rates[i] / rate_sum;
                let improvement_share = if weighted_sum > 0.0 {
                    (1.0 - RATE_SHARE) * weighted[i] / weighted_sum
                } else {
                    0.0
                };
                (rate_share + improvement_share).max(MIN_PROBS[i])
            });
            let sum: f64 = fresh.iter().sum();
            for p in &mut fresh {
                *p /= sum;
            }

            for i in 0..5 {
                self.probs[i] = (1.0 - LEARNING_RATE) * self.probs[i] + LEARNING_RATE * fresh[i];
            }
            let sum: f64 = self.probs.iter().sum();
            for p in &mut self.probs {
                *p /= sum;
            }
        }

        for s in &mut self.stats {
            s.attempts *= DECAY;
            s.successes *= DECAY;
            s.total_improvement *= DECAY;
        }
    }

    /// One `(name, attempts, successes)` row per operator, for reporting.
    pub fn stat_rows(&self) -> Vec<(&'static str, u64, u64)> {
        MoveKind::ALL
            .iter()
            .map(|kind| {
                let s = &self.stats[kind.index()];
                (kind.name(), s.attempts as u64, s.successes as u64)
            })
            .collect()
    }
}

impl Default for AdaptivePerturbation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn prob_sum(adaptive: &AdaptivePerturbation) -> f64 {
        MoveKind::ALL
            .iter()
            .map(|&k| adaptive.probability(k))
            .sum()
    }

    #[test]
    fn initial_probabilities_are_normalized() {
        let adaptive = AdaptivePerturbation::new();
        assert!((prob_sum(&adaptive) - 1.0).abs() < 1e-9);
        assert!((adaptive.probability(MoveKind::Rotate) - 0.3).abs() < 1e-9);
        assert!((adaptive.probability(MoveKind::ConvertSym) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn custom_probabilities_are_normalized() {
        let adaptive = AdaptivePerturbation::with_probabilities([2.0, 2.0, 2.0, 2.0, 2.0]);
        assert!((adaptive.probability(MoveKind::Swap) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn zero_probabilities_fall_back_to_defaults() {
        let adaptive = AdaptivePerturbation::with_probabilities([0.0; 5]);
        assert!((adaptive.probability(MoveKind::Relocate) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn select_respects_distribution() {
        let adaptive = AdaptivePerturbation::new();
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0usize; 5];
        for _ in 0..10_000 {
            counts[adaptive.select(&mut rng).index()] += 1;
        }
        // The three 0.3-operators dominate the two 0.05-operators.
        assert!(counts[0] > counts[3] * 2);
        assert!(counts[1] > counts[4] * 2);
        assert!(counts[3] > 0);
    }

    #[test]
    fn successful_operator_gains_probability() {
        let mut adaptive = AdaptivePerturbation::new();
        for _ in 0..50 {
            adaptive.record_attempt(MoveKind::Swap);
            adaptive.record_success(MoveKind::Swap, 100.0);
            adaptive.record_attempt(MoveKind::Rotate);
        }
        let before = adaptive.probability(MoveKind::Swap);
        adaptive.update_probabilities();
        assert!(adaptive.probability(MoveKind::Swap) > before);
        assert!((prob_sum(&adaptive) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn floors_are_respected_after_many_updates() {
        let mut adaptive = AdaptivePerturbation::new();
        for _ in 0..100 {
            adaptive.record_attempt(MoveKind::Rotate);
            adaptive.record_success(MoveKind::Rotate, 1000.0);
            adaptive.record_attempt(MoveKind::ConvertSym);
            adaptive.update_probabilities();
        }
        // The floor is blended, never undershot by more than the blend lag.
        assert!(adaptive.probability(MoveKind::ConvertSym) > 0.01);
        assert!((prob_sum(&adaptive) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn update_without_data_changes_nothing() {
        let mut adaptive = AdaptivePerturbation::new();
        let before: Vec<f64> = MoveKind::ALL
            .iter()
            .map(|&k| adaptive.probability(k))
            .collect();
        adaptive.update_probabilities();
        let after: Vec<f64> = MoveKind::ALL
            .iter()
            .map(|&k| adaptive.probability(k))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn counters_decay() {
        let mut adaptive = AdaptivePerturbation::new();
        adaptive.record_attempt(MoveKind::Rotate);
        adaptive.record_success(MoveKind::Rotate, 10.0);
        adaptive.update_probabilities();
        let rows = adaptive.stat_rows();
        // 1.0 decayed by 0.7 truncates to 0 in the integer report.
        assert_eq!(rows[0].0, "rotate");
        assert!(rows[0].1 <= 1);
    }
}
