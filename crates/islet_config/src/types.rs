//! Configuration types deserialized from `islet.toml`.

use serde::Deserialize;

/// The top-level placer configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlacerConfig {
    /// Annealing schedule overrides.
    #[serde(default)]
    pub anneal: AnnealConfig,
    /// Initial perturbation-operator probabilities.
    #[serde(default)]
    pub perturb: PerturbConfig,
    /// Watchdog overrides.
    #[serde(default)]
    pub timeout: TimeoutConfig,
}

/// The annealing schedule, with the stock defaults of the placer driver.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnealConfig {
    /// Fallback starting temperature when move sampling finds no deltas.
    #[serde(default = "defaults::initial_temperature")]
    pub initial_temperature: f64,
    /// Temperature floor ending the search.
    #[serde(default = "defaults::final_temperature")]
    pub final_temperature: f64,
    /// Geometric cooling factor per level, in (0, 1).
    #[serde(default = "defaults::cooling_rate")]
    pub cooling_rate: f64,
    /// Moves proposed per temperature level.
    #[serde(default = "defaults::moves_per_temperature")]
    pub moves_per_temperature: u32,
    /// Stagnant levels tolerated before extra cooling.
    #[serde(default = "defaults::no_improvement_limit")]
    pub no_improvement_limit: u32,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            initial_temperature: defaults::initial_temperature(),
            final_temperature: defaults::final_temperature(),
            cooling_rate: defaults::cooling_rate(),
            moves_per_temperature: defaults::moves_per_temperature(),
            no_improvement_limit: defaults::no_improvement_limit(),
        }
    }
}

/// Initial probabilities for the five perturbation operators. They are
/// normalized before use and adapt during the run; these are starting
/// points, not fixed shares.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerturbConfig {
    /// Rotate a representative module.
    #[serde(default = "defaults::prob_rotate")]
    pub rotate: f64,
    /// Relocate a node of the outer tree.
    #[serde(rename = "move", default = "defaults::prob_move")]
    pub relocate: f64,
    /// Swap two nodes of the outer tree.
    #[serde(default = "defaults::prob_swap")]
    pub swap: f64,
    /// Flip a pair's representative.
    #[serde(default = "defaults::prob_change_rep")]
    pub change_rep: f64,
    /// Flip a group's axis orientation.
    #[serde(default = "defaults::prob_convert_sym")]
    pub convert_sym: f64,
}

impl PerturbConfig {
    /// The probabilities as an operator-ordered array.
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.rotate,
            self.relocate,
            self.swap,
            self.change_rep,
            self.convert_sym,
        ]
    }
}

impl Default for PerturbConfig {
    fn default() -> Self {
        Self {
            rotate: defaults::prob_rotate(),
            relocate: defaults::prob_move(),
            swap: defaults::prob_swap(),
            change_rep: defaults::prob_change_rep(),
            convert_sym: defaults::prob_convert_sym(),
        }
    }
}

/// Watchdog deadlines.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Main deadline in seconds; the loop returns its best solution then.
    #[serde(default = "defaults::timeout_seconds")]
    pub seconds: u64,
    /// Grace window after the main deadline before the emergency finalizer
    /// writes output and exits the process.
    #[serde(default = "defaults::emergency_seconds")]
    pub emergency_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            seconds: defaults::timeout_seconds(),
            emergency_seconds: defaults::emergency_seconds(),
        }
    }
}

mod defaults {
    pub fn initial_temperature() -> f64 {
        1000.0
    }
    pub fn final_temperature() -> f64 {
        1.0
    }
    pub fn cooling_rate() -> f64 {
        0.85
    }
    pub fn moves_per_temperature() -> u32 {
        250
    }
    pub fn no_improvement_limit() -> u32 {
        3
    }
    pub fn timeout_seconds() -> u64 {
        240
    }
    pub fn emergency_seconds() -> u64 {
        10
    }
    pub fn prob_rotate() -> f64 {
        0.3
    }
    pub fn prob_move() -> f64 {
        0.3
    }
    pub fn prob_swap() -> f64 {
        0.3
    }
    pub fn prob_change_rep() -> f64 {
        0.05
    }
    pub fn prob_convert_sym() -> f64 {
        0.05
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_driver_parameters() {
        let config = PlacerConfig::default();
        assert_eq!(config.anneal.initial_temperature, 1000.0);
        assert_eq!(config.anneal.final_temperature, 1.0);
        assert_eq!(config.anneal.cooling_rate, 0.85);
        assert_eq!(config.anneal.moves_per_temperature, 250);
        assert_eq!(config.anneal.no_improvement_limit, 3);
        assert_eq!(config.timeout.seconds, 240);
        assert_eq!(config.timeout.emergency_seconds, 10);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: PlacerConfig = toml::from_str("[anneal]\ncooling_rate = 0.9\n").unwrap();
        assert_eq!(config.anneal.cooling_rate, 0.9);
        assert_eq!(config.anneal.moves_per_temperature, 250);
        assert_eq!(config.timeout.seconds, 240);
        assert_eq!(config.perturb.rotate, 0.3);
    }

    #[test]
    fn perturb_uses_move_as_the_toml_key() {
        let config: PlacerConfig =
            toml::from_str("[perturb]\nmove = 0.5\nconvert_sym = 0.1\n").unwrap();
        assert_eq!(config.perturb.relocate, 0.5);
        assert_eq!(config.perturb.convert_sym, 0.1);
        assert_eq!(
            config.perturb.as_array(),
            [0.3, 0.5, 0.3, 0.05, 0.1]
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<PlacerConfig, _> = toml::from_str("[anneal]\ntemprature = 5.0\n");
        assert!(result.is_err());
    }
}
