//! Configuration for the Islet placer.
//!
//! Runs work out of the box with built-in defaults; an optional
//! `islet.toml` overrides the annealing schedule and the watchdog:
//!
//! ```toml
//! [anneal]
//! initial_temperature = 1000.0
//! final_temperature = 1.0
//! cooling_rate = 0.85
//! moves_per_temperature = 250
//! no_improvement_limit = 3
//!
//! [perturb]
//! rotate = 0.3
//! move = 0.3
//! swap = 0.3
//! change_rep = 0.05
//! convert_sym = 0.05
//!
//! [timeout]
//! seconds = 240
//! emergency_seconds = 10
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::{AnnealConfig, PerturbConfig, PlacerConfig, TimeoutConfig};
