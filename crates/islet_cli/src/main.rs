//! Islet CLI — the command-line interface for the Islet analog placer.
//!
//! `islet <input> <output> [area_ratio]` reads a placement problem, runs the
//! annealing engine under a wall-clock watchdog, and writes the best
//! placement found. The exit code is 0 on success (including a graceful
//! timeout, which still writes the best solution) and non-zero on parse,
//! configuration, or I/O errors.

#![warn(missing_docs)]

mod place;

use clap::Parser;
use std::process;

/// Islet, an analog placement engine with symmetry constraints.
#[derive(Parser, Debug)]
#[command(name = "islet", version, about = "Islet analog placement engine")]
pub struct Cli {
    /// Path to the input problem file.
    pub input: String,

    /// Path the placement result is written to.
    pub output: String,

    /// Weight of the area term in [0, 1]; wirelength gets the complement.
    #[arg(default_value_t = 1.0)]
    pub area_ratio: f64,

    /// RNG seed for reproducible runs (default: derived from the clock).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Path to a custom `islet.toml` configuration file.
    #[arg(long)]
    pub config: Option<String>,

    /// Wall-clock limit in seconds, overriding the configuration file.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Suppress all output except errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Print annealing statistics after the run.
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    match place::run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
