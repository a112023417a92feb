//! The placement driver: parse, solve under the watchdog, write.

use crate::Cli;
use islet_common::Watchdog;
use islet_config::PlacerConfig;
use islet_diagnostics::{render_text, Diagnostic, DiagnosticSink, Severity};
use islet_io::{parse_problem, write_placement};
use islet_place::{AnnealParams, PlacementCost, PlacementSolver, SolverOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Runs the placer end to end; returns the process exit code.
pub fn run(cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.area_ratio) {
        eprintln!("error: area_ratio must be in [0, 1], got {}", cli.area_ratio);
        return Ok(1);
    }

    let config = match &cli.config {
        Some(path) => islet_config::load_config(Path::new(path))?,
        None => PlacerConfig::default(),
    };

    let sink = Arc::new(DiagnosticSink::new());
    let (plan, groups) = match parse_problem(Path::new(&cli.input), &sink) {
        Ok(parsed) => parsed,
        Err(e) => {
            drain_sink(&sink, cli.quiet);
            eprintln!("error: {e}");
            return Ok(1);
        }
    };

    let options = SolverOptions {
        anneal: annealing_params(&config),
        cost: PlacementCost::from_area_ratio(cli.area_ratio),
        probabilities: config.perturb.as_array(),
        seed: cli.seed.unwrap_or_else(clock_seed),
    };
    let mut solver = PlacementSolver::new(options);
    solver.load_problem(plan, groups)?;

    // The emergency finalizer only touches the shared snapshot slot, so it
    // can write output and leave even if the engine is wedged mid-pack.
    let slot = solver.snapshot_slot();
    let emergency_output = PathBuf::from(&cli.output);
    let emergency: Box<dyn FnOnce() + Send> = Box::new(move || {
        eprintln!("emergency shutdown: writing best solution found so far");
        let guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            Some(snapshot)
                if write_placement(&emergency_output, &snapshot.plan, snapshot.area).is_ok() =>
            {
                std::process::exit(0)
            }
            _ => std::process::exit(1),
        }
    });

    let timeout_secs = cli.timeout.unwrap_or(config.timeout.seconds);
    let watchdog = Watchdog::start(
        Duration::from_secs(timeout_secs),
        Some((
            Duration::from_secs(config.timeout.emergency_seconds),
            emergency,
        )),
    );
    solver.set_timeout_flag(watchdog.flag());

    if let Err(e) = solver.solve(&sink) {
        // Contained per the error policy: write whatever was found.
        sink.emit(Diagnostic::warning(format!("annealing aborted: {e}")));
    }
    solver.finalize_solution(&sink);
    watchdog.disarm();

    write_placement(Path::new(&cli.output), solver.solution_plan(), solver.area())?;

    drain_sink(&sink, cli.quiet);
    if !cli.quiet {
        println!("Area: {}", solver.area());
    }
    if cli.verbose {
        if let Some(stats) = solver.stats() {
            println!("Iterations: {}", stats.total_iterations);
            println!("Accepted moves: {}", stats.accepted_moves);
            println!("Rejected moves: {}", stats.rejected_moves);
            println!("Non-improving accepts: {}", stats.no_improvement_count);
        }
    }
    Ok(0)
}

/// Prints accumulated diagnostics: errors always, the rest unless quiet.
fn drain_sink(sink: &DiagnosticSink, quiet: bool) {
    for diag in sink.take_all() {
        if quiet && diag.severity != Severity::Error {
            continue;
        }
        eprintln!("{}", render_text(&diag));
    }
}

fn annealing_params(config: &PlacerConfig) -> AnnealParams {
    let defaults = AnnealParams::default();
    AnnealParams {
        initial_temperature: config.anneal.initial_temperature,
        final_temperature: config.anneal.final_temperature,
        cooling_rate: config.anneal.cooling_rate,
        moves_per_temperature: config.anneal.moves_per_temperature,
        no_improvement_limit: config.anneal.no_improvement_limit,
        min_initial_temperature: defaults.min_initial_temperature,
        max_initial_temperature: defaults.max_initial_temperature,
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn cli_for(input: &Path, output: &Path, extra: &[&str]) -> Cli {
        let mut args = vec![
            "islet".to_string(),
            input.display().to_string(),
            output.display().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        Cli::parse_from(args)
    }

    fn write_input(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn end_to_end_two_modules() {
        let input = write_input("A 2 3\nB 4 1\n");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        let cli = cli_for(
            input.path(),
            &output,
            &["--seed", "1", "--timeout", "20", "--quiet"],
        );

        let code = run(&cli).unwrap();
        assert_eq!(code, 0);

        let text = std::fs::read_to_string(&output).unwrap();
        let mut lines = text.lines();
        let area_line = lines.next().unwrap();
        let area: i64 = area_line.strip_prefix("Area ").unwrap().parse().unwrap();
        // Greedy side-by-side upper bound from the problem statement.
        assert!(area > 0 && area <= 18);
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn empty_input_writes_area_zero() {
        let input = write_input("");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        let cli = cli_for(input.path(), &output, &["--seed", "1", "--quiet"]);

        assert_eq!(run(&cli).unwrap(), 0);
        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text, "Area 0\n");
    }

    #[test]
    fn malformed_input_exits_nonzero_without_output() {
        let input = write_input("A 0 3\n");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        let cli = cli_for(input.path(), &output, &["--quiet"]);

        assert_eq!(run(&cli).unwrap(), 1);
        assert!(!output.exists());
    }

    #[test]
    fn bad_area_ratio_exits_nonzero() {
        let input = write_input("A 2 3\n");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        let mut cli = cli_for(input.path(), &output, &[]);
        cli.area_ratio = 1.5;
        assert_eq!(run(&cli).unwrap(), 1);
    }

    #[test]
    fn missing_input_file_exits_nonzero() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        let cli = cli_for(Path::new("/definitely/missing.txt"), &output, &["--quiet"]);
        assert_eq!(run(&cli).unwrap(), 1);
    }

    #[test]
    fn bad_config_is_propagated() {
        let input = write_input("A 2 3\n");
        let config = write_input("[anneal]\ncooling_rate = 2.0\n");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        let config_arg = config.path().display().to_string();
        let cli = cli_for(input.path(), &output, &["--config", &config_arg]);
        assert!(run(&cli).is_err());
    }

    #[test]
    fn symmetric_problem_round_trips() {
        let input = write_input(
            "inp 3 2\ninn 3 2\nbias 2 2\nSymGroup diff Vertical\nSymPair inp inn\n",
        );
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        let cli = cli_for(
            input.path(),
            &output,
            &["--seed", "3", "--timeout", "20", "--quiet"],
        );
        assert_eq!(run(&cli).unwrap(), 0);

        let text = std::fs::read_to_string(&output).unwrap();
        let mut x = std::collections::HashMap::new();
        for line in text.lines().skip(1) {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            x.insert(
                tokens[0].to_string(),
                (
                    tokens[1].parse::<i64>().unwrap(),
                    tokens[2].parse::<i64>().unwrap(),
                    tokens[3].parse::<u8>().unwrap(),
                ),
            );
        }
        assert_eq!(x.len(), 3);
        let (inp, inn) = (x["inp"], x["inn"]);
        // Mirrored pair: same orientation, non-negative coordinates, and
        // either side by side or stacked depending on the final axis.
        assert_eq!(inp.2, inn.2);
        assert!(inp.0 >= 0 && inn.0 >= 0);
        let side_by_side = inp.1 == inn.1 && inp.0 != inn.0;
        let stacked = inp.0 == inn.0 && inp.1 != inn.1;
        assert!(side_by_side || stacked);
    }
}
