//! Parser for the placement problem format.
//!
//! The input is line-oriented and whitespace-separated; `#` starts a
//! comment line. Three record forms exist:
//!
//! ```text
//! <name> <w> <h>                      module declaration
//! SymGroup <name> <Vertical|Horizontal>
//! SymPair <a> <b>                     pair in the most recent SymGroup
//! SelfSym <s>                         self-symmetric in the most recent SymGroup
//! ```
//!
//! Every violation is reported as an error diagnostic with the offending
//! line number; parsing continues so one bad input surfaces all its
//! problems in a single run, and the function fails at the end.

use islet_diagnostics::{Diagnostic, DiagnosticSink};
use islet_model::{Axis, Floorplan, Module, SymmetryGroup, SymmetryPair};
use std::collections::HashSet;
use std::path::Path;

/// Errors surfaced by problem parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The input file could not be read.
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// One or more records were malformed; details are in the sink.
    #[error("{0} error(s) in input file")]
    InvalidInput(usize),
}

/// Parses a problem file from disk.
pub fn parse_problem(
    path: &Path,
    sink: &DiagnosticSink,
) -> Result<(Floorplan, Vec<SymmetryGroup>), ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_problem_str(&content, sink)
}

/// Parses a problem from text (useful for tests).
pub fn parse_problem_str(
    content: &str,
    sink: &DiagnosticSink,
) -> Result<(Floorplan, Vec<SymmetryGroup>), ParseError> {
    let mut plan = Floorplan::new();
    let mut groups: Vec<SymmetryGroup> = Vec::new();
    let mut grouped: HashSet<String> = HashSet::new();
    let errors_before = sink.error_count();

    for (index, raw_line) in content.lines().enumerate() {
        let line_no = (index + 1) as u32;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens[0] {
            "SymGroup" => {
                if tokens.len() != 3 {
                    sink.emit(
                        Diagnostic::error("SymGroup expects a name and an axis").with_line(line_no),
                    );
                    continue;
                }
                let axis = match tokens[2] {
                    "Vertical" | "V" => Axis::Vertical,
                    "Horizontal" | "H" => Axis::Horizontal,
                    other => {
                        sink.emit(
                            Diagnostic::error(format!(
                                "unknown axis '{other}', expected Vertical or Horizontal"
                            ))
                            .with_line(line_no),
                        );
                        continue;
                    }
                };
                if groups.iter().any(|g| g.name == tokens[1]) {
                    sink.emit(
                        Diagnostic::error(format!("duplicate symmetry group '{}'", tokens[1]))
                            .with_line(line_no),
                    );
                    continue;
                }
                groups.push(SymmetryGroup::new(tokens[1], axis));
            }
            "SymPair" => {
                if tokens.len() != 3 {
                    sink.emit(
                        Diagnostic::error("SymPair expects two module names").with_line(line_no),
                    );
                    continue;
                }
                let Some(group) = groups.last_mut() else {
                    sink.emit(
                        Diagnostic::error("SymPair before any SymGroup").with_line(line_no),
                    );
                    continue;
                };
                let (a, b) = (tokens[1], tokens[2]);
                if a == b {
                    sink.emit(
                        Diagnostic::error(format!("pair members must be distinct, got '{a}' twice"))
                            .with_line(line_no),
                    );
                    continue;
                }
                if check_member(&plan, &mut grouped, a, sink, line_no)
                    && check_member(&plan, &mut grouped, b, sink, line_no)
                {
                    let (ida, idb) = (plan.id_of(a), plan.id_of(b));
                    if let (Some(ida), Some(idb)) = (ida, idb) {
                        let (ma, mb) = (&plan[ida], &plan[idb]);
                        if ma.original_width() != mb.original_width()
                            || ma.original_height() != mb.original_height()
                        {
                            sink.emit(
                                Diagnostic::error(format!(
                                    "pair '{a}'/'{b}' members have different dimensions"
                                ))
                                .with_line(line_no),
                            );
                            continue;
                        }
                    }
                    group.pairs.push(SymmetryPair::new(a, b));
                }
            }
            "SelfSym" => {
                if tokens.len() != 2 {
                    sink.emit(
                        Diagnostic::error("SelfSym expects one module name").with_line(line_no),
                    );
                    continue;
                }
                let Some(group) = groups.last_mut() else {
                    sink.emit(
                        Diagnostic::error("SelfSym before any SymGroup").with_line(line_no),
                    );
                    continue;
                };
                if check_member(&plan, &mut grouped, tokens[1], sink, line_no) {
                    group.self_symmetric.push(tokens[1].to_string());
                }
            }
            name => {
                if tokens.len() != 3 {
                    sink.emit(
                        Diagnostic::error(format!(
                            "expected '<name> <w> <h>', got {} token(s)",
                            tokens.len()
                        ))
                        .with_line(line_no),
                    );
                    continue;
                }
                let (w, h) = match (tokens[1].parse::<i32>(), tokens[2].parse::<i32>()) {
                    (Ok(w), Ok(h)) => (w, h),
                    _ => {
                        sink.emit(
                            Diagnostic::error(format!(
                                "module '{name}' has non-integer dimensions"
                            ))
                            .with_line(line_no),
                        );
                        continue;
                    }
                };
                if w <= 0 || h <= 0 {
                    sink.emit(
                        Diagnostic::error(format!(
                            "module '{name}' has non-positive dimensions {w}x{h}"
                        ))
                        .with_line(line_no),
                    );
                    continue;
                }
                if plan.id_of(name).is_some() {
                    sink.emit(
                        Diagnostic::error(format!("duplicate module '{name}'")).with_line(line_no),
                    );
                    continue;
                }
                plan.add_module(Module::new(name, w, h));
            }
        }
    }

    let errors = sink.error_count() - errors_before;
    if errors > 0 {
        Err(ParseError::InvalidInput(errors))
    } else {
        Ok((plan, groups))
    }
}

/// Validates one group-member reference: the module must exist and must not
/// already belong to a group.
fn check_member(
    plan: &Floorplan,
    grouped: &mut HashSet<String>,
    name: &str,
    sink: &DiagnosticSink,
    line_no: u32,
) -> bool {
    if plan.id_of(name).is_none() {
        sink.emit(Diagnostic::error(format!("unknown module '{name}'")).with_line(line_no));
        return false;
    }
    if !grouped.insert(name.to_string()) {
        sink.emit(
            Diagnostic::error(format!("module '{name}' is already in a symmetry group"))
                .with_line(line_no),
        );
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_modules_only() {
        let sink = DiagnosticSink::new();
        let (plan, groups) = parse_problem_str("A 2 3\nB 4 1\n", &sink).unwrap();
        assert_eq!(plan.module_count(), 2);
        assert!(groups.is_empty());
        let a = plan.id_of("A").unwrap();
        assert_eq!(plan[a].original_width(), 2);
        assert_eq!(plan[a].original_height(), 3);
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let sink = DiagnosticSink::new();
        let input = "# a comment\n\nA 2 3\n   \n# another\nB 4 1\n";
        let (plan, _) = parse_problem_str(input, &sink).unwrap();
        assert_eq!(plan.module_count(), 2);
    }

    #[test]
    fn parses_group_with_pair_and_self_sym() {
        let sink = DiagnosticSink::new();
        let input = "\
inp 3 2
inn 3 2
tail 4 2
SymGroup diff Vertical
SymPair inp inn
SelfSym tail
";
        let (plan, groups) = parse_problem_str(input, &sink).unwrap();
        assert_eq!(plan.module_count(), 3);
        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert_eq!(g.name, "diff");
        assert_eq!(g.axis, Axis::Vertical);
        assert_eq!(g.pairs.len(), 1);
        assert_eq!(g.self_symmetric, vec!["tail".to_string()]);
    }

    #[test]
    fn accepts_short_axis_names() {
        let sink = DiagnosticSink::new();
        let input = "a 1 1\nb 1 1\nSymGroup g H\nSymPair a b\n";
        let (_, groups) = parse_problem_str(input, &sink).unwrap();
        assert_eq!(groups[0].axis, Axis::Horizontal);
    }

    #[test]
    fn empty_input_is_valid() {
        let sink = DiagnosticSink::new();
        let (plan, groups) = parse_problem_str("", &sink).unwrap();
        assert!(plan.is_empty());
        assert!(groups.is_empty());
    }

    #[test]
    fn rejects_duplicate_module() {
        let sink = DiagnosticSink::new();
        let result = parse_problem_str("A 2 3\nA 1 1\n", &sink);
        assert!(result.is_err());
        let diags = sink.take_all();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, Some(2));
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let sink = DiagnosticSink::new();
        assert!(parse_problem_str("A 0 3\n", &sink).is_err());
        assert!(parse_problem_str("B -1 3\n", &sink).is_err());
    }

    #[test]
    fn rejects_pair_outside_group() {
        let sink = DiagnosticSink::new();
        let result = parse_problem_str("a 1 1\nb 1 1\nSymPair a b\n", &sink);
        assert!(result.is_err());
        assert!(sink.take_all()[0].message.contains("before any SymGroup"));
    }

    #[test]
    fn rejects_unknown_member() {
        let sink = DiagnosticSink::new();
        let result = parse_problem_str("a 1 1\nSymGroup g Vertical\nSymPair a ghost\n", &sink);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_module_in_two_groups() {
        let sink = DiagnosticSink::new();
        let input = "\
a 1 1
b 1 1
c 1 1
SymGroup g1 Vertical
SymPair a b
SymGroup g2 Vertical
SymPair a c
";
        assert!(parse_problem_str(input, &sink).is_err());
    }

    #[test]
    fn rejects_mismatched_pair_dimensions() {
        let sink = DiagnosticSink::new();
        let input = "a 2 2\nb 3 2\nSymGroup g Vertical\nSymPair a b\n";
        assert!(parse_problem_str(input, &sink).is_err());
        assert!(sink.take_all()[0].message.contains("different dimensions"));
    }

    #[test]
    fn collects_multiple_errors_in_one_pass() {
        let sink = DiagnosticSink::new();
        let input = "A 0 1\nA 2 2\nSymPair x y\n";
        match parse_problem_str(input, &sink) {
            Err(ParseError::InvalidInput(count)) => assert!(count >= 2),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "A 2 3").unwrap();
        writeln!(file, "B 4 1").unwrap();
        let sink = DiagnosticSink::new();
        let (plan, _) = parse_problem(file.path(), &sink).unwrap();
        assert_eq!(plan.module_count(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let sink = DiagnosticSink::new();
        let result = parse_problem(Path::new("/definitely/not/here.txt"), &sink);
        assert!(matches!(result, Err(ParseError::Io(_))));
    }
}
