//! Text rendering for diagnostics.

use crate::diagnostic::Diagnostic;

/// Renders a single diagnostic as a one-line message.
///
/// Produces output like:
/// ```text
/// error: duplicate module 'M1' (line 7)
/// warning: fixed horizontal overlap: moved B to the right of A
/// ```
pub fn render_text(diag: &Diagnostic) -> String {
    match diag.line {
        Some(line) => format!("{}: {} (line {})", diag.severity, diag.message, line),
        None => format!("{}: {}", diag.severity, diag.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_without_line() {
        let diag = Diagnostic::warning("overlap fixed");
        assert_eq!(render_text(&diag), "warning: overlap fixed");
    }

    #[test]
    fn renders_with_line() {
        let diag = Diagnostic::error("unknown module 'X'").with_line(4);
        assert_eq!(render_text(&diag), "error: unknown module 'X' (line 4)");
    }

    #[test]
    fn renders_note() {
        let diag = Diagnostic::note("timeout reached, writing best solution");
        assert_eq!(
            render_text(&diag),
            "note: timeout reached, writing best solution"
        );
    }
}
