//! Severity levels for diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a diagnostic is.
///
/// Only [`Severity::Error`] diagnostics make a run fail; warnings and notes
/// are informational (overlap repairs, timeout truncation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// A fatal problem: malformed input, unwritable output.
    Error,
    /// A recovered problem the user should know about.
    Warning,
    /// Informational context.
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}
