//! Structured diagnostic records.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// A single diagnostic record.
///
/// Input-related diagnostics carry the 1-based line number of the offending
/// record; engine diagnostics (overlap fixes, timeout notes) have no line.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The human-readable message.
    pub message: String,
    /// The 1-based input line the diagnostic refers to, if any.
    pub line: Option<u32>,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            line: None,
        }
    }

    /// Creates a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            line: None,
        }
    }

    /// Creates a note diagnostic.
    pub fn note(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            message: message.into(),
            line: None,
        }
    }

    /// Attaches an input line number.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}
