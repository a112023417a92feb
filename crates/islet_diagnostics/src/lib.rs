//! Diagnostics for the Islet placer.
//!
//! The engine never prints directly: parser errors, overlap repairs, and
//! timeout notes are emitted as [`Diagnostic`] records into a shared
//! [`DiagnosticSink`]. The CLI drains the sink and renders the records with
//! [`render_text`] at the end of the run (or as they matter).

#![warn(missing_docs)]

pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use diagnostic::Diagnostic;
pub use renderer::render_text;
pub use severity::Severity;
pub use sink::DiagnosticSink;
