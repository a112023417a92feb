//! Common result and error types for the Islet placer.

/// The standard result type for fallible internal operations.
///
/// `Ok` contains the result value (which may be partial or degraded after
/// error recovery). `Err` indicates an unrecoverable internal error (a bug
/// in Islet), not a user-facing error. User errors are reported through the
/// diagnostic sink and the operation still returns `Ok`; rejected
/// perturbations inside the annealing loop are plain `false` returns, not
/// errors at all.
pub type IsletResult<T> = Result<T, InternalError>;

/// An internal engine error indicating a bug in Islet, not a user input problem.
///
/// These errors should never occur during normal operation. If one does occur,
/// it means there is a logic error in the placer that should be fixed.
#[derive(Debug, thiserror::Error)]
#[error("internal placer error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
