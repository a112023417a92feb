//! Shared infrastructure for the Islet analog placer.
//!
//! This crate holds the pieces every other Islet crate needs: the standard
//! [`IsletResult`] type for fallible engine-internal operations, and the
//! [`Watchdog`] used to bound the wall-clock time of a placement run.

#![warn(missing_docs)]

pub mod result;
pub mod watchdog;

pub use result::{InternalError, IsletResult};
pub use watchdog::{TimeoutFlag, Watchdog};
