//! Core types shared by every synthesis phase.
//!
//! This module owns the error taxonomy of a synthesis run. Every phase of the
//! pipeline returns [`SynthError`] so that callers can tell a bad variable
//! apart from a dangling reference or a dependency cycle, and the CLI turns
//! those errors into colored, actionable messages through
//! [`user_friendly_error`].
//!
//! ```rust,no_run
//! use stacksynth::core::{SynthError, user_friendly_error};
//!
//! fn report(result: Result<(), SynthError>) {
//!     if let Err(e) = result {
//!         user_friendly_error(anyhow::Error::from(e)).display();
//!     }
//! }
//! ```

pub mod error;

pub use error::{ErrorContext, SynthError, user_friendly_error};

/// Result alias used by the library phases.
pub type SynthResult<T> = std::result::Result<T, SynthError>;
