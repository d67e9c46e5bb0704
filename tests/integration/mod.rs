//! Integration test suite for stacksynth
//!
//! End-to-end tests of the synthesis pipeline and the CLI.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **synth_stack**: The built-in service stack, plan ordering and determinism
//! - **error_scenarios**: Fatal errors abort synthesis without a plan
//! - **cli**: Commands, exit codes and written artifacts

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod error_scenarios;
mod synth_stack;
