//! stacksynth - deployment plan synthesis
//!
//! Turns a declarative graph of cloud resources, whose attributes may be
//! forward references to values that only exist after another resource is
//! created, into a deterministic, dependency-ordered deployment plan.
//!
//! # Pipeline
//!
//! ```text
//! variables ─▶ graph builder ─▶ token resolver ─▶ tag propagator
//!                                                      │
//!                 plan ◀── output extractor ◀── topological planner
//! ```
//!
//! 1. [`variables`] resolves the stack's variables from defaults, the
//!    environment, TOML files and flags.
//! 2. [`graph`] records nodes whose attributes are literals, references,
//!    composites or computed placeholders.
//! 3. [`resolver`] resolves every reference to a known value or a typed
//!    deferred token, merges global tags, orders nodes and binds outputs.
//! 4. [`synth`] runs the stages and produces a [`synth::Plan`].
//!
//! Any failure aborts the run; there is no partial plan.
//!
//! # Core Modules
//!
//! - [`core`] - Error taxonomy and user-facing error context
//! - [`config`] - Override collection and the derived stack configuration
//! - [`variables`] - Typed variable tables and coercion
//! - [`graph`] - Attribute values, resource nodes and the graph builder
//! - [`resolver`] - Reference resolution, tags, ordering and outputs
//! - [`synth`] - The pipeline and the plan artifact
//! - [`stack`] - The built-in container service stack
//! - [`cli`] - Command-line interface
//! - [`utils`] - Atomic writes, digests and name suggestions
//!
//! # Example
//!
//! ```rust
//! use stacksynth::stack::ServiceStack;
//! use stacksynth::synth::synthesize;
//! use stacksynth::variables::{Overrides, ValueSource};
//!
//! # fn main() -> stacksynth::core::SynthResult<()> {
//! let mut overrides = Overrides::new();
//! overrides.insert_text("env", "prod", ValueSource::Flag);
//!
//! let plan = synthesize(&ServiceStack::new(), &overrides)?;
//! assert_eq!(plan.outputs["ecs_cluster_name"].value, "turbo-app-prod-cluster");
//! assert_eq!(plan.outputs["vpc_id"].value, "${aws_vpc.vpc.id}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod graph;
pub mod resolver;
pub mod stack;
pub mod synth;
pub mod utils;
pub mod variables;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
