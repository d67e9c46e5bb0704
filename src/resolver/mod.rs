//! Reference resolution, tagging, ordering and output extraction.
//!
//! The resolver turns a declared [`ResourceGraph`](crate::graph::ResourceGraph)
//! into the pieces of a plan. Its stages run strictly in this order:
//!
//! 1. [`TokenResolver`] evaluates every attribute and tag, turning
//!    references into values or placeholders
//! 2. [`propagate_tags`] merges the global tags into every taggable node
//! 3. [`DependencyGraph`] orders the nodes and rejects cycles
//! 4. [`extract_outputs`] evaluates the declared outputs
//!
//! Every stage is a pure function of its input: no stage performs I/O and
//! no state survives between runs.

pub mod outputs;
pub mod planner;
pub mod resolved;
pub mod tags;
pub mod token_resolver;

pub use outputs::{ResolvedOutput, extract_outputs};
pub use planner::DependencyGraph;
pub use resolved::{Deferred, Placeholder, Resolved, stringify};
pub use tags::{effective_tags, propagate_tags};
pub use token_resolver::{ResolvedGraph, ResolvedNode, TokenResolver, evaluate};
