//! Output extraction.
//!
//! Outputs are read-only projections of resolved node state. They are
//! evaluated after ordering, against the fully resolved graph.

use std::collections::BTreeMap;
use tracing::debug;

use super::resolved::Resolved;
use super::token_resolver::{ResolvedGraph, evaluate};
use crate::core::{SynthError, SynthResult};
use crate::graph::AttrRef;

/// An output evaluated against the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOutput {
    /// The evaluated value
    pub value: Resolved,
    /// Human-readable description
    pub description: String,
}

/// Evaluate every declared output.
///
/// # Errors
///
/// [`SynthError::ReferenceError`] when an output names a node or attribute
/// that is not in the graph, and [`SynthError::InvalidExpression`] for
/// element expressions the value cannot satisfy.
pub fn extract_outputs(graph: &ResolvedGraph) -> SynthResult<BTreeMap<String, ResolvedOutput>> {
    let mut outputs = BTreeMap::new();

    for output in graph.outputs() {
        let referrer = format!("output '{}'", output.name);
        for reference in output.expression.references() {
            graph.lookup(reference, &referrer)?;
        }

        let lookup = |reference: &AttrRef| graph.lookup(reference, &referrer).ok();
        let value = evaluate(&output.expression, &referrer, &lookup)?.ok_or_else(|| {
            SynthError::InvalidExpression {
                location: referrer.clone(),
                reason: "output did not resolve".to_string(),
            }
        })?;

        debug!("Resolved {referrer}");
        outputs.insert(
            output.name.clone(),
            ResolvedOutput {
                value,
                description: output.description.clone(),
            },
        );
    }

    Ok(outputs)
}
