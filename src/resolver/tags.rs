//! Global tag propagation.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::resolved::Resolved;
use super::token_resolver::ResolvedGraph;

/// Merge global tags with node tags, node values winning per key.
///
/// ```rust
/// use stacksynth::resolver::{Resolved, effective_tags};
/// use std::collections::BTreeMap;
///
/// let global = BTreeMap::from([("Environment".to_string(), Resolved::string("dev"))]);
/// let node = BTreeMap::from([("Environment".to_string(), Resolved::string("prod"))]);
/// assert_eq!(effective_tags(&global, &node)["Environment"], Resolved::string("prod"));
/// ```
#[must_use]
pub fn effective_tags(
    global: &BTreeMap<String, Resolved>,
    node: &BTreeMap<String, Resolved>,
) -> BTreeMap<String, Resolved> {
    let mut tags = global.clone();
    tags.extend(node.iter().map(|(k, v)| (k.clone(), v.clone())));
    tags
}

/// Replace every node's tags with its effective tags.
///
/// Kinds that do not accept tags end up with none; tags declared on them
/// are dropped with a warning.
pub fn propagate_tags(graph: &mut ResolvedGraph, global: &BTreeMap<String, Resolved>) {
    for node in graph.nodes_mut() {
        if node.kind.supports_tags() {
            node.tags = effective_tags(global, &node.tags);
            debug!("{} carries {} tags", node.address, node.tags.len());
        } else if !node.tags.is_empty() {
            let keys: Vec<&String> = node.tags.keys().collect();
            warn!("{} does not accept tags; dropping {:?}", node.address, keys);
            node.tags.clear();
        }
    }
}
