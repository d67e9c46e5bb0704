//! Two-phase resolution of attribute values.
//!
//! # Phase 1: placeholders
//!
//! Every node gets its address (`aws_lb.alb`) and every computed attribute
//! resolves to a placeholder bound to `<address>.<attribute>`. Placeholders
//! exist regardless of declaration order, so later-declared nodes can be
//! referenced freely.
//!
//! # Phase 2: fixed point
//!
//! Passes walk the nodes in declaration order and evaluate every attribute
//! whose references are all resolved. A pass that resolves nothing while
//! attributes remain pending means resolution has stalled:
//!
//! - a pending reference naming an undeclared node or attribute is a
//!   [`SynthError::ReferenceError`]
//! - otherwise the pending attributes wait on each other, which is a
//!   [`SynthError::CycleError`]
//!
//! Tags are evaluated once the fixed point is reached, so tag values can be
//! composites over any attribute.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, trace};

use super::planner::DependencyGraph;
use super::resolved::{Deferred, Placeholder, Resolved, stringify};
use crate::core::{SynthError, SynthResult};
use crate::graph::{
    AttrRef, AttributeValue, Edge, Fragment, NodeState, Output, ResourceGraph, ResourceKind, ResourceNode,
};
use crate::utils::similar_names;

/// A node with every attribute and tag evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNode {
    /// Node id
    pub id: String,
    /// Node kind
    pub kind: ResourceKind,
    /// `<kind>.<id>`
    pub address: String,
    /// Evaluated attributes
    pub attributes: BTreeMap<String, Resolved>,
    /// Evaluated node-level tags; global tags are merged later
    pub tags: BTreeMap<String, Resolved>,
    /// Names of attributes known only after realization
    pub computed: Vec<String>,
    /// Lifecycle state
    pub state: NodeState,
}

impl ResolvedNode {
    pub(crate) fn advance(&mut self, next: NodeState) {
        if next > self.state {
            self.state = next;
        }
    }
}

/// The outcome of resolution: nodes in declaration order plus the edges and
/// outputs carried over from the declared graph.
#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    nodes: Vec<ResolvedNode>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    outputs: Vec<Output>,
}

impl ResolvedGraph {
    /// Nodes in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[ResolvedNode] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [ResolvedNode] {
        &mut self.nodes
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ResolvedNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Recorded dependency edges.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Declared outputs.
    #[must_use]
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Look up a resolved attribute, reporting which half of the reference
    /// is missing.
    pub fn lookup(&self, reference: &AttrRef, referrer: &str) -> SynthResult<&Resolved> {
        let Some(node) = self.node(&reference.node) else {
            return Err(missing_node(reference, referrer, self.nodes.iter().map(|n| &n.id)));
        };
        node.attributes
            .get(&reference.attribute)
            .ok_or_else(|| missing_attribute(reference, referrer, &node.address, node.attributes.keys()))
    }
}

fn missing_node<'a>(reference: &AttrRef, referrer: &str, ids: impl IntoIterator<Item = &'a String>) -> SynthError {
    SynthError::ReferenceError {
        reference: reference.to_string(),
        referrer: referrer.to_string(),
        reason: format!("node '{}' is not declared", reference.node),
        similar: similar_names(&reference.node, ids),
    }
}

fn missing_attribute<'a>(
    reference: &AttrRef,
    referrer: &str,
    address: &str,
    attributes: impl IntoIterator<Item = &'a String>,
) -> SynthError {
    SynthError::ReferenceError {
        reference: reference.to_string(),
        referrer: referrer.to_string(),
        reason: format!("{address} declares no attribute '{}'", reference.attribute),
        similar: similar_names(&reference.attribute, attributes),
    }
}

/// Evaluate one attribute value.
///
/// `lookup` returns the resolved value of a reference, or `None` while it is
/// still pending. Returns `Ok(None)` when any reference is pending.
///
/// `location` names the attribute, tag or output being evaluated.
///
/// # Errors
///
/// [`SynthError::InvalidExpression`] when an element expression is applied
/// to a known value it cannot split, or when a nested value is
/// [`AttributeValue::Computed`].
pub fn evaluate<'a, F>(
    value: &AttributeValue,
    location: &str,
    lookup: &F,
) -> SynthResult<Option<Resolved>>
where
    F: Fn(&AttrRef) -> Option<&'a Resolved>,
{
    let resolved = match value {
        AttributeValue::Literal(literal) => Resolved::Known(literal.clone()),
        AttributeValue::Computed => {
            return Err(SynthError::InvalidExpression {
                location: location.to_string(),
                reason: "computed values are only valid as whole resource attributes".to_string(),
            });
        }
        AttributeValue::Reference(reference) => match lookup(reference) {
            Some(target) => target.clone(),
            None => return Ok(None),
        },
        AttributeValue::Composite(fragments) => {
            // A lone reference keeps its native type
            if let [Fragment::Reference(reference)] = fragments.as_slice() {
                return Ok(lookup(reference).cloned());
            }
            let mut parts = Vec::with_capacity(fragments.len());
            for fragment in fragments {
                match fragment {
                    Fragment::Literal(literal) => parts.push(Resolved::Known(literal.clone())),
                    Fragment::Reference(reference) => match lookup(reference) {
                        Some(target) => parts.push(target.clone()),
                        None => return Ok(None),
                    },
                }
            }
            interpolate(parts)
        }
        AttributeValue::List(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                match evaluate(item, location, lookup)? {
                    Some(item) => resolved.push(item),
                    None => return Ok(None),
                }
            }
            if resolved.iter().all(Resolved::is_known) {
                Resolved::Known(Value::Array(resolved.into_iter().map(|item| item.render()).collect()))
            } else {
                Resolved::Deferred(Deferred::List(resolved))
            }
        }
        AttributeValue::Map(entries) => {
            let mut resolved = BTreeMap::new();
            for (key, entry) in entries {
                match evaluate(entry, location, lookup)? {
                    Some(entry) => {
                        resolved.insert(key.clone(), entry);
                    }
                    None => return Ok(None),
                }
            }
            if resolved.values().all(Resolved::is_known) {
                Resolved::Known(Value::Object(resolved.into_iter().map(|(k, v)| (k, v.render())).collect()))
            } else {
                Resolved::Deferred(Deferred::Map(resolved))
            }
        }
        AttributeValue::JsonEncode(inner) => match evaluate(inner, location, lookup)? {
            Some(Resolved::Known(known)) => Resolved::Known(Value::String(known.to_string())),
            Some(deferred) => Resolved::Deferred(Deferred::JsonEncode(Box::new(deferred))),
            None => return Ok(None),
        },
        AttributeValue::Element {
            source,
            separator,
            index,
        } => match evaluate(source, location, lookup)? {
            Some(Resolved::Known(Value::String(text))) => {
                let element = text.split(separator.as_str()).nth(*index).ok_or_else(|| {
                    SynthError::InvalidExpression {
                        location: location.to_string(),
                        reason: format!(
                            "element {index} of '{text}' split on '{separator}' is out of range"
                        ),
                    }
                })?;
                Resolved::string(element)
            }
            Some(Resolved::Known(other)) => {
                return Err(SynthError::InvalidExpression {
                    location: location.to_string(),
                    reason: format!("cannot split non-string value {other}"),
                });
            }
            Some(deferred) => Resolved::Deferred(Deferred::Element {
                source: Box::new(deferred),
                separator: separator.clone(),
                index: *index,
            }),
            None => return Ok(None),
        },
    };
    Ok(Some(resolved))
}

/// Concatenate resolved parts into a string.
///
/// Adjacent known parts are merged and nested interpolations flattened, so
/// the result is either a known string or an interpolation alternating
/// between text and deferred parts.
fn interpolate(parts: Vec<Resolved>) -> Resolved {
    let mut merged: Vec<Resolved> = Vec::new();
    let mut text = String::new();

    fn flush(text: &mut String, merged: &mut Vec<Resolved>) {
        if !text.is_empty() {
            merged.push(Resolved::string(std::mem::take(text)));
        }
    }

    for part in parts {
        match part {
            Resolved::Known(value) => text.push_str(&stringify(&value)),
            Resolved::Deferred(Deferred::Interpolation(inner)) => {
                for inner_part in inner {
                    match inner_part {
                        Resolved::Known(value) => text.push_str(&stringify(&value)),
                        deferred => {
                            flush(&mut text, &mut merged);
                            merged.push(deferred);
                        }
                    }
                }
            }
            deferred => {
                flush(&mut text, &mut merged);
                merged.push(deferred);
            }
        }
    }

    if merged.is_empty() {
        return Resolved::string(text);
    }
    flush(&mut text, &mut merged);
    Resolved::Deferred(Deferred::Interpolation(merged))
}

/// Resolves every attribute and tag of a declared graph.
#[derive(Debug, Default)]
pub struct TokenResolver;

impl TokenResolver {
    /// Create a resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolve a declared graph.
    ///
    /// # Errors
    ///
    /// - [`SynthError::ReferenceError`] for references to undeclared nodes
    ///   or attributes
    /// - [`SynthError::CycleError`] when attributes wait on each other
    /// - [`SynthError::InvalidExpression`] for element expressions over
    ///   unsplittable known values
    pub fn resolve(&self, graph: ResourceGraph) -> SynthResult<ResolvedGraph> {
        let dependency_graph = DependencyGraph::from_resources(&graph);
        let (declared, edges, outputs) = graph.into_parts();
        let index: HashMap<String, usize> =
            declared.iter().enumerate().map(|(i, node)| (node.id.clone(), i)).collect();

        // Phase 1: addresses and placeholders
        let mut resolved: Vec<BTreeMap<String, Resolved>> = Vec::with_capacity(declared.len());
        let mut pending: Vec<Vec<String>> = Vec::with_capacity(declared.len());
        for node in &declared {
            let address = node.address();
            let mut known = BTreeMap::new();
            let mut waiting = Vec::new();
            for (name, value) in &node.attributes {
                if matches!(value, AttributeValue::Computed) {
                    known.insert(
                        name.clone(),
                        Resolved::Deferred(Deferred::Attribute(Placeholder {
                            address: address.clone(),
                            attribute: name.clone(),
                        })),
                    );
                } else {
                    waiting.push(name.clone());
                }
            }
            resolved.push(known);
            pending.push(waiting);
        }

        // Phase 2: fixed point over the remaining attributes
        let mut pass = 0;
        loop {
            let remaining: usize = pending.iter().map(Vec::len).sum();
            if remaining == 0 {
                break;
            }
            pass += 1;

            let mut progress = 0;
            for (i, node) in declared.iter().enumerate() {
                let mut still_waiting = Vec::new();
                for name in std::mem::take(&mut pending[i]) {
                    let location = format!("{} attribute '{name}'", node.address());
                    let outcome = {
                        let lookup = |reference: &AttrRef| {
                            index.get(&reference.node).and_then(|&j| resolved[j].get(&reference.attribute))
                        };
                        evaluate(&node.attributes[&name], &location, &lookup)?
                    };
                    match outcome {
                        Some(value) => {
                            debug!("Resolved {}.{name}", node.address());
                            resolved[i].insert(name, value);
                            progress += 1;
                        }
                        None => still_waiting.push(name),
                    }
                }
                pending[i] = still_waiting;
            }

            trace!("Resolution pass {pass}: {progress} resolved, {} pending", remaining - progress);
            if progress == 0 {
                return Err(Self::diagnose_stall(&declared, &index, &pending, &dependency_graph));
            }
        }

        // Tags see the fully resolved attribute set of every node
        let mut node_tags = Vec::with_capacity(declared.len());
        for node in &declared {
            let mut tags = BTreeMap::new();
            for (key, value) in &node.tags {
                let location = format!("{} tag '{key}'", node.address());
                for reference in value.references() {
                    Self::check_reference(&declared, &index, reference, &location)?;
                }
                let lookup = |reference: &AttrRef| {
                    index.get(&reference.node).and_then(|&j| resolved[j].get(&reference.attribute))
                };
                let tag = evaluate(value, &location, &lookup)?.ok_or_else(|| SynthError::InvalidExpression {
                    location: location.clone(),
                    reason: "tag did not resolve".to_string(),
                })?;
                tags.insert(key.clone(), tag);
            }
            node_tags.push(tags);
        }

        let mut nodes = Vec::with_capacity(declared.len());
        for ((i, node), tags) in declared.iter().enumerate().zip(node_tags) {
            let mut resolved_node = ResolvedNode {
                id: node.id.clone(),
                kind: node.kind,
                address: node.address(),
                attributes: std::mem::take(&mut resolved[i]),
                tags,
                computed: node
                    .attributes
                    .iter()
                    .filter(|(_, value)| matches!(value, AttributeValue::Computed))
                    .map(|(name, _)| name.clone())
                    .collect(),
                state: node.state,
            };
            resolved_node.advance(NodeState::Resolved);
            nodes.push(resolved_node);
        }

        info!("Resolved {} nodes in {pass} passes", nodes.len());
        Ok(ResolvedGraph {
            nodes,
            index,
            edges,
            outputs,
        })
    }

    fn check_reference(
        declared: &[ResourceNode],
        index: &HashMap<String, usize>,
        reference: &AttrRef,
        referrer: &str,
    ) -> SynthResult<()> {
        match index.get(&reference.node) {
            None => Err(missing_node(reference, referrer, declared.iter().map(|n| &n.id))),
            Some(&j) if !declared[j].attributes.contains_key(&reference.attribute) => Err(missing_attribute(
                reference,
                referrer,
                &declared[j].address(),
                declared[j].attributes.keys(),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Explain why no pass could make progress.
    fn diagnose_stall(
        declared: &[ResourceNode],
        index: &HashMap<String, usize>,
        pending: &[Vec<String>],
        dependency_graph: &DependencyGraph,
    ) -> SynthError {
        for (i, names) in pending.iter().enumerate() {
            let node = &declared[i];
            for name in names {
                let location = format!("{} attribute '{name}'", node.address());
                for reference in node.attributes[name].references() {
                    if let Err(error) = Self::check_reference(declared, index, reference, &location) {
                        return error;
                    }
                }
            }
        }

        // Every reference exists, so the pending attributes wait on each other
        let nodes = dependency_graph.find_cycle().unwrap_or_else(|| {
            pending
                .iter()
                .enumerate()
                .filter(|(_, names)| !names.is_empty())
                .map(|(i, _)| declared[i].id.clone())
                .collect()
        });
        SynthError::CycleError {
            nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Attributes, GraphBuilder};
    use serde_json::json;

    fn resolve(builder: GraphBuilder) -> SynthResult<ResolvedGraph> {
        TokenResolver::new().resolve(builder.build())
    }

    #[test]
    fn test_forward_reference_to_literal_resolves() {
        let mut builder = GraphBuilder::new();
        builder
            .add_node(
                ResourceKind::Subnet,
                "public-a",
                Attributes::new().set("cidr_block", AttrRef::new("vpc", "cidr_block")),
            )
            .unwrap();
        builder
            .add_node(ResourceKind::Vpc, "vpc", Attributes::new().set("cidr_block", "10.0.0.0/16"))
            .unwrap();

        let graph = resolve(builder).unwrap();
        let subnet = graph.node("public-a").unwrap();
        assert_eq!(subnet.attributes["cidr_block"], Resolved::string("10.0.0.0/16"));
        assert_eq!(subnet.state, NodeState::Resolved);
    }

    #[test]
    fn test_whole_reference_keeps_native_type() {
        let mut builder = GraphBuilder::new();
        builder.add_node(ResourceKind::Null, "config", Attributes::new().set("port", 3000_i64)).unwrap();
        builder
            .add_node(
                ResourceKind::Null,
                "consumer",
                Attributes::new()
                    .set("whole", AttrRef::new("config", "port"))
                    .set("single_fragment", AttributeValue::concat([AttrRef::new("config", "port").into()]))
                    .set("embedded", AttributeValue::concat([":".into(), AttrRef::new("config", "port").into()])),
            )
            .unwrap();

        let graph = resolve(builder).unwrap();
        let consumer = graph.node("consumer").unwrap();
        assert_eq!(consumer.attributes["whole"], Resolved::Known(json!(3000)));
        assert_eq!(consumer.attributes["single_fragment"], Resolved::Known(json!(3000)));
        assert_eq!(consumer.attributes["embedded"], Resolved::string(":3000"));
    }

    #[test]
    fn test_composite_over_known_hostname() {
        let mut builder = GraphBuilder::new();
        builder
            .add_node(ResourceKind::Lb, "alb", Attributes::new().set("dns_name", "lb-123.example.com"))
            .unwrap();
        builder
            .add_node(
                ResourceKind::Null,
                "probe",
                Attributes::new().set(
                    "url",
                    AttributeValue::concat(["http://".into(), AttrRef::new("alb", "dns_name").into(), "/health".into()]),
                ),
            )
            .unwrap();

        let graph = resolve(builder).unwrap();
        assert_eq!(
            graph.node("probe").unwrap().attributes["url"],
            Resolved::string("http://lb-123.example.com/health")
        );
    }

    #[test]
    fn test_computed_attributes_become_placeholders() {
        let mut builder = GraphBuilder::new();
        builder.add_node(ResourceKind::Lb, "alb", Attributes::new()).unwrap();
        builder
            .add_node(
                ResourceKind::Null,
                "probe",
                Attributes::new().set(
                    "url",
                    AttributeValue::concat(["http://".into(), AttrRef::new("alb", "dns_name").into(), "/health".into()]),
                ),
            )
            .unwrap();

        let graph = resolve(builder).unwrap();
        let alb = graph.node("alb").unwrap();
        assert_eq!(alb.computed, vec!["arn", "dns_name", "id", "zone_id"]);
        assert_eq!(graph.node("probe").unwrap().attributes["url"].render(), json!("http://${aws_lb.alb.dns_name}/health"));
    }

    #[test]
    fn test_dangling_reference_fails() {
        let mut builder = GraphBuilder::new();
        builder
            .add_node(ResourceKind::Subnet, "public-a", Attributes::new().set("vpc_id", AttrRef::new("vpcc", "id")))
            .unwrap();
        builder.add_node(ResourceKind::Vpc, "vpc", Attributes::new()).unwrap();

        match resolve(builder).unwrap_err() {
            SynthError::ReferenceError {
                reference,
                referrer,
                similar,
                ..
            } => {
                assert_eq!(reference, "vpcc.id");
                assert_eq!(referrer, "aws_subnet.public-a attribute 'vpc_id'");
                assert_eq!(similar, vec!["vpc".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_attribute_fails() {
        let mut builder = GraphBuilder::new();
        builder.add_node(ResourceKind::Vpc, "vpc", Attributes::new()).unwrap();
        builder
            .add_node(ResourceKind::Subnet, "a", Attributes::new().set("cidr", AttrRef::new("vpc", "cidr_block")))
            .unwrap();

        let err = resolve(builder).unwrap_err();
        assert!(matches!(err, SynthError::ReferenceError { ref reason, .. } if reason == "aws_vpc.vpc declares no attribute 'cidr_block'"));
    }

    #[test]
    fn test_mutually_waiting_attributes_are_a_cycle() {
        let mut builder = GraphBuilder::new();
        builder.add_node(ResourceKind::Null, "a", Attributes::new().set("x", AttrRef::new("b", "y"))).unwrap();
        builder.add_node(ResourceKind::Null, "b", Attributes::new().set("y", AttrRef::new("a", "x"))).unwrap();

        match resolve(builder).unwrap_err() {
            SynthError::CycleError {
                nodes,
            } => assert_eq!(nodes, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_element_over_known_and_deferred_strings() {
        let mut builder = GraphBuilder::new();
        builder
            .add_node(
                ResourceKind::Null,
                "split",
                Attributes::new()
                    .set("host", AttributeValue::from("123.dkr.ecr.us-east-2.amazonaws.com/app").element("/", 0))
                    .set("bad", AttributeValue::from("a/b").element("/", 5)),
            )
            .unwrap();
        assert!(matches!(resolve(builder).unwrap_err(), SynthError::InvalidExpression { .. }));

        let mut builder = GraphBuilder::new();
        builder.add_node(ResourceKind::EcrRepository, "repo", Attributes::new()).unwrap();
        builder
            .add_node(
                ResourceKind::Null,
                "split",
                Attributes::new()
                    .set("host", AttributeValue::from("123.dkr.ecr.us-east-2.amazonaws.com/app").element("/", 0))
                    .set("deferred", AttributeValue::from(AttrRef::new("repo", "repository_url")).element("/", 0)),
            )
            .unwrap();
        let graph = resolve(builder).unwrap();
        let node = graph.node("split").unwrap();
        assert_eq!(node.attributes["host"], Resolved::string("123.dkr.ecr.us-east-2.amazonaws.com"));
        assert!(!node.attributes["deferred"].is_known());
    }

    #[test]
    fn test_json_encode_of_known_structure() {
        let mut builder = GraphBuilder::new();
        builder
            .add_node(
                ResourceKind::Null,
                "doc",
                Attributes::new().set(
                    "policy",
                    AttributeValue::map([("Version", AttributeValue::from("2012-10-17"))]).json_encode(),
                ),
            )
            .unwrap();

        let graph = resolve(builder).unwrap();
        assert_eq!(graph.node("doc").unwrap().attributes["policy"], Resolved::string(r#"{"Version":"2012-10-17"}"#));
    }

    #[test]
    fn test_tags_resolve_against_attributes() {
        let mut builder = GraphBuilder::new();
        builder.add_node(ResourceKind::Null, "naming", Attributes::new().set("name", "main")).unwrap();
        builder
            .add_node(
                ResourceKind::Vpc,
                "vpc",
                Attributes::new()
                    .tag("Name", AttributeValue::concat([AttrRef::new("naming", "name").into(), "-vpc".into()])),
            )
            .unwrap();

        let graph = resolve(builder).unwrap();
        assert_eq!(graph.node("vpc").unwrap().tags["Name"], Resolved::string("main-vpc"));
    }

    #[test]
    fn test_lookup_reports_missing_halves() {
        let mut builder = GraphBuilder::new();
        builder.add_node(ResourceKind::Vpc, "vpc", Attributes::new()).unwrap();
        let graph = resolve(builder).unwrap();

        assert!(graph.lookup(&AttrRef::new("vpc", "id"), "output 'vpc_id'").is_ok());
        assert!(graph.lookup(&AttrRef::new("vpc", "nope"), "output 'x'").is_err());
        assert!(graph.lookup(&AttrRef::new("ghost", "id"), "output 'x'").is_err());
    }
}
