//! Explicit graph construction context.
//!
//! Stack code receives a `&mut GraphBuilder`, declares nodes through it and
//! keeps the returned [`NodeHandle`]s to reference those nodes later. There
//! is no ambient registry: two builders never share state, so independent
//! synthesis runs can proceed in parallel.
//!
//! The builder only records what it is told. Forward references and
//! references to nodes that are never declared are both accepted here;
//! the Token Resolver decides which of them are errors.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::node::{NodeHandle, NodeState, ResourceKind, ResourceNode};
use super::value::AttributeValue;
use crate::core::{SynthError, SynthResult};

/// A dependency edge: `from` holds a reference to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    /// The referencing node
    pub from: String,
    /// The referenced node
    pub to: String,
}

/// A named value exported from the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    /// Output name
    pub name: String,
    /// Expression evaluated against the resolved plan
    pub expression: AttributeValue,
    /// Human-readable description
    pub description: String,
}

/// Attributes and tags for one node declaration.
///
/// ```rust
/// use stacksynth::graph::Attributes;
///
/// let attrs = Attributes::new()
///     .set("cidr_block", "10.0.0.0/16")
///     .set("enable_dns_support", true)
///     .tag("Name", "main-vpc");
/// assert_eq!(attrs.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    values: BTreeMap<String, AttributeValue>,
    tags: BTreeMap<String, AttributeValue>,
}

impl Attributes {
    /// Empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing any earlier value for the same name.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Set a node-level tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Number of attributes (tags excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no attribute is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Collects node and output declarations for one synthesis run.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<ResourceNode>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    outputs: Vec<Output>,
}

impl GraphBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a node.
    ///
    /// Computed attributes of `kind` that the declaration does not set are
    /// added as [`AttributeValue::Computed`]. The edges implied by every
    /// reference in the attributes and tags are recorded, including
    /// references to nodes not declared yet.
    ///
    /// # Errors
    ///
    /// [`SynthError::DuplicateNode`] when `id` is already taken.
    pub fn add_node(
        &mut self,
        kind: ResourceKind,
        id: impl Into<String>,
        attributes: Attributes,
    ) -> SynthResult<NodeHandle> {
        let id = id.into();
        if let Some(&existing) = self.index.get(&id) {
            return Err(SynthError::DuplicateNode {
                id,
                existing: self.nodes[existing].address(),
            });
        }

        let Attributes {
            mut values,
            tags,
        } = attributes;
        for name in kind.computed_attributes() {
            values.entry((*name).to_string()).or_insert(AttributeValue::Computed);
        }

        let mut node = ResourceNode {
            id: id.clone(),
            kind,
            attributes: values,
            tags,
            state: NodeState::Declared,
        };

        let dependencies = node.dependencies();
        debug!("Declared {} with {} dependencies", node.address(), dependencies.len());
        self.edges.extend(dependencies.into_iter().map(|to| Edge {
            from: id.clone(),
            to,
        }));
        node.advance(NodeState::Linked);

        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(NodeHandle::new(id, kind))
    }

    /// Declare a named output.
    ///
    /// # Errors
    ///
    /// [`SynthError::DuplicateOutput`] when `name` is already taken.
    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        expression: impl Into<AttributeValue>,
        description: impl Into<String>,
    ) -> SynthResult<()> {
        let name = name.into();
        if self.outputs.iter().any(|output| output.name == name) {
            return Err(SynthError::DuplicateOutput {
                name,
            });
        }
        self.outputs.push(Output {
            name,
            expression: expression.into(),
            description: description.into(),
        });
        Ok(())
    }

    /// Number of declared nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finish construction.
    #[must_use]
    pub fn build(self) -> ResourceGraph {
        ResourceGraph {
            nodes: self.nodes,
            index: self.index,
            edges: self.edges,
            outputs: self.outputs,
        }
    }
}

/// The declared graph: nodes in declaration order, their edges and outputs.
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    outputs: Vec<Output>,
}

impl ResourceGraph {
    /// Nodes in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// All recorded edges, grouped by referencing node in declaration order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Declared outputs in declaration order.
    #[must_use]
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Node ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.nodes.iter().map(|node| &node.id)
    }

    /// Consume the graph into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<ResourceNode>, Vec<Edge>, Vec<Output>) {
        (self.nodes, self.edges, self.outputs)
    }
}
