//! The synthesis pipeline and its plan artifact.
//!
//! One call to [`synthesize`] runs every stage in order and either returns
//! a complete [`Plan`] or the first fatal error:
//!
//! ```text
//! variables → declare graph → resolve → tag → order → outputs → plan
//! ```
//!
//! Each run owns its builder, graph and variable table, so runs for
//! different environments can execute in parallel.
//!
//! ```rust
//! use stacksynth::stack::ServiceStack;
//! use stacksynth::synth::synthesize;
//! use stacksynth::variables::Overrides;
//!
//! # fn example() -> stacksynth::core::SynthResult<()> {
//! let plan = synthesize(&ServiceStack::new(), &Overrides::new())?;
//! assert_eq!(plan.resources.first().map(|r| r.address.as_str()), Some("aws_provider.aws"));
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

use crate::core::SynthResult;
use crate::graph::{GraphBuilder, NodeState, ResourceGraph, ResourceKind};
use crate::resolver::{DependencyGraph, Resolved, ResolvedGraph, TokenResolver, extract_outputs, propagate_tags};
use crate::utils::sha256_digest;
use crate::variables::{Overrides, ResolvedVariables, VariableTable};

/// A declarative set of resources.
///
/// Implementations declare variables and nodes; they never see the resolver
/// or the planner.
pub trait Stack: Send + Sync {
    /// Stack name recorded in the plan.
    fn name(&self) -> &str;

    /// The variables the stack reads.
    fn variables(&self) -> SynthResult<VariableTable>;

    /// Tags merged into every taggable node.
    fn global_tags(&self, vars: &ResolvedVariables) -> SynthResult<BTreeMap<String, String>>;

    /// Declare nodes and outputs.
    fn declare(&self, vars: &ResolvedVariables, builder: &mut GraphBuilder) -> SynthResult<()>;
}

/// One resource in plan order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedResource {
    /// `<kind>.<id>`
    pub address: String,
    /// Resource kind
    pub kind: ResourceKind,
    /// Node id
    pub id: String,
    /// Ids of direct dependencies, sorted
    pub depends_on: Vec<String>,
    /// Rendered attributes, excluding computed ones
    pub attributes: BTreeMap<String, Value>,
    /// Attributes known only after realization
    pub computed: Vec<String>,
    /// Effective tags
    pub tags: BTreeMap<String, Value>,
}

/// A rendered output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedOutput {
    /// Rendered value
    pub value: Value,
    /// Human-readable description
    pub description: String,
}

/// The terminal artifact of a synthesis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Name of the synthesized stack
    pub stack: String,
    /// The resolved variable table
    pub variables: ResolvedVariables,
    /// Resources in deployment order
    pub resources: Vec<PlannedResource>,
    /// Outputs by name
    pub outputs: BTreeMap<String, PlannedOutput>,
    /// `sha256:<hex>` over the canonical resources and outputs
    pub digest: String,
}

#[derive(Serialize)]
struct DigestBody<'a> {
    resources: &'a [PlannedResource],
    outputs: &'a BTreeMap<String, PlannedOutput>,
}

impl Plan {
    /// Resources in teardown order: dependents before dependencies.
    pub fn teardown_order(&self) -> impl Iterator<Item = &PlannedResource> {
        self.resources.iter().rev()
    }

    /// Find a resource by id.
    #[must_use]
    pub fn resource(&self, id: &str) -> Option<&PlannedResource> {
        self.resources.iter().find(|resource| resource.id == id)
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_json(&self) -> SynthResult<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    /// YAML rendering.
    pub fn to_yaml(&self) -> SynthResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn compute_digest(resources: &[PlannedResource], outputs: &BTreeMap<String, PlannedOutput>) -> SynthResult<String> {
        let body = serde_json::to_vec(&DigestBody {
            resources,
            outputs,
        })?;
        Ok(sha256_digest(&body))
    }
}

/// Resolve variables and declare the stack's graph, without resolving it.
///
/// # Errors
///
/// [`SynthError::ConfigError`](crate::core::SynthError::ConfigError) for bad
/// overrides, or any error the stack raises while declaring nodes.
pub fn declare(stack: &dyn Stack, overrides: &Overrides) -> SynthResult<(ResolvedVariables, ResourceGraph)> {
    let variables = stack.variables()?.resolve(overrides)?;
    info!("Resolved {} variables for stack '{}'", variables.iter().count(), stack.name());

    let mut builder = GraphBuilder::new();
    stack.declare(&variables, &mut builder)?;
    let graph = builder.build();
    info!("Declared {} nodes and {} outputs", graph.nodes().len(), graph.outputs().len());
    Ok((variables, graph))
}

/// Run the whole pipeline for one stack and one set of overrides.
///
/// # Errors
///
/// Any [`SynthError`](crate::core::SynthError) raised by a stage; no plan
/// is produced when a stage fails.
pub fn synthesize(stack: &dyn Stack, overrides: &Overrides) -> SynthResult<Plan> {
    let (variables, graph) = declare(stack, overrides)?;

    let planner = DependencyGraph::from_resources(&graph);
    let mut resolved = TokenResolver::new().resolve(graph)?;

    let global: BTreeMap<String, Resolved> =
        stack.global_tags(&variables)?.into_iter().map(|(k, v)| (k, Resolved::string(v))).collect();
    propagate_tags(&mut resolved, &global);

    let order = planner.topological_order()?;
    for node in resolved.nodes_mut() {
        node.advance(NodeState::Ordered);
    }

    let outputs = extract_outputs(&resolved)?;
    let resources = emit_resources(&mut resolved, &order, &planner);
    let outputs: BTreeMap<String, PlannedOutput> = outputs
        .into_iter()
        .map(|(name, output)| {
            (
                name,
                PlannedOutput {
                    value: output.value.render(),
                    description: output.description,
                },
            )
        })
        .collect();

    let digest = Plan::compute_digest(&resources, &outputs)?;
    info!("Plan for '{}' has {} resources, digest {digest}", stack.name(), resources.len());

    Ok(Plan {
        stack: stack.name().to_string(),
        variables,
        resources,
        outputs,
        digest,
    })
}

fn emit_resources(resolved: &mut ResolvedGraph, order: &[String], planner: &DependencyGraph) -> Vec<PlannedResource> {
    let mut resources = Vec::with_capacity(order.len());
    for id in order {
        let Some(node) = resolved.node(id) else {
            continue;
        };
        let mut depends_on = planner.direct_deps(id);
        depends_on.sort();

        resources.push(PlannedResource {
            address: node.address.clone(),
            kind: node.kind,
            id: node.id.clone(),
            depends_on,
            attributes: node
                .attributes
                .iter()
                .filter(|(name, _)| !node.computed.contains(*name))
                .map(|(k, v)| (k.clone(), v.render()))
                .collect(),
            computed: node.computed.clone(),
            tags: node.tags.iter().map(|(k, v)| (k.clone(), v.render())).collect(),
        });
    }
    for node in resolved.nodes_mut() {
        node.advance(NodeState::Emitted);
    }
    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SynthError;
    use crate::graph::{AttrRef, AttributeValue, Attributes};

    /// A stack declared from a closure, for pipeline tests.
    struct TestStack<F>(F);

    impl<F> Stack for TestStack<F>
    where
        F: Fn(&mut GraphBuilder) -> SynthResult<()> + Send + Sync,
    {
        fn name(&self) -> &str {
            "test"
        }

        fn variables(&self) -> SynthResult<VariableTable> {
            Ok(VariableTable::new())
        }

        fn global_tags(&self, _vars: &ResolvedVariables) -> SynthResult<BTreeMap<String, String>> {
            Ok(BTreeMap::from([("Environment".to_string(), "dev".to_string())]))
        }

        fn declare(&self, _vars: &ResolvedVariables, builder: &mut GraphBuilder) -> SynthResult<()> {
            (self.0)(builder)
        }
    }

    #[test]
    fn test_every_edge_points_backwards_in_plan() {
        let stack = TestStack(|b: &mut GraphBuilder| {
            b.add_node(ResourceKind::Subnet, "subnet", Attributes::new().set("vpc_id", AttrRef::new("vpc", "id")))?;
            b.add_node(ResourceKind::Lb, "alb", Attributes::new().set("subnets", AttributeValue::list([AttrRef::new("subnet", "id").into()])))?;
            b.add_node(ResourceKind::Vpc, "vpc", Attributes::new())?;
            Ok(())
        });
        let plan = synthesize(&stack, &Overrides::new()).unwrap();

        let ids: Vec<&str> = plan.resources.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["vpc", "subnet", "alb"]);
        let teardown: Vec<&str> = plan.teardown_order().map(|r| r.id.as_str()).collect();
        assert_eq!(teardown, vec!["alb", "subnet", "vpc"]);
        assert_eq!(plan.resource("alb").unwrap().depends_on, vec!["subnet"]);
    }

    #[test]
    fn test_node_tag_beats_global_tag() {
        let stack = TestStack(|b: &mut GraphBuilder| {
            b.add_node(ResourceKind::Vpc, "prod-vpc", Attributes::new().tag("Environment", "prod"))?;
            b.add_node(ResourceKind::Vpc, "dev-vpc", Attributes::new())?;
            Ok(())
        });
        let plan = synthesize(&stack, &Overrides::new()).unwrap();

        assert_eq!(plan.resource("prod-vpc").unwrap().tags["Environment"], "prod");
        assert_eq!(plan.resource("dev-vpc").unwrap().tags["Environment"], "dev");
    }

    #[test]
    fn test_cycle_between_computed_attributes_fails() {
        let stack = TestStack(|b: &mut GraphBuilder| {
            b.add_node(ResourceKind::Null, "A", Attributes::new().set("peer", AttrRef::new("B", "id")))?;
            b.add_node(ResourceKind::Null, "B", Attributes::new().set("peer", AttrRef::new("A", "id")))?;
            Ok(())
        });

        match synthesize(&stack, &Overrides::new()) {
            Err(SynthError::CycleError {
                nodes,
            }) => {
                assert!(nodes.contains(&"A".to_string()));
                assert!(nodes.contains(&"B".to_string()));
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_digest_is_deterministic() {
        let declare = |b: &mut GraphBuilder| {
            b.add_node(ResourceKind::Vpc, "vpc", Attributes::new().set("cidr_block", "10.0.0.0/16"))?;
            b.add_output("vpc_id", AttrRef::new("vpc", "id"), "VPC")?;
            Ok(())
        };
        let first = synthesize(&TestStack(declare), &Overrides::new()).unwrap();
        let second = synthesize(&TestStack(declare), &Overrides::new()).unwrap();

        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        assert!(first.digest.starts_with("sha256:"));
    }
}
