//! The containerized web service stack.
//!
//! Declares everything needed to run one HTTP workload on a container
//! platform behind a public load balancer:
//!
//! - [`registry`]: image repository
//! - [`network`]: VPC, public and private subnets, gateways and routes
//! - [`compute`]: logs, cluster, roles and the task definition
//! - [`load_balancing`]: security groups, load balancer, target group and listener
//! - [`service`]: the long-running container service
//! - [`outputs`]: values exported for deployment tooling
//!
//! Resources are declared in the order above; the planner reorders them
//! by dependency.

pub mod compute;
pub mod load_balancing;
pub mod network;
pub mod outputs;
pub mod registry;
pub mod service;

use std::collections::BTreeMap;
use tracing::info;

use crate::config::StackConfig;
use crate::core::SynthResult;
use crate::graph::{Attributes, GraphBuilder, NodeHandle, ResourceKind};
use crate::synth::Stack;
use crate::variables::{ResolvedVariables, VariableTable, VariableType, VariableValue};

/// Handles of the nodes other parts of the stack reference.
#[derive(Debug, Clone)]
pub struct ServiceHandles {
    /// Image repository
    pub repository: NodeHandle,
    /// Network layout
    pub network: network::Network,
    /// Container cluster
    pub cluster: NodeHandle,
    /// Task definition
    pub task_definition: NodeHandle,
    /// Load balancing layer
    pub load_balancing: load_balancing::LoadBalancing,
    /// Container service
    pub service: NodeHandle,
}

/// The service stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceStack;

impl ServiceStack {
    /// Create the stack.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// The variables the service stack reads, with their defaults.
pub fn service_variables() -> SynthResult<VariableTable> {
    let mut table = VariableTable::new();
    let strings = [
        ("project", "turbo", "Project name (e.g. turbo, payments, analytics)"),
        ("service", "app", "Service name (e.g. api, worker, ingestion)"),
        ("env", "dev", "Deployment environment (dev/staging/prod)"),
        ("region", "us-east-2", "Cloud region for deployment"),
    ];
    for (name, default, description) in strings {
        table.define(name, VariableType::String, Some(VariableValue::from(default)))?.describe(description);
    }
    table
        .define("containerPort", VariableType::Number, Some(VariableValue::from(3000_i64)))?
        .describe("Port the container listens on");
    table
        .define("imageTag", VariableType::String, Some(VariableValue::from("latest")))?
        .describe("Container image tag to deploy");
    table
        .define("az1", VariableType::String, Some(VariableValue::from("us-east-2a")))?
        .describe("Primary availability zone");
    table
        .define("az2", VariableType::String, Some(VariableValue::from("us-east-2b")))?
        .describe("Secondary availability zone");
    table
        .define("taskCpu", VariableType::String, Some(VariableValue::from("256")))?
        .describe("Task CPU units");
    table
        .define("taskMemory", VariableType::String, Some(VariableValue::from("512")))?
        .describe("Task memory (MiB)");
    table
        .define("extraTags", VariableType::Map, Some(VariableValue::Map(BTreeMap::new())))?
        .describe("Additional tags for every taggable resource; built-in tags win on conflict");
    Ok(table)
}

impl Stack for ServiceStack {
    fn name(&self) -> &str {
        "service"
    }

    fn variables(&self) -> SynthResult<VariableTable> {
        service_variables()
    }

    fn global_tags(&self, vars: &ResolvedVariables) -> SynthResult<BTreeMap<String, String>> {
        Ok(StackConfig::from_variables(vars)?.global_tags)
    }

    fn declare(&self, vars: &ResolvedVariables, builder: &mut GraphBuilder) -> SynthResult<()> {
        let config = StackConfig::from_variables(vars)?;
        info!("Declaring service stack {}", config.prefix);

        builder.add_node(ResourceKind::AwsProvider, "aws", Attributes::new().set("region", config.region.as_str()))?;

        let repository = registry::declare_registry(&config, builder)?;
        let network = network::declare_network(&config, builder)?;
        let compute = compute::declare_compute(&config, &repository, builder)?;
        let load_balancing = load_balancing::declare_load_balancing(&config, &network, builder)?;
        let service = service::declare_service(&config, &network, &compute, &load_balancing, builder)?;

        let handles = ServiceHandles {
            repository,
            network,
            cluster: compute.cluster,
            task_definition: compute.task_definition,
            load_balancing,
            service,
        };
        outputs::declare_outputs(&handles, builder)
    }
}

/// `Name` tag attributes for a resource named `<prefix>-<suffix>`.
pub(crate) fn named(config: &StackConfig, suffix: &str) -> Attributes {
    Attributes::new().tag("Name", config.name(suffix))
}
