//! Resource nodes and the schema of each resource kind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::value::{AttrRef, AttributeValue};

/// The kind of a declared resource.
///
/// Kinds carry the schema the synthesizer needs: which attributes only exist
/// once the resource is realized, and whether the resource accepts tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Cloud provider configuration
    #[serde(rename = "aws_provider")]
    AwsProvider,
    /// Container image repository
    #[serde(rename = "aws_ecr_repository")]
    EcrRepository,
    /// Virtual network
    #[serde(rename = "aws_vpc")]
    Vpc,
    /// Network subnet
    #[serde(rename = "aws_subnet")]
    Subnet,
    /// Internet gateway
    #[serde(rename = "aws_internet_gateway")]
    InternetGateway,
    /// Route table
    #[serde(rename = "aws_route_table")]
    RouteTable,
    /// Subnet to route table binding
    #[serde(rename = "aws_route_table_association")]
    RouteTableAssociation,
    /// Single route entry
    #[serde(rename = "aws_route")]
    Route,
    /// Elastic IP address
    #[serde(rename = "aws_eip")]
    Eip,
    /// NAT gateway
    #[serde(rename = "aws_nat_gateway")]
    NatGateway,
    /// Container cluster
    #[serde(rename = "aws_ecs_cluster")]
    EcsCluster,
    /// Identity role
    #[serde(rename = "aws_iam_role")]
    IamRole,
    /// Managed policy attached to a role
    #[serde(rename = "aws_iam_role_policy_attachment")]
    IamRolePolicyAttachment,
    /// Log group
    #[serde(rename = "aws_cloudwatch_log_group")]
    CloudwatchLogGroup,
    /// Container task definition
    #[serde(rename = "aws_ecs_task_definition")]
    EcsTaskDefinition,
    /// Security group
    #[serde(rename = "aws_security_group")]
    SecurityGroup,
    /// Security group ingress or egress rule
    #[serde(rename = "aws_security_group_rule")]
    SecurityGroupRule,
    /// Load balancer
    #[serde(rename = "aws_lb")]
    Lb,
    /// Load balancer listener
    #[serde(rename = "aws_lb_listener")]
    LbListener,
    /// Load balancer target group
    #[serde(rename = "aws_lb_target_group")]
    LbTargetGroup,
    /// Container service
    #[serde(rename = "aws_ecs_service")]
    EcsService,
    /// Generic resource with no provider semantics
    #[serde(rename = "null_resource")]
    Null,
}

impl ResourceKind {
    /// The kind's type name as it appears in addresses, e.g. `aws_vpc`.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::AwsProvider => "aws_provider",
            Self::EcrRepository => "aws_ecr_repository",
            Self::Vpc => "aws_vpc",
            Self::Subnet => "aws_subnet",
            Self::InternetGateway => "aws_internet_gateway",
            Self::RouteTable => "aws_route_table",
            Self::RouteTableAssociation => "aws_route_table_association",
            Self::Route => "aws_route",
            Self::Eip => "aws_eip",
            Self::NatGateway => "aws_nat_gateway",
            Self::EcsCluster => "aws_ecs_cluster",
            Self::IamRole => "aws_iam_role",
            Self::IamRolePolicyAttachment => "aws_iam_role_policy_attachment",
            Self::CloudwatchLogGroup => "aws_cloudwatch_log_group",
            Self::EcsTaskDefinition => "aws_ecs_task_definition",
            Self::SecurityGroup => "aws_security_group",
            Self::SecurityGroupRule => "aws_security_group_rule",
            Self::Lb => "aws_lb",
            Self::LbListener => "aws_lb_listener",
            Self::LbTargetGroup => "aws_lb_target_group",
            Self::EcsService => "aws_ecs_service",
            Self::Null => "null_resource",
        }
    }

    /// Attributes known only after the resource is realized.
    #[must_use]
    pub const fn computed_attributes(self) -> &'static [&'static str] {
        match self {
            Self::AwsProvider => &[],
            Self::EcrRepository => &["id", "arn", "registry_id", "repository_url"],
            Self::Vpc => &["id", "arn", "default_route_table_id", "main_route_table_id"],
            Self::Eip => &["id", "allocation_id", "public_ip"],
            Self::NatGateway => &["id", "public_ip", "network_interface_id"],
            Self::IamRole => &["id", "arn", "unique_id"],
            Self::EcsTaskDefinition => &["id", "arn", "revision"],
            Self::Lb => &["id", "arn", "dns_name", "zone_id"],
            Self::LbTargetGroup => &["id", "arn", "arn_suffix"],
            Self::Subnet
            | Self::InternetGateway
            | Self::RouteTable
            | Self::EcsCluster
            | Self::CloudwatchLogGroup
            | Self::SecurityGroup
            | Self::LbListener
            | Self::EcsService => &["id", "arn"],
            Self::RouteTableAssociation
            | Self::Route
            | Self::IamRolePolicyAttachment
            | Self::SecurityGroupRule
            | Self::Null => &["id"],
        }
    }

    /// Whether the kind accepts tags.
    #[must_use]
    pub const fn supports_tags(self) -> bool {
        !matches!(
            self,
            Self::AwsProvider
                | Self::Route
                | Self::RouteTableAssociation
                | Self::IamRolePolicyAttachment
                | Self::SecurityGroupRule
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Where a node is in its synthesis lifecycle.
///
/// States only move forward within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// Added to the builder
    Declared,
    /// Dependency edges computed
    Linked,
    /// Attributes substituted
    Resolved,
    /// Placed in the plan order
    Ordered,
    /// Written into a plan
    Emitted,
}

/// A declared resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    /// Unique id within the graph
    pub id: String,
    /// Resource kind
    pub kind: ResourceKind,
    /// Attribute values, including injected computed attributes
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Node-level tags
    pub tags: BTreeMap<String, AttributeValue>,
    /// Lifecycle state
    pub state: NodeState,
}

impl ResourceNode {
    /// The node's address, e.g. `aws_lb.alb`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}.{}", self.kind, self.id)
    }

    /// Ids of the nodes this node references, deduplicated and sorted.
    ///
    /// Includes references made from tags as well as attributes.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .attributes
            .values()
            .chain(self.tags.values())
            .flat_map(AttributeValue::references)
            .map(|reference| reference.node.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Move the node forward to `next`; earlier states are ignored.
    pub(crate) fn advance(&mut self, next: NodeState) {
        if next > self.state {
            self.state = next;
        }
    }
}

/// Opaque handle to a node returned by the builder.
///
/// Handles are the only way stack code refers to other nodes, so every
/// reference is built from an id that was actually declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    id: String,
    kind: ResourceKind,
}

impl NodeHandle {
    pub(crate) fn new(id: String, kind: ResourceKind) -> Self {
        Self {
            id,
            kind,
        }
    }

    /// The node id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The node kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// A reference to one of the node's attributes.
    #[must_use]
    pub fn reference(&self, attribute: &str) -> AttrRef {
        AttrRef::new(self.id.clone(), attribute)
    }

    /// A whole-reference attribute value for one of the node's attributes.
    #[must_use]
    pub fn attr(&self, attribute: &str) -> AttributeValue {
        AttributeValue::Reference(self.reference(attribute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_serialization() {
        for kind in [ResourceKind::Vpc, ResourceKind::Lb, ResourceKind::Null, ResourceKind::EcsService] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.type_name().to_string()));
        }
    }

    #[test]
    fn test_tag_support() {
        assert!(ResourceKind::Vpc.supports_tags());
        assert!(ResourceKind::Lb.supports_tags());
        assert!(!ResourceKind::Route.supports_tags());
        assert!(!ResourceKind::AwsProvider.supports_tags());
        assert!(!ResourceKind::SecurityGroupRule.supports_tags());
        assert!(ResourceKind::Null.supports_tags());
    }

    #[test]
    fn test_every_kind_except_provider_has_an_id() {
        assert!(ResourceKind::AwsProvider.computed_attributes().is_empty());
        assert!(ResourceKind::Lb.computed_attributes().contains(&"dns_name"));
        assert!(ResourceKind::Route.computed_attributes().contains(&"id"));
    }

    #[test]
    fn test_state_only_moves_forward() {
        let mut node = ResourceNode {
            id: "vpc".to_string(),
            kind: ResourceKind::Vpc,
            attributes: BTreeMap::new(),
            tags: BTreeMap::new(),
            state: NodeState::Declared,
        };
        node.advance(NodeState::Resolved);
        node.advance(NodeState::Linked);
        assert_eq!(node.state, NodeState::Resolved);
        assert_eq!(node.address(), "aws_vpc.vpc");
    }

    #[test]
    fn test_dependencies_include_tags() {
        let mut node = ResourceNode {
            id: "sg".to_string(),
            kind: ResourceKind::SecurityGroup,
            attributes: BTreeMap::from([("vpc_id".to_string(), AttrRef::new("vpc", "id").into())]),
            tags: BTreeMap::from([("Owner".to_string(), AttrRef::new("role", "arn").into())]),
            state: NodeState::Declared,
        };
        assert_eq!(node.dependencies(), vec!["role".to_string(), "vpc".to_string()]);
        node.tags.clear();
        assert_eq!(node.dependencies(), vec!["vpc".to_string()]);
    }
}
