//! Values exported from the plan for deployment tooling.

use crate::constants::HEALTH_CHECK_PATH;
use crate::core::SynthResult;
use crate::graph::{AttributeValue, GraphBuilder};

use super::ServiceHandles;

/// Declare the stack outputs.
pub fn declare_outputs(handles: &ServiceHandles, builder: &mut GraphBuilder) -> SynthResult<()> {
    let repository = &handles.repository;
    let alb = &handles.load_balancing.alb;
    let [public_a, public_b] = &handles.network.public_subnets;
    let [private_1, private_2] = &handles.network.private_subnets;

    builder.add_output(
        "ecr_repository_url",
        repository.attr("repository_url"),
        "ECR Repository URL for pushing/pulling images",
    )?;
    builder.add_output(
        "ecr_registry_host",
        repository.attr("repository_url").element("/", 0),
        "ECR registry hostname (no repository name)",
    )?;
    builder.add_output(
        "ecr_repository_name",
        repository.attr("name"),
        "ECR repository name (used in image tagging)",
    )?;
    builder.add_output("alb_dns_name", alb.attr("dns_name"), "Public DNS of the Application Load Balancer")?;
    builder.add_output(
        "health_check_url",
        AttributeValue::concat(["http://".into(), alb.reference("dns_name").into(), HEALTH_CHECK_PATH.into()]),
        "Public health endpoint for verifying the deployment",
    )?;
    builder.add_output("ecs_cluster_name", handles.cluster.attr("name"), "ECS Cluster name")?;
    builder.add_output("ecs_service_name", handles.service.attr("name"), "ECS Service name")?;
    builder.add_output(
        "task_definition_arn",
        handles.task_definition.attr("arn"),
        "Full ARN of the ECS Task Definition",
    )?;
    builder.add_output("vpc_id", handles.network.vpc.attr("id"), "VPC ID")?;
    builder.add_output(
        "public_subnet_ids",
        AttributeValue::list([public_a.attr("id"), public_b.attr("id")]),
        "Public subnet IDs",
    )?;
    builder.add_output(
        "private_subnet_ids",
        AttributeValue::list([private_1.attr("id"), private_2.attr("id")]),
        "Private subnet IDs",
    )?;
    builder.add_output(
        "target_group_arn",
        handles.load_balancing.target_group.attr("arn"),
        "Target Group ARN for ECS service",
    )
}
