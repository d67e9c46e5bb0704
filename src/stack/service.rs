//! The container service running the workload.

use crate::config::StackConfig;
use crate::core::SynthResult;
use crate::graph::{AttributeValue, GraphBuilder, NodeHandle, ResourceKind};

use super::compute::Compute;
use super::load_balancing::LoadBalancing;
use super::network::Network;

const DESIRED_COUNT: i64 = 1;
const GRACE_PERIOD_SECS: i64 = 30;
const MIN_HEALTHY_PERCENT: i64 = 50;
const MAX_PERCENT: i64 = 200;

/// Declare the Fargate service.
///
/// Tasks run in the private subnets without public addresses and register
/// with the target group under the container's name and port.
pub fn declare_service(
    config: &StackConfig,
    network: &Network,
    compute: &Compute,
    load_balancing: &LoadBalancing,
    builder: &mut GraphBuilder,
) -> SynthResult<NodeHandle> {
    let [private_1, private_2] = &network.private_subnets;

    builder.add_node(
        ResourceKind::EcsService,
        "ecs-service",
        super::named(config, "service")
            .set("name", config.name("service"))
            .set("cluster", compute.cluster.attr("id"))
            .set("launch_type", "FARGATE")
            .set("task_definition", compute.task_definition.attr("arn"))
            .set("desired_count", DESIRED_COUNT)
            .set("enable_ecs_managed_tags", true)
            .set("propagate_tags", "SERVICE")
            .set("deployment_controller", AttributeValue::map([("type", "ECS")]))
            .set("health_check_grace_period_seconds", GRACE_PERIOD_SECS)
            .set(
                "network_configuration",
                AttributeValue::map([
                    ("subnets", AttributeValue::list([private_1.attr("id"), private_2.attr("id")])),
                    ("security_groups", AttributeValue::list([load_balancing.task_security_group.attr("id")])),
                    ("assign_public_ip", false.into()),
                ]),
            )
            .set(
                "load_balancer",
                AttributeValue::list([AttributeValue::map([
                    ("container_name", AttributeValue::from(config.name("container"))),
                    ("container_port", i64::from(config.container_port).into()),
                    ("target_group_arn", load_balancing.target_group.attr("arn")),
                ])]),
            )
            .set("deployment_minimum_healthy_percent", MIN_HEALTHY_PERCENT)
            .set("deployment_maximum_percent", MAX_PERCENT),
    )
}
