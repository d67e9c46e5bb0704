//! Security groups, the public load balancer, its target group and listener.
//!
//! The target group's health probe is the contract with the workload: it
//! must answer `GET /health` with a status in the matcher range.

use crate::config::StackConfig;
use crate::constants::{
    HEALTH_CHECK_INTERVAL_SECS, HEALTH_CHECK_MATCHER, HEALTH_CHECK_PATH, HEALTH_CHECK_TIMEOUT_SECS,
    HEALTHY_THRESHOLD, LISTENER_PORT, UNHEALTHY_THRESHOLD,
};
use crate::core::SynthResult;
use crate::graph::{AttributeValue, Attributes, GraphBuilder, NodeHandle, ResourceKind};

use super::named;
use super::network::Network;

const ANYWHERE: &str = "0.0.0.0/0";
const IDLE_TIMEOUT_SECS: i64 = 60;

/// Handles of the load balancing nodes.
#[derive(Debug, Clone)]
pub struct LoadBalancing {
    /// Security group of the load balancer
    pub alb_security_group: NodeHandle,
    /// Security group of the tasks
    pub task_security_group: NodeHandle,
    /// The load balancer
    pub alb: NodeHandle,
    /// Target group the tasks register into
    pub target_group: NodeHandle,
    /// HTTP listener
    pub listener: NodeHandle,
}

/// Declare security groups, load balancer, target group and listener.
pub fn declare_load_balancing(
    config: &StackConfig,
    network: &Network,
    builder: &mut GraphBuilder,
) -> SynthResult<LoadBalancing> {
    let port = i64::from(config.container_port);
    let listener_port = i64::from(LISTENER_PORT);

    let alb_sg = builder.add_node(
        ResourceKind::SecurityGroup,
        "alb-sg",
        named(config, "alb-sg")
            .set("name", config.name("alb-sg"))
            .set("description", "Security group for public-facing ALB")
            .set("vpc_id", network.vpc.attr("id")),
    )?;
    builder.add_node(
        ResourceKind::SecurityGroupRule,
        "alb-ingress-80",
        rule("ingress", listener_port, "tcp", &alb_sg)
            .set("cidr_blocks", AttributeValue::list([ANYWHERE.into()]))
            .set("description", "Allow inbound HTTP"),
    )?;
    builder.add_node(
        ResourceKind::SecurityGroupRule,
        "alb-egress-all",
        rule("egress", 0, "-1", &alb_sg)
            .set("cidr_blocks", AttributeValue::list([ANYWHERE.into()]))
            .set("description", "Allow outbound to anywhere"),
    )?;

    let task_sg = builder.add_node(
        ResourceKind::SecurityGroup,
        "task-sg",
        named(config, "task-sg")
            .set("name", config.name("task-sg"))
            .set("description", "Allow inbound traffic only from ALB to ECS tasks")
            .set("vpc_id", network.vpc.attr("id")),
    )?;
    builder.add_node(
        ResourceKind::SecurityGroupRule,
        "task-ingress-alb",
        rule("ingress", port, "tcp", &task_sg).set("source_security_group_id", alb_sg.attr("id")),
    )?;
    builder.add_node(
        ResourceKind::SecurityGroupRule,
        "task-egress",
        rule("egress", 0, "-1", &task_sg).set("cidr_blocks", AttributeValue::list([ANYWHERE.into()])),
    )?;

    let [public_a, public_b] = &network.public_subnets;
    let alb = builder.add_node(
        ResourceKind::Lb,
        "alb",
        named(config, "alb")
            .set("name", config.name("alb"))
            .set("load_balancer_type", "application")
            .set("security_groups", AttributeValue::list([alb_sg.attr("id")]))
            .set("subnets", AttributeValue::list([public_a.attr("id"), public_b.attr("id")]))
            .set("idle_timeout", IDLE_TIMEOUT_SECS),
    )?;

    let target_group = builder.add_node(
        ResourceKind::LbTargetGroup,
        "tg",
        named(config, "tg")
            .set("name", config.name("tg"))
            .set("port", port)
            .set("protocol", "HTTP")
            .set("target_type", "ip")
            .set("vpc_id", network.vpc.attr("id"))
            .set("health_check", health_check()),
    )?;

    let listener = builder.add_node(
        ResourceKind::LbListener,
        "listener",
        named(config, "listener")
            .set("load_balancer_arn", alb.attr("arn"))
            .set("port", listener_port)
            .set("protocol", "HTTP")
            .set(
                "default_action",
                AttributeValue::list([AttributeValue::map([
                    ("type", AttributeValue::from("forward")),
                    ("target_group_arn", target_group.attr("arn")),
                ])]),
            ),
    )?;

    Ok(LoadBalancing {
        alb_security_group: alb_sg,
        task_security_group: task_sg,
        alb,
        target_group,
        listener,
    })
}

/// A rule on one port (or all ports when `port` is 0).
fn rule(direction: &str, port: i64, protocol: &str, group: &NodeHandle) -> Attributes {
    Attributes::new()
        .set("type", direction)
        .set("from_port", port)
        .set("to_port", port)
        .set("protocol", protocol)
        .set("security_group_id", group.attr("id"))
}

/// The load balancer's probe of the workload's liveness endpoint.
fn health_check() -> AttributeValue {
    AttributeValue::map([
        ("path", AttributeValue::from(HEALTH_CHECK_PATH)),
        ("healthy_threshold", HEALTHY_THRESHOLD.into()),
        ("unhealthy_threshold", UNHEALTHY_THRESHOLD.into()),
        ("interval", HEALTH_CHECK_INTERVAL_SECS.into()),
        ("timeout", HEALTH_CHECK_TIMEOUT_SECS.into()),
        ("matcher", HEALTH_CHECK_MATCHER.into()),
    ])
}
