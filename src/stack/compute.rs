//! Logs, cluster, roles and the Fargate task definition.

use crate::config::StackConfig;
use crate::constants::HEALTH_CHECK_PATH;
use crate::core::SynthResult;
use crate::graph::{AttributeValue, Attributes, GraphBuilder, NodeHandle, ResourceKind};

use super::named;

const TASK_EXECUTION_POLICY_ARN: &str = "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy";
const TASKS_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";
const LOG_RETENTION_DAYS: i64 = 7;

/// Handles of the compute nodes.
#[derive(Debug, Clone)]
pub struct Compute {
    /// Log group receiving container output
    pub log_group: NodeHandle,
    /// Container cluster
    pub cluster: NodeHandle,
    /// Task definition
    pub task_definition: NodeHandle,
}

/// Declare logs, cluster, roles and the task definition.
pub fn declare_compute(
    config: &StackConfig,
    repository: &NodeHandle,
    builder: &mut GraphBuilder,
) -> SynthResult<Compute> {
    let log_group = builder.add_node(
        ResourceKind::CloudwatchLogGroup,
        "log-group",
        named(config, "logs")
            .set("name", format!("/ecs/{}", config.prefix))
            .set("retention_in_days", LOG_RETENTION_DAYS),
    )?;

    let cluster = builder.add_node(
        ResourceKind::EcsCluster,
        "cluster",
        named(config, "cluster").set("name", config.name("cluster")).set(
            "setting",
            AttributeValue::list([AttributeValue::map([("name", "containerInsights"), ("value", "enabled")])]),
        ),
    )?;

    // Execution role: pulls images and ships logs on the task's behalf
    let execution_role = builder.add_node(
        ResourceKind::IamRole,
        "task-exec-role",
        named(config, "task-exec-role")
            .set("name", config.name("task-exec-role"))
            .set("assume_role_policy", assume_role_policy()),
    )?;
    builder.add_node(
        ResourceKind::IamRolePolicyAttachment,
        "task-exec-policy",
        Attributes::new().set("role", execution_role.attr("id")).set("policy_arn", TASK_EXECUTION_POLICY_ARN),
    )?;

    // Task role: what the container itself may call; no policies attached
    let task_role = builder.add_node(
        ResourceKind::IamRole,
        "task-role",
        named(config, "task-role")
            .set("name", config.name("task-role"))
            .set("assume_role_policy", assume_role_policy()),
    )?;

    let task_definition = builder.add_node(
        ResourceKind::EcsTaskDefinition,
        "taskdef",
        named(config, "task")
            .set("family", config.name("task"))
            .set("network_mode", "awsvpc")
            .set("requires_compatibilities", AttributeValue::list(["FARGATE".into()]))
            .set("cpu", config.task_cpu.as_str())
            .set("memory", config.task_memory.as_str())
            .set("execution_role_arn", execution_role.attr("arn"))
            .set("task_role_arn", task_role.attr("arn"))
            .set("container_definitions", container_definitions(config, repository, &log_group)),
    )?;

    Ok(Compute {
        log_group,
        cluster,
        task_definition,
    })
}

/// Trust policy letting container tasks assume a role.
fn assume_role_policy() -> AttributeValue {
    let statement = AttributeValue::map([
        ("Effect", AttributeValue::from("Allow")),
        ("Principal", AttributeValue::map([("Service", TASKS_PRINCIPAL)])),
        ("Action", AttributeValue::from("sts:AssumeRole")),
    ]);
    AttributeValue::map([
        ("Version", AttributeValue::from("2012-10-17")),
        ("Statement", AttributeValue::list([statement])),
    ])
    .json_encode()
}

/// The single container, JSON-encoded as the task definition expects.
fn container_definitions(config: &StackConfig, repository: &NodeHandle, log_group: &NodeHandle) -> AttributeValue {
    let port = i64::from(config.container_port);
    let image = AttributeValue::concat([
        repository.reference("repository_url").into(),
        format!(":{}", config.image_tag).into(),
    ]);
    let health_check = AttributeValue::map([
        (
            "command",
            AttributeValue::list([
                "CMD-SHELL".into(),
                format!("wget --spider -q http://localhost:{port}{HEALTH_CHECK_PATH} || exit 1").into(),
            ]),
        ),
        ("interval", 30_i64.into()),
        ("timeout", 5_i64.into()),
        ("retries", 3_i64.into()),
        ("startPeriod", 10_i64.into()),
    ]);
    let log_configuration = AttributeValue::map([
        ("logDriver", AttributeValue::from("awslogs")),
        (
            "options",
            AttributeValue::map([
                ("awslogs-group", log_group.attr("name")),
                ("awslogs-region", config.region.as_str().into()),
                ("awslogs-stream-prefix", "ecs".into()),
            ]),
        ),
    ]);
    let environment = AttributeValue::list([
        AttributeValue::map([("name", "NODE_ENV"), ("value", "production")]),
        AttributeValue::map([("name", "PORT".to_string()), ("value", port.to_string())]),
    ]);

    AttributeValue::list([AttributeValue::map([
        ("name", AttributeValue::from(config.name("container"))),
        ("image", image),
        ("essential", true.into()),
        (
            "portMappings",
            AttributeValue::list([AttributeValue::map([
                ("containerPort", AttributeValue::from(port)),
                ("protocol", "tcp".into()),
            ])]),
        ),
        ("healthCheck", health_check),
        ("logConfiguration", log_configuration),
        ("environment", environment),
    ])])
    .json_encode()
}
