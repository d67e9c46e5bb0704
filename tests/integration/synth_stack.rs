//! End-to-end synthesis of the built-in service stack.

use serde_json::json;
use std::collections::HashMap;

use stacksynth::graph::{AttrRef, AttributeValue, Attributes, GraphBuilder, ResourceKind};
use stacksynth::stack::ServiceStack;
use stacksynth::synth::{Plan, synthesize};
use stacksynth::test_utils::{flag_overrides, init_test_logging};
use stacksynth::variables::Overrides;

use crate::common::ClosureStack;

fn default_plan() -> Plan {
    init_test_logging(None);
    synthesize(&ServiceStack::new(), &Overrides::new()).unwrap()
}

#[test]
fn test_plan_shape() {
    let plan = default_plan();

    assert_eq!(plan.stack, "service");
    assert_eq!(plan.resources.len(), 34);
    assert_eq!(plan.outputs.len(), 12);
    assert_eq!(plan.resources.first().unwrap().address, "aws_provider.aws");
    assert_eq!(plan.resources.last().unwrap().address, "aws_ecs_service.ecs-service");
}

#[test]
fn test_every_dependency_precedes_its_dependent() {
    let plan = default_plan();
    let position: HashMap<&str, usize> =
        plan.resources.iter().enumerate().map(|(i, r)| (r.id.as_str(), i)).collect();

    for (index, resource) in plan.resources.iter().enumerate() {
        for dependency in &resource.depends_on {
            assert!(
                position[dependency.as_str()] < index,
                "{} is planned before its dependency {dependency}",
                resource.id
            );
        }
    }
}

#[test]
fn test_teardown_reverses_deployment() {
    let plan = default_plan();
    let deploy: Vec<&str> = plan.resources.iter().map(|r| r.id.as_str()).collect();
    let mut teardown: Vec<&str> = plan.teardown_order().map(|r| r.id.as_str()).collect();
    teardown.reverse();

    assert_eq!(deploy, teardown);
}

#[test]
fn test_synthesis_is_deterministic() {
    let first = default_plan();
    let second = default_plan();

    assert_eq!(first.digest, second.digest);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_overrides_change_names_and_digest() {
    let dev = default_plan();
    let prod = synthesize(&ServiceStack::new(), &flag_overrides(&[("env", "prod"), ("project", "payments")])).unwrap();

    assert_eq!(dev.resource("cluster").unwrap().attributes["name"], "turbo-app-dev-cluster");
    assert_eq!(prod.resource("cluster").unwrap().attributes["name"], "payments-app-prod-cluster");
    assert_eq!(prod.resource("log-group").unwrap().attributes["name"], "/ecs/payments-app-prod");
    assert_ne!(dev.digest, prod.digest);
}

#[test]
fn test_outputs_compose_deferred_values() {
    let plan = default_plan();

    assert_eq!(plan.outputs["health_check_url"].value, "http://${aws_lb.alb.dns_name}/health");
    assert_eq!(
        plan.outputs["ecr_registry_host"].value,
        r#"${element(split("/", aws_ecr_repository.ecr-repo.repository_url), 0)}"#
    );
    assert_eq!(plan.outputs["ecr_repository_name"].value, "turbo-app");
    assert_eq!(plan.outputs["ecs_service_name"].value, "turbo-app-dev-service");
    assert_eq!(
        plan.outputs["private_subnet_ids"].value,
        json!(["${aws_subnet.private-subnet-az1.id}", "${aws_subnet.private-subnet-az2.id}"])
    );
    assert_eq!(plan.outputs["vpc_id"].description, "VPC ID");
}

#[test]
fn test_global_tags_reach_taggable_resources_only() {
    let plan = synthesize(&ServiceStack::new(), &flag_overrides(&[("extraTags", r#"{"Team":"platform"}"#)])).unwrap();

    let vpc = plan.resource("vpc").unwrap();
    assert_eq!(vpc.tags["Name"], "turbo-app-dev-vpc");
    assert_eq!(vpc.tags["Project"], "turbo");
    assert_eq!(vpc.tags["Environment"], "dev");
    assert_eq!(vpc.tags["ManagedBy"], "stacksynth");
    assert_eq!(vpc.tags["Team"], "platform");

    assert!(plan.resource("public-default-route").unwrap().tags.is_empty());
    assert!(plan.resource("aws").unwrap().tags.is_empty());
}

#[test]
fn test_computed_attributes_are_listed() {
    let plan = default_plan();
    let alb = plan.resource("alb").unwrap();

    assert!(alb.computed.contains(&"dns_name".to_string()));
    assert!(!alb.attributes.contains_key("dns_name"));
    assert_eq!(alb.attributes["subnets"], json!(["${aws_subnet.public-subnet-a.id}", "${aws_subnet.public-subnet-b.id}"]));
}

#[test]
fn test_plan_survives_serialization() {
    let plan = default_plan();
    let parsed: Plan = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
    assert_eq!(parsed, plan);

    let yaml = plan.to_yaml().unwrap();
    assert!(yaml.contains("digest: sha256:"));
}

#[test]
fn test_tag_composed_from_earlier_node() {
    let stack = ClosureStack::new(|b: &mut GraphBuilder| {
        b.add_node(ResourceKind::Vpc, "naming", Attributes::new().set("cidr_block", "10.0.0.0/16"))?;
        b.add_node(
            ResourceKind::Subnet,
            "sub",
            Attributes::new().tag("Name", AttributeValue::concat([AttrRef::new("naming", "cidr_block").into(), "-sub".into()])),
        )?;
        Ok(())
    })
    .with_tag("Environment", "dev");

    let plan = synthesize(&stack, &Overrides::new()).unwrap();
    let tags = &plan.resource("sub").unwrap().tags;
    assert_eq!(tags["Name"], "10.0.0.0/16-sub");
    assert_eq!(tags["Environment"], "dev");
}

#[test]
fn test_generic_node_keeps_its_own_tags() {
    let stack = ClosureStack::new(|b: &mut GraphBuilder| {
        b.add_node(ResourceKind::Null, "marker", Attributes::new().tag("Environment", "prod"))?;
        Ok(())
    })
    .with_tag("Environment", "dev")
    .with_tag("Project", "turbo");

    let plan = synthesize(&stack, &Overrides::new()).unwrap();
    let tags = &plan.resource("marker").unwrap().tags;
    assert_eq!(tags["Environment"], "prod");
    assert_eq!(tags["Project"], "turbo");
}
