//! Fatal errors abort synthesis before any plan exists.

use stacksynth::core::SynthError;
use stacksynth::graph::{AttrRef, AttributeValue, Attributes, GraphBuilder, ResourceKind};
use stacksynth::stack::ServiceStack;
use stacksynth::synth::synthesize;
use stacksynth::test_utils::flag_overrides;
use stacksynth::variables::Overrides;

use crate::common::ClosureStack;

#[test]
fn test_reference_cycle_names_participants() {
    let stack = ClosureStack::new(|b: &mut GraphBuilder| {
        b.add_node(ResourceKind::Null, "A", Attributes::new().set("next", AttrRef::new("B", "id")))?;
        b.add_node(ResourceKind::Null, "B", Attributes::new().set("next", AttrRef::new("C", "id")))?;
        b.add_node(ResourceKind::Null, "C", Attributes::new().set("next", AttrRef::new("A", "id")))?;
        Ok(())
    });

    let err = synthesize(&stack, &Overrides::new()).unwrap_err();
    let SynthError::CycleError {
        nodes,
    } = &err
    else {
        panic!("expected a cycle, got {err:?}");
    };
    let mut sorted = nodes.clone();
    sorted.sort();
    assert_eq!(sorted, vec!["A", "B", "C"]);
    assert!(err.to_string().starts_with("Circular dependency detected"));
}

#[test]
fn test_self_reference_is_a_cycle() {
    let stack = ClosureStack::new(|b: &mut GraphBuilder| {
        b.add_node(ResourceKind::Null, "loop", Attributes::new().set("me", AttrRef::new("loop", "id")))?;
        Ok(())
    });

    assert!(matches!(synthesize(&stack, &Overrides::new()), Err(SynthError::CycleError { .. })));
}

#[test]
fn test_dangling_reference_suggests_declared_id() {
    let stack = ClosureStack::new(|b: &mut GraphBuilder| {
        b.add_node(ResourceKind::Vpc, "vpc", Attributes::new())?;
        b.add_node(ResourceKind::Subnet, "subnet", Attributes::new().set("vpc_id", AttrRef::new("vpcc", "id")))?;
        Ok(())
    });

    match synthesize(&stack, &Overrides::new()) {
        Err(SynthError::ReferenceError {
            reference,
            referrer,
            similar,
            ..
        }) => {
            assert_eq!(reference, "vpcc.id");
            assert!(referrer.contains("aws_subnet.subnet"));
            assert_eq!(similar, vec!["vpc"]);
        }
        other => panic!("expected a reference error, got {other:?}"),
    }
}

#[test]
fn test_forward_reference_resolves() {
    let stack = ClosureStack::new(|b: &mut GraphBuilder| {
        b.add_node(
            ResourceKind::Null,
            "url",
            Attributes::new().set(
                "value",
                AttributeValue::concat(["http://".into(), AttrRef::new("alb", "dns_name").into(), "/health".into()]),
            ),
        )?;
        b.add_node(ResourceKind::Lb, "alb", Attributes::new())?;
        Ok(())
    });

    let plan = synthesize(&stack, &Overrides::new()).unwrap();
    let ids: Vec<&str> = plan.resources.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["alb", "url"]);
    assert_eq!(plan.resource("url").unwrap().attributes["value"], "http://${aws_lb.alb.dns_name}/health");
}

#[test]
fn test_unbound_output_fails() {
    let stack = ClosureStack::new(|b: &mut GraphBuilder| {
        b.add_node(ResourceKind::Vpc, "vpc", Attributes::new())?;
        b.add_output("missing", AttrRef::new("nowhere", "id"), "Never bound")?;
        Ok(())
    });

    match synthesize(&stack, &Overrides::new()) {
        Err(SynthError::ReferenceError {
            referrer,
            ..
        }) => assert_eq!(referrer, "output 'missing'"),
        other => panic!("expected a reference error, got {other:?}"),
    }
}

#[test]
fn test_duplicate_node_id_fails() {
    let stack = ClosureStack::new(|b: &mut GraphBuilder| {
        b.add_node(ResourceKind::Vpc, "net", Attributes::new())?;
        b.add_node(ResourceKind::Subnet, "net", Attributes::new())?;
        Ok(())
    });

    match synthesize(&stack, &Overrides::new()) {
        Err(SynthError::DuplicateNode {
            id,
            existing,
        }) => {
            assert_eq!(id, "net");
            assert_eq!(existing, "aws_vpc.net");
        }
        other => panic!("expected a duplicate node error, got {other:?}"),
    }
}

#[test]
fn test_element_index_out_of_range_fails() {
    let stack = ClosureStack::new(|b: &mut GraphBuilder| {
        b.add_node(ResourceKind::Null, "host", Attributes::new().set("part", AttributeValue::from("a/b").element("/", 5)))?;
        Ok(())
    });

    assert!(matches!(synthesize(&stack, &Overrides::new()), Err(SynthError::InvalidExpression { .. })));
}

#[test]
fn test_port_out_of_range_is_config_error() {
    let result = synthesize(&ServiceStack::new(), &flag_overrides(&[("containerPort", "70000")]));
    assert!(matches!(result, Err(SynthError::ConfigError { .. })));

    let result = synthesize(&ServiceStack::new(), &flag_overrides(&[("containerPort", "http")]));
    assert!(matches!(result, Err(SynthError::ConfigError { .. })));
}

#[test]
fn test_misspelled_variable_suggests_declared_name() {
    match synthesize(&ServiceStack::new(), &flag_overrides(&[("envv", "prod")])) {
        Err(SynthError::ConfigError {
            similar,
            ..
        }) => assert!(similar.contains(&"env".to_string())),
        other => panic!("expected a config error, got {other:?}"),
    }
}
