//! CLI behavior: exit codes, stdout contents and written artifacts.

use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

use stacksynth::synth::Plan;

use crate::common::stacksynth_cmd;

#[test]
fn test_synth_prints_json_plan() {
    let output = stacksynth_cmd().arg("synth").output().unwrap();
    assert!(output.status.success());

    let plan: Plan = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan.resources.len(), 34);
    assert!(plan.digest.starts_with("sha256:"));
}

#[test]
fn test_synth_writes_yaml_file() {
    let temp = tempdir().unwrap();
    let out = temp.path().join("plan.yaml");

    stacksynth_cmd()
        .args(["synth", "--format", "yaml", "--var", "env=staging", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let plan: Plan = serde_yaml::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(plan.resource("alb").unwrap().attributes["name"], "turbo-app-staging-alb");
}

#[test]
fn test_var_file_and_environment_layers() {
    let temp = tempdir().unwrap();
    let var_file = temp.path().join("prod.toml");
    fs::write(&var_file, "env = \"prod\"\ncontainerPort = 8080\nregion = \"eu-west-1\"\n").unwrap();

    let output = stacksynth_cmd()
        .env("STACKSYNTH_VAR_region", "ap-south-1")
        .env("STACKSYNTH_VAR_imageTag", "v42")
        .args(["synth", "--var", "env=qa", "--var-file"])
        .arg(&var_file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: Plan = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan.resource("cluster").unwrap().attributes["name"], "turbo-app-qa-cluster");
    assert_eq!(plan.resource("tg").unwrap().attributes["port"], 8080);
    assert_eq!(plan.resource("aws").unwrap().attributes["region"], "eu-west-1");
    let definitions = plan.resource("taskdef").unwrap().attributes["container_definitions"].as_str().unwrap().to_string();
    assert!(definitions.contains(":v42"));
}

#[test]
fn test_failure_exits_nonzero_and_writes_nothing() {
    let temp = tempdir().unwrap();
    let out = temp.path().join("plan.json");

    stacksynth_cmd()
        .args(["synth", "--var", "containerPort=0", "--out"])
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("containerPort"));

    assert!(!out.exists());
}

#[test]
fn test_unknown_variable_suggests_name() {
    stacksynth_cmd()
        .args(["synth", "--var", "regoin=eu-west-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("region"));
}

#[test]
fn test_environments_write_plan_per_env() {
    let temp = tempdir().unwrap();
    let out_dir = temp.path().join("plans");

    stacksynth_cmd()
        .args(["synth", "--environments", "dev,staging,prod", "--out-dir"])
        .arg(&out_dir)
        .assert()
        .success();

    for env in ["dev", "staging", "prod"] {
        let text = fs::read_to_string(out_dir.join(format!("plan.{env}.json"))).unwrap();
        let plan: Plan = serde_json::from_str(&text).unwrap();
        assert_eq!(plan.resource("vpc").unwrap().tags["Environment"], env);
    }
}

#[test]
fn test_order_and_reverse() {
    let forward = stacksynth_cmd().arg("order").output().unwrap();
    let backward = stacksynth_cmd().args(["order", "--reverse"]).output().unwrap();
    assert!(forward.status.success() && backward.status.success());

    let forward = String::from_utf8(forward.stdout).unwrap();
    let mut backward: Vec<String> = String::from_utf8(backward.stdout).unwrap().lines().map(str::to_string).collect();
    backward.reverse();

    assert_eq!(forward.lines().next(), Some("aws_provider.aws"));
    assert_eq!(forward.lines().collect::<Vec<_>>(), backward);
}

#[test]
fn test_graph_of_single_node() {
    stacksynth_cmd()
        .args(["graph", "--node", "nat-gw"])
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("nat-gw\n"))
        .stdout(predicate::str::contains("nat-eip"))
        .stdout(predicate::str::contains("public-subnet-a"));
}

#[test]
fn test_vars_lists_sources() {
    stacksynth_cmd()
        .env("NO_COLOR", "1")
        .env("STACKSYNTH_VAR_service", "api")
        .arg("vars")
        .assert()
        .success()
        .stdout(predicate::str::contains("api"))
        .stdout(predicate::str::contains("[environment]"))
        .stdout(predicate::str::contains("[default]"));
}

#[test]
fn test_graph_transitive_dependencies() {
    stacksynth_cmd()
        .args(["graph", "--node", "nat-gw", "--transitive"])
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout("nat-gw\nnat-eip\npublic-subnet-a\nvpc\n");
}
