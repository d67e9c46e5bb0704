//! Common test utilities for stacksynth integration tests

// Not every helper is used by every test file
#![allow(dead_code)]

use assert_cmd::Command;
use std::collections::BTreeMap;

use stacksynth::core::SynthResult;
use stacksynth::graph::GraphBuilder;
use stacksynth::synth::Stack;
use stacksynth::variables::{ResolvedVariables, VariableTable};

/// The binary under test, isolated from `STACKSYNTH_VAR_*` variables of the
/// calling environment.
pub fn stacksynth_cmd() -> Command {
    let mut cmd = Command::cargo_bin("stacksynth").unwrap();
    for (key, _) in std::env::vars() {
        if key.starts_with("STACKSYNTH_VAR_") {
            cmd.env_remove(key);
        }
    }
    cmd.env_remove("RUST_LOG");
    cmd
}

/// A stack without variables, declared from a closure.
pub struct ClosureStack<F> {
    declare: F,
    tags: BTreeMap<String, String>,
}

impl<F> ClosureStack<F>
where
    F: Fn(&mut GraphBuilder) -> SynthResult<()> + Send + Sync,
{
    pub fn new(declare: F) -> Self {
        Self {
            declare,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }
}

impl<F> Stack for ClosureStack<F>
where
    F: Fn(&mut GraphBuilder) -> SynthResult<()> + Send + Sync,
{
    fn name(&self) -> &str {
        "closure"
    }

    fn variables(&self) -> SynthResult<VariableTable> {
        Ok(VariableTable::new())
    }

    fn global_tags(&self, _vars: &ResolvedVariables) -> SynthResult<BTreeMap<String, String>> {
        Ok(self.tags.clone())
    }

    fn declare(&self, _vars: &ResolvedVariables, builder: &mut GraphBuilder) -> SynthResult<()> {
        (self.declare)(builder)
    }
}
