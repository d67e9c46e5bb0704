//! Arguments and helpers shared by the subcommands.

use anyhow::Result;
use clap::{Args, ValueEnum};
use std::path::PathBuf;

use crate::config::{OverrideSources, collect_overrides};
use crate::synth::Plan;
use crate::variables::{Overrides, ValueSource};

/// Variable override flags.
///
/// Overrides layer on top of `STACKSYNTH_VAR_<name>` environment variables;
/// files apply in order and `--var` flags win over everything.
#[derive(Args, Debug, Clone, Default)]
pub struct VarArgs {
    /// Set a variable (`name=value`); may be repeated
    ///
    /// ```bash
    /// stacksynth synth --var env=prod --var containerPort=8080
    /// stacksynth synth --var 'extraTags={"Team":"platform"}'
    /// ```
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    /// Read variables from a flat TOML file; may be repeated
    #[arg(long = "var-file", value_name = "FILE")]
    pub var_files: Vec<PathBuf>,
}

impl VarArgs {
    /// Collect overrides from the environment, files and flags.
    pub fn overrides(&self) -> Result<Overrides> {
        collect_overrides(&OverrideSources::from_process(self.var_files.clone(), self.vars.clone()))
    }

    /// Like [`overrides`](Self::overrides), with `env` pinned to one
    /// environment for multi-environment runs.
    pub fn overrides_for_env(&self, env: &str) -> Result<Overrides> {
        let mut overrides = self.overrides()?;
        overrides.insert_text("env", env, ValueSource::Flag);
        Ok(overrides)
    }
}

/// Serialization format of a plan.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlanFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

impl PlanFormat {
    /// File extension for written plans.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    /// Render a plan in this format.
    pub fn render(self, plan: &Plan) -> Result<String> {
        let text = match self {
            Self::Json => plan.to_json()?,
            Self::Yaml => plan.to_yaml()?,
        };
        Ok(text)
    }
}
