//! Configuration intake for synthesis runs.
//!
//! A run's variables come from four layers, lowest precedence first:
//!
//! 1. **Defaults** declared by the stack
//! 2. **Environment**: `STACKSYNTH_VAR_<name>=<value>`
//! 3. **Variable files**: `--var-file prod.toml`, flat TOML tables
//! 4. **Flags**: `--var name=value`, repeatable
//!
//! [`collect_overrides`] gathers layers 2 to 4 into one
//! [`Overrides`](crate::variables::Overrides) set; the stack's
//! [`VariableTable`](crate::variables::VariableTable) applies them on top of
//! its defaults. [`StackConfig`] is the typed view of the resolved table that
//! stack code builds from.
//!
//! # Modules
//!
//! - `parser` - Generic TOML parsing and variable file loading

mod parser;

pub use parser::{load_var_file, parse_config};

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

use crate::constants::{ENV_VAR_PREFIX, MANAGED_BY};
use crate::core::{SynthError, SynthResult};
use crate::variables::{Overrides, ResolvedVariables, ValueSource};

/// Split a `name=value` assignment.
///
/// The value may itself contain `=`; only the first one separates.
///
/// ```rust
/// use stacksynth::config::parse_assignment;
///
/// let (name, value) = parse_assignment("extraTags={\"a\":\"b=c\"}").unwrap();
/// assert_eq!(name, "extraTags");
/// assert_eq!(value, "{\"a\":\"b=c\"}");
/// ```
pub fn parse_assignment(text: &str) -> SynthResult<(String, String)> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.to_string())),
        _ => Err(SynthError::config(format!("invalid variable assignment '{text}': expected name=value"))),
    }
}

/// Overrides from `STACKSYNTH_VAR_*` entries among `vars`.
///
/// Takes the environment as an argument so callers and tests control it.
pub fn env_overrides<I>(vars: I, overrides: &mut Overrides)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if let Some(name) = key.strip_prefix(ENV_VAR_PREFIX)
            && !name.is_empty()
        {
            debug!("Environment override for '{name}'");
            overrides.insert_text(name, value, ValueSource::Environment);
        }
    }
}

/// Where a run's overrides come from.
#[derive(Debug, Clone, Default)]
pub struct OverrideSources {
    /// `--var-file` paths, applied in order
    pub var_files: Vec<PathBuf>,
    /// Raw `--var name=value` flags
    pub assignments: Vec<String>,
    /// Environment entries; only `STACKSYNTH_VAR_*` keys are used
    pub environment: Vec<(String, String)>,
}

impl OverrideSources {
    /// Capture the current process environment alongside files and flags.
    #[must_use]
    pub fn from_process(var_files: Vec<PathBuf>, assignments: Vec<String>) -> Self {
        Self {
            var_files,
            assignments,
            environment: std::env::vars().collect(),
        }
    }
}

/// Collect every override layer into one set.
///
/// # Errors
///
/// Fails when a variable file cannot be read or parsed, or when a flag is
/// not a `name=value` assignment.
pub fn collect_overrides(sources: &OverrideSources) -> Result<Overrides> {
    let mut overrides = Overrides::new();

    env_overrides(sources.environment.iter().cloned(), &mut overrides);
    for path in &sources.var_files {
        load_var_file(path, &mut overrides)?;
    }
    for assignment in &sources.assignments {
        let (name, value) = parse_assignment(assignment)?;
        overrides.insert_text(name, value, ValueSource::Flag);
    }

    debug!("Collected {} overrides", overrides.len());
    Ok(overrides)
}

/// Typed view of the resolved service variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    /// Project name
    pub project: String,
    /// Service name
    pub service: String,
    /// Deployment environment
    pub env: String,
    /// Cloud region
    pub region: String,
    /// Port the workload listens on
    pub container_port: u16,
    /// Container image tag
    pub image_tag: String,
    /// First availability zone
    pub az1: String,
    /// Second availability zone
    pub az2: String,
    /// Task CPU units
    pub task_cpu: String,
    /// Task memory in MiB
    pub task_memory: String,
    /// `project-service-env`, used to name resources
    pub prefix: String,
    /// Tags applied to every taggable resource
    pub global_tags: BTreeMap<String, String>,
}

impl StackConfig {
    /// Build the typed view and the derived values.
    ///
    /// # Errors
    ///
    /// [`SynthError::ConfigError`] when a variable is missing, has the wrong
    /// type, or `containerPort` is not an integer in `1..=65535`.
    pub fn from_variables(vars: &ResolvedVariables) -> SynthResult<Self> {
        let project = vars.string("project")?.to_string();
        let service = vars.string("service")?.to_string();
        let env = vars.string("env")?.to_string();

        let port = vars.number("containerPort")?;
        let container_port = port
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .filter(|p| *p > 0)
            .ok_or_else(|| {
                SynthError::config(format!("containerPort must be an integer between 1 and 65535, got {port}"))
            })?;

        let prefix = format!("{project}-{service}-{env}");
        let mut global_tags = BTreeMap::from([
            ("Project".to_string(), project.clone()),
            ("Service".to_string(), service.clone()),
            ("Environment".to_string(), env.clone()),
            ("ManagedBy".to_string(), MANAGED_BY.to_string()),
        ]);
        for (key, value) in vars.map("extraTags")? {
            global_tags.entry(key.clone()).or_insert_with(|| value.clone());
        }

        Ok(Self {
            region: vars.string("region")?.to_string(),
            container_port,
            image_tag: vars.string("imageTag")?.to_string(),
            az1: vars.string("az1")?.to_string(),
            az2: vars.string("az2")?.to_string(),
            task_cpu: vars.string("taskCpu")?.to_string(),
            task_memory: vars.string("taskMemory")?.to_string(),
            project,
            service,
            env,
            prefix,
            global_tags,
        })
    }

    /// Name a resource `<prefix>-<suffix>`.
    #[must_use]
    pub fn name(&self, suffix: &str) -> String {
        format!("{}-{suffix}", self.prefix)
    }
}
