//! Synthesize deployment plans.
//!
//! The `synth` command runs the whole pipeline and prints the plan, writes
//! it to a file, or synthesizes several environments in parallel.
//!
//! # Examples
//!
//! Print the default plan:
//! ```bash
//! stacksynth synth
//! ```
//!
//! Write a production plan as YAML:
//! ```bash
//! stacksynth synth --var env=prod --format yaml --out plan.prod.yaml
//! ```
//!
//! Synthesize three environments into `plans/`:
//! ```bash
//! stacksynth synth --environments dev,staging,prod --out-dir plans
//! ```
//!
//! A failed run writes nothing: plans are rendered completely in memory and
//! then written atomically.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::common::{PlanFormat, VarArgs};
use crate::stack::ServiceStack;
use crate::synth::{Plan, Stack, synthesize};
use crate::utils::fs::atomic_write;

/// Command to synthesize deployment plans.
#[derive(Args, Debug)]
pub struct SynthCommand {
    #[command(flatten)]
    vars: VarArgs,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = PlanFormat::Json)]
    format: PlanFormat,

    /// Write the plan to this file instead of stdout
    #[arg(short = 'o', long, conflicts_with = "environments")]
    out: Option<PathBuf>,

    /// Synthesize each listed environment in parallel
    ///
    /// Each run pins the `env` variable; everything else comes from the
    /// usual override layers.
    #[arg(long, value_delimiter = ',', requires = "out_dir")]
    environments: Vec<String>,

    /// Directory receiving `plan.<env>.<format>` files
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

impl SynthCommand {
    /// Execute the synth command.
    pub async fn execute(self) -> Result<()> {
        self.execute_with_stack(Arc::new(ServiceStack::new())).await
    }

    /// Execute against a specific stack.
    pub async fn execute_with_stack(self, stack: Arc<dyn Stack>) -> Result<()> {
        if self.environments.is_empty() {
            return self.synth_single(stack.as_ref());
        }
        self.synth_environments(stack).await
    }

    fn synth_single(&self, stack: &dyn Stack) -> Result<()> {
        let overrides = self.vars.overrides()?;
        let plan = synthesize(stack, &overrides).context("Synthesis failed")?;
        let text = self.format.render(&plan)?;

        match &self.out {
            Some(path) => {
                write_plan(path, &text)?;
                eprintln!(
                    "{} Wrote {} resources to {} ({})",
                    "✓".green(),
                    plan.resources.len(),
                    path.display(),
                    plan.digest
                );
            }
            None => print!("{text}"),
        }
        Ok(())
    }

    async fn synth_environments(&self, stack: Arc<dyn Stack>) -> Result<()> {
        let out_dir =
            self.out_dir.clone().ok_or_else(|| anyhow::anyhow!("--environments requires --out-dir"))?;
        info!("Synthesizing {} environments", self.environments.len());

        let mut handles = Vec::with_capacity(self.environments.len());
        for env in &self.environments {
            let overrides = self.vars.overrides_for_env(env)?;
            let stack = Arc::clone(&stack);
            let env = env.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                debug!("Starting synthesis for '{env}'");
                let plan = synthesize(stack.as_ref(), &overrides)
                    .with_context(|| format!("Synthesis failed for environment '{env}'"));
                (env, plan)
            }));
        }

        // Every run is awaited before anything is written
        let mut plans: Vec<(String, Plan)> = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for handle in handles {
            let (env, result) = handle.await.context("Synthesis task panicked")?;
            match result {
                Ok(plan) => plans.push((env, plan)),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        for (env, plan) in &plans {
            let path = out_dir.join(format!("plan.{env}.{}", self.format.extension()));
            write_plan(&path, &self.format.render(plan)?)?;
            eprintln!("{} {env}: {} ({})", "✓".green(), path.display(), plan.digest);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn write_plan(path: &Path, text: &str) -> Result<()> {
    atomic_write(path, text.as_bytes()).with_context(|| format!("Failed to write plan: {}", path.display()))
}
