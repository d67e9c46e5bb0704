//! Command-line interface for stacksynth.
//!
//! Each subcommand lives in its own module with its own argument struct and
//! an async `execute` method.
//!
//! # Available Commands
//!
//! - `synth` - Synthesize a plan and print or write it
//! - `order` - Print resource addresses in deployment or teardown order
//! - `graph` - Print dependency trees of the declared stack
//! - `vars` - Print the resolved variable table
//!
//! # Variable Overrides
//!
//! Every command accepts `--var name=value` and `--var-file FILE`, layered
//! over `STACKSYNTH_VAR_<name>` environment variables and the declared
//! defaults:
//!
//! ```bash
//! STACKSYNTH_VAR_region=eu-west-1 stacksynth synth --var-file prod.toml --var imageTag=v42
//! ```
//!
//! # Logging
//!
//! Logs go to stderr; plans go to stdout. `RUST_LOG` takes precedence over
//! `--verbose` and `--quiet`.

pub mod common;
pub mod graph;
pub mod order;
pub mod synth;
pub mod vars;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Runtime settings derived from the global flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Filter used when `RUST_LOG` is not set
    pub log_level: &'static str,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn",
        }
    }
}

impl CliConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber.
    ///
    /// Does nothing when a subscriber is already installed.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.log_level));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
    }
}

/// Synthesizes deployment plans from the built-in service stack.
#[derive(Parser)]
#[command(
    name = "stacksynth",
    about = "Synthesize deterministic deployment plans from declarative resource graphs",
    version,
    author
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Log errors only
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a deployment plan.
    ///
    /// See [`synth::SynthCommand`] for options.
    Synth(synth::SynthCommand),

    /// Print resource addresses in plan order.
    ///
    /// See [`order::OrderCommand`] for options.
    Order(order::OrderCommand),

    /// Print the dependency tree of the stack.
    ///
    /// See [`graph::GraphCommand`] for options.
    Graph(graph::GraphCommand),

    /// Print the resolved variables and their sources.
    Vars(vars::VarsCommand),
}

impl Cli {
    /// Execute the CLI with configuration built from the global flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Build a [`CliConfig`] from the parsed arguments.
    ///
    /// ```rust
    /// use clap::Parser;
    /// use stacksynth::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["stacksynth", "--verbose", "order"]);
    /// assert_eq!(cli.build_config().log_level, "debug");
    /// ```
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };
        CliConfig {
            log_level,
        }
    }

    /// Execute the CLI with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Synth(cmd) => cmd.execute().await,
            Commands::Order(cmd) => cmd.execute().await,
            Commands::Graph(cmd) => cmd.execute().await,
            Commands::Vars(cmd) => cmd.execute().await,
        }
    }
}
