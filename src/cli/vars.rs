//! Print the resolved variable table.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::common::VarArgs;
use crate::stack::ServiceStack;
use crate::synth::Stack;
use crate::variables::{ResolvedVariables, ValueSource, VariableTable};

/// Command to show every variable, its value and where the value came from.
#[derive(Args, Debug)]
pub struct VarsCommand {
    #[command(flatten)]
    vars: VarArgs,
}

impl VarsCommand {
    /// Execute the vars command.
    pub async fn execute(self) -> Result<()> {
        let stack = ServiceStack::new();
        let table = stack.variables()?;
        let resolved = table.resolve(&self.vars.overrides()?).context("Failed to resolve variables")?;
        print!("{}", render(&table, &resolved));
        Ok(())
    }
}

fn render(table: &VariableTable, resolved: &ResolvedVariables) -> String {
    let width = table.variables().iter().map(|v| v.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for variable in table.variables() {
        let Ok(value) = resolved.get(&variable.name) else {
            continue;
        };
        let source = match value.source {
            ValueSource::Default => value.source.to_string().dimmed(),
            _ => value.source.to_string().yellow(),
        };
        out.push_str(&format!(
            "{:<width$}  {}  [{source}]  {}\n",
            variable.name,
            value.value,
            variable.description.dimmed(),
        ));
    }
    out
}
