//! Print resource addresses in deployment or teardown order.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::common::VarArgs;
use crate::stack::ServiceStack;
use crate::synth::{Plan, synthesize};

/// Command to print the plan order.
#[derive(Args, Debug)]
pub struct OrderCommand {
    #[command(flatten)]
    vars: VarArgs,

    /// Print teardown order (dependents first)
    #[arg(short, long)]
    reverse: bool,
}

impl OrderCommand {
    /// Execute the order command.
    pub async fn execute(self) -> Result<()> {
        let plan = synthesize(&ServiceStack::new(), &self.vars.overrides()?).context("Synthesis failed")?;
        for address in self.addresses(&plan) {
            println!("{address}");
        }
        Ok(())
    }

    fn addresses<'a>(&self, plan: &'a Plan) -> Vec<&'a str> {
        if self.reverse {
            plan.teardown_order().map(|r| r.address.as_str()).collect()
        } else {
            plan.resources.iter().map(|r| r.address.as_str()).collect()
        }
    }
}
