//! Display the dependency tree of the declared stack.
//!
//! Without `--node`, one tree is printed per root: every node nothing else
//! depends on. With `--invert`, children are the nodes that reference their
//! parent, so the tree answers "what breaks if this goes away".
//! `--transitive` flattens the tree of one node into the sorted list of
//! everything it needs.
//!
//! ```text
//! ecs-service
//! ├── cluster
//! ├── private-subnet-az1
//! │   └── vpc
//! ...
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::common::VarArgs;
use crate::core::SynthError;
use crate::resolver::DependencyGraph;
use crate::stack::ServiceStack;
use crate::synth::declare;
use crate::utils::similar_names;

/// Command to print dependency trees.
#[derive(Args, Debug)]
pub struct GraphCommand {
    #[command(flatten)]
    vars: VarArgs,

    /// Show the tree of a single node
    #[arg(short, long, value_name = "ID")]
    node: Option<String>,

    /// Show dependents instead of dependencies
    #[arg(short, long)]
    invert: bool,

    /// List every direct and indirect dependency of --node
    #[arg(short, long, requires = "node", conflicts_with = "invert")]
    transitive: bool,
}

impl GraphCommand {
    /// Execute the graph command.
    pub async fn execute(self) -> Result<()> {
        let (_, graph) = declare(&ServiceStack::new(), &self.vars.overrides()?).context("Failed to declare stack")?;
        let planner = DependencyGraph::from_resources(&graph);
        planner.detect_cycles()?;

        let ids: Vec<String> = graph.ids().cloned().collect();
        print!("{}", self.render(&planner, &ids)?);
        Ok(())
    }

    fn render(&self, planner: &DependencyGraph, ids: &[String]) -> Result<String> {
        let roots = match &self.node {
            Some(id) if planner.contains(id) => vec![id.clone()],
            Some(id) => {
                return Err(SynthError::ReferenceError {
                    reference: id.clone(),
                    referrer: "--node".to_string(),
                    reason: "no node with this id is declared".to_string(),
                    similar: similar_names(id, ids),
                }
                .into());
            }
            None => planner.roots(self.invert),
        };

        let mut out = String::new();
        if self.transitive {
            for root in roots {
                out.push_str(&format!("{}\n", root.bold()));
                for dependency in planner.transitive_deps(&root) {
                    out.push_str(&format!("{dependency}\n"));
                }
            }
            return Ok(out);
        }

        for root in roots {
            out.push_str(&format!("{}\n", root.bold()));
            let tree = planner.to_tree_string(&root, self.invert);
            // Drop the root line; it is printed as the header above
            for line in tree.lines().skip(1) {
                out.push_str(line.get(4..).unwrap_or(line));
                out.push('\n');
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::Overrides;

    fn command(node: Option<&str>, invert: bool) -> GraphCommand {
        GraphCommand {
            vars: VarArgs::default(),
            node: node.map(str::to_string),
            invert,
            transitive: false,
        }
    }

    #[test]
    fn test_unknown_node_suggests_close_ids() {
        colored::control::set_override(false);
        let (_, graph) = declare(&ServiceStack::new(), &Overrides::new()).unwrap();
        let planner = DependencyGraph::from_resources(&graph);

        let ids: Vec<String> = graph.ids().cloned().collect();
        let err = command(Some("clustr"), false).render(&planner, &ids).unwrap_err();
        match err.downcast_ref::<SynthError>() {
            Some(SynthError::ReferenceError {
                similar,
                ..
            }) => assert_eq!(similar.first().map(String::as_str), Some("cluster")),
            other => panic!("expected a reference error, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_tree_lists_dependents() {
        colored::control::set_override(false);
        let (_, graph) = declare(&ServiceStack::new(), &Overrides::new()).unwrap();
        let planner = DependencyGraph::from_resources(&graph);

        let ids: Vec<String> = graph.ids().cloned().collect();
        let text = command(Some("cluster"), true).render(&planner, &ids).unwrap();
        assert!(text.starts_with("cluster\n"));
        assert!(text.contains("ecs-service"));
    }

    #[test]
    fn test_transitive_lists_indirect_dependencies() {
        colored::control::set_override(false);
        let (_, graph) = declare(&ServiceStack::new(), &Overrides::new()).unwrap();
        let planner = DependencyGraph::from_resources(&graph);

        let ids: Vec<String> = graph.ids().cloned().collect();
        let command = GraphCommand {
            transitive: true,
            ..command(Some("nat-gw"), false)
        };
        let text = command.render(&planner, &ids).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines, vec!["nat-gw", "nat-eip", "public-subnet-a", "vpc"]);
    }
}
