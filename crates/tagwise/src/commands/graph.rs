//! Graph command: workspace packages in dependency order.

use anyhow::Context;
use camino::Utf8Path;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::instrument;

use tagwise_core::config::Config;
use tagwise_core::dependencies::{dependents_of, topological_sort};
use tagwise_core::package::PackageBase;
use tagwise_core::repo::Workspace;

use super::Output;

/// Arguments for the `graph` subcommand.
#[derive(Args, Debug, Default)]
pub struct GraphArgs {
    /// Also list each package's dependents
    #[arg(long)]
    pub dependents: bool,
}

#[derive(Serialize)]
struct GraphNode<'a> {
    name: &'a str,
    version: String,
    path: &'a Utf8Path,
    dependencies: &'a [String],
    dependents: Vec<&'a str>,
}

/// Build nodes in dependencies-first order.
fn graph_nodes(sorted: &[PackageBase]) -> Vec<GraphNode<'_>> {
    sorted
        .iter()
        .map(|package| GraphNode {
            name: &package.name,
            version: package.version.to_string(),
            path: &package.relative_path,
            dependencies: &package.dependencies,
            dependents: dependents_of(sorted, &package.name)
                .into_iter()
                .map(|p| p.name.as_str())
                .collect(),
        })
        .collect()
}

/// Execute the graph command.
#[instrument(name = "cmd_graph", skip_all)]
pub fn cmd_graph(
    args: GraphArgs,
    output: Output,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    let git = super::open_repository(cwd)?;
    let workspace = Workspace::new(git.root(), config, &git);
    let packages = workspace
        .discover_packages()
        .context("package discovery failed")?;
    let sorted = topological_sort(&packages);
    let nodes = graph_nodes(&sorted);

    if output.json {
        return output.print_json(&nodes);
    }

    if nodes.is_empty() {
        println!("{}", "No packages found.".yellow());
        return Ok(());
    }
    for node in &nodes {
        println!("{} {}", node.name.bold(), node.version.dimmed());
        for dependency in node.dependencies {
            println!("  {} {}", "→".dimmed(), dependency.cyan());
        }
        if args.dependents {
            for dependent in &node.dependents {
                println!("  {} {}", "←".dimmed(), dependent.magenta());
            }
        }
    }
    Ok(())
}
