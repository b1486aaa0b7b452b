// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Validate command - builds the graph and reports rejected records

use super::{load_graph, ModelArgs, OutputOptions};
use anyhow::Result;
use serde::Serialize;
use vaxflow::config::Config;

/// Summary of a dataset check
#[derive(Debug, Serialize)]
struct ValidationSummary {
    nodes: usize,
    edges: usize,
    recipients: usize,
    manufacturers: usize,
    rejected: Vec<String>,
}

/// Run the validate command; fails when any record was rejected
pub fn run(args: &ModelArgs, config: &Config, output: OutputOptions) -> Result<()> {
    let outcome = load_graph(args, config)?;
    let graph = &outcome.graph;

    let summary = ValidationSummary {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        recipients: graph.recipients().count(),
        manufacturers: graph.manufacturers().count(),
        rejected: outcome.rejected.iter().map(ToString::to_string).collect(),
    };

    if output.json {
        output.print_json(&summary)?;
    } else {
        println!(
            "{}: {} nodes ({} recipients, {} manufacturers), {} edges",
            args.dataset.display(),
            summary.nodes,
            summary.recipients,
            summary.manufacturers,
            summary.edges
        );
        for reason in &summary.rejected {
            println!("  rejected: {reason}");
        }
    }

    if !summary.rejected.is_empty() {
        anyhow::bail!("{} invalid records", summary.rejected.len());
    }
    Ok(())
}
