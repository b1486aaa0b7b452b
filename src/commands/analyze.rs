// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Analyze command - centrality and bottlenecks of the supply network

use super::{load_graph, ModelArgs, OutputOptions};
use anyhow::Result;
use std::path::Path;
use vaxflow::analysis::analyze;
use vaxflow::config::Config;
use vaxflow::report::{write_json, TextRenderer, NETWORK_FILE};

/// Run the analyze command
pub fn run(
    args: &ModelArgs,
    config: &Config,
    output_dir: Option<&Path>,
    output: OutputOptions,
) -> Result<()> {
    let outcome = load_graph(args, config)?;
    let metrics = analyze(&outcome.graph);

    if let Some(dir) = output_dir {
        let path = write_json(dir, NETWORK_FILE, &metrics)?;
        if !output.json {
            println!("Network analysis saved to {}", path.display());
        }
    }

    if output.json {
        output.print_json(&metrics)
    } else {
        print!("{}", TextRenderer::new(output.color).network(&metrics));
        Ok(())
    }
}
