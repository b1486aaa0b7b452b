// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Run command - analysis, allocation and equity in one pass

use super::{load_graph, ModelArgs, OutputOptions};
use anyhow::Result;
use std::path::Path;
use vaxflow::analysis::analyze;
use vaxflow::config::Config;
use vaxflow::report::{write_json, RunReport, TextRenderer, NETWORK_FILE, OPTIMIZATION_FILE};

/// Run the full pipeline
pub fn run(
    args: &ModelArgs,
    config: &Config,
    output_dir: Option<&Path>,
    output: OutputOptions,
) -> Result<()> {
    let outcome = load_graph(args, config)?;
    let network = analyze(&outcome.graph);
    let optimization = super::optimize::solve(&outcome.graph, config);
    let report = RunReport::new(network, optimization);

    if let Some(dir) = output_dir {
        let network_path = write_json(dir, NETWORK_FILE, &report.network)?;
        let optimization_path = write_json(dir, OPTIMIZATION_FILE, &report.optimization)?;
        if !output.json {
            println!("Network analysis saved to {}", network_path.display());
            println!("Optimization results saved to {}", optimization_path.display());
        }
    }

    if output.json {
        output.print_json(&report)
    } else {
        print!("{}", TextRenderer::new(output.color).run(&report));
        Ok(())
    }
}
