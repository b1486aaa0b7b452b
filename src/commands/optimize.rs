// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Optimize command - allocate supply and measure the equity change

use super::{load_graph, ModelArgs, OutputOptions};
use anyhow::Result;
use std::path::Path;
use tracing::warn;
use vaxflow::config::Config;
use vaxflow::equity::evaluate;
use vaxflow::graph::SupplyGraph;
use vaxflow::optimize::{optimize_with, verify_allocation};
use vaxflow::report::{write_json, OptimizationReport, TextRenderer, OPTIMIZATION_FILE};

/// Relative slack allowed when re-checking the solver's allocation
const VERIFY_TOLERANCE: f64 = 1e-6;

/// Solve the allocation and evaluate it when an optimum was found
pub fn solve(graph: &SupplyGraph, config: &Config) -> OptimizationReport {
    let allocation = optimize_with(graph, config.available_supply, &config.optimizer());

    let equity = if allocation.is_optimal() {
        let violations =
            verify_allocation(graph, &allocation, config.available_supply, VERIFY_TOLERANCE);
        for violation in violations {
            warn!(
                "Allocation breaks {}: {} > {}",
                violation.constraint, violation.actual, violation.limit
            );
        }
        Some(evaluate(graph, &allocation))
    } else {
        None
    };

    OptimizationReport {
        available_supply: config.available_supply,
        allocation,
        equity,
    }
}

/// Run the optimize command
pub fn run(
    args: &ModelArgs,
    config: &Config,
    output_dir: Option<&Path>,
    output: OutputOptions,
) -> Result<()> {
    let outcome = load_graph(args, config)?;
    let report = solve(&outcome.graph, config);

    if let Some(dir) = output_dir {
        let path = write_json(dir, OPTIMIZATION_FILE, &report)?;
        if !output.json {
            println!("Optimization results saved to {}", path.display());
        }
    }

    if output.json {
        output.print_json(&report)
    } else {
        print!("{}", TextRenderer::new(output.color).optimization(&report));
        Ok(())
    }
}
