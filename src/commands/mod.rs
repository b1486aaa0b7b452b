// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod analyze;
pub mod completions;
pub mod config;
pub mod export;
pub mod optimize;
pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use vaxflow::builder::{build_with_policy, BuildOutcome, InvalidRecordPolicy};
use vaxflow::config::Config;
use vaxflow::dataset::Dataset;

/// How results are printed
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Print serialized records instead of text
    pub json: bool,
    /// Allow ANSI colour in text output
    pub color: bool,
}

impl OutputOptions {
    /// Print `value` as pretty JSON on stdout
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{content}");
        Ok(())
    }
}

/// Dataset and model parameters shared by every pipeline command
#[derive(Debug, Clone, Args)]
pub struct ModelArgs {
    /// Prepared dataset (.json or .toml)
    pub dataset: PathBuf,

    /// Relations at or below this weight do not become transport links
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Abort on the first invalid record instead of skipping it
    #[arg(long)]
    pub strict: bool,
}

impl ModelArgs {
    /// Apply flag overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(threshold) = self.threshold {
            config.supply_threshold = threshold;
        }
        if self.strict {
            config.on_invalid = InvalidRecordPolicy::Fail;
        }
    }
}

/// Solver parameters for commands that allocate supply
#[derive(Debug, Clone, Args)]
pub struct SolverArgs {
    /// Global supply budget
    #[arg(long, visible_alias = "vaccines")]
    pub supply: Option<f64>,

    /// Per-recipient uptake bound as a share of population
    #[arg(long, conflicts_with = "no_uptake_cap")]
    pub uptake_cap: Option<f64>,

    /// Disable the per-recipient uptake bound
    #[arg(long)]
    pub no_uptake_cap: bool,

    /// Solver pivot budget
    #[arg(long)]
    pub max_iterations: Option<usize>,
}

impl SolverArgs {
    /// Apply flag overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(supply) = self.supply {
            config.available_supply = supply;
        }
        if let Some(cap) = self.uptake_cap {
            config.uptake_cap = Some(cap);
        }
        if self.no_uptake_cap {
            config.uptake_cap = None;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations;
        }
        config.validate()
    }
}

/// Load the dataset and build the graph under the configured policy
pub fn load_graph(args: &ModelArgs, config: &Config) -> Result<BuildOutcome> {
    info!("Loading dataset {}", args.dataset.display());
    let dataset = Dataset::load(&args.dataset)?;
    let (records, weights, manufacturers) = dataset.into_parts();

    build_with_policy(
        &records,
        &weights,
        &manufacturers,
        config.supply_threshold,
        config.on_invalid,
    )
    .with_context(|| format!("Invalid dataset {}", args.dataset.display()))
}
