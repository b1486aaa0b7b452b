// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Result records and their terminal rendering
//!
//! Records are plain serde structs. The text renderer is a separate layer
//! that only reads them.

use crate::analysis::{top_ranked, NetworkMetrics};
use crate::equity::EquityReport;
use crate::optimize::AllocationOutcome;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use owo_colors::{OwoColorize, Style};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Centrality entries shown per ranking
pub const TOP_CENTRALITY: usize = 5;

/// Bottlenecks shown in the text report
pub const TOP_BOTTLENECKS: usize = 10;

/// File written by network analysis under `--output-dir`
pub const NETWORK_FILE: &str = "network_analysis.json";

/// File written by optimization under `--output-dir`
pub const OPTIMIZATION_FILE: &str = "optimization_results.json";

/// Allocation together with its equity evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Budget the allocation was solved for
    pub available_supply: f64,
    /// Solver output
    pub allocation: AllocationOutcome,
    /// Present when the solver reached an optimum
    pub equity: Option<EquityReport>,
}

/// Everything a full run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
    /// Crate version that produced it
    pub version: String,
    /// Structural metrics
    pub network: NetworkMetrics,
    /// Allocation and equity
    pub optimization: OptimizationReport,
}

impl RunReport {
    /// Stamp a new report with the current time
    #[must_use]
    pub fn new(network: NetworkMetrics, optimization: OptimizationReport) -> Self {
        Self {
            generated_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            network,
            optimization,
        }
    }
}

/// Serialize `value` as pretty JSON into `dir/name`, creating `dir`
pub fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(name);
    let content = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(path)
}

// =============================================================================
// Text rendering
// =============================================================================

/// Renders records as human-readable text, optionally with ANSI colour
#[derive(Debug, Clone, Copy)]
pub struct TextRenderer {
    color: bool,
}

impl TextRenderer {
    /// Create a renderer
    #[must_use]
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        let rule = "=".repeat(60);
        format!(
            "{}\n{}\n{}\n",
            rule,
            self.paint(text, Style::new().bold()),
            rule
        )
    }

    /// Network metrics: top centralities and the worst bottlenecks
    #[must_use]
    pub fn network(&self, metrics: &NetworkMetrics) -> String {
        let mut out = self.heading("NETWORK ANALYSIS");

        out.push_str(&format!(
            "Manufacturers: {}\n",
            if metrics.manufacturers.is_empty() {
                "none".to_string()
            } else {
                metrics.manufacturers.join(", ")
            }
        ));

        out.push_str(&format!(
            "\nTop {TOP_CENTRALITY} by connectivity (degree centrality):\n"
        ));
        for (id, score) in top_ranked(&metrics.degree_centrality, TOP_CENTRALITY) {
            out.push_str(&format!("  {id}: {score:.4}\n"));
        }

        out.push_str(&format!(
            "\nTop {TOP_CENTRALITY} distribution hubs (betweenness centrality):\n"
        ));
        for (id, score) in top_ranked(&metrics.betweenness_centrality, TOP_CENTRALITY) {
            out.push_str(&format!("  {id}: {score:.4}\n"));
        }

        out.push_str("\nBottlenecks:\n");
        if metrics.bottlenecks.is_empty() {
            out.push_str(&format!("  {}\n", self.paint("none", Style::new().green())));
        }
        for bottleneck in metrics.bottlenecks.iter().take(TOP_BOTTLENECKS) {
            let pct = format!("{:.1}%", bottleneck.coverage_pct());
            out.push_str(&format!(
                "  {}: can supply only {} of need ({:.0} of {:.0})\n",
                bottleneck.id,
                self.paint(&pct, Style::new().red()),
                bottleneck.incoming_capacity,
                bottleneck.need
            ));
        }
        if metrics.bottlenecks.len() > TOP_BOTTLENECKS {
            out.push_str(&format!(
                "  ... and {} more\n",
                metrics.bottlenecks.len() - TOP_BOTTLENECKS
            ));
        }

        out
    }

    /// Allocation status, totals and equity change
    #[must_use]
    pub fn optimization(&self, report: &OptimizationReport) -> String {
        let mut out = self.heading(&format!(
            "ALLOCATION (available supply: {:.0})",
            report.available_supply
        ));
        let outcome = &report.allocation;

        let status = outcome.status.to_string();
        let status_style = if outcome.is_optimal() {
            Style::new().green().bold()
        } else {
            Style::new().red().bold()
        };
        out.push_str(&format!("Status: {}\n", self.paint(&status, status_style)));

        if !outcome.is_optimal() {
            out.push_str(&format!("  {}\n", outcome.message));
        }

        if let Some(objective) = outcome.objective_value {
            out.push_str(&format!("Objective value: {objective:.4}\n"));
            out.push_str(&format!("Total allocated: {:.0}\n", outcome.total_allocated));
        }

        let mut ranked: Vec<(&String, &f64)> = outcome
            .allocation
            .iter()
            .filter(|(_, qty)| **qty > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
        if !ranked.is_empty() {
            out.push_str("\nAllocation:\n");
            for (id, qty) in ranked {
                out.push_str(&format!("  {id}: {qty:.0}\n"));
            }
        }

        for exclusion in &outcome.excluded {
            out.push_str(&format!(
                "{} {} excluded: {}\n",
                self.paint("warning:", Style::new().yellow()),
                exclusion.id,
                exclusion.reason
            ));
        }

        if let Some(equity) = &report.equity {
            out.push('\n');
            out.push_str(&self.equity(equity));
        }

        out
    }

    /// Gini change and recipients still under-covered
    #[must_use]
    pub fn equity(&self, report: &EquityReport) -> String {
        let mut out = String::from("Equity:\n");
        out.push_str(&format!("  Gini before: {:.4}\n", report.before_gini));
        out.push_str(&format!("  Gini after:  {:.4}\n", report.after_gini));
        let improvement = report
            .improvement_pct
            .map_or_else(|| "N/A".to_string(), |pct| format!("{pct:.2}%"));
        out.push_str(&format!("  Improvement: {improvement}\n"));

        if !report.remaining_bottlenecks.is_empty() {
            out.push_str("  Still under 50% coverage:\n");
            for entry in &report.remaining_bottlenecks {
                out.push_str(&format!("    {}: {:.1}%\n", entry.id, entry.rate));
            }
        }
        out
    }

    /// Full run
    #[must_use]
    pub fn run(&self, report: &RunReport) -> String {
        let mut out = self.network(&report.network);
        out.push('\n');
        out.push_str(&self.optimization(&report.optimization));
        out.push_str(&format!(
            "\nGenerated {} by vaxflow {}\n",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            report.version
        ));
        out
    }
}
