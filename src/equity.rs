// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Equity evaluation - coverage inequality before and after an allocation

use crate::graph::SupplyGraph;
use crate::optimize::AllocationOutcome;
use crate::types::Exclusion;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Recipients still below this coverage after allocation are reported
pub const REMAINING_BOTTLENECK_RATE: f64 = 50.0;

/// Added to every value before the Gini sum so an all-zero input does not
/// divide by zero. Numerical stabilization only.
pub const GINI_EPSILON: f64 = 1e-7;

/// A recipient and its coverage rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    /// Recipient id
    pub id: String,
    /// Coverage percentage
    pub rate: f64,
}

/// Inequality before and after an allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityReport {
    /// Gini of current coverage rates
    pub before_gini: f64,
    /// Gini of post-allocation coverage rates
    pub after_gini: f64,
    /// Relative Gini reduction; `None` when `before_gini` is zero
    #[serde(serialize_with = "serialize_pct_or_na", deserialize_with = "deserialize_pct_or_na")]
    pub improvement_pct: Option<f64>,
    /// Current coverage per recipient
    pub before_rates: BTreeMap<String, f64>,
    /// Coverage per recipient after the allocation, capped at 100
    pub after_rates: BTreeMap<String, f64>,
    /// Recipients still under 50% coverage, lowest first
    pub remaining_bottlenecks: Vec<RateEntry>,
    /// Recipients left out of the evaluation
    pub excluded: Vec<Exclusion>,
}

fn serialize_pct_or_na<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(pct) => serializer.serialize_f64(*pct),
        None => serializer.serialize_str("N/A"),
    }
}

fn deserialize_pct_or_na<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PctOrNa {
        Pct(f64),
        Na(String),
    }

    Ok(match PctOrNa::deserialize(deserializer)? {
        PctOrNa::Pct(pct) => Some(pct),
        PctOrNa::Na(_) => None,
    })
}

/// Gini coefficient of a set of values.
///
/// Negative inputs are shifted up to zero and every value is offset by
/// [`GINI_EPSILON`]; the empty set has a Gini of 0.
#[must_use]
pub fn gini(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let shift = if min < 0.0 { -min } else { 0.0 };

    let mut sorted: Vec<f64> = values.iter().map(|v| v + shift + GINI_EPSILON).collect();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, v)| (2.0 * (i + 1) as f64 - n - 1.0) * v)
        .sum();
    let total: f64 = sorted.iter().sum();

    weighted / (n * total)
}

/// Relative Gini reduction in percent, `None` when there was no inequality
#[must_use]
pub fn improvement_pct(before_gini: f64, after_gini: f64) -> Option<f64> {
    if before_gini.abs() <= f64::EPSILON {
        None
    } else {
        Some((before_gini - after_gini) / before_gini * 100.0)
    }
}

/// Compare coverage inequality before and after an allocation
#[must_use]
pub fn evaluate(graph: &SupplyGraph, outcome: &AllocationOutcome) -> EquityReport {
    let mut before_rates = BTreeMap::new();
    let mut after_rates = BTreeMap::new();
    let mut excluded = Vec::new();

    for recipient in graph.recipients() {
        let Some(population) = recipient.usable_population() else {
            let reason = recipient.exclusion_reason().unwrap_or("population unusable");
            warn!("Excluding {} from equity evaluation: {}", recipient.id, reason);
            excluded.push(Exclusion::new(&recipient.id, reason));
            continue;
        };

        let before = recipient.vaccination_rate;
        let added = outcome.allocated_to(&recipient.id) / population * 100.0;
        let after = (before + added).min(100.0);

        before_rates.insert(recipient.id.clone(), before);
        after_rates.insert(recipient.id.clone(), after);
    }

    let before: Vec<f64> = before_rates.values().copied().collect();
    let after: Vec<f64> = after_rates.values().copied().collect();
    let before_gini = gini(&before);
    let after_gini = gini(&after);

    let mut remaining_bottlenecks: Vec<RateEntry> = after_rates
        .iter()
        .filter(|(_, rate)| **rate < REMAINING_BOTTLENECK_RATE)
        .map(|(id, rate)| RateEntry {
            id: id.clone(),
            rate: *rate,
        })
        .collect();
    remaining_bottlenecks.sort_by(|a, b| a.rate.total_cmp(&b.rate).then_with(|| a.id.cmp(&b.id)));

    info!(
        "Gini coefficient {:.4} -> {:.4} ({} recipients still under {}%)",
        before_gini,
        after_gini,
        remaining_bottlenecks.len(),
        REMAINING_BOTTLENECK_RATE
    );

    EquityReport {
        before_gini,
        after_gini,
        improvement_pct: improvement_pct(before_gini, after_gini),
        before_rates,
        after_rates,
        remaining_bottlenecks,
        excluded,
    }
}
