// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::collections::HashSet;
use vaxflow::analysis::analyze;
use vaxflow::builder::{build_lenient, RelationWeights};
use vaxflow::equity::evaluate;
use vaxflow::optimize::{optimize_with, OptimizerConfig};
use vaxflow::types::NodeRecord;

#[derive(Debug, Arbitrary)]
struct Input {
    recipients: Vec<(u8, f64, f64)>,
    manufacturers: Vec<(u8, f64)>,
    relations: Vec<(u8, u8, f64)>,
    supply: f64,
}

fuzz_target!(|input: Input| {
    if input.recipients.len() + input.manufacturers.len() > 24 {
        return;
    }

    let mut records = Vec::new();
    let mut manufacturer_ids = HashSet::new();
    for (id, capacity) in &input.manufacturers {
        let id = format!("N{id}");
        records.push(NodeRecord::manufacturer(id.clone(), *capacity));
        manufacturer_ids.insert(id);
    }
    for (id, population, rate) in &input.recipients {
        records.push(NodeRecord::recipient(format!("N{id}"), *population, *rate));
    }
    let mut weights = RelationWeights::new();
    for (a, b, weight) in &input.relations {
        weights.insert((format!("N{a}"), format!("N{b}")), *weight);
    }

    let graph = build_lenient(&records, &weights, &manufacturer_ids, 0.0).graph;
    let _ = analyze(&graph);

    let config = OptimizerConfig {
        max_iterations: 10_000,
        ..OptimizerConfig::default()
    };
    let outcome = optimize_with(&graph, input.supply, &config);
    let report = evaluate(&graph, &outcome);
    for (id, after) in &report.after_rates {
        assert!(*after <= 100.0 || after.is_nan(), "{id} above 100%");
    }
});
