// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use libfuzzer_sys::fuzz_target;
use vaxflow::builder::build_lenient;
use vaxflow::dataset::Dataset;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(dataset) = Dataset::from_json(text) else {
        return;
    };
    let (records, weights, manufacturers) = dataset.into_parts();
    let outcome = build_lenient(&records, &weights, &manufacturers, 0.0);
    let _ = outcome.graph.to_json();
});
