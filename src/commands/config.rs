// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - shows the effective configuration

use super::OutputOptions;
use anyhow::{Context, Result};
use vaxflow::config::Config;

/// Print the whole configuration, or the value of one key
pub fn run(config: &Config, key: Option<&str>, output: OutputOptions) -> Result<()> {
    let value = serde_json::to_value(config).context("Failed to serialize configuration")?;

    match key {
        Some(key) => {
            let entry = value
                .get(key)
                .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;
            match entry {
                serde_json::Value::String(s) => println!("{s}"),
                serde_json::Value::Null => println!("none"),
                other => println!("{other}"),
            }
        }
        None if output.json => output.print_json(config)?,
        None => print!("{}", config.to_toml()?),
    }

    Ok(())
}
