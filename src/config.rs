// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Layers, lowest precedence first: built-in defaults, the config file,
//! `VAXFLOW_*` environment variables. CLI flags are applied by the caller.

use crate::builder::InvalidRecordPolicy;
use crate::optimize::{OptimizerConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_UPTAKE_CAP};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "VAXFLOW";

/// File name looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "vaxflow.toml";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global supply budget for the allocation
    pub available_supply: f64,
    /// Relations at or below this weight do not become transport links
    pub supply_threshold: f64,
    /// Per-recipient uptake bound as a share of population; absent disables it
    pub uptake_cap: Option<f64>,
    /// Solver pivot budget
    pub max_iterations: usize,
    /// What to do with records that fail validation
    pub on_invalid: InvalidRecordPolicy,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            available_supply: 1e9,
            supply_threshold: 0.0,
            uptake_cap: Some(DEFAULT_UPTAKE_CAP),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            on_invalid: InvalidRecordPolicy::Skip,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Solver settings derived from this configuration
    #[must_use]
    pub fn optimizer(&self) -> OptimizerConfig {
        OptimizerConfig {
            uptake_cap: self.uptake_cap,
            max_iterations: self.max_iterations,
        }
    }

    /// Reject values no run could use
    pub fn validate(&self) -> Result<()> {
        if self.available_supply.is_nan() {
            anyhow::bail!("available_supply must be a number");
        }
        if self.supply_threshold.is_nan() {
            anyhow::bail!("supply_threshold must be a number");
        }
        if let Some(cap) = self.uptake_cap {
            if !cap.is_finite() || cap < 0.0 {
                anyhow::bail!("uptake_cap must be a non-negative number, got {}", cap);
            }
        }
        if self.max_iterations == 0 {
            anyhow::bail!("max_iterations must be at least 1");
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Default config file location, if the platform has a config directory
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "vaxflow", "vaxflow")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Load configuration from defaults, an optional file and the environment.
///
/// An explicit `path` must exist; the default location is optional.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let defaults = ::config::Config::try_from(&Config::default())
        .context("Failed to encode default configuration")?;

    let mut builder = ::config::Config::builder().add_source(defaults);

    match path {
        Some(path) => {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        None => {
            if let Some(path) = default_path() {
                debug!("Looking for configuration at {}", path.display());
                builder = builder.add_source(::config::File::from(path).required(false));
            }
        }
    }

    let config: Config = builder
        .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;

    config.validate()?;
    Ok(config)
}
