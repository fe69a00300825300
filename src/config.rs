// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for weekly reporting.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportConfig {
    /// Number of weeks reported when none is requested.
    #[serde(default = "default_weeks")]
    pub weeks: usize,

    /// Deadline for fetching snapshots from the store.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Issue one concurrent query per platform instead of a single query.
    #[serde(default)]
    pub fan_out: bool,

    /// Platforms queried when `fan_out` is set.
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_weeks() -> usize {
    8
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_platforms() -> Vec<String> {
    vec!["instagram".to_string(), "tiktok".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            weeks: default_weeks(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            fan_out: false,
            platforms: default_platforms(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ReportConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path.as_std_path())
            .with_context(|| format!("failed to read config file at {}", path))?;

        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file at {}", path))
    }

    /// Load configuration from `path`, or use defaults if the file doesn't
    /// exist.
    pub fn load_or_default(path: &Utf8Path) -> Result<Self> {
        if path.as_std_path().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
