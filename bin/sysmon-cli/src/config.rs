// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Optional TOML configuration, merged underneath the command-line flags.
//!
//! # TOML Format
//! ```toml
//! metric = "cpu,disk"
//! seconds = 2.5
//! md = "/home"
//! format = "json"
//! ```
//!
//! Every key is optional; a flag given on the command line always wins.

use crate::Cli;
use anyhow::Context;
use host_metrics::{DispatchOptions, OutputFormat};
use std::path::Path;

/// Default sampling window in seconds.
pub(crate) const DEFAULT_SECONDS: f64 = 5.0;

/// Default disk target.
pub(crate) const DEFAULT_DISK_TARGET: &str = "/";

/// Contents of a configuration file.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub metric: Option<String>,
    pub seconds: Option<f64>,
    pub md: Option<String>,
    pub format: Option<OutputFormat>,
}

impl FileConfig {
    pub(crate) fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config '{}'", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config '{}'", path.display()))
    }

    pub(crate) fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    /// Raw metric selection; `None` when neither flag nor config named one.
    pub metric: Option<String>,
    pub options: DispatchOptions,
}

impl Settings {
    /// Loads the config file named by `--config` (if any) and applies the flags over it.
    pub(crate) fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => {
                let file = FileConfig::from_file(path)?;
                tracing::info!("loaded config from {}", path.display());
                file
            }
            None => FileConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    pub(crate) fn merge(cli: &Cli, file: FileConfig) -> Self {
        let metric = cli
            .metric
            .clone()
            .or(file.metric)
            .filter(|m| !m.trim().is_empty());

        Self {
            metric,
            options: DispatchOptions {
                seconds: cli.seconds.or(file.seconds).unwrap_or(DEFAULT_SECONDS),
                disk_target: cli
                    .md
                    .clone()
                    .or(file.md)
                    .unwrap_or_else(|| DEFAULT_DISK_TARGET.to_string()),
                format: cli.format.or(file.format).unwrap_or_default(),
            },
        }
    }
}
