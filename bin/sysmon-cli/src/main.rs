// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # sysmon
//!
//! Command-line sampler for host metrics.
//!
//! ## Usage
//! ```bash
//! # CPU usage over 2 seconds plus load averages
//! sysmon -metric=cpu -seconds=2
//!
//! # List mounted devices, then measure one of them over 5 seconds
//! sysmon -metric=deviceMounts
//! sysmon -metric=disk -md=/home
//!
//! # Several metrics, as JSON lines
//! sysmon --metric cpu,memory,disk --format json
//! ```
//!
//! Single-dash long flags (`-metric=cpu`) and the usual `--metric cpu` form
//! are both accepted.

mod args;
mod commands;
mod config;

use clap::Parser;
use host_metrics::OutputFormat;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "sysmon",
    about = "Sample CPU, disk, memory and mount metrics of this host",
    version,
    author
)]
pub(crate) struct Cli {
    /// Comma-separated metrics: cpu, disk, memory, deviceMounts.
    #[arg(short, long)]
    metric: Option<String>,

    /// Sampling window in seconds for cpu and disk [default: 5].
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Mountpoint or device for the disk metric [default: /].
    #[arg(long)]
    md: Option<String>,

    /// Output format: text or json [default: text].
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Path to a TOML configuration file supplying defaults for the flags above.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(args::normalize_single_dash_flags(std::env::args_os()));

    commands::init_tracing(cli.verbose);

    let settings = match config::Settings::resolve(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match commands::measure::execute(&settings) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
