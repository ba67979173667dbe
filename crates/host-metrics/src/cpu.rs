// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CPU utilisation and load average.
//!
//! Per-core usage is measured by the provider over a blocking window of
//! `seconds`; load averages are read separately. Both reads must succeed,
//! otherwise no metric is produced.

use crate::error::sampling_window;
use crate::format::{heading, percent_bar};
use crate::{MetricsError, StatsProvider};
use chrono::{DateTime, Utc};
use std::fmt;

/// CPU usage over a sampling window plus the system load averages.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CpuMetric {
    /// Busy percentage of each core over the window, in core order.
    pub usage_per_core: Vec<f64>,
    /// Number of cores reported.
    pub core_count: usize,
    /// Length of the usage window in seconds.
    pub interval_secs: f64,
    /// 1-minute load average.
    pub load_avg_1: f64,
    /// 5-minute load average.
    pub load_avg_5: f64,
    /// 15-minute load average.
    pub load_avg_15: f64,
    /// When the measurement completed.
    pub timestamp: DateTime<Utc>,
}

/// Measures per-core usage over `seconds`, then reads load averages.
///
/// Fails with [`MetricsError::InvalidArgument`] before touching the provider
/// when `seconds` is not a positive, finite number.
pub fn measure_cpu<P: StatsProvider + ?Sized>(
    provider: &P,
    seconds: f64,
) -> Result<CpuMetric, MetricsError> {
    let window = sampling_window("seconds", seconds)?;

    let usage_per_core = provider
        .cpu_percent_per_core(window)
        .map_err(MetricsError::unavailable("cpu usage"))?;
    let load = provider
        .load_average()
        .map_err(MetricsError::unavailable("load average"))?;

    Ok(CpuMetric {
        core_count: usage_per_core.len(),
        usage_per_core,
        interval_secs: seconds,
        load_avg_1: load.one,
        load_avg_5: load.five,
        load_avg_15: load.fifteen,
        timestamp: Utc::now(),
    })
}

impl CpuMetric {
    /// Mean usage across cores, or 0 when no cores were reported.
    pub fn average_usage(&self) -> f64 {
        if self.usage_per_core.is_empty() {
            return 0.0;
        }
        self.usage_per_core.iter().sum::<f64>() / self.usage_per_core.len() as f64
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "CPU {:.1}% avg over {} cores ({:.2}s), load {:.2}/{:.2}/{:.2}",
            self.average_usage(),
            self.core_count,
            self.interval_secs,
            self.load_avg_1,
            self.load_avg_5,
            self.load_avg_15,
        )
    }
}

impl fmt::Display for CpuMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "CPU")?;
        for (core, usage) in self.usage_per_core.iter().enumerate() {
            writeln!(
                f,
                "   Core {core:<3}     {usage:>6.2}%  {}",
                percent_bar(*usage)
            )?;
        }
        writeln!(f, "   Average:      {:.2}%", self.average_usage())?;
        writeln!(f, "   Cores:        {}", self.core_count)?;
        writeln!(f, "   Window:       {:.2} s", self.interval_secs)?;
        writeln!(
            f,
            "   Load avg:     {:.2} (1m)  {:.2} (5m)  {:.2} (15m)",
            self.load_avg_1, self.load_avg_5, self.load_avg_15,
        )?;
        write!(f, "   Timestamp:    {}", self.timestamp.to_rfc3339())
    }
}
