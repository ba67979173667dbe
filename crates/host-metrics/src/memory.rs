// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! System memory snapshot.

use crate::format::{heading, human_bytes, percent_bar};
use crate::{MetricsError, StatsProvider};
use chrono::{DateTime, Utc};
use std::fmt;

/// Point-in-time memory usage. Sizes in bytes.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MemoryMetric {
    /// Memory in use.
    pub used: u64,
    /// Memory available to new allocations without swapping.
    pub available: u64,
    /// Total physical memory.
    pub total: u64,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

/// Reads the current memory statistics.
pub fn measure_memory<P: StatsProvider + ?Sized>(
    provider: &P,
) -> Result<MemoryMetric, MetricsError> {
    let stat = provider
        .virtual_memory()
        .map_err(MetricsError::unavailable("virtual memory"))?;
    Ok(MemoryMetric {
        used: stat.used,
        available: stat.available,
        total: stat.total,
        timestamp: Utc::now(),
    })
}

impl MemoryMetric {
    /// Memory utilisation as a fraction in `[0.0, 1.0]`.
    pub fn utilisation(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.used as f64 / self.total as f64).clamp(0.0, 1.0)
    }

    pub fn summary(&self) -> String {
        format!(
            "Mem {} used, {} available ({:.0}% used)",
            human_bytes(self.used),
            human_bytes(self.available),
            self.utilisation() * 100.0,
        )
    }
}

impl fmt::Display for MemoryMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "Memory")?;
        writeln!(f, "   Total:        {} ({})", self.total, human_bytes(self.total))?;
        writeln!(
            f,
            "   Available:    {} ({})",
            self.available,
            human_bytes(self.available)
        )?;
        writeln!(
            f,
            "   Used:         {} ({}, {:.2}%)  {}",
            self.used,
            human_bytes(self.used),
            self.utilisation() * 100.0,
            percent_bar(self.utilisation() * 100.0),
        )?;
        write!(f, "   Timestamp:    {}", self.timestamp.to_rfc3339())
    }
}
