// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Disk usage and throughput.
//!
//! A [`DiskMetric`] combines an instantaneous filesystem usage snapshot with
//! a [`ThroughputSample`] taken over an interval, for the same device. The
//! disk argument may be a mountpoint, a device path, or a bare device name;
//! it is resolved through the [`DeviceMountTable`] first.

use crate::error::sampling_window;
use crate::format::{heading, human_bytes, human_rate, percent_bar};
use crate::throughput::{ThroughputSample, ThroughputSampler};
use crate::{DeviceMountTable, MetricsError, StatsProvider};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Filesystem usage. Sizes in bytes.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    /// Percentage of usable space in use.
    pub used_percent: f64,
}

/// Usage and throughput of one disk at one instant.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DiskMetric {
    /// Device path from the partition table.
    pub device: String,
    /// Where the device is mounted.
    pub mountpoint: String,
    pub usage: DiskUsage,
    pub throughput: ThroughputSample,
    /// When the measurement completed.
    pub timestamp: DateTime<Utc>,
}

/// Reads usage of the filesystem at `path`.
pub fn measure_disk_usage<P: StatsProvider + ?Sized>(
    provider: &P,
    path: &Path,
) -> Result<DiskUsage, MetricsError> {
    let usage = provider
        .fs_usage(path)
        .map_err(MetricsError::unavailable("filesystem usage"))?;
    Ok(DiskUsage {
        total: usage.total,
        used: usage.used,
        free: usage.free,
        used_percent: usage.used_percent,
    })
}

/// Resolves `target`, snapshots its usage, then samples its throughput over
/// `interval_secs`. Blocks for the interval.
pub fn measure_disk<P: StatsProvider + ?Sized>(
    provider: &P,
    sleep: fn(Duration),
    target: &str,
    interval_secs: f64,
) -> Result<DiskMetric, MetricsError> {
    sampling_window("interval", interval_secs)?;

    let resolved = DeviceMountTable::read(provider)?.resolve(target)?;
    let counter_key = provider.counter_key(&resolved.device);
    tracing::debug!(
        device = %resolved.device,
        mountpoint = %resolved.mountpoint,
        counter_key = %counter_key,
        "resolved disk target"
    );

    let usage = measure_disk_usage(provider, Path::new(&resolved.mountpoint))?;
    let throughput = ThroughputSampler::new(provider)
        .with_sleep(sleep)
        .measure(&counter_key, interval_secs)?;

    Ok(DiskMetric {
        device: resolved.device,
        mountpoint: resolved.mountpoint,
        usage,
        throughput,
        timestamp: Utc::now(),
    })
}

impl DiskMetric {
    pub fn summary(&self) -> String {
        format!(
            "Disk {} on {}: {:.1}% used, read {}, write {}, {:.1} IOPS over {:.2}s",
            self.device,
            self.mountpoint,
            self.usage.used_percent,
            human_rate(self.throughput.read_bytes_per_sec),
            human_rate(self.throughput.write_bytes_per_sec),
            self.throughput.total_ops_per_sec,
            self.throughput.interval_secs,
        )
    }
}

impl fmt::Display for DiskMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let u = &self.usage;
        let t = &self.throughput;

        heading(f, "Disk")?;
        writeln!(f, "   Device:       {}", self.device)?;
        writeln!(f, "   Mountpoint:   {}", self.mountpoint)?;
        writeln!(f, "   Total:        {} ({})", u.total, human_bytes(u.total))?;
        writeln!(f, "   Used:         {} ({})", u.used, human_bytes(u.used))?;
        writeln!(f, "   Free:         {} ({})", u.free, human_bytes(u.free))?;
        writeln!(
            f,
            "   Usage:        {:.2}%  {}",
            u.used_percent,
            percent_bar(u.used_percent)
        )?;
        writeln!(
            f,
            "   Read:         {:.2} B/s ({})",
            t.read_bytes_per_sec,
            human_rate(t.read_bytes_per_sec)
        )?;
        writeln!(
            f,
            "   Write:        {:.2} B/s ({})",
            t.write_bytes_per_sec,
            human_rate(t.write_bytes_per_sec)
        )?;
        writeln!(f, "   Read ops:     {:.2} /s", t.read_ops_per_sec)?;
        writeln!(f, "   Write ops:    {:.2} /s", t.write_ops_per_sec)?;
        writeln!(f, "   Total IOPS:   {:.2}", t.total_ops_per_sec)?;
        writeln!(f, "   Interval:     {:.2} s", t.interval_secs)?;
        if t.counter_reset {
            writeln!(
                f,
                "   WARNING: counter reset during sample; affected rates shown as 0"
            )?;
        }
        write!(f, "   Timestamp:    {}", self.timestamp.to_rfc3339())
    }
}
