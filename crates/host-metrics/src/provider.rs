// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The OS-statistics collaborator.
//!
//! Every measurement in this crate goes through a [`StatsProvider`]. The
//! production implementation is [`ProcfsProvider`](crate::ProcfsProvider);
//! tests substitute [`FakeProvider`](crate::testing::FakeProvider).

use crate::ProbeError;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// System load averages.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Filesystem usage for a mounted path. All sizes in bytes.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct FsUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    /// `used / (used + free) * 100`.
    pub used_percent: f64,
}

/// Cumulative I/O counters for one block device, as maintained by the kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RawCounterSnapshot {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_ops: u64,
    pub write_ops: u64,
}

/// A mounted physical partition.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Partition {
    /// Device path, e.g. `/dev/nvme0n1p2`.
    pub device: String,
    /// Mount path, e.g. `/home`.
    pub mountpoint: String,
    /// Filesystem type, e.g. `ext4`.
    pub fs_type: String,
}

/// Virtual memory statistics in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MemoryStat {
    pub total: u64,
    pub available: u64,
    pub used: u64,
}

/// Source of raw OS statistics.
///
/// Implementations perform a single query per call and return raw values;
/// validation, rate computation and error context belong to the callers.
pub trait StatsProvider {
    /// Per-core busy percentage measured over `window`. Blocks for `window`.
    fn cpu_percent_per_core(&self, window: Duration) -> Result<Vec<f64>, ProbeError>;

    /// 1, 5 and 15-minute load averages.
    fn load_average(&self) -> Result<LoadAverage, ProbeError>;

    /// Usage of the filesystem mounted at (or containing) `path`.
    fn fs_usage(&self, path: &Path) -> Result<FsUsage, ProbeError>;

    /// Cumulative I/O counters for every block device, keyed by kernel name.
    fn io_counters(&self) -> Result<HashMap<String, RawCounterSnapshot>, ProbeError>;

    /// Mounted physical partitions.
    fn partitions(&self) -> Result<Vec<Partition>, ProbeError>;

    /// Current virtual memory statistics.
    fn virtual_memory(&self) -> Result<MemoryStat, ProbeError>;

    /// Maps a partition-table device path to its key in [`io_counters`](Self::io_counters).
    ///
    /// The default takes the final path component (`/dev/sda1` → `sda1`).
    fn counter_key(&self, device: &str) -> String {
        Path::new(device)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| device.to_string())
    }
}

impl<P: StatsProvider + ?Sized> StatsProvider for &P {
    fn cpu_percent_per_core(&self, window: Duration) -> Result<Vec<f64>, ProbeError> {
        (**self).cpu_percent_per_core(window)
    }

    fn load_average(&self) -> Result<LoadAverage, ProbeError> {
        (**self).load_average()
    }

    fn fs_usage(&self, path: &Path) -> Result<FsUsage, ProbeError> {
        (**self).fs_usage(path)
    }

    fn io_counters(&self) -> Result<HashMap<String, RawCounterSnapshot>, ProbeError> {
        (**self).io_counters()
    }

    fn partitions(&self) -> Result<Vec<Partition>, ProbeError> {
        (**self).partitions()
    }

    fn virtual_memory(&self) -> Result<MemoryStat, ProbeError> {
        (**self).virtual_memory()
    }

    fn counter_key(&self, device: &str) -> String {
        (**self).counter_key(device)
    }
}
