// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # host-metrics
//!
//! Samples host operating-system metrics for ad-hoc inspection of a single
//! machine.
//!
//! # Metrics
//! - **CPU**: per-core utilisation over a window, plus 1/5/15-minute load.
//! - **Disk**: filesystem usage and I/O throughput for one device.
//! - **Memory**: used / available / total.
//! - **Device mounts**: physical partition → mountpoint table.
//!
//! All OS access goes through the [`StatsProvider`] trait. [`ProcfsProvider`]
//! reads Linux procfs; [`testing::FakeProvider`] is a scripted double.
//!
//! # Blocking
//! CPU usage and disk throughput are measured over a window and block the
//! calling thread for its full length. Everything else is a single read.
//!
//! # Example
//! ```no_run
//! use host_metrics::{measure_cpu, ProcfsProvider};
//!
//! let provider = ProcfsProvider::new();
//! let cpu = measure_cpu(&provider, 1.0).expect("failed to sample CPU");
//! println!("{cpu}");
//! ```

mod cpu;
mod disk;
pub mod dispatch;
mod error;
pub mod format;
mod memory;
mod mounts;
pub mod procfs;
pub mod provider;
mod record;
pub mod testing;
mod throughput;

pub use cpu::{measure_cpu, CpuMetric};
pub use disk::{measure_disk, measure_disk_usage, DiskMetric, DiskUsage};
pub use dispatch::{DispatchOptions, DispatchReport, Dispatcher, MetricKind};
pub use error::{MetricsError, ProbeError};
pub use format::OutputFormat;
pub use memory::{measure_memory, MemoryMetric};
pub use mounts::{DeviceMountTable, DiskTarget};
pub use procfs::ProcfsProvider;
pub use provider::{RawCounterSnapshot, StatsProvider};
pub use record::MetricRecord;
pub use throughput::{ThroughputSample, ThroughputSampler};
