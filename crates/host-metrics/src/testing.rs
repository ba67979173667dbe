// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Deterministic [`StatsProvider`] for tests.
//!
//! [`FakeProvider`] returns canned values and never touches the host. I/O
//! counter reads are scripted as a sequence so two-point sampling can be
//! exercised; the last step repeats once the script runs out.

use crate::provider::{FsUsage, LoadAverage, MemoryStat, Partition, RawCounterSnapshot};
use crate::{ProbeError, StatsProvider};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

type Canned<T> = Result<T, String>;

fn replay<T: Clone>(canned: &Canned<T>) -> Result<T, ProbeError> {
    canned.clone().map_err(ProbeError::Other)
}

/// Scripted stand-in for the OS-statistics provider.
#[derive(Debug)]
pub struct FakeProvider {
    cpu: Canned<Vec<f64>>,
    load: Canned<LoadAverage>,
    fs: Canned<FsUsage>,
    counters: Vec<Canned<HashMap<String, RawCounterSnapshot>>>,
    partitions: Canned<Vec<Partition>>,
    memory: Canned<MemoryStat>,
    counter_reads: Cell<usize>,
    cpu_windows: RefCell<Vec<Duration>>,
    fs_paths: RefCell<Vec<PathBuf>>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProvider {
    /// A provider describing a small, idle two-core machine with one disk.
    pub fn new() -> Self {
        Self {
            cpu: Ok(vec![12.5, 7.5]),
            load: Ok(LoadAverage {
                one: 0.42,
                five: 0.36,
                fifteen: 0.30,
            }),
            fs: Ok(FsUsage {
                total: 100 * 1024 * 1024 * 1024,
                used: 40 * 1024 * 1024 * 1024,
                free: 60 * 1024 * 1024 * 1024,
                used_percent: 40.0,
            }),
            counters: Vec::new(),
            partitions: Ok(vec![Partition {
                device: "/dev/sda1".into(),
                mountpoint: "/".into(),
                fs_type: "ext4".into(),
            }]),
            memory: Ok(MemoryStat {
                total: 8 * 1024 * 1024 * 1024,
                available: 6 * 1024 * 1024 * 1024,
                used: 2 * 1024 * 1024 * 1024,
            }),
            counter_reads: Cell::new(0),
            cpu_windows: RefCell::new(Vec::new()),
            fs_paths: RefCell::new(Vec::new()),
        }
    }

    pub fn with_cpu(mut self, per_core: Vec<f64>) -> Self {
        self.cpu = Ok(per_core);
        self
    }

    pub fn failing_cpu(mut self, msg: &str) -> Self {
        self.cpu = Err(msg.to_string());
        self
    }

    pub fn with_load(mut self, load: LoadAverage) -> Self {
        self.load = Ok(load);
        self
    }

    pub fn failing_load(mut self, msg: &str) -> Self {
        self.load = Err(msg.to_string());
        self
    }

    pub fn with_fs_usage(mut self, usage: FsUsage) -> Self {
        self.fs = Ok(usage);
        self
    }

    pub fn failing_fs_usage(mut self, msg: &str) -> Self {
        self.fs = Err(msg.to_string());
        self
    }

    /// Appends one step to the I/O counter script.
    pub fn push_counters(mut self, counters: HashMap<String, RawCounterSnapshot>) -> Self {
        self.counters.push(Ok(counters));
        self
    }

    /// Appends a failing step to the I/O counter script.
    pub fn push_counter_error(mut self, msg: &str) -> Self {
        self.counters.push(Err(msg.to_string()));
        self
    }

    pub fn with_partitions(mut self, partitions: Vec<Partition>) -> Self {
        self.partitions = Ok(partitions);
        self
    }

    pub fn failing_partitions(mut self, msg: &str) -> Self {
        self.partitions = Err(msg.to_string());
        self
    }

    pub fn with_memory(mut self, memory: MemoryStat) -> Self {
        self.memory = Ok(memory);
        self
    }

    pub fn failing_memory(mut self, msg: &str) -> Self {
        self.memory = Err(msg.to_string());
        self
    }

    /// Number of times [`StatsProvider::io_counters`] has been called.
    pub fn counter_reads(&self) -> usize {
        self.counter_reads.get()
    }

    /// Windows passed to [`StatsProvider::cpu_percent_per_core`], in call order.
    pub fn cpu_windows(&self) -> Vec<Duration> {
        self.cpu_windows.borrow().clone()
    }

    /// Paths passed to [`StatsProvider::fs_usage`], in call order.
    pub fn fs_paths(&self) -> Vec<PathBuf> {
        self.fs_paths.borrow().clone()
    }
}

impl StatsProvider for FakeProvider {
    fn cpu_percent_per_core(&self, window: Duration) -> Result<Vec<f64>, ProbeError> {
        self.cpu_windows.borrow_mut().push(window);
        replay(&self.cpu)
    }

    fn load_average(&self) -> Result<LoadAverage, ProbeError> {
        replay(&self.load)
    }

    fn fs_usage(&self, path: &Path) -> Result<FsUsage, ProbeError> {
        self.fs_paths.borrow_mut().push(path.to_path_buf());
        replay(&self.fs)
    }

    fn io_counters(&self) -> Result<HashMap<String, RawCounterSnapshot>, ProbeError> {
        let call = self.counter_reads.get();
        self.counter_reads.set(call + 1);
        match self.counters.get(call).or_else(|| self.counters.last()) {
            Some(step) => replay(step),
            None => Ok(HashMap::new()),
        }
    }

    fn partitions(&self) -> Result<Vec<Partition>, ProbeError> {
        replay(&self.partitions)
    }

    fn virtual_memory(&self) -> Result<MemoryStat, ProbeError> {
        replay(&self.memory)
    }
}

/// Builds a single-device counter table.
pub fn counters(
    device: &str,
    read_bytes: u64,
    write_bytes: u64,
    read_ops: u64,
    write_ops: u64,
) -> HashMap<String, RawCounterSnapshot> {
    HashMap::from([(
        device.to_string(),
        RawCounterSnapshot {
            read_bytes,
            write_bytes,
            read_ops,
            write_ops,
        },
    )])
}

/// Builds a partition entry with an `ext4` filesystem.
pub fn partition(device: &str, mountpoint: &str) -> Partition {
    Partition {
        device: device.to_string(),
        mountpoint: mountpoint.to_string(),
        fs_type: "ext4".to_string(),
    }
}

/// Sleep stand-in that returns immediately.
pub fn no_sleep(_: Duration) {}

/// Sleep stand-in that fails the test if a sleep is attempted.
pub fn forbid_sleep(d: Duration) {
    panic!("unexpected sleep of {d:?}");
}
