// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Two-point disk throughput sampling.
//!
//! A [`ThroughputSampler`] reads the cumulative I/O counters of a device,
//! sleeps for the requested interval, reads them again, and divides the
//! deltas by the interval. Every call therefore blocks for at least the
//! interval; the sleep is not cancellable.
//!
//! # Counter resets
//! Kernel counters only grow, but a device can be replaced (or a counter
//! wrap) between the two reads. Any counter whose end value is below its
//! start value contributes a rate of `0.0`, and the sample is flagged with
//! [`ThroughputSample::counter_reset`]. Rates are never negative.

use crate::error::sampling_window;
use crate::provider::RawCounterSnapshot;
use crate::{MetricsError, StatsProvider};
use std::time::Duration;

/// Rates derived from two counter snapshots taken `interval_secs` apart.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ThroughputSample {
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
    pub read_ops_per_sec: f64,
    pub write_ops_per_sec: f64,
    /// `read_ops_per_sec + write_ops_per_sec`.
    pub total_ops_per_sec: f64,
    /// The sampling window that produced these rates.
    pub interval_secs: f64,
    /// At least one counter went backwards during the window; its rate is
    /// reported as `0.0`.
    pub counter_reset: bool,
}

impl ThroughputSample {
    /// Derives rates from a start/end pair. `interval_secs` must be positive.
    pub fn from_counters(
        device: &str,
        start: &RawCounterSnapshot,
        end: &RawCounterSnapshot,
        interval_secs: f64,
    ) -> Self {
        let mut counter_reset = false;
        let mut rate = |counter: &str, start: u64, end: u64| -> f64 {
            match end.checked_sub(start) {
                Some(delta) => delta as f64 / interval_secs,
                None => {
                    tracing::warn!(
                        device,
                        counter,
                        start,
                        end,
                        "counter went backwards during sample; reporting 0"
                    );
                    counter_reset = true;
                    0.0
                }
            }
        };

        let read_bytes_per_sec = rate("read_bytes", start.read_bytes, end.read_bytes);
        let write_bytes_per_sec = rate("write_bytes", start.write_bytes, end.write_bytes);
        let read_ops_per_sec = rate("read_ops", start.read_ops, end.read_ops);
        let write_ops_per_sec = rate("write_ops", start.write_ops, end.write_ops);

        Self {
            read_bytes_per_sec,
            write_bytes_per_sec,
            read_ops_per_sec,
            write_ops_per_sec,
            total_ops_per_sec: read_ops_per_sec + write_ops_per_sec,
            interval_secs,
            counter_reset,
        }
    }
}

/// Measures device throughput over a blocking window.
pub struct ThroughputSampler<'p, P: StatsProvider + ?Sized> {
    provider: &'p P,
    sleep: fn(Duration),
}

impl<'p, P: StatsProvider + ?Sized> ThroughputSampler<'p, P> {
    /// Sampler that sleeps with [`std::thread::sleep`].
    pub fn new(provider: &'p P) -> Self {
        Self {
            provider,
            sleep: std::thread::sleep,
        }
    }

    /// Replaces the sleep function (for tests).
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    /// Samples the counters of `device` twice, `interval_secs` apart.
    ///
    /// `device` is looked up verbatim in the provider's counter table.
    pub fn measure(
        &self,
        device: &str,
        interval_secs: f64,
    ) -> Result<ThroughputSample, MetricsError> {
        let window = sampling_window("interval", interval_secs)?;

        let start = self.read_device(device, "io counters (start)", "start counter read")?;
        tracing::debug!(device, interval_secs, "throughput window started");
        (self.sleep)(window);
        let end = self.read_device(device, "io counters (end)", "end counter read")?;

        let sample = ThroughputSample::from_counters(device, &start, &end, interval_secs);
        tracing::debug!(
            device,
            read_bps = sample.read_bytes_per_sec,
            write_bps = sample.write_bytes_per_sec,
            iops = sample.total_ops_per_sec,
            "throughput window finished"
        );
        Ok(sample)
    }

    fn read_device(
        &self,
        device: &str,
        query: &'static str,
        stage: &'static str,
    ) -> Result<RawCounterSnapshot, MetricsError> {
        let mut counters = self
            .provider
            .io_counters()
            .map_err(MetricsError::unavailable(query))?;
        counters
            .remove(device)
            .ok_or_else(|| MetricsError::DeviceNotFound {
                device: device.to_string(),
                stage,
            })
    }
}
