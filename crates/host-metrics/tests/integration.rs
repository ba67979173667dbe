// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: selection → measurement → rendered output.
//!
//! These drive the public API end-to-end with the scripted provider, plus a
//! procfs provider pointed at a fixture tree.

use host_metrics::testing::{counters, no_sleep, partition, FakeProvider};
use host_metrics::{
    measure_disk, DispatchOptions, Dispatcher, MetricKind, MetricsError, OutputFormat,
    ProcfsProvider, StatsProvider, ThroughputSampler,
};

// ── Helpers ────────────────────────────────────────────────────

fn workstation() -> FakeProvider {
    FakeProvider::new()
        .with_cpu(vec![3.0, 97.0, 50.0, 50.0])
        .with_partitions(vec![
            partition("/dev/nvme0n1p2", "/"),
            partition("/dev/nvme0n1p1", "/boot/efi"),
        ])
        .push_counters(counters("nvme0n1p2", 1_000, 2_000, 10, 20))
        .push_counters(counters("nvme0n1p2", 11_000, 42_000, 30, 60))
}

fn dispatch(
    provider: &FakeProvider,
    selection: &str,
    format: OutputFormat,
) -> (Vec<MetricKind>, usize, String) {
    let options = DispatchOptions {
        seconds: 2.0,
        disk_target: "/".into(),
        format,
    };
    let mut out = Vec::new();
    let report = Dispatcher::new(provider, options)
        .with_sleep(no_sleep)
        .run(selection, &mut out)
        .expect("writing to a Vec cannot fail");
    (report.succeeded, report.failed.len(), String::from_utf8(out).unwrap())
}

// ── Dispatcher ─────────────────────────────────────────────────

#[test]
fn test_full_selection_text() {
    let provider = workstation();
    let (ok, failed, out) = dispatch(&provider, "cpu,disk,memory,deviceMounts", OutputFormat::Text);

    assert_eq!(
        ok,
        vec![MetricKind::Cpu, MetricKind::Disk, MetricKind::Memory, MetricKind::DeviceMounts]
    );
    assert_eq!(failed, 0);
    assert!(out.contains("Average:      50.00%"));
    assert!(out.contains("Read:         5000.00 B/s"));
    assert!(out.contains("Write:        20000.00 B/s"));
    assert!(out.contains("/dev/nvme0n1p1  /boot/efi"));
}

#[test]
fn test_mixed_failures_are_isolated() {
    let provider = workstation().failing_load("loadavg missing");
    let (ok, failed, out) = dispatch(&provider, "cpu,gpu,memory", OutputFormat::Text);

    assert_eq!(ok, vec![MetricKind::Memory]);
    assert_eq!(failed, 2);
    assert!(out.contains("error measuring cpu: load average unavailable: loadavg missing"));
    assert!(out.contains("invalid metric: gpu"));
}

#[test]
fn test_json_output_parses() {
    let provider = workstation();
    let (_, _, out) = dispatch(&provider, "disk", OutputFormat::Json);
    let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();

    assert_eq!(value["metric"], "disk");
    assert_eq!(value["data"]["device"], "/dev/nvme0n1p2");
    assert_eq!(value["data"]["throughput"]["read_bytes_per_sec"], 5000.0);
    assert_eq!(value["data"]["throughput"]["counter_reset"], false);
}

// ── Throughput through the public API ──────────────────────────

#[test]
fn test_device_missing_on_both_read_paths() {
    let missing_at_start = FakeProvider::new().push_counters(counters("sda", 0, 0, 0, 0));
    let err = ThroughputSampler::new(&missing_at_start)
        .with_sleep(no_sleep)
        .measure("sdb", 1.0)
        .unwrap_err();
    assert!(err.to_string().contains("start counter read"));

    let missing_at_end = FakeProvider::new()
        .push_counters(counters("sdb", 0, 0, 0, 0))
        .push_counters(counters("sda", 0, 0, 0, 0));
    let err = ThroughputSampler::new(&missing_at_end)
        .with_sleep(no_sleep)
        .measure("sdb", 1.0)
        .unwrap_err();
    assert!(err.to_string().contains("end counter read"));
}

#[test]
fn test_disk_requires_both_halves() {
    let provider = workstation().failing_fs_usage("EACCES");
    let result = measure_disk(&provider, no_sleep, "/", 1.0);
    assert!(matches!(result, Err(MetricsError::Unavailable { query: "filesystem usage", .. })));
}

// ── Procfs fixture ─────────────────────────────────────────────

#[test]
fn test_procfs_fixture_through_sampler() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("diskstats"),
        "   8       0 sda 100 0 2000 0 50 0 4000 0 0 0 0 0 0 0 0\n",
    )
    .unwrap();
    let provider = ProcfsProvider::with_root(dir.path());

    let counters = provider.io_counters().unwrap();
    assert_eq!(counters["sda"].read_bytes, 2000 * 512);

    // The fixture does not change between reads, so every rate is zero.
    let sample = ThroughputSampler::new(&provider)
        .with_sleep(no_sleep)
        .measure("sda", 0.5)
        .unwrap();
    assert_eq!(sample.read_bytes_per_sec, 0.0);
    assert_eq!(sample.total_ops_per_sec, 0.0);
    assert!(!sample.counter_reset);
}
