// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Metric selection and per-metric evaluation.
//!
//! The [`Dispatcher`] takes a comma-separated selection such as
//! `"cpu,disk,deviceMounts"`, measures each entry in order, and writes either
//! the rendered record or an error line for it. A failing or unknown entry
//! never stops the entries after it.

use crate::format::OutputFormat;
use crate::{
    measure_cpu, measure_disk, measure_memory, DeviceMountTable, MetricRecord, MetricsError,
    StatsProvider,
};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::time::Duration;

/// A metric that can be requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Cpu,
    Disk,
    Memory,
    DeviceMounts,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [Self::Cpu, Self::Disk, Self::Memory, Self::DeviceMounts];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Disk => "disk",
            Self::Memory => "memory",
            Self::DeviceMounts => "deviceMounts",
        }
    }
}

impl FromStr for MetricKind {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "disk" => Ok(Self::Disk),
            "memory" | "mem" => Ok(Self::Memory),
            "devicemounts" | "mounts" => Ok(Self::DeviceMounts),
            _ => Err(MetricsError::UnknownMetric(s.trim().to_string())),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits a comma-separated selection, dropping empty entries.
pub fn split_selection(selection: &str) -> Vec<&str> {
    selection
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parameters shared by every metric in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOptions {
    /// Sampling window for CPU usage and disk throughput, in seconds.
    pub seconds: f64,
    /// Mountpoint or device for `disk`.
    pub disk_target: String,
    pub format: OutputFormat,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            seconds: 5.0,
            disk_target: "/".to_string(),
            format: OutputFormat::Text,
        }
    }
}

/// Outcome of a [`Dispatcher::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Metrics that produced a record, in evaluation order.
    pub succeeded: Vec<MetricKind>,
    /// Entries that failed, with their error messages, in evaluation order.
    pub failed: Vec<(String, String)>,
}

impl DispatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Evaluates metric selections against a provider.
pub struct Dispatcher<'p, P: StatsProvider + ?Sized> {
    provider: &'p P,
    options: DispatchOptions,
    sleep: fn(Duration),
}

impl<'p, P: StatsProvider + ?Sized> Dispatcher<'p, P> {
    pub fn new(provider: &'p P, options: DispatchOptions) -> Self {
        Self {
            provider,
            options,
            sleep: std::thread::sleep,
        }
    }

    /// Replaces the throughput sleep (for tests).
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    /// Measures a single metric.
    pub fn measure(&self, kind: MetricKind) -> Result<MetricRecord, MetricsError> {
        match kind {
            MetricKind::Cpu => {
                measure_cpu(self.provider, self.options.seconds).map(MetricRecord::Cpu)
            }
            MetricKind::Disk => measure_disk(
                self.provider,
                self.sleep,
                &self.options.disk_target,
                self.options.seconds,
            )
            .map(MetricRecord::Disk),
            MetricKind::Memory => measure_memory(self.provider).map(MetricRecord::Memory),
            MetricKind::DeviceMounts => {
                DeviceMountTable::read(self.provider).map(MetricRecord::DeviceMounts)
            }
        }
    }

    /// Measures every entry of `selection` in order, writing one block per entry.
    ///
    /// Failures are written to `out` and recorded in the report; evaluation
    /// always continues with the next entry. Only I/O errors on `out` abort.
    pub fn run<W: Write>(&self, selection: &str, out: &mut W) -> io::Result<DispatchReport> {
        let mut report = DispatchReport::default();

        for entry in split_selection(selection) {
            let outcome = entry
                .parse::<MetricKind>()
                .and_then(|kind| self.measure(kind).map(|record| (kind, record)));

            match outcome {
                Ok((kind, record)) => match record.render(self.options.format) {
                    Ok(rendered) => {
                        tracing::info!("{}", record.summary());
                        writeln!(out, "{rendered}")?;
                        if self.options.format == OutputFormat::Text {
                            writeln!(out)?;
                        }
                        report.succeeded.push(kind);
                    }
                    Err(e) => {
                        let message = format!("failed to render {kind}: {e}");
                        self.write_failure(out, entry, &message)?;
                        report.failed.push((entry.to_string(), message));
                    }
                },
                Err(e) => {
                    tracing::warn!(metric = entry, "{e}");
                    let message = match e {
                        MetricsError::UnknownMetric(_) => e.to_string(),
                        _ => format!("error measuring {entry}: {e}"),
                    };
                    self.write_failure(out, entry, &message)?;
                    report.failed.push((entry.to_string(), message));
                }
            }
        }

        Ok(report)
    }

    fn write_failure<W: Write>(&self, out: &mut W, entry: &str, message: &str) -> io::Result<()> {
        match self.options.format {
            OutputFormat::Text => writeln!(out, "{message}\n"),
            OutputFormat::Json => {
                let line = serde_json::json!({ "metric": entry, "error": message });
                writeln!(out, "{line}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{counters, no_sleep, partition, FakeProvider};

    fn run(
        provider: &FakeProvider,
        selection: &str,
        format: OutputFormat,
    ) -> (DispatchReport, String) {
        let options = DispatchOptions {
            seconds: 1.0,
            disk_target: "/".into(),
            format,
        };
        let mut out = Vec::new();
        let report = Dispatcher::new(provider, options)
            .with_sleep(no_sleep)
            .run(selection, &mut out)
            .unwrap();
        (report, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_metric_kind_parse() {
        assert_eq!("cpu".parse::<MetricKind>().unwrap(), MetricKind::Cpu);
        assert_eq!("deviceMounts".parse::<MetricKind>().unwrap(), MetricKind::DeviceMounts);
        assert_eq!(" Disk ".parse::<MetricKind>().unwrap(), MetricKind::Disk);
        assert_eq!("memory".parse::<MetricKind>().unwrap(), MetricKind::Memory);
        assert!(matches!(
            "gpu".parse::<MetricKind>(),
            Err(MetricsError::UnknownMetric(name)) if name == "gpu"
        ));
        for kind in MetricKind::ALL {
            assert_eq!(kind.as_str().parse::<MetricKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_split_selection() {
        assert_eq!(split_selection("cpu, disk,,memory,"), vec!["cpu", "disk", "memory"]);
        assert!(split_selection("").is_empty());
    }

    #[test]
    fn test_unknown_metric_does_not_abort() {
        let provider = FakeProvider::new();
        let (report, out) = run(&provider, "bogus,memory,deviceMounts", OutputFormat::Text);

        assert_eq!(report.succeeded, vec![MetricKind::Memory, MetricKind::DeviceMounts]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "bogus");
        assert!(out.starts_with("invalid metric: bogus\n"));
        assert!(out.contains("  Memory\n"));
        assert!(out.contains("  Device mounts\n"));
    }

    #[test]
    fn test_failed_metric_does_not_abort() {
        let provider = FakeProvider::new().failing_cpu("no /proc/stat");
        let (report, out) = run(&provider, "cpu,memory", OutputFormat::Text);

        assert_eq!(report.succeeded, vec![MetricKind::Memory]);
        assert!(!report.all_succeeded());
        assert!(out.contains("error measuring cpu: cpu usage unavailable: no /proc/stat"));
        assert!(out.contains("  Memory\n"));
    }

    #[test]
    fn test_metrics_run_in_order() {
        let provider = FakeProvider::new()
            .with_partitions(vec![partition("/dev/sda1", "/")])
            .push_counters(counters("sda1", 0, 0, 0, 0))
            .push_counters(counters("sda1", 10, 20, 1, 2));
        let (report, out) = run(&provider, "disk,cpu", OutputFormat::Text);

        assert_eq!(report.succeeded, vec![MetricKind::Disk, MetricKind::Cpu]);
        let disk_at = out.find("  Disk\n").unwrap();
        let cpu_at = out.find("  CPU\n").unwrap();
        assert!(disk_at < cpu_at);
    }

    #[test]
    fn test_invalid_seconds_reported_per_metric() {
        let provider = FakeProvider::new();
        let options = DispatchOptions {
            seconds: 0.0,
            ..Default::default()
        };
        let mut out = Vec::new();
        let report = Dispatcher::new(&provider, options)
            .with_sleep(crate::testing::forbid_sleep)
            .run("cpu,disk,memory", &mut out)
            .unwrap();
        assert_eq!(report.succeeded, vec![MetricKind::Memory]);
        assert_eq!(report.failed.len(), 2);
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("error measuring cpu: seconds must be greater than zero (got 0)"));
    }

    #[test]
    fn test_json_lines() {
        let provider = FakeProvider::new();
        let (report, out) = run(&provider, "memory,nope", OutputFormat::Json);
        assert_eq!(report.succeeded.len(), 1);

        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["metric"], "memory");
        assert_eq!(lines[1]["metric"], "nope");
        assert_eq!(lines[1]["error"], "invalid metric: nope");
    }
}
