// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Measures the selected metrics and prints them to stdout.
//!
//! A metric that fails is reported and the run moves on to the next one;
//! the exit status stays 0. Only a missing selection exits with 1.

use crate::config::Settings;
use host_metrics::{Dispatcher, ProcfsProvider, StatsProvider};
use std::io::Write;
use std::process::ExitCode;

/// Message printed when no metric was selected.
pub(crate) const NO_METRIC: &str = "no metric was chosen (ex: -metric=cpu,disk)";

pub fn execute(settings: &Settings) -> anyhow::Result<ExitCode> {
    let provider = ProcfsProvider::new();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let code = run(&provider, settings, &mut out)?;
    out.flush()?;
    Ok(code)
}

pub(crate) fn run<P, W>(provider: &P, settings: &Settings, out: &mut W) -> anyhow::Result<ExitCode>
where
    P: StatsProvider + ?Sized,
    W: Write,
{
    let Some(selection) = settings.metric.as_deref() else {
        writeln!(out, "{NO_METRIC}")?;
        return Ok(ExitCode::FAILURE);
    };

    tracing::info!(
        selection,
        seconds = settings.options.seconds,
        target = %settings.options.disk_target,
        "measuring"
    );

    let report = Dispatcher::new(provider, settings.options.clone()).run(selection, out)?;

    if !report.all_succeeded() {
        tracing::warn!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "some metrics could not be measured"
        );
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use host_metrics::testing::FakeProvider;
    use host_metrics::DispatchOptions;

    fn settings(metric: Option<&str>) -> Settings {
        Settings {
            metric: metric.map(str::to_string),
            options: DispatchOptions {
                seconds: 0.01,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_no_metric_fails() {
        let mut out = Vec::new();
        let code = run(&FakeProvider::new(), &settings(None), &mut out).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert_eq!(String::from_utf8(out).unwrap(), format!("{NO_METRIC}\n"));
    }

    #[test]
    fn test_partial_failure_still_succeeds() {
        let provider = FakeProvider::new().failing_memory("meminfo gone");
        let mut out = Vec::new();
        let code = run(&provider, &settings(Some("memory,cpu,nope")), &mut out).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("error measuring memory: virtual memory unavailable: meminfo gone"));
        assert!(out.contains("  CPU\n"));
        assert!(out.contains("invalid metric: nope"));
    }
}
