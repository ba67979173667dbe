// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A single completed measurement, as handed to the formatter.

use crate::format::OutputFormat;
use crate::{CpuMetric, DeviceMountTable, DiskMetric, MemoryMetric};
use std::fmt;

/// One measurement event for one resource.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "metric", content = "data", rename_all = "camelCase")]
pub enum MetricRecord {
    Cpu(CpuMetric),
    Disk(DiskMetric),
    Memory(MemoryMetric),
    DeviceMounts(DeviceMountTable),
}

impl MetricRecord {
    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        match self {
            Self::Cpu(m) => m.summary(),
            Self::Disk(m) => m.summary(),
            Self::Memory(m) => m.summary(),
            Self::DeviceMounts(m) => m.summary(),
        }
    }

    /// Renders the record in the requested format, without a trailing newline.
    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Text => Ok(self.to_string()),
            OutputFormat::Json => serde_json::to_string(self),
        }
    }
}

impl fmt::Display for MetricRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu(m) => fmt::Display::fmt(m, f),
            Self::Disk(m) => fmt::Display::fmt(m, f),
            Self::Memory(m) => fmt::Display::fmt(m, f),
            Self::DeviceMounts(m) => fmt::Display::fmt(m, f),
        }
    }
}
