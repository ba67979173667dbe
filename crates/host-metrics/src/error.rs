// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for metric collection.
//!
//! Two layers: [`ProbeError`] is what a [`StatsProvider`](crate::StatsProvider)
//! returns when the OS query itself fails; [`MetricsError`] is what the
//! measurement functions return, wrapping probe failures with the sub-query
//! that produced them.

/// Failure of a single OS-statistics query.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Failed to read a procfs file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse a value from a procfs file.
    #[error("failed to parse value from {path}: {detail}")]
    ParseError { path: String, detail: String },

    /// The procfs path does not exist (e.g., not running on Linux).
    #[error("path not found: {path}")]
    NotAvailable { path: String },

    /// A system call failed.
    #[error("{call}({path}) failed: {source}")]
    Syscall {
        call: &'static str,
        path: String,
        source: nix::Error,
    },

    /// Free-form failure, used by non-procfs providers.
    #[error("{0}")]
    Other(String),
}

/// Errors returned by the measurement and dispatch operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// A sampling window was zero, negative, or not finite.
    #[error("{name} must be greater than zero (got {value})")]
    InvalidArgument { name: &'static str, value: f64 },

    /// The requested device is absent from the counter or partition table.
    #[error("device \"{device}\" not found in {stage}")]
    DeviceNotFound { device: String, stage: &'static str },

    /// The underlying OS query failed.
    #[error("{query} unavailable: {source}")]
    Unavailable {
        query: &'static str,
        #[source]
        source: ProbeError,
    },

    /// The metric name is not recognized.
    #[error("invalid metric: {0}")]
    UnknownMetric(String),
}

impl MetricsError {
    /// Builds a closure that wraps a [`ProbeError`] with the failing sub-query.
    pub(crate) fn unavailable(query: &'static str) -> impl FnOnce(ProbeError) -> Self {
        move |source| Self::Unavailable { query, source }
    }
}

/// Converts a sampling window in seconds to a [`Duration`](std::time::Duration).
///
/// The window must be finite, strictly positive and representable.
pub(crate) fn sampling_window(
    name: &'static str,
    value: f64,
) -> Result<std::time::Duration, MetricsError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(MetricsError::InvalidArgument { name, value });
    }
    std::time::Duration::try_from_secs_f64(value)
        .map_err(|_| MetricsError::InvalidArgument { name, value })
}
