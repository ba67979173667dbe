// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Production [`StatsProvider`] backed by Linux procfs.
//!
//! Reads:
//! - `/proc/stat`: per-core CPU time, sampled twice across the window.
//! - `/proc/loadavg`: 1/5/15-minute load averages.
//! - `/proc/diskstats`: cumulative block-device I/O counters.
//! - `/proc/self/mounts` + `/proc/filesystems`: physical partitions.
//! - `/proc/meminfo`: total and available memory.
//!
//! Filesystem usage comes from `statvfs(2)` rather than procfs.
//!
//! The procfs root is configurable so the parsers can be pointed at a
//! fixture tree in tests.

use crate::provider::{FsUsage, LoadAverage, MemoryStat, Partition, RawCounterSnapshot};
use crate::{ProbeError, StatsProvider};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `/proc/diskstats` reports sectors in fixed 512-byte units regardless of
/// the device's physical sector size.
const SECTOR_BYTES: u64 = 512;

/// Reads host statistics from procfs.
#[derive(Debug, Clone)]
pub struct ProcfsProvider {
    root: PathBuf,
}

impl Default for ProcfsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcfsProvider {
    /// Provider reading the host's `/proc`.
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Provider reading a procfs tree rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn read(&self, name: &str) -> Result<(String, PathBuf), ProbeError> {
        let path = self.path(name);
        let content = read_proc_file(&path)?;
        Ok((content, path))
    }

    fn read_cpu_times(&self) -> Result<Vec<CpuTimes>, ProbeError> {
        let (content, path) = self.read("stat")?;
        parse_cpu_times(&content, &path)
    }
}

impl StatsProvider for ProcfsProvider {
    fn cpu_percent_per_core(&self, window: Duration) -> Result<Vec<f64>, ProbeError> {
        let before = self.read_cpu_times()?;
        tracing::debug!(cores = before.len(), ?window, "cpu sample window started");
        std::thread::sleep(window);
        let after = self.read_cpu_times()?;

        if before.len() != after.len() {
            return Err(ProbeError::ParseError {
                path: self.path("stat").display().to_string(),
                detail: format!(
                    "online core count changed during sampling ({} -> {})",
                    before.len(),
                    after.len()
                ),
            });
        }

        Ok(before
            .iter()
            .zip(&after)
            .map(|(b, a)| busy_percent(b, a))
            .collect())
    }

    fn load_average(&self) -> Result<LoadAverage, ProbeError> {
        let (content, path) = self.read("loadavg")?;
        parse_loadavg(&content, &path)
    }

    fn fs_usage(&self, path: &Path) -> Result<FsUsage, ProbeError> {
        let stats = nix::sys::statvfs::statvfs(path).map_err(|e| ProbeError::Syscall {
            call: "statvfs",
            path: path.display().to_string(),
            source: e,
        })?;

        let block_size = if stats.fragment_size() > 0 {
            stats.fragment_size() as u64
        } else {
            stats.block_size() as u64
        };
        let blocks = stats.blocks() as u64;
        let blocks_free = stats.blocks_free() as u64;
        let blocks_avail = stats.blocks_available() as u64;

        Ok(fs_usage_from_blocks(
            blocks,
            blocks_free,
            blocks_avail,
            block_size,
        ))
    }

    fn io_counters(&self) -> Result<HashMap<String, RawCounterSnapshot>, ProbeError> {
        let (content, path) = self.read("diskstats")?;
        let counters = parse_diskstats(&content, &path)?;
        tracing::debug!(devices = counters.len(), "read io counters");
        Ok(counters)
    }

    fn partitions(&self) -> Result<Vec<Partition>, ProbeError> {
        let (content, _) = self
            .read("self/mounts")
            .or_else(|_| self.read("mounts"))?;

        let nodev = match self.read("filesystems") {
            Ok((fs, _)) => Some(parse_nodev_filesystems(&fs)),
            Err(e) => {
                tracing::debug!(
                    "filesystem type list unavailable ({e}); keeping all device mounts"
                );
                None
            }
        };

        Ok(parse_mounts(&content)
            .into_iter()
            .filter(|p| p.device.starts_with('/'))
            .filter(|p| nodev.as_ref().map_or(true, |n| !n.contains(&p.fs_type)))
            .collect())
    }

    fn virtual_memory(&self) -> Result<MemoryStat, ProbeError> {
        let (content, path) = self.read("meminfo")?;
        parse_meminfo(&content, &path)
    }

    /// Resolves symlinks first so `/dev/mapper/root` maps to `dm-0`.
    fn counter_key(&self, device: &str) -> String {
        let resolved = std::fs::canonicalize(device).unwrap_or_else(|_| PathBuf::from(device));
        resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| device.to_string())
    }
}

/// Reads a procfs file and returns its content.
pub(crate) fn read_proc_file(path: &Path) -> Result<String, ProbeError> {
    if !path.exists() {
        return Err(ProbeError::NotAvailable {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| ProbeError::ReadError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Cumulative jiffies for one core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    /// Sum of user, nice, system, idle, iowait, irq, softirq and steal.
    pub total: u64,
    /// idle + iowait.
    pub idle: u64,
}

/// Busy percentage between two readings of the same core.
fn busy_percent(before: &CpuTimes, after: &CpuTimes) -> f64 {
    let total = after.total.saturating_sub(before.total);
    if total == 0 {
        return 0.0;
    }
    let idle = after.idle.saturating_sub(before.idle).min(total);
    (total - idle) as f64 / total as f64 * 100.0
}

/// Parses the per-core `cpuN` lines of `/proc/stat`. The aggregate `cpu`
/// line is skipped.
pub fn parse_cpu_times(content: &str, source_path: &Path) -> Result<Vec<CpuTimes>, ProbeError> {
    let mut cores = Vec::new();
    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let Some(label) = fields.next() else { continue };
        let is_core = label.len() > 3
            && label.starts_with("cpu")
            && label[3..].chars().all(|c| c.is_ascii_digit());
        if !is_core {
            continue;
        }

        let values = fields
            .take(8)
            .map(|f| {
                f.parse::<u64>().map_err(|_| ProbeError::ParseError {
                    path: source_path.display().to_string(),
                    detail: format!("expected integer jiffies in '{label}', got '{f}'"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if values.len() < 4 {
            return Err(ProbeError::ParseError {
                path: source_path.display().to_string(),
                detail: format!("'{label}' has {} time fields, expected at least 4", values.len()),
            });
        }

        let iowait = values.get(4).copied().unwrap_or(0);
        cores.push(CpuTimes {
            total: values.iter().sum(),
            idle: values[3] + iowait,
        });
    }

    if cores.is_empty() {
        return Err(ProbeError::ParseError {
            path: source_path.display().to_string(),
            detail: "no per-core cpu lines found".to_string(),
        });
    }
    Ok(cores)
}

/// Parses `/proc/loadavg`, e.g. `"0.35 0.28 0.22 1/234 5678"`.
pub fn parse_loadavg(content: &str, source_path: &Path) -> Result<LoadAverage, ProbeError> {
    let mut fields = content.split_whitespace();
    let mut next = |window: &str| -> Result<f64, ProbeError> {
        let raw = fields.next().unwrap_or("");
        raw.parse::<f64>().map_err(|_| ProbeError::ParseError {
            path: source_path.display().to_string(),
            detail: format!("expected {window} load average, got '{raw}'"),
        })
    };
    Ok(LoadAverage {
        one: next("1-minute")?,
        five: next("5-minute")?,
        fifteen: next("15-minute")?,
    })
}

/// Parses `/proc/diskstats` into cumulative counters keyed by device name.
///
/// Format (kernel 4.18+):
/// ```text
/// major minor name rd_ios rd_merges rd_sectors rd_ticks
///   wr_ios wr_merges wr_sectors wr_ticks in_flight io_ticks time_in_queue [...]
/// ```
/// Lines with fewer than 14 fields are skipped.
pub fn parse_diskstats(
    content: &str,
    source_path: &Path,
) -> Result<HashMap<String, RawCounterSnapshot>, ProbeError> {
    let mut devices = HashMap::new();
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }
        let field = |idx: usize| -> Result<u64, ProbeError> {
            parts[idx].parse::<u64>().map_err(|_| ProbeError::ParseError {
                path: source_path.display().to_string(),
                detail: format!(
                    "expected integer in column {} for '{}', got '{}'",
                    idx + 1,
                    parts[2],
                    parts[idx]
                ),
            })
        };
        devices.insert(
            parts[2].to_string(),
            RawCounterSnapshot {
                read_ops: field(3)?,
                read_bytes: field(5)?.saturating_mul(SECTOR_BYTES),
                write_ops: field(7)?,
                write_bytes: field(9)?.saturating_mul(SECTOR_BYTES),
            },
        );
    }
    Ok(devices)
}

/// Parses `/proc/mounts`-formatted content into partitions, without filtering.
pub fn parse_mounts(content: &str) -> Vec<Partition> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mountpoint = fields.next()?;
            let fs_type = fields.next()?;
            Some(Partition {
                device: decode_mount_field(device),
                mountpoint: decode_mount_field(mountpoint),
                fs_type: fs_type.to_string(),
            })
        })
        .collect()
}

/// Filesystem types flagged `nodev` in `/proc/filesystems`.
pub fn parse_nodev_filesystems(content: &str) -> HashSet<String> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some("nodev"), Some(fs)) => Some(fs.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Decodes the octal escapes (`\040` for space, etc.) the kernel uses in mount tables.
fn decode_mount_field(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let decoded = std::str::from_utf8(&bytes[i + 1..i + 4])
                .ok()
                .and_then(|digits| u8::from_str_radix(digits, 8).ok());
            if let Some(b) = decoded {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parses `MemTotal` and `MemAvailable` from `/proc/meminfo` (values in kB).
pub fn parse_meminfo(content: &str, source_path: &Path) -> Result<MemoryStat, ProbeError> {
    let mut total_kb: Option<u64> = None;
    let mut available_kb: Option<u64> = None;

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }
        match parts[0] {
            "MemTotal:" => total_kb = Some(parse_kb_value(parts[1], source_path)?),
            "MemAvailable:" => available_kb = Some(parse_kb_value(parts[1], source_path)?),
            _ => {}
        }
        if total_kb.is_some() && available_kb.is_some() {
            break;
        }
    }

    let total_kb = total_kb.ok_or_else(|| ProbeError::ParseError {
        path: source_path.display().to_string(),
        detail: "MemTotal not found".to_string(),
    })?;
    let available_kb = available_kb.ok_or_else(|| ProbeError::ParseError {
        path: source_path.display().to_string(),
        detail: "MemAvailable not found".to_string(),
    })?;

    let total = total_kb.saturating_mul(1024);
    let available = available_kb.saturating_mul(1024);
    Ok(MemoryStat {
        total,
        available,
        used: total.saturating_sub(available),
    })
}

fn parse_kb_value(s: &str, source_path: &Path) -> Result<u64, ProbeError> {
    s.parse::<u64>().map_err(|_| ProbeError::ParseError {
        path: source_path.display().to_string(),
        detail: format!("expected integer kB value, got '{s}'"),
    })
}

/// Converts raw `statvfs` block counts into byte totals.
fn fs_usage_from_blocks(
    blocks: u64,
    blocks_free: u64,
    blocks_avail: u64,
    block_size: u64,
) -> FsUsage {
    let total = blocks.saturating_mul(block_size);
    let used = blocks.saturating_sub(blocks_free).saturating_mul(block_size);
    let free = blocks_avail.saturating_mul(block_size);
    let denom = used.saturating_add(free);
    let used_percent = if denom == 0 {
        0.0
    } else {
        used as f64 / denom as f64 * 100.0
    };
    FsUsage {
        total,
        used,
        free,
        used_percent,
    }
}
