// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device → mountpoint table.
//!
//! Lists the physical partitions currently mounted so an operator can find
//! valid arguments for a disk measurement. The table is read fresh on every
//! call; nothing is cached.

use crate::format::heading;
use crate::provider::Partition;
use crate::{MetricsError, StatsProvider};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Mapping from device path to mountpoint, sorted by device.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct DeviceMountTable {
    entries: BTreeMap<String, String>,
}

/// A disk resolved to both its device and its mountpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DiskTarget {
    pub device: String,
    pub mountpoint: String,
}

impl DeviceMountTable {
    /// Reads the partition table from the provider.
    pub fn read<P: StatsProvider + ?Sized>(provider: &P) -> Result<Self, MetricsError> {
        let partitions = provider
            .partitions()
            .map_err(MetricsError::unavailable("partition list"))?;
        Ok(Self::from_partitions(partitions))
    }

    /// Projects partitions onto a device → mountpoint map.
    ///
    /// A device mounted more than once keeps the first mountpoint listed.
    pub fn from_partitions(partitions: impl IntoIterator<Item = Partition>) -> Self {
        let mut entries = BTreeMap::new();
        for p in partitions {
            if let Some(existing) = entries.get(&p.device) {
                tracing::debug!(
                    device = %p.device,
                    kept = %existing,
                    ignored = %p.mountpoint,
                    "device mounted more than once"
                );
                continue;
            }
            entries.insert(p.device, p.mountpoint);
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(device, mountpoint)` pairs in device order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(d, m)| (d.as_str(), m.as_str()))
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.entries
    }

    pub fn mountpoint_of(&self, device: &str) -> Option<&str> {
        self.entries.get(device).map(String::as_str)
    }

    pub fn device_of(&self, mountpoint: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, m)| m.as_str() == mountpoint)
            .map(|(d, _)| d.as_str())
    }

    /// Resolves a user-supplied disk argument.
    ///
    /// Accepted forms, tried in order:
    /// 1. a device path present in the table (`/dev/sda1`);
    /// 2. a bare device name (`sda1` → `/dev/sda1`);
    /// 3. any path outside `/dev`, matched to the mount that contains it
    ///    (longest mountpoint prefix wins, so `/home/me` → `/home`).
    ///
    /// An empty argument means `/`.
    pub fn resolve(&self, target: &str) -> Result<DiskTarget, MetricsError> {
        let target = if target.trim().is_empty() { "/" } else { target.trim() };

        if let Some(mountpoint) = self.mountpoint_of(target) {
            return Ok(DiskTarget {
                device: target.to_string(),
                mountpoint: mountpoint.to_string(),
            });
        }

        if !target.contains('/') {
            let device = format!("/dev/{target}");
            if let Some(mountpoint) = self.mountpoint_of(&device) {
                return Ok(DiskTarget {
                    mountpoint: mountpoint.to_string(),
                    device,
                });
            }
        }

        if target.starts_with('/') && !target.starts_with("/dev/") {
            let path = Path::new(target);
            let containing = self
                .entries
                .iter()
                .filter(|(_, m)| path.starts_with(m.as_str()))
                .max_by_key(|(_, m)| Path::new(m.as_str()).components().count());
            if let Some((device, mountpoint)) = containing {
                return Ok(DiskTarget {
                    device: device.clone(),
                    mountpoint: mountpoint.clone(),
                });
            }
        }

        Err(MetricsError::DeviceNotFound {
            device: target.to_string(),
            stage: "partition table",
        })
    }

    pub fn summary(&self) -> String {
        format!("{} mounted physical devices", self.entries.len())
    }
}

impl fmt::Display for DeviceMountTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "Device mounts")?;
        if self.is_empty() {
            return write!(f, "   (no physical partitions mounted)");
        }
        let width = self.iter().map(|(d, _)| d.len()).max().unwrap_or(0);
        let mut first = true;
        for (device, mountpoint) in self.iter() {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "   {device:<width$}  {mountpoint}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{partition, FakeProvider};

    fn table() -> DeviceMountTable {
        DeviceMountTable::from_partitions(vec![
            partition("/dev/nvme0n1p2", "/"),
            partition("/dev/nvme0n1p3", "/home"),
            partition("/dev/sdb1", "/mnt/backup"),
        ])
    }

    #[test]
    fn test_read_exact_mapping() {
        let p = FakeProvider::new().with_partitions(vec![
            partition("/dev/nvme01", "/"),
            partition("/dev/nvme02", "/mnt"),
        ]);
        let table = DeviceMountTable::read(&p).unwrap();
        let expected = BTreeMap::from([
            ("/dev/nvme01".to_string(), "/".to_string()),
            ("/dev/nvme02".to_string(), "/mnt".to_string()),
        ]);
        assert_eq!(table.into_map(), expected);
    }

    #[test]
    fn test_read_failure() {
        let p = FakeProvider::new().failing_partitions("mounts unreadable");
        match DeviceMountTable::read(&p) {
            Err(MetricsError::Unavailable { query, .. }) => assert_eq!(query, "partition list"),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_first_mount_wins() {
        let table = DeviceMountTable::from_partitions(vec![
            partition("/dev/sda1", "/"),
            partition("/dev/sda1", "/var/lib/docker"),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.mountpoint_of("/dev/sda1"), Some("/"));
    }

    #[test]
    fn test_lookups() {
        let t = table();
        assert_eq!(t.mountpoint_of("/dev/sdb1"), Some("/mnt/backup"));
        assert_eq!(t.device_of("/home"), Some("/dev/nvme0n1p3"));
        assert_eq!(t.device_of("/nope"), None);
    }

    #[test]
    fn test_resolve_forms() {
        let t = table();
        let by_device = t.resolve("/dev/nvme0n1p3").unwrap();
        assert_eq!(by_device.mountpoint, "/home");

        let by_name = t.resolve("sdb1").unwrap();
        assert_eq!(by_name.device, "/dev/sdb1");

        let by_mount = t.resolve("/home").unwrap();
        assert_eq!(by_mount.device, "/dev/nvme0n1p3");

        let nested = t.resolve("/home/alice/projects").unwrap();
        assert_eq!(nested.mountpoint, "/home");

        let root = t.resolve("").unwrap();
        assert_eq!(root.device, "/dev/nvme0n1p2");

        // Sibling prefix must not match component-wise.
        assert_eq!(t.resolve("/homework").unwrap().mountpoint, "/");
    }

    #[test]
    fn test_resolve_unknown_device() {
        let t = table();
        for target in ["/dev/sdz", "sdz"] {
            match t.resolve(target) {
                Err(MetricsError::DeviceNotFound { device, stage }) => {
                    assert_eq!(device, target);
                    assert_eq!(stage, "partition table");
                }
                other => panic!("expected DeviceNotFound, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_display() {
        let text = table().to_string();
        assert!(text.starts_with("  Device mounts\n"));
        assert!(text.contains("/dev/sdb1       /mnt/backup"));
        assert_eq!(
            DeviceMountTable::default().to_string(),
            "  Device mounts\n   (no physical partitions mounted)"
        );
    }

    #[test]
    fn test_iter_in_device_order() {
        let t = table();
        assert!(!t.is_empty());
        assert!(DeviceMountTable::default().is_empty());
        let devices: Vec<&str> = t.iter().map(|(d, _)| d).collect();
        assert_eq!(devices, vec!["/dev/nvme0n1p2", "/dev/nvme0n1p3", "/dev/sdb1"]);
        assert_eq!(t.iter().nth(1), Some(("/dev/nvme0n1p3", "/home")));
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let json = serde_json::to_string(&table()).unwrap();
        assert!(json.starts_with("{\"/dev/nvme0n1p2\":\"/\""));
    }
}
