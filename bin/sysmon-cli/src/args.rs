// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Rewrites single-dash long flags (`-metric=cpu`) into `--metric=cpu`.
//!
//! Only the long names below are rewritten, so bundled short flags such as
//! `-vv` keep their meaning. Everything after a bare `--` is left alone.

use std::ffi::OsString;

const LONG_FLAGS: &[&str] = &[
    "metric", "seconds", "md", "format", "config", "verbose", "help", "version",
];

pub(crate) fn normalize_single_dash_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough {
                return arg;
            }
            let Some(s) = arg.to_str() else { return arg };
            if s == "--" {
                passthrough = true;
                return arg;
            }
            match single_dash_long(s) {
                Some(rewritten) => OsString::from(rewritten),
                None => arg,
            }
        })
        .collect()
}

fn single_dash_long(arg: &str) -> Option<String> {
    let rest = arg.strip_prefix('-')?;
    if rest.starts_with('-') {
        return None;
    }
    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
    LONG_FLAGS.contains(&name).then(|| format!("-{arg}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(args: &[&str]) -> Vec<String> {
        normalize_single_dash_flags(args.iter().copied())
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect()
    }

    #[test]
    fn test_rewrites_known_long_flags() {
        assert_eq!(
            normalize(&["sysmon", "-metric=cpu,disk", "-seconds", "2", "-md=/home"]),
            vec!["sysmon", "--metric=cpu,disk", "--seconds", "2", "--md=/home"]
        );
    }

    #[test]
    fn test_leaves_short_and_double_dash_flags() {
        assert_eq!(
            normalize(&["sysmon", "-vv", "-m", "cpu", "--format", "json"]),
            vec!["sysmon", "-vv", "-m", "cpu", "--format", "json"]
        );
    }

    #[test]
    fn test_unknown_single_dash_untouched() {
        assert_eq!(normalize(&["sysmon", "-bogus=1"]), vec!["sysmon", "-bogus=1"]);
    }

    #[test]
    fn test_stops_after_separator() {
        assert_eq!(
            normalize(&["sysmon", "--", "-metric=cpu"]),
            vec!["sysmon", "--", "-metric=cpu"]
        );
    }

    #[test]
    fn test_parses_with_clap() {
        use clap::Parser;
        let cli = crate::Cli::parse_from(normalize_single_dash_flags([
            "sysmon",
            "-metric=cpu,deviceMounts",
            "-seconds=0.5",
            "-md=sda1",
            "-v",
        ]));
        assert_eq!(cli.metric.as_deref(), Some("cpu,deviceMounts"));
        assert_eq!(cli.seconds, Some(0.5));
        assert_eq!(cli.md.as_deref(), Some("sda1"));
        assert_eq!(cli.verbose, 1);
    }
}
