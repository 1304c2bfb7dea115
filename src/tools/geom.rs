//! Disk discovery tools: `sysctl`, `diskinfo`, `camcontrol`, `glabel`,
//! `graid` and `gmirror`, with parsers for their text output.

use std::collections::HashSet;

use crate::tool_traits::ToolArgs;

/// `sysctl -n <name>`
#[derive(Debug, Clone)]
pub struct Sysctl {
    pub name: String,
}

impl ToolArgs for Sysctl {
    fn program(&self) -> &'static str {
        "sysctl"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["-n".into(), self.name.clone()]
    }
}

#[derive(Debug, Clone)]
pub struct Diskinfo {
    pub disk: String,
}

impl ToolArgs for Diskinfo {
    fn program(&self) -> &'static str {
        "diskinfo"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["-v".into(), self.disk.clone()]
    }
}

#[derive(Debug, Clone, Default)]
pub struct CamcontrolDevlist;

impl ToolArgs for CamcontrolDevlist {
    fn program(&self) -> &'static str {
        "camcontrol"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["devlist".into(), "-v".into()]
    }
}

#[derive(Debug, Clone, Default)]
pub struct GlabelStatus;

impl ToolArgs for GlabelStatus {
    fn program(&self) -> &'static str {
        "glabel"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["status".into()]
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraidStatus;

impl ToolArgs for GraidStatus {
    fn program(&self) -> &'static str {
        "graid"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["status".into(), "-s".into()]
    }
}

/// Tear down a `gmirror` device left behind by a trial layout.
#[derive(Debug, Clone)]
pub struct GmirrorDestroy {
    pub name: String,
}

impl ToolArgs for GmirrorDestroy {
    fn program(&self) -> &'static str {
        "gmirror"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["destroy".into(), "-f".into(), self.name.clone()]
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// Returns true if `device` is `disk` itself or one of its partitions or
/// slices (`ada0p2`, `ada0s4`, `ada0s1a`).
pub fn device_belongs_to(device: &str, disk: &str) -> bool {
    let Some(rest) = device.strip_prefix(disk) else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    let mut chars = rest.chars();
    match chars.next() {
        Some('p') | Some('s') => {}
        _ => return false,
    }
    let tail: String = chars.collect();
    let digits = tail.trim_end_matches(|c: char| ('a'..='h').contains(&c));
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && tail.len() - digits.len() <= 1
}

/// Fields of interest from `diskinfo -v`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskinfoRecord {
    pub media_size: u64,
    pub description: String,
}

pub fn parse_diskinfo(output: &str) -> Option<DiskinfoRecord> {
    let mut record = DiskinfoRecord::default();
    let mut found_size = false;
    for line in output.lines() {
        let Some((value, comment)) = line.split_once('#') else {
            continue;
        };
        let value = value.trim();
        let comment = comment.trim();
        if comment.starts_with("mediasize in bytes") {
            record.media_size = value.parse().ok()?;
            found_size = true;
        } else if comment.starts_with("Disk descr.") {
            record.description = value.to_string();
        }
    }
    found_size.then_some(record)
}

/// Device names attached through a USB mass-storage bridge (`umass-sim`).
pub fn parse_removable(devlist: &str) -> HashSet<String> {
    let mut removable = HashSet::new();
    let mut on_umass = false;
    for line in devlist.lines() {
        if line.starts_with("scbus") {
            on_umass = line.contains("umass-sim");
            continue;
        }
        if !on_umass {
            continue;
        }
        let Some(start) = line.rfind('(') else {
            continue;
        };
        let inner = line[start + 1..].trim_end().trim_end_matches(')');
        removable.extend(
            inner
                .split(',')
                .map(str::trim)
                .filter(|name| !name.starts_with("pass") && !name.is_empty())
                .map(str::to_string),
        );
    }
    removable
}

/// `(label, component)` pairs from `glabel status`.
pub fn parse_glabel_status(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                ["Name", ..] => None,
                [label, _status, component] => Some((label.to_string(), component.to_string())),
                _ => None,
            }
        })
        .collect()
}

/// A software RAID volume and the disks it is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaidVolume {
    /// Device name, e.g. `raid/r0`
    pub name: String,
    pub members: Vec<String>,
}

/// Parse `graid status -s`. Continuation lines carry only a component.
pub fn parse_graid_status(output: &str) -> Vec<RaidVolume> {
    let mut volumes: Vec<RaidVolume> = Vec::new();
    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if line.starts_with(char::is_whitespace) {
            if let (Some(volume), Some(member)) = (volumes.last_mut(), fields.first()) {
                volume.members.push(member.to_string());
            }
            continue;
        }
        let (Some(name), Some(member)) = (fields.first(), fields.get(2)) else {
            continue;
        };
        match volumes.iter_mut().find(|v| v.name == *name) {
            Some(volume) => volume.members.push(member.to_string()),
            None => volumes.push(RaidVolume {
                name: name.to_string(),
                members: vec![member.to_string()],
            }),
        }
    }
    volumes
}
