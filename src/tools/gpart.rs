//! Typed arguments for `gpart(8)` and parsers for its output.
//!
//! | Struct | Command line |
//! |--------|--------------|
//! | `GpartDestroy` | `gpart destroy -F <disk>` |
//! | `GpartCreate` | `gpart create -s gpt <disk>` |
//! | `GpartAdd` | `gpart add -t <type> [-a <align>] -i <n> [-s <size>] <disk>` |
//! | `GpartSetActive` | `gpart set -a active <disk>` |
//! | `GpartModify` | `gpart modify -i <n> -t <type> <disk>` |
//! | `GpartList` | `gpart list <disk>` |
//! | `GpartShow` | `gpart show <disk>` |
//! | `GpartBootcode` | `chroot <root> gpart bootcode -b /boot/pmbr -p /boot/gptzfsboot -i 1 <disk>` |

use std::path::PathBuf;

use strum::{Display, EnumString};

use crate::tool_traits::ToolArgs;
use crate::units::{GIB, KIB, MIB};

/// GPT partition types the installer writes or looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum PartitionType {
    Efi,
    FreebsdBoot,
    FreebsdSwap,
    FreebsdZfs,
    /// MBR slice holding a BSD label (legacy layout)
    Freebsd,
}

/// Render a byte count the way `gpart -s`/`-a` expects it.
///
/// Whole binary units use their suffix; anything else is given in 512-byte
/// blocks, which is what a bare number means to `gpart`.
pub fn gpart_size(bytes: u64) -> String {
    if bytes % GIB == 0 {
        format!("{}G", bytes / GIB)
    } else if bytes % MIB == 0 {
        format!("{}M", bytes / MIB)
    } else if bytes % KIB == 0 {
        format!("{}k", bytes / KIB)
    } else {
        (bytes / 512).to_string()
    }
}

#[derive(Debug, Clone)]
pub struct GpartDestroy {
    pub disk: String,
}

impl ToolArgs for GpartDestroy {
    fn program(&self) -> &'static str {
        "gpart"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["destroy".into(), "-F".into(), self.disk.clone()]
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct GpartCreate {
    pub disk: String,
}

impl ToolArgs for GpartCreate {
    fn program(&self) -> &'static str {
        "gpart"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["create".into(), "-s".into(), "gpt".into(), self.disk.clone()]
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// Add one partition. `size: None` takes the remaining free space.
#[derive(Debug, Clone)]
pub struct GpartAdd {
    pub disk: String,
    pub kind: PartitionType,
    pub index: u32,
    pub size: Option<u64>,
    pub align: Option<u64>,
}

impl ToolArgs for GpartAdd {
    fn program(&self) -> &'static str {
        "gpart"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["add".into(), "-t".into(), self.kind.to_string()];
        if let Some(align) = self.align {
            args.push("-a".into());
            args.push(gpart_size(align));
        }
        args.push("-i".into());
        args.push(self.index.to_string());
        if let Some(size) = self.size {
            args.push("-s".into());
            args.push(gpart_size(size));
        }
        args.push(self.disk.clone());
        args
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// Mark the protective MBR active so BIOS firmware will boot the disk.
#[derive(Debug, Clone)]
pub struct GpartSetActive {
    pub disk: String,
}

impl ToolArgs for GpartSetActive {
    fn program(&self) -> &'static str {
        "gpart"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["set".into(), "-a".into(), "active".into(), self.disk.clone()]
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct GpartModify {
    pub disk: String,
    pub index: u32,
    pub kind: PartitionType,
}

impl ToolArgs for GpartModify {
    fn program(&self) -> &'static str {
        "gpart"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "modify".into(),
            "-i".into(),
            self.index.to_string(),
            "-t".into(),
            self.kind.to_string(),
            self.disk.clone(),
        ]
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct GpartList {
    pub disk: String,
}

impl ToolArgs for GpartList {
    fn program(&self) -> &'static str {
        "gpart"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["list".into(), self.disk.clone()]
    }
}

#[derive(Debug, Clone)]
pub struct GpartShow {
    pub disk: String,
}

impl ToolArgs for GpartShow {
    fn program(&self) -> &'static str {
        "gpart"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["show".into(), self.disk.clone()]
    }
}

/// Write BIOS boot code using the new environment's own `gpart` and images.
#[derive(Debug, Clone)]
pub struct GpartBootcode {
    pub root: PathBuf,
    pub disk: String,
}

impl ToolArgs for GpartBootcode {
    fn program(&self) -> &'static str {
        "chroot"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            self.root.display().to_string(),
            "gpart".into(),
            "bootcode".into(),
            "-b".into(),
            "/boot/pmbr".into(),
            "-p".into(),
            "/boot/gptzfsboot".into(),
            "-i".into(),
            "1".into(),
            self.disk.clone(),
        ]
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// One provider from `gpart list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListedPartition {
    pub name: String,
    pub index: u32,
    /// Raw type string (`efi`, `freebsd-zfs`, ...)
    pub kind: String,
    pub size: u64,
}

/// Parse the `Providers:` section of `gpart list <disk>`.
pub fn parse_list(output: &str) -> Vec<ListedPartition> {
    let mut partitions = Vec::new();
    let mut current: Option<ListedPartition> = None;
    let mut in_providers = false;

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed == "Providers:" {
            in_providers = true;
            continue;
        }
        if trimmed == "Consumers:" {
            break;
        }
        if !in_providers {
            continue;
        }

        // "1. Name: ada0p1" opens a new provider
        if let Some((ordinal, rest)) = trimmed.split_once(". Name: ") {
            if ordinal.chars().all(|c| c.is_ascii_digit()) {
                partitions.extend(current.take());
                current = Some(ListedPartition {
                    name: rest.trim().to_string(),
                    ..Default::default()
                });
                continue;
            }
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };
        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Mediasize" => {
                entry.size = value
                    .split_whitespace()
                    .next()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
            }
            "type" => entry.kind = value.to_string(),
            "index" => entry.index = value.parse().unwrap_or(0),
            _ => {}
        }
    }
    partitions.extend(current);
    partitions
}

/// Find the slice flagged `[active]` in `gpart show <disk>` output.
pub fn parse_active_slice(output: &str) -> Option<u32> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("=>"))
        .find(|line| line.contains("[active"))
        .and_then(|line| line.split_whitespace().nth(2))
        .and_then(|index| index.parse().ok())
}
