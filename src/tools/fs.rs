//! Typed arguments for mounting and formatting.

use std::path::PathBuf;

use strum::{Display, EnumString};

use crate::tool_traits::ToolArgs;

/// Filesystem types the installer mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FsType {
    Ufs,
    Zfs,
    Msdosfs,
}

/// `mount -t <type> [-o <opts>] <device> <target>`
///
/// For ZFS the device is a dataset name; everything else is resolved under
/// `/dev`.
#[derive(Debug, Clone)]
pub struct Mount {
    pub fstype: FsType,
    pub device: String,
    pub target: PathBuf,
    pub options: Vec<String>,
}

impl Mount {
    fn source(&self) -> String {
        match self.fstype {
            FsType::Zfs => self.device.clone(),
            _ => format!("/dev/{}", self.device),
        }
    }
}

impl ToolArgs for Mount {
    fn program(&self) -> &'static str {
        "mount"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["-t".into(), self.fstype.to_string()];
        if !self.options.is_empty() {
            args.push("-o".into());
            args.push(self.options.join(","));
        }
        args.push(self.source());
        args.push(self.target.display().to_string());
        args
    }
}

#[derive(Debug, Clone)]
pub struct Umount {
    pub target: PathBuf,
    pub force: bool,
}

impl ToolArgs for Umount {
    fn program(&self) -> &'static str {
        "umount"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.force {
            args.push("-f".into());
        }
        args.push(self.target.display().to_string());
        args
    }
}

/// `mount -p`: the mount table in fstab format.
#[derive(Debug, Clone, Default)]
pub struct MountTable;

impl ToolArgs for MountTable {
    fn program(&self) -> &'static str {
        "mount"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["-p".into()]
    }
}

/// FAT16 for the EFI System Partition.
#[derive(Debug, Clone)]
pub struct NewfsMsdos {
    pub device: String,
}

impl ToolArgs for NewfsMsdos {
    fn program(&self) -> &'static str {
        "newfs_msdos"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["-F".into(), "16".into(), format!("/dev/{}", self.device)]
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// One row of `mount -p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRecord {
    pub device: String,
    pub mountpoint: PathBuf,
    pub fstype: String,
}

pub fn parse_mount_table(output: &str) -> Vec<MountRecord> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mountpoint = fields.next()?;
            let fstype = fields.next()?;
            Some(MountRecord {
                device: device.trim_start_matches("/dev/").to_string(),
                mountpoint: PathBuf::from(mountpoint),
                fstype: fstype.to_string(),
            })
        })
        .collect()
}
