//! The machine being provisioned.
//!
//! `Host` is the narrow seam between the provisioning engine and the
//! operating system. Every query and every write goes through it and comes
//! back as a structured value or a typed error. `SystemHost` drives the real
//! tools; tests use a simulated host that models disks, partition tables,
//! pools and mounts in memory.

pub mod system;

#[cfg(test)]
pub mod sim;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::BootMode;

pub use crate::tools::fs::{FsType, MountRecord};
pub use crate::tools::geom::RaidVolume;
pub use crate::tools::gpart::{ListedPartition, PartitionType};
pub use system::SystemHost;

/// Size and identity of one disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskInfo {
    pub media_size: u64,
    pub description: String,
}

/// One partition to add to a disk's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSpec {
    pub index: u32,
    pub kind: PartitionType,
    /// `None` takes the rest of the free space
    pub size: Option<u64>,
    pub align: Option<u64>,
}

/// A boot pool to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSpec {
    pub name: String,
    /// Data partitions (`ada0p2`, ...)
    pub vdevs: Vec<String>,
    pub mirror: bool,
    pub cachefile: PathBuf,
    pub altroot: PathBuf,
}

/// A filesystem to mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub fstype: FsType,
    /// Device name without `/dev/`, or a dataset name for ZFS
    pub device: String,
    pub target: PathBuf,
    pub options: Vec<String>,
}

/// Device name of partition `index` on `disk` (`ada0p2`, `raid/r0p1`).
pub fn partition_device(disk: &str, index: u32) -> String {
    format!("{}p{}", disk, index)
}

/// Device name of MBR slice `index` on `disk` (`ada0s4`).
pub fn slice_device(disk: &str, index: u32) -> String {
    format!("{}s{}", disk, index)
}

/// Everything the engine needs from the machine.
pub trait Host {
    // Discovery
    fn list_disks(&self) -> Result<Vec<String>>;
    fn disk_info(&self, disk: &str) -> Result<DiskInfo>;
    /// Disks attached through a USB mass-storage bridge
    fn removable_disks(&self) -> Result<HashSet<String>>;
    /// `(label, component device)` pairs
    fn labels(&self) -> Result<Vec<(String, String)>>;
    fn raid_volumes(&self) -> Result<Vec<RaidVolume>>;
    fn mounts(&self) -> Result<Vec<MountRecord>>;
    /// Firmware mode the live environment booted under
    fn live_boot_mode(&self) -> Result<BootMode>;

    // Partition tables
    fn destroy_table(&self, disk: &str) -> Result<()>;
    fn create_table(&self, disk: &str) -> Result<()>;
    fn add_partition(&self, disk: &str, spec: &PartitionSpec) -> Result<()>;
    fn set_active(&self, disk: &str) -> Result<()>;
    fn set_partition_type(&self, disk: &str, index: u32, kind: PartitionType) -> Result<()>;
    fn partitions(&self, disk: &str) -> Result<Vec<ListedPartition>>;
    /// Active slice of a legacy MBR table, if any
    fn active_slice(&self, disk: &str) -> Result<Option<u32>>;
    fn format_efi(&self, device: &str) -> Result<()>;
    /// Remove a swap mirror a trial layout may have left behind
    fn destroy_swap_mirror(&self) -> Result<()>;

    // Pools and datasets
    fn create_pool(&self, spec: &PoolSpec) -> Result<()>;
    fn import_pool(&self, pool: &str, altroot: &Path) -> Result<()>;
    fn export_pool(&self, pool: &str) -> Result<()>;
    /// Pool named in the ZFS label of `device`, if it carries one
    fn pool_label(&self, device: &str) -> Result<Option<String>>;
    fn bootfs(&self, pool: &str) -> Result<Option<String>>;
    fn set_bootfs(&self, pool: &str, dataset: &str) -> Result<()>;
    fn create_dataset(&self, dataset: &str, properties: &[(&str, &str)]) -> Result<()>;

    // Filesystems
    /// Mount and return the path through which the contents are reachable.
    fn mount(&self, spec: &MountSpec) -> Result<PathBuf>;
    fn unmount(&self, target: &Path) -> Result<()>;

    // Boot code
    fn install_bootcode(&self, root: &Path, disk: &str) -> Result<()>;
}
