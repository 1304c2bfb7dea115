//! In-memory host for tests.
//!
//! Models just enough of the machine for the engine to run end to end:
//! GPT placement with 512-byte sectors, legacy MBR tables, pools with
//! labels, datasets and `bootfs`, and mounts. Every filesystem (a dataset, a
//! partition, a slice) is backed by a directory under a private temporary
//! directory, and `mount` returns that directory.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::{
    partition_device, slice_device, DiskInfo, Host, ListedPartition, MountRecord, MountSpec,
    PartitionSpec, PartitionType, PoolSpec, RaidVolume,
};
use crate::error::{ProvisionError, Result};
use crate::tools::fs::FsType;
use crate::tools::geom::device_belongs_to;
use crate::types::BootMode;

const SECTOR: u64 = 512;
/// Protective MBR, GPT header and 128 entries
const GPT_FIRST_USABLE: u64 = 40;
/// Backup entries and header at the end of the disk
const GPT_TRAILER: u64 = 34;

#[derive(Debug, Clone)]
struct SimPartition {
    index: u32,
    kind: PartitionType,
    start: u64,
    sectors: u64,
}

#[derive(Debug, Clone)]
enum SimTable {
    Gpt(Vec<SimPartition>),
    /// Legacy four-slice table with an optional active slice
    Mbr { active: Option<u32> },
}

#[derive(Debug, Clone)]
struct SimDisk {
    size: u64,
    description: String,
    removable: bool,
    table: Option<SimTable>,
}

#[derive(Debug, Clone, Default)]
pub struct SimPool {
    pub vdevs: Vec<String>,
    pub mirror: bool,
    pub imported: bool,
    pub bootfs: Option<String>,
    pub datasets: BTreeMap<String, Vec<(String, String)>>,
}

#[derive(Debug, Default)]
struct SimState {
    disks: BTreeMap<String, SimDisk>,
    labels: Vec<(String, String)>,
    raid: Vec<RaidVolume>,
    /// Mounts that predate the run (device, mountpoint)
    foreign_mounts: Vec<(String, PathBuf)>,
    /// Active mounts: target -> (device, backing dir)
    mounts: HashMap<PathBuf, (String, PathBuf)>,
    pools: BTreeMap<String, SimPool>,
    /// ZFS labels on devices: device -> pool
    zfs_labels: HashMap<String, String>,
    formatted: HashSet<String>,
    boot_mode: Option<BootMode>,
    faults: HashSet<String>,
    /// Every mutating call, in order
    ops: Vec<String>,
}

pub struct SimHost {
    state: RefCell<SimState>,
    scratch: TempDir,
}

fn sim_error(what: impl Into<String>) -> ProvisionError {
    ProvisionError::Tool {
        program: "sim".to_string(),
        code: 1,
        stderr: what.into(),
    }
}

impl SimHost {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(SimState {
                boot_mode: Some(BootMode::Uefi),
                ..Default::default()
            }),
            scratch: tempfile::tempdir().expect("scratch dir"),
        }
    }

    /// Directory under which tests can place their own mount points.
    pub fn scratch(&self) -> &Path {
        self.scratch.path()
    }

    pub fn add_disk(&self, name: &str, size: u64) {
        self.add_disk_with(name, size, false);
    }

    pub fn add_disk_with(&self, name: &str, size: u64, removable: bool) {
        self.state.borrow_mut().disks.insert(
            name.to_string(),
            SimDisk {
                size,
                description: format!("SIM DISK {}", name),
                removable,
                table: None,
            },
        );
    }

    pub fn add_label(&self, label: &str, component: &str) {
        self.state
            .borrow_mut()
            .labels
            .push((label.to_string(), component.to_string()));
    }

    pub fn add_raid(&self, name: &str, members: &[&str]) {
        self.state.borrow_mut().raid.push(RaidVolume {
            name: name.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        });
    }

    pub fn add_foreign_mount(&self, device: &str, mountpoint: &str) {
        self.state
            .borrow_mut()
            .foreign_mounts
            .push((device.to_string(), PathBuf::from(mountpoint)));
    }

    /// `None` makes the boot method unreadable.
    pub fn set_boot_mode(&self, mode: Option<BootMode>) {
        self.state.borrow_mut().boot_mode = mode;
    }

    /// Make the operation named `op` (e.g. `add_partition:ada1`) fail.
    pub fn fail_on(&self, op: &str) {
        self.state.borrow_mut().faults.insert(op.to_string());
    }

    /// Mutating calls performed so far.
    pub fn ops(&self) -> Vec<String> {
        self.state.borrow().ops.clone()
    }

    pub fn pool(&self, name: &str) -> Option<SimPool> {
        self.state.borrow().pools.get(name).cloned()
    }

    pub fn has_table(&self, disk: &str) -> bool {
        self.state
            .borrow()
            .disks
            .get(disk)
            .is_some_and(|d| d.table.is_some())
    }

    /// Sizes by index of the partitions currently on `disk`.
    pub fn partition_sizes(&self, disk: &str) -> BTreeMap<u32, u64> {
        match self.state.borrow().disks.get(disk).and_then(|d| d.table.clone()) {
            Some(SimTable::Gpt(parts)) => parts
                .iter()
                .map(|p| (p.index, p.sectors * SECTOR))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    pub fn active_mounts(&self) -> usize {
        self.state.borrow().mounts.len()
    }

    /// Backing directory of a filesystem source (dataset or device).
    pub fn fs_path(&self, source: &str) -> PathBuf {
        let dir = self
            .scratch
            .path()
            .join("fs")
            .join(source.replace('/', "_"));
        let _ = std::fs::create_dir_all(&dir);
        dir
    }

    /// Write `contents` to `rel` inside the filesystem `source`.
    pub fn write_file(&self, source: &str, rel: &str, contents: &[u8]) {
        let path = self.fs_path(source).join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, contents).expect("write file");
    }

    /// Lay down a modern installation: GPT, boot pool on p2, exported,
    /// with `bootfs` pointing at `<pool>/ROOT/<be>`.
    pub fn seed_modern_install(&self, disk: &str, pool: &str, be: &str, uefi: bool) {
        let boot_kind = if uefi {
            PartitionType::Efi
        } else {
            PartitionType::FreebsdBoot
        };
        let boot_size = if uefi { 260 * 1024 * 1024 } else { 512 * 1024 };
        {
            let mut state = self.state.borrow_mut();
            let disk_state = state.disks.get_mut(disk).expect("seeded disk exists");
            let total = disk_state.size / SECTOR;
            let boot_sectors = boot_size / SECTOR;
            disk_state.table = Some(SimTable::Gpt(vec![
                SimPartition {
                    index: 1,
                    kind: boot_kind,
                    start: GPT_FIRST_USABLE,
                    sectors: boot_sectors,
                },
                SimPartition {
                    index: 2,
                    kind: PartitionType::FreebsdZfs,
                    start: GPT_FIRST_USABLE + boot_sectors,
                    sectors: total - GPT_TRAILER - GPT_FIRST_USABLE - boot_sectors,
                },
            ]));
            if uefi {
                state.formatted.insert(partition_device(disk, 1));
            }
            let vdev = partition_device(disk, 2);
            state.zfs_labels.insert(vdev.clone(), pool.to_string());
            let root = format!("{}/ROOT", pool);
            let be_dataset = format!("{}/{}", root, be);
            let mut datasets = BTreeMap::new();
            datasets.insert(pool.to_string(), Vec::new());
            datasets.insert(root, vec![("canmount".into(), "off".into())]);
            datasets.insert(be_dataset.clone(), vec![("mountpoint".into(), "legacy".into())]);
            state.pools.insert(
                pool.to_string(),
                SimPool {
                    vdevs: vec![vdev],
                    mirror: false,
                    imported: false,
                    bootfs: Some(be_dataset),
                    datasets,
                },
            );
        }
        let _ = self.fs_path(&format!("{}/ROOT/{}", pool, be));
    }

    /// Lay down a legacy four-slice MBR installation with `active` marked.
    pub fn seed_legacy_install(&self, disk: &str, active: u32) {
        let mut state = self.state.borrow_mut();
        let disk_state = state.disks.get_mut(disk).expect("seeded disk exists");
        disk_state.table = Some(SimTable::Mbr {
            active: Some(active),
        });
    }

    fn check_fault(&self, op: &str) -> Result<()> {
        if self.state.borrow().faults.contains(op) {
            return Err(sim_error(format!("injected failure: {}", op)));
        }
        Ok(())
    }

    fn record(&self, op: String) {
        self.state.borrow_mut().ops.push(op);
    }

    /// Devices a mount can resolve: GPT partitions or slices and their
    /// BSD partitions on MBR disks.
    fn device_exists(&self, device: &str) -> bool {
        let state = self.state.borrow();
        state.disks.iter().any(|(name, disk)| match &disk.table {
            Some(SimTable::Gpt(parts)) => parts
                .iter()
                .any(|p| partition_device(name, p.index) == device),
            Some(SimTable::Mbr { .. }) => (1..=4).any(|i| {
                let slice = slice_device(name, i);
                device == slice || device == format!("{}a", slice)
            }),
            None => false,
        })
    }

    fn dataset_mountable(&self, dataset: &str) -> bool {
        let state = self.state.borrow();
        state.pools.iter().any(|(name, pool)| {
            pool.imported
                && (dataset == name || dataset.starts_with(&format!("{}/", name)))
                && pool.datasets.contains_key(dataset)
        })
    }
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for SimHost {
    fn list_disks(&self) -> Result<Vec<String>> {
        self.check_fault("list_disks")?;
        Ok(self.state.borrow().disks.keys().cloned().collect())
    }

    fn disk_info(&self, disk: &str) -> Result<DiskInfo> {
        self.check_fault(&format!("disk_info:{}", disk))?;
        let state = self.state.borrow();
        let found = state
            .disks
            .get(disk)
            .ok_or_else(|| sim_error(format!("{}: No such file or directory", disk)))?;
        Ok(DiskInfo {
            media_size: found.size,
            description: found.description.clone(),
        })
    }

    fn removable_disks(&self) -> Result<HashSet<String>> {
        Ok(self
            .state
            .borrow()
            .disks
            .iter()
            .filter(|(_, d)| d.removable)
            .map(|(n, _)| n.clone())
            .collect())
    }

    fn labels(&self) -> Result<Vec<(String, String)>> {
        Ok(self.state.borrow().labels.clone())
    }

    fn raid_volumes(&self) -> Result<Vec<RaidVolume>> {
        Ok(self.state.borrow().raid.clone())
    }

    fn mounts(&self) -> Result<Vec<MountRecord>> {
        let state = self.state.borrow();
        let mut records: Vec<MountRecord> = state
            .foreign_mounts
            .iter()
            .map(|(device, mountpoint)| MountRecord {
                device: device.clone(),
                mountpoint: mountpoint.clone(),
                fstype: "ufs".to_string(),
            })
            .collect();
        records.extend(state.mounts.iter().map(|(target, (device, _))| MountRecord {
            device: device.clone(),
            mountpoint: target.clone(),
            fstype: "sim".to_string(),
        }));
        Ok(records)
    }

    fn live_boot_mode(&self) -> Result<BootMode> {
        self.state
            .borrow()
            .boot_mode
            .ok_or_else(|| sim_error("machdep.bootmethod: unknown oid"))
    }

    fn destroy_table(&self, disk: &str) -> Result<()> {
        self.check_fault(&format!("destroy_table:{}", disk))?;
        self.record(format!("destroy_table {}", disk));
        let mut state = self.state.borrow_mut();
        let found = state
            .disks
            .get_mut(disk)
            .ok_or_else(|| sim_error(format!("No such geom: {}", disk)))?;
        if found.table.take().is_none() {
            return Err(sim_error(format!("geom '{}' has no table", disk)));
        }
        state
            .zfs_labels
            .retain(|device, _| !device_belongs_to(device, disk));
        state.formatted.retain(|device| !device_belongs_to(device, disk));
        Ok(())
    }

    fn create_table(&self, disk: &str) -> Result<()> {
        self.check_fault(&format!("create_table:{}", disk))?;
        self.record(format!("create_table {}", disk));
        let mut state = self.state.borrow_mut();
        let found = state
            .disks
            .get_mut(disk)
            .ok_or_else(|| sim_error(format!("No such geom: {}", disk)))?;
        if found.table.is_some() {
            return Err(sim_error(format!("geom '{}': File exists", disk)));
        }
        found.table = Some(SimTable::Gpt(Vec::new()));
        Ok(())
    }

    fn add_partition(&self, disk: &str, spec: &PartitionSpec) -> Result<()> {
        self.check_fault(&format!("add_partition:{}", disk))?;
        self.record(format!("add_partition {} {} {}", disk, spec.index, spec.kind));
        let mut state = self.state.borrow_mut();
        let found = state
            .disks
            .get_mut(disk)
            .ok_or_else(|| sim_error(format!("No such geom: {}", disk)))?;
        let total = found.size / SECTOR;
        let Some(SimTable::Gpt(parts)) = found.table.as_mut() else {
            return Err(sim_error(format!("{}: no GPT table", disk)));
        };
        if parts.iter().any(|p| p.index == spec.index) {
            return Err(sim_error(format!("index {} in use", spec.index)));
        }

        let align = spec.align.map(|a| (a / SECTOR).max(1)).unwrap_or(1);
        let last_usable = total.saturating_sub(GPT_TRAILER + 1);
        let next_free = parts
            .iter()
            .map(|p| p.start + p.sectors)
            .max()
            .unwrap_or(GPT_FIRST_USABLE);
        let start = next_free.div_ceil(align) * align;
        let available = (last_usable + 1).saturating_sub(start);
        let wanted = spec.size.map(|s| s / SECTOR).unwrap_or(available);
        let sectors = wanted - wanted % align;
        if sectors == 0 || sectors > available {
            return Err(sim_error(format!("{}: not enough space", disk)));
        }
        parts.push(SimPartition {
            index: spec.index,
            kind: spec.kind,
            start,
            sectors,
        });
        Ok(())
    }

    fn set_active(&self, disk: &str) -> Result<()> {
        self.check_fault(&format!("set_active:{}", disk))?;
        self.record(format!("set_active {}", disk));
        Ok(())
    }

    fn set_partition_type(&self, disk: &str, index: u32, kind: PartitionType) -> Result<()> {
        self.check_fault(&format!("set_partition_type:{}", disk))?;
        self.record(format!("set_partition_type {} {} {}", disk, index, kind));
        let mut state = self.state.borrow_mut();
        let part = match state.disks.get_mut(disk).and_then(|d| d.table.as_mut()) {
            Some(SimTable::Gpt(parts)) => parts.iter_mut().find(|p| p.index == index),
            _ => None,
        };
        let part = part.ok_or_else(|| sim_error(format!("{}: no partition {}", disk, index)))?;
        part.kind = kind;
        Ok(())
    }

    fn partitions(&self, disk: &str) -> Result<Vec<ListedPartition>> {
        let state = self.state.borrow();
        let found = state
            .disks
            .get(disk)
            .ok_or_else(|| sim_error(format!("No such geom: {}", disk)))?;
        match &found.table {
            Some(SimTable::Gpt(parts)) => {
                let mut listed: Vec<ListedPartition> = parts
                    .iter()
                    .map(|p| ListedPartition {
                        name: partition_device(disk, p.index),
                        index: p.index,
                        kind: p.kind.to_string(),
                        size: p.sectors * SECTOR,
                    })
                    .collect();
                listed.sort_by_key(|p| p.index);
                Ok(listed)
            }
            Some(SimTable::Mbr { .. }) => Ok((1..=4)
                .map(|i| ListedPartition {
                    name: slice_device(disk, i),
                    index: i,
                    kind: PartitionType::Freebsd.to_string(),
                    size: found.size / 4,
                })
                .collect()),
            None => Err(sim_error(format!("No such geom: {}", disk))),
        }
    }

    fn active_slice(&self, disk: &str) -> Result<Option<u32>> {
        self.check_fault(&format!("active_slice:{}", disk))?;
        match self.state.borrow().disks.get(disk).and_then(|d| d.table.clone()) {
            Some(SimTable::Mbr { active }) => Ok(active),
            Some(SimTable::Gpt(_)) => Ok(None),
            None => Err(sim_error(format!("No such geom: {}", disk))),
        }
    }

    fn format_efi(&self, device: &str) -> Result<()> {
        self.check_fault(&format!("format_efi:{}", device))?;
        self.record(format!("format_efi {}", device));
        if !self.device_exists(device) {
            return Err(sim_error(format!("/dev/{}: No such file or directory", device)));
        }
        self.state.borrow_mut().formatted.insert(device.to_string());
        Ok(())
    }

    fn destroy_swap_mirror(&self) -> Result<()> {
        self.record("destroy_swap_mirror".to_string());
        Ok(())
    }

    fn create_pool(&self, spec: &PoolSpec) -> Result<()> {
        self.check_fault("create_pool")?;
        self.record(format!("create_pool {} {}", spec.name, spec.vdevs.join(" ")));
        if let Some(missing) = spec.vdevs.iter().find(|v| !self.device_exists(v)) {
            return Err(sim_error(format!("cannot open '{}'", missing)));
        }
        let mut state = self.state.borrow_mut();
        if state.pools.get(&spec.name).is_some_and(|p| p.imported) {
            return Err(sim_error(format!("pool '{}' already exists", spec.name)));
        }
        for vdev in &spec.vdevs {
            state.zfs_labels.insert(vdev.clone(), spec.name.clone());
        }
        let mut datasets = BTreeMap::new();
        datasets.insert(spec.name.clone(), Vec::new());
        state.pools.insert(
            spec.name.clone(),
            SimPool {
                vdevs: spec.vdevs.clone(),
                mirror: spec.mirror,
                imported: true,
                bootfs: None,
                datasets,
            },
        );
        Ok(())
    }

    fn import_pool(&self, pool: &str, _altroot: &Path) -> Result<()> {
        self.check_fault(&format!("import_pool:{}", pool))?;
        self.record(format!("import_pool {}", pool));
        let mut state = self.state.borrow_mut();
        let found = state
            .pools
            .get_mut(pool)
            .ok_or_else(|| sim_error(format!("cannot import '{}': no such pool", pool)))?;
        if found.imported {
            return Err(sim_error(format!("pool '{}' is already imported", pool)));
        }
        found.imported = true;
        Ok(())
    }

    fn export_pool(&self, pool: &str) -> Result<()> {
        self.record(format!("export_pool {}", pool));
        let mut state = self.state.borrow_mut();
        let found = state
            .pools
            .get_mut(pool)
            .filter(|p| p.imported)
            .ok_or_else(|| sim_error(format!("cannot open '{}': no such pool", pool)))?;
        found.imported = false;
        Ok(())
    }

    fn pool_label(&self, device: &str) -> Result<Option<String>> {
        Ok(self.state.borrow().zfs_labels.get(device).cloned())
    }

    fn bootfs(&self, pool: &str) -> Result<Option<String>> {
        let state = self.state.borrow();
        let found = state
            .pools
            .get(pool)
            .filter(|p| p.imported)
            .ok_or_else(|| sim_error(format!("cannot open '{}': no such pool", pool)))?;
        Ok(found.bootfs.clone())
    }

    fn set_bootfs(&self, pool: &str, dataset: &str) -> Result<()> {
        self.check_fault("set_bootfs")?;
        self.record(format!("set_bootfs {} {}", pool, dataset));
        let mut state = self.state.borrow_mut();
        let found = state
            .pools
            .get_mut(pool)
            .filter(|p| p.imported)
            .ok_or_else(|| sim_error(format!("cannot open '{}': no such pool", pool)))?;
        if !found.datasets.contains_key(dataset) {
            return Err(sim_error(format!("dataset '{}' does not exist", dataset)));
        }
        found.bootfs = Some(dataset.to_string());
        Ok(())
    }

    fn create_dataset(&self, dataset: &str, properties: &[(&str, &str)]) -> Result<()> {
        self.check_fault(&format!("create_dataset:{}", dataset))?;
        self.record(format!("create_dataset {}", dataset));
        let (pool_name, _) = dataset.split_once('/').unwrap_or((dataset, ""));
        let parent = dataset.rsplit_once('/').map(|(p, _)| p).unwrap_or(dataset);
        let mut state = self.state.borrow_mut();
        let pool = state
            .pools
            .get_mut(pool_name)
            .filter(|p| p.imported)
            .ok_or_else(|| sim_error(format!("cannot create '{}': no such pool", dataset)))?;
        if !pool.datasets.contains_key(parent) {
            return Err(sim_error(format!("cannot create '{}': parent does not exist", dataset)));
        }
        if pool.datasets.contains_key(dataset) {
            return Err(sim_error(format!("cannot create '{}': dataset already exists", dataset)));
        }
        pool.datasets.insert(
            dataset.to_string(),
            properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        Ok(())
    }

    fn mount(&self, spec: &MountSpec) -> Result<PathBuf> {
        self.check_fault(&format!("mount:{}", spec.device))?;
        let resolvable = match spec.fstype {
            FsType::Zfs => self.dataset_mountable(&spec.device),
            FsType::Msdosfs => self.state.borrow().formatted.contains(&spec.device),
            FsType::Ufs => self.device_exists(&spec.device),
        };
        if !resolvable {
            return Err(sim_error(format!("{}: No such file or directory", spec.device)));
        }
        if self.state.borrow().mounts.contains_key(&spec.target) {
            return Err(sim_error(format!("{}: Device busy", spec.target.display())));
        }
        let backing = self.fs_path(&spec.device);
        self.state
            .borrow_mut()
            .mounts
            .insert(spec.target.clone(), (spec.device.clone(), backing.clone()));
        Ok(backing)
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        self.state
            .borrow_mut()
            .mounts
            .remove(target)
            .map(|_| ())
            .ok_or_else(|| sim_error(format!("{}: not a file system root directory", target.display())))
    }

    fn install_bootcode(&self, root: &Path, disk: &str) -> Result<()> {
        self.check_fault(&format!("install_bootcode:{}", disk))?;
        self.record(format!("install_bootcode {} {}", root.display(), disk));
        let state = self.state.borrow();
        let boot_slot = match state.disks.get(disk).and_then(|d| d.table.as_ref()) {
            Some(SimTable::Gpt(parts)) => parts.iter().find(|p| p.index == 1).map(|p| p.kind),
            _ => None,
        };
        if boot_slot != Some(PartitionType::FreebsdBoot) {
            return Err(sim_error(format!("{}: no freebsd-boot partition at index 1", disk)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{GIB, KIB, MIB};

    #[test]
    fn test_gpt_placement_takes_remainder() {
        let host = SimHost::new();
        host.add_disk("ada0", 100 * GIB);
        host.create_table("ada0").unwrap();
        host.add_partition(
            "ada0",
            &PartitionSpec {
                index: 1,
                kind: PartitionType::Efi,
                size: Some(260 * MIB),
                align: None,
            },
        )
        .unwrap();
        host.add_partition(
            "ada0",
            &PartitionSpec {
                index: 2,
                kind: PartitionType::FreebsdZfs,
                size: None,
                align: Some(4 * KIB),
            },
        )
        .unwrap();
        let sizes = host.partition_sizes("ada0");
        assert_eq!(sizes[&1], 260 * MIB);
        let data = sizes[&2];
        assert!(data < 100 * GIB - 260 * MIB);
        assert!(data > 100 * GIB - 261 * MIB);
        assert_eq!(data % (4 * KIB), 0);
    }

    #[test]
    fn test_mount_requires_existing_source() {
        let host = SimHost::new();
        let target = host.scratch().join("mnt");
        let spec = MountSpec {
            fstype: FsType::Ufs,
            device: "ada0s4".into(),
            target: target.clone(),
            options: vec![],
        };
        assert!(host.mount(&spec).is_err());

        host.add_disk("ada0", 20 * GIB);
        host.seed_legacy_install("ada0", 1);
        let path = host.mount(&spec).unwrap();
        assert_eq!(path, host.fs_path("ada0s4"));
        assert!(host.mount(&spec).is_err());
        host.unmount(&target).unwrap();
        assert!(host.unmount(&target).is_err());
    }

    #[test]
    fn test_pool_lifecycle() {
        let host = SimHost::new();
        host.add_disk("ada0", 20 * GIB);
        host.seed_modern_install("ada0", "freenas-boot", "default", true);
        assert_eq!(host.pool_label("ada0p2").unwrap().as_deref(), Some("freenas-boot"));
        assert!(host.bootfs("freenas-boot").is_err());
        host.import_pool("freenas-boot", Path::new("/tmp/boot")).unwrap();
        assert_eq!(
            host.bootfs("freenas-boot").unwrap().as_deref(),
            Some("freenas-boot/ROOT/default")
        );
        host.export_pool("freenas-boot").unwrap();
        assert!(host.export_pool("freenas-boot").is_err());
    }
}
