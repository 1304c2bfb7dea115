//! `Host` implementation backed by the FreeBSD base system tools.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{
    DiskInfo, Host, ListedPartition, MountRecord, MountSpec, PartitionSpec, PartitionType, PoolSpec,
    RaidVolume,
};
use crate::error::{ProvisionError, Result};
use crate::tool_runner::{SystemRunner, ToolRunner};
use crate::tools::fs::{self, Mount, MountTable, NewfsMsdos, Umount};
use crate::tools::geom::{
    self, CamcontrolDevlist, Diskinfo, GlabelStatus, GmirrorDestroy, GraidStatus, Sysctl,
};
use crate::tools::gpart::{
    self, GpartAdd, GpartBootcode, GpartCreate, GpartDestroy, GpartList, GpartModify,
    GpartSetActive, GpartShow,
};
use crate::tools::zfs::{
    self, ZdbLabel, ZfsCreate, ZpoolCreate, ZpoolExport, ZpoolGet, ZpoolImport, ZpoolSet,
};
use crate::types::BootMode;

/// Name of the swap mirror a previous trial layout may leave assembled
const SWAP_MIRROR: &str = "swap";

/// The real machine, reached through a `ToolRunner`.
#[derive(Debug, Default)]
pub struct SystemHost<R: ToolRunner = SystemRunner> {
    runner: R,
}

impl SystemHost<SystemRunner> {
    pub fn new() -> Self {
        Self {
            runner: SystemRunner,
        }
    }
}

impl<R: ToolRunner> SystemHost<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn sysctl(&self, name: &str) -> Result<String> {
        let out = self.runner.run_checked(&Sysctl {
            name: name.to_string(),
        })?;
        Ok(out.stdout.trim().to_string())
    }
}

impl<R: ToolRunner> Host for SystemHost<R> {
    fn list_disks(&self) -> Result<Vec<String>> {
        Ok(self
            .sysctl("kern.disks")?
            .split_whitespace()
            .map(str::to_string)
            .collect())
    }

    fn disk_info(&self, disk: &str) -> Result<DiskInfo> {
        let out = self.runner.run_checked(&Diskinfo {
            disk: disk.to_string(),
        })?;
        let record = geom::parse_diskinfo(&out.stdout).ok_or_else(|| {
            ProvisionError::validation(format!("diskinfo reported no media size for {}", disk))
        })?;
        Ok(DiskInfo {
            media_size: record.media_size,
            description: record.description,
        })
    }

    fn removable_disks(&self) -> Result<HashSet<String>> {
        let out = self.runner.run_checked(&CamcontrolDevlist)?;
        Ok(geom::parse_removable(&out.stdout))
    }

    fn labels(&self) -> Result<Vec<(String, String)>> {
        let out = self.runner.run_checked(&GlabelStatus)?;
        Ok(geom::parse_glabel_status(&out.stdout))
    }

    fn raid_volumes(&self) -> Result<Vec<RaidVolume>> {
        // graid exits non-zero when the class is not loaded
        let out = self.runner.run(&GraidStatus)?;
        if !out.success {
            return Ok(Vec::new());
        }
        Ok(geom::parse_graid_status(&out.stdout))
    }

    fn mounts(&self) -> Result<Vec<MountRecord>> {
        let out = self.runner.run_checked(&MountTable)?;
        Ok(fs::parse_mount_table(&out.stdout))
    }

    fn live_boot_mode(&self) -> Result<BootMode> {
        let method = self.sysctl("machdep.bootmethod")?;
        method
            .parse()
            .map_err(|_| ProvisionError::validation(format!("unknown boot method '{}'", method)))
    }

    fn destroy_table(&self, disk: &str) -> Result<()> {
        self.runner.run_checked(&GpartDestroy {
            disk: disk.to_string(),
        })?;
        Ok(())
    }

    fn create_table(&self, disk: &str) -> Result<()> {
        self.runner.run_checked(&GpartCreate {
            disk: disk.to_string(),
        })?;
        Ok(())
    }

    fn add_partition(&self, disk: &str, spec: &PartitionSpec) -> Result<()> {
        self.runner.run_checked(&GpartAdd {
            disk: disk.to_string(),
            kind: spec.kind,
            index: spec.index,
            size: spec.size,
            align: spec.align,
        })?;
        Ok(())
    }

    fn set_active(&self, disk: &str) -> Result<()> {
        self.runner.run_checked(&GpartSetActive {
            disk: disk.to_string(),
        })?;
        Ok(())
    }

    fn set_partition_type(&self, disk: &str, index: u32, kind: PartitionType) -> Result<()> {
        self.runner.run_checked(&GpartModify {
            disk: disk.to_string(),
            index,
            kind,
        })?;
        Ok(())
    }

    fn partitions(&self, disk: &str) -> Result<Vec<ListedPartition>> {
        let out = self.runner.run_checked(&GpartList {
            disk: disk.to_string(),
        })?;
        Ok(gpart::parse_list(&out.stdout))
    }

    fn active_slice(&self, disk: &str) -> Result<Option<u32>> {
        let out = self.runner.run_checked(&GpartShow {
            disk: disk.to_string(),
        })?;
        Ok(gpart::parse_active_slice(&out.stdout))
    }

    fn format_efi(&self, device: &str) -> Result<()> {
        self.runner.run_checked(&NewfsMsdos {
            device: device.to_string(),
        })?;
        Ok(())
    }

    fn destroy_swap_mirror(&self) -> Result<()> {
        self.runner.run_checked(&GmirrorDestroy {
            name: SWAP_MIRROR.to_string(),
        })?;
        Ok(())
    }

    fn create_pool(&self, spec: &PoolSpec) -> Result<()> {
        self.runner.run_checked(&ZpoolCreate {
            pool: spec.name.clone(),
            vdevs: spec.vdevs.clone(),
            mirror: spec.mirror,
            cachefile: spec.cachefile.clone(),
            altroot: spec.altroot.clone(),
        })?;
        Ok(())
    }

    fn import_pool(&self, pool: &str, altroot: &Path) -> Result<()> {
        self.runner.run_checked(&ZpoolImport {
            pool: pool.to_string(),
            altroot: altroot.to_path_buf(),
        })?;
        Ok(())
    }

    fn export_pool(&self, pool: &str) -> Result<()> {
        self.runner.run_checked(&ZpoolExport {
            pool: pool.to_string(),
        })?;
        Ok(())
    }

    fn pool_label(&self, device: &str) -> Result<Option<String>> {
        // zdb fails on devices without a vdev label; that is an answer, not an error
        let out = self.runner.run(&ZdbLabel {
            device: device.to_string(),
        })?;
        if !out.success {
            return Ok(None);
        }
        Ok(zfs::parse_label_pool_name(&out.stdout))
    }

    fn bootfs(&self, pool: &str) -> Result<Option<String>> {
        let out = self.runner.run_checked(&ZpoolGet {
            pool: pool.to_string(),
            property: "bootfs".to_string(),
        })?;
        Ok(zfs::parse_property_value(&out.stdout))
    }

    fn set_bootfs(&self, pool: &str, dataset: &str) -> Result<()> {
        self.runner.run_checked(&ZpoolSet {
            pool: pool.to_string(),
            property: "bootfs".to_string(),
            value: dataset.to_string(),
        })?;
        Ok(())
    }

    fn create_dataset(&self, dataset: &str, properties: &[(&str, &str)]) -> Result<()> {
        self.runner.run_checked(&ZfsCreate {
            dataset: dataset.to_string(),
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })?;
        Ok(())
    }

    fn mount(&self, spec: &MountSpec) -> Result<PathBuf> {
        std::fs::create_dir_all(&spec.target)?;
        self.runner.run_checked(&Mount {
            fstype: spec.fstype,
            device: spec.device.clone(),
            target: spec.target.clone(),
            options: spec.options.clone(),
        })?;
        Ok(spec.target.clone())
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        self.runner.run_checked(&Umount {
            target: target.to_path_buf(),
            force: false,
        })?;
        Ok(())
    }

    fn install_bootcode(&self, root: &Path, disk: &str) -> Result<()> {
        self.runner.run_checked(&GpartBootcode {
            root: root.to_path_buf(),
            disk: disk.to_string(),
        })?;
        Ok(())
    }
}
