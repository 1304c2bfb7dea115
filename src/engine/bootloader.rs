//! Bootloader Installer
//!
//! Makes every target disk bootable. The firmware mode comes from one of two
//! places: the live environment for layouts written by this run, or the
//! disk's own partition table for in-place upgrades, where the existing
//! layout decides what will boot.

use std::fs;
use std::path::Path;

use crate::error::{ProvisionError, Result};
use crate::host::{partition_device, FsType, Host, MountSpec, PartitionType};
use crate::product::WorkPaths;
use crate::types::BootMode;

use super::boot_env::BootEnvironment;
use super::partition::BOOT_INDEX;
use super::MountGuard;

/// Loader shipped in the new environment.
pub const EFI_LOADER_SOURCE: &str = "boot/boot1.efi";
/// Removable-media fallback path inside the EFI System Partition.
pub const EFI_LOADER_TARGET: &str = "efi/boot/BOOTx64.efi";

/// How the firmware mode of a disk is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootModeResolver {
    /// Use what the live environment booted under (possibly operator-adjusted)
    FromLiveEnvironment(BootMode),
    /// An `efi` partition on the disk means UEFI, otherwise BIOS
    FromExistingDiskLayout,
}

impl BootModeResolver {
    pub fn resolve(&self, host: &dyn Host, disk: &str) -> BootMode {
        match self {
            Self::FromLiveEnvironment(mode) => *mode,
            Self::FromExistingDiskLayout => match host.partitions(disk) {
                Ok(partitions) => {
                    let efi = PartitionType::Efi.to_string();
                    if partitions.iter().any(|p| p.kind == efi) {
                        BootMode::Uefi
                    } else {
                        BootMode::Bios
                    }
                }
                Err(e) => {
                    tracing::warn!("Could not read table of {}, assuming BIOS: {}", disk, e);
                    BootMode::Bios
                }
            },
        }
    }
}

/// Firmware mode of the live environment. Unreadable means BIOS.
pub fn live_boot_mode(host: &dyn Host) -> BootMode {
    host.live_boot_mode().unwrap_or_else(|e| {
        tracing::warn!("Could not determine boot method, assuming BIOS: {}", e);
        BootMode::Bios
    })
}

/// Per-disk outcome of stamping.
#[derive(Debug, Default)]
pub struct StampReport {
    pub stamped: Vec<(String, BootMode)>,
    pub failures: Vec<ProvisionError>,
}

impl StampReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when no disk could be made bootable.
    pub fn all_failed(&self) -> bool {
        self.stamped.is_empty() && !self.failures.is_empty()
    }

    /// Operator-facing line per failed disk.
    pub fn failure_lines(&self) -> Vec<String> {
        self.failures.iter().map(|e| e.to_string()).collect()
    }
}

pub struct BootloaderInstaller<'a> {
    host: &'a dyn Host,
    paths: &'a WorkPaths,
}

impl<'a> BootloaderInstaller<'a> {
    pub fn new(host: &'a dyn Host, paths: &'a WorkPaths) -> Self {
        Self { host, paths }
    }

    /// Stamp every disk. A failing disk does not stop the others.
    pub fn install(
        &self,
        env: &BootEnvironment,
        disks: &[String],
        resolver: BootModeResolver,
    ) -> StampReport {
        let mut report = StampReport::default();
        for disk in disks {
            let mode = resolver.resolve(self.host, disk);
            let result = match mode {
                BootMode::Uefi => self.stamp_uefi(env, disk),
                BootMode::Bios => self.stamp_bios(env, disk),
            };
            match result {
                Ok(()) => {
                    tracing::info!("Installed {} boot code on {}", mode, disk);
                    report.stamped.push((disk.clone(), mode));
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    report.failures.push(e);
                }
            }
        }
        report
    }

    fn stamp_uefi(&self, env: &BootEnvironment, disk: &str) -> Result<()> {
        let loader = env.root.join(EFI_LOADER_SOURCE);
        if !loader.is_file() {
            return Err(ProvisionError::bootloader(
                disk,
                format!("{} not found in {}", EFI_LOADER_SOURCE, env.dataset),
            ));
        }

        let spec = MountSpec {
            fstype: FsType::Msdosfs,
            device: partition_device(disk, BOOT_INDEX),
            target: self.paths.efi_mount.clone(),
            options: Vec::new(),
        };
        let esp = self
            .host
            .mount(&spec)
            .map_err(|e| ProvisionError::bootloader(disk, e))?;
        let _mounted = MountGuard::new(self.host, &self.paths.efi_mount);

        copy_loader(&loader, &esp.join(EFI_LOADER_TARGET))
            .map_err(|e| ProvisionError::bootloader(disk, e))
    }

    fn stamp_bios(&self, env: &BootEnvironment, disk: &str) -> Result<()> {
        self.host
            .set_partition_type(disk, BOOT_INDEX, PartitionType::FreebsdBoot)
            .map_err(|e| ProvisionError::bootloader(disk, e))?;
        self.host
            .install_bootcode(&env.mountpoint, disk)
            .map_err(|e| ProvisionError::bootloader(disk, e))
    }
}

fn copy_loader(source: &Path, target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, target).map(|_| ())
}
