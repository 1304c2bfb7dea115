//! Partition Builder
//!
//! Turns a firmware mode, a swap decision and a data size into a concrete
//! per-disk GPT layout, writes it to every target disk, and creates the boot
//! pool over the data slots.
//!
//! # Layout
//!
//! | Index | Type                                | Size                 |
//! |-------|-------------------------------------|----------------------|
//! | 1     | `efi` (UEFI, FAT16) or `freebsd-boot` (BIOS) | 260 MiB / 512 KiB |
//! | 2     | `freebsd-zfs`, 4K aligned           | common data size     |
//! | 3     | `freebsd-swap`, 4K aligned          | 16 GiB, swap only    |
//!
//! Slots are added boot, swap, data: with no data size the data slot takes
//! whatever remains, which is how the capacity planner measures a disk.

use std::fmt;

use crate::error::{ProvisionError, Result};
use crate::host::{partition_device, Host, PartitionSpec, PartitionType, PoolSpec};
use crate::product::{ProductIdentity, WorkPaths};
use crate::types::{BootMode, SwapPolicy};
use crate::units::{human, KIB, MIB, GIB};

pub const EFI_SIZE: u64 = 260 * MIB;
pub const BIOS_BOOT_SIZE: u64 = 512 * KIB;
pub const SWAP_SIZE: u64 = 16 * GIB;
pub const SLOT_ALIGN: u64 = 4 * KIB;
/// Data slots are cut to a multiple of this so mirror members match.
pub const DATA_ROUNDING: u64 = 16 * MIB;
/// Smallest common data size provisioning accepts.
pub const MIN_DATA_SIZE: u64 = 8 * GIB;

pub const BOOT_INDEX: u32 = 1;
pub const DATA_INDEX: u32 = 2;
pub const SWAP_INDEX: u32 = 3;

// ============================================================================
// Layout
// ============================================================================

/// One partition in a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub index: u32,
    pub kind: PartitionType,
    /// `None` takes the remaining free space
    pub size: Option<u64>,
    pub align: Option<u64>,
}

impl Slot {
    fn spec(&self) -> PartitionSpec {
        PartitionSpec {
            index: self.index,
            kind: self.kind,
            size: self.size,
            align: self.align,
        }
    }
}

/// The ordered slots every target disk receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLayout {
    pub boot_mode: BootMode,
    slots: Vec<Slot>,
}

impl PartitionLayout {
    /// Final layout with the data slot cut to `data_size` (rounded down to 16 MiB).
    pub fn new(boot_mode: BootMode, swap: SwapPolicy, data_size: u64) -> Self {
        Self::build(
            boot_mode,
            swap,
            Some(crate::units::round_down(data_size, DATA_ROUNDING)),
        )
    }

    /// Layout used for measuring: the data slot is unconstrained.
    pub fn trial(boot_mode: BootMode, swap: SwapPolicy) -> Self {
        Self::build(boot_mode, swap, None)
    }

    fn build(boot_mode: BootMode, swap: SwapPolicy, data_size: Option<u64>) -> Self {
        let mut slots = vec![match boot_mode {
            BootMode::Uefi => Slot {
                index: BOOT_INDEX,
                kind: PartitionType::Efi,
                size: Some(EFI_SIZE),
                align: None,
            },
            BootMode::Bios => Slot {
                index: BOOT_INDEX,
                kind: PartitionType::FreebsdBoot,
                size: Some(BIOS_BOOT_SIZE),
                align: None,
            },
        }];
        if swap.creates_swap() {
            slots.push(Slot {
                index: SWAP_INDEX,
                kind: PartitionType::FreebsdSwap,
                size: Some(SWAP_SIZE),
                align: Some(SLOT_ALIGN),
            });
        }
        slots.push(Slot {
            index: DATA_INDEX,
            kind: PartitionType::FreebsdZfs,
            size: data_size,
            align: Some(SLOT_ALIGN),
        });
        Self { boot_mode, slots }
    }

    /// Slots in the order they are added to the table.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn has_swap(&self) -> bool {
        self.slots.iter().any(|s| s.index == SWAP_INDEX)
    }

    /// Size of the data slot, `None` for a trial layout.
    pub fn data_size(&self) -> Option<u64> {
        self.slots
            .iter()
            .find(|s| s.index == DATA_INDEX)
            .and_then(|s| s.size)
    }

    /// Bytes taken by everything except the data slot.
    pub fn overhead(&self) -> u64 {
        self.slots
            .iter()
            .filter(|s| s.index != DATA_INDEX)
            .filter_map(|s| s.size)
            .sum()
    }

    /// One line per slot, for logs and the destructive-operation prompt.
    pub fn summary(&self) -> String {
        self.slots
            .iter()
            .map(|slot| {
                let size = slot.size.map(human).unwrap_or_else(|| "remaining".to_string());
                format!("  p{}  {:<13} {}", slot.index, slot.kind.to_string(), size)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for PartitionLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} layout", self.boot_mode)?;
        if self.has_swap() {
            write!(f, " with swap")?;
        }
        match self.data_size() {
            Some(size) => write!(f, ", data {}", human(size)),
            None => write!(f, ", data unconstrained"),
        }
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Replace whatever table `disk` carries with `layout`.
///
/// UEFI boot slots are formatted FAT16; BIOS tables are marked active.
pub fn apply_layout(host: &dyn Host, disk: &str, layout: &PartitionLayout) -> Result<()> {
    if let Err(e) = host.destroy_table(disk) {
        tracing::debug!("No table to destroy on {}: {}", disk, e);
    }
    host.create_table(disk)
        .map_err(|e| ProvisionError::partition(disk, e))?;

    for slot in layout.slots() {
        host.add_partition(disk, &slot.spec())
            .map_err(|e| ProvisionError::partition(disk, e))?;
    }

    match layout.boot_mode {
        BootMode::Uefi => host
            .format_efi(&partition_device(disk, BOOT_INDEX))
            .map_err(|e| ProvisionError::partition(disk, e))?,
        BootMode::Bios => host
            .set_active(disk)
            .map_err(|e| ProvisionError::partition(disk, e))?,
    }
    Ok(())
}

/// A created boot pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootPool {
    pub name: String,
    /// Data slot devices (`ada0p2`, ...)
    pub members: Vec<String>,
    pub mirror: bool,
    /// Boot environment created inside the ROOT container
    pub active_environment: String,
}

/// Writes layouts and creates the pool.
pub struct PartitionBuilder<'a> {
    host: &'a dyn Host,
    product: &'a ProductIdentity,
    paths: &'a WorkPaths,
}

impl<'a> PartitionBuilder<'a> {
    pub fn new(host: &'a dyn Host, product: &'a ProductIdentity, paths: &'a WorkPaths) -> Self {
        Self {
            host,
            product,
            paths,
        }
    }

    /// Partition every disk, then create the pool, the ROOT container and
    /// the `environment` dataset. The first failure stops the build.
    pub fn build(
        &self,
        disks: &[String],
        layout: &PartitionLayout,
        environment: &str,
    ) -> Result<BootPool> {
        if disks.is_empty() {
            return Err(ProvisionError::NoEligibleDisks);
        }
        tracing::info!("Partitioning {} with {}", disks.join(" "), layout);

        for disk in disks {
            apply_layout(self.host, disk, layout)?;
        }

        let spec = PoolSpec {
            name: self.product.pool_name.clone(),
            vdevs: disks
                .iter()
                .map(|d| partition_device(d, DATA_INDEX))
                .collect(),
            mirror: disks.len() > 1,
            cachefile: self.paths.cachefile.clone(),
            altroot: self.paths.pool_altroot.clone(),
        };
        self.host
            .create_pool(&spec)
            .map_err(|e| ProvisionError::pool(&spec.name, e))?;

        self.host
            .create_dataset(&self.product.root_dataset(), &[("canmount", "off")])
            .map_err(|e| ProvisionError::pool(&spec.name, e))?;

        self.host
            .create_dataset(
                &self.product.environment_dataset(environment),
                &[("mountpoint", "legacy")],
            )
            .map_err(|e| ProvisionError::environment(environment, e))?;

        tracing::info!(
            "Created {} pool {} over {}",
            if spec.mirror { "mirrored" } else { "single-disk" },
            spec.name,
            spec.vdevs.join(" ")
        );
        Ok(BootPool {
            name: spec.name,
            members: spec.vdevs,
            mirror: spec.mirror,
            active_environment: environment.to_string(),
        })
    }
}
