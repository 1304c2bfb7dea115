//! Capacity Planner
//!
//! Finds the largest data slot every selected disk can hold. The achievable
//! size depends on boot and swap overhead and on how `gpart` places and
//! aligns slots, so each disk gets the real layout once, the data slot is
//! measured, and the table is destroyed again before the next disk.

use crate::error::{ProvisionError, Result};
use crate::host::{partition_device, Host};
use crate::types::{BootMode, DiskCandidate, SwapPolicy};
use crate::units::{human, round_down, MIB};

use super::partition::{apply_layout, PartitionLayout, DATA_INDEX, DATA_ROUNDING};

/// Space `gpart` keeps for the primary and backup GPT plus first-slot alignment.
const GPT_RESERVE: u64 = MIB;

/// A trial layout on one disk. Dropping it destroys the table and any swap
/// mirror the trial left behind, whether or not the trial succeeded.
struct TrialLayout<'a> {
    host: &'a dyn Host,
    disk: &'a str,
}

impl Drop for TrialLayout<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.host.destroy_table(self.disk) {
            tracing::debug!("Trial teardown on {}: {}", self.disk, e);
        }
        if let Err(e) = self.host.destroy_swap_mirror() {
            tracing::debug!("Trial teardown of swap mirror: {}", e);
        }
    }
}

pub struct CapacityPlanner<'a> {
    host: &'a dyn Host,
}

impl<'a> CapacityPlanner<'a> {
    pub fn new(host: &'a dyn Host) -> Self {
        Self { host }
    }

    /// Common data size across `disks`, a multiple of 16 MiB.
    ///
    /// Disks that cannot be trial-partitioned are skipped. Zero means every
    /// disk was skipped.
    pub fn plan(&self, disks: &[String], boot_mode: BootMode, swap: SwapPolicy) -> u64 {
        let layout = PartitionLayout::trial(boot_mode, swap);
        let smallest = disks
            .iter()
            .filter_map(|disk| match self.measure(disk, &layout) {
                Ok(size) => {
                    tracing::info!("{}: data slot can hold {}", disk, human(size));
                    Some(size)
                }
                Err(e) => {
                    tracing::warn!("Skipping {} in capacity planning: {}", disk, e);
                    None
                }
            })
            .min()
            .unwrap_or(0);
        round_down(smallest, DATA_ROUNDING)
    }

    /// Apply the trial layout to `disk` and read back the data slot size.
    pub fn measure(&self, disk: &str, layout: &PartitionLayout) -> Result<u64> {
        let _trial = TrialLayout {
            host: self.host,
            disk,
        };
        apply_layout(self.host, disk, layout)?;

        let data_device = partition_device(disk, DATA_INDEX);
        self.host
            .partitions(disk)?
            .into_iter()
            .find(|p| p.index == DATA_INDEX)
            .map(|p| p.size)
            .ok_or_else(|| ProvisionError::partition(disk, format!("{} missing after trial", data_device)))
    }
}

/// Conservative common data size computed from media sizes alone.
///
/// Never writes to a disk, so it can reject a too-small selection before the
/// critical section starts.
pub fn estimate_data_size(disks: &[DiskCandidate], layout: &PartitionLayout) -> u64 {
    let smallest = disks.iter().map(|d| d.media_size).min().unwrap_or(0);
    round_down(
        smallest.saturating_sub(layout.overhead() + GPT_RESERVE),
        DATA_ROUNDING,
    )
}
