//! Engine modules: the provisioning decisions and the disk work behind them.
//!
//! Each component takes the `Host` it runs against plus explicit inputs and
//! returns an explicit result. Nothing here holds run state between calls;
//! the orchestrator threads results from one component to the next.

pub mod boot_env;
pub mod bootloader;
pub mod capacity;
pub mod enumerate;
pub mod partition;
pub mod safety;
pub mod upgrade;

use std::path::{Path, PathBuf};

use crate::host::Host;

/// Unmounts `target` when dropped, logging rather than failing.
pub(crate) struct MountGuard<'a> {
    host: &'a dyn Host,
    target: PathBuf,
}

impl<'a> MountGuard<'a> {
    pub(crate) fn new(host: &'a dyn Host, target: &Path) -> Self {
        Self {
            host,
            target: target.to_path_buf(),
        }
    }
}

impl Drop for MountGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.host.unmount(&self.target) {
            tracing::warn!("Could not unmount {}: {}", self.target.display(), e);
        }
    }
}

/// Exports `pool` when dropped.
pub(crate) struct PoolImportGuard<'a> {
    host: &'a dyn Host,
    pool: String,
}

impl<'a> PoolImportGuard<'a> {
    pub(crate) fn new(host: &'a dyn Host, pool: &str) -> Self {
        Self {
            host,
            pool: pool.to_string(),
        }
    }
}

impl Drop for PoolImportGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.host.export_pool(&self.pool) {
            tracing::warn!("Could not export {}: {}", self.pool, e);
        }
    }
}
