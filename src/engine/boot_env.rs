//! Boot Environment Manager
//!
//! Produces the mounted root the new system is written into. A fresh install
//! mounts the environment the partition builder created; an in-place upgrade
//! imports the preserved pool and adds a timestamped sibling next to the
//! environments already there.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::error::{ProvisionError, Result};
use crate::host::{FsType, Host, MountSpec};
use crate::product::{ProductIdentity, WorkPaths};

use super::partition::BootPool;
use super::upgrade::STATE_DIR;

pub const FIRST_BOOT_SENTINEL: &str = "first-boot";
pub const NEED_UPDATE_SENTINEL: &str = "need-update";
pub const MEDIA_UPGRADE_SENTINEL: &str = "cd-upgrade";

/// A mounted boot environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootEnvironment {
    pub pool: String,
    pub name: String,
    /// Full dataset name (`<pool>/ROOT/<name>`)
    pub dataset: String,
    /// Where the environment is mounted
    pub mountpoint: PathBuf,
    /// Path through which its contents are reachable
    pub root: PathBuf,
    /// Created next to existing environments in a preserved pool
    pub in_place: bool,
}

impl BootEnvironment {
    /// The environment's data area.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }
}

/// `<base>-YYYYMMDD-HHMMSS`
pub fn timestamped_name(base: &str, at: DateTime<Local>) -> String {
    format!("{}-{}", base, at.format("%Y%m%d-%H%M%S"))
}

pub struct BootEnvManager<'a> {
    host: &'a dyn Host,
    product: &'a ProductIdentity,
    paths: &'a WorkPaths,
}

impl<'a> BootEnvManager<'a> {
    pub fn new(host: &'a dyn Host, product: &'a ProductIdentity, paths: &'a WorkPaths) -> Self {
        Self {
            host,
            product,
            paths,
        }
    }

    /// Mount the environment created together with a fresh pool.
    pub fn create_fresh(&self, pool: &BootPool) -> Result<BootEnvironment> {
        let name = pool.active_environment.clone();
        let dataset = self.product.environment_dataset(&name);
        let root = self.mount(&name, &dataset)?;
        Ok(BootEnvironment {
            pool: pool.name.clone(),
            name,
            dataset,
            mountpoint: self.paths.working_root.clone(),
            root,
            in_place: false,
        })
    }

    /// Import the preserved `pool` and add a new environment named after the
    /// default one and the current local time.
    pub fn create_in_place(&self, pool: &str) -> Result<BootEnvironment> {
        let name = timestamped_name(&self.product.default_environment, Local::now());
        self.create_in_place_named(pool, &name)
    }

    pub fn create_in_place_named(&self, pool: &str, name: &str) -> Result<BootEnvironment> {
        self.host
            .import_pool(pool, &self.paths.pool_altroot)
            .map_err(|e| ProvisionError::environment(name, format!("cannot import {}: {}", pool, e)))?;

        let dataset = self.product.environment_dataset(name);
        let created = self
            .host
            .create_dataset(&dataset, &[("mountpoint", "legacy")])
            .map_err(|e| ProvisionError::environment(name, e))
            .and_then(|()| self.mount(name, &dataset));

        match created {
            Ok(root) => Ok(BootEnvironment {
                pool: pool.to_string(),
                name: name.to_string(),
                dataset,
                mountpoint: self.paths.working_root.clone(),
                root,
                in_place: true,
            }),
            Err(e) => {
                if let Err(export) = self.host.export_pool(pool) {
                    tracing::warn!("Could not export {}: {}", pool, export);
                }
                Err(e)
            }
        }
    }

    fn mount(&self, name: &str, dataset: &str) -> Result<PathBuf> {
        let spec = MountSpec {
            fstype: FsType::Zfs,
            device: dataset.to_string(),
            target: self.paths.working_root.clone(),
            options: Vec::new(),
        };
        let root = self
            .host
            .mount(&spec)
            .map_err(|e| ProvisionError::environment(name, e))?;
        fs::create_dir_all(root.join(STATE_DIR))
            .map_err(|e| ProvisionError::environment(name, e))?;
        tracing::info!("Mounted {} at {}", dataset, self.paths.working_root.display());
        Ok(root)
    }

    /// Mark the environment for first-boot processing. `preserving` adds the
    /// marker for an upgrade that carried configuration over.
    pub fn write_sentinels(&self, env: &BootEnvironment, preserving: bool) -> Result<()> {
        let data = env.data_dir();
        let mut sentinels = vec![FIRST_BOOT_SENTINEL, NEED_UPDATE_SENTINEL];
        if preserving {
            sentinels.push(MEDIA_UPGRADE_SENTINEL);
        }
        for sentinel in sentinels {
            fs::write(data.join(sentinel), b"")?;
            tracing::debug!("Wrote {}", data.join(sentinel).display());
        }
        Ok(())
    }

    /// Make `env` the pool's default boot environment.
    pub fn activate(&self, env: &BootEnvironment) -> Result<()> {
        self.host
            .set_bootfs(&env.pool, &env.dataset)
            .map_err(|e| ProvisionError::environment(&env.name, e))?;
        tracing::info!("{} now boots {}", env.pool, env.dataset);
        Ok(())
    }

    /// Unmount the environment, and export the pool if it was imported for
    /// an in-place upgrade.
    pub fn release(&self, env: &BootEnvironment) -> Result<()> {
        self.host
            .unmount(&env.mountpoint)
            .map_err(|e| ProvisionError::mount(&env.dataset, e))?;
        if env.in_place {
            self.host
                .export_pool(&env.pool)
                .map_err(|e| ProvisionError::environment(&env.name, e))?;
        }
        Ok(())
    }
}
