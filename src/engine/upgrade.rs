//! Upgrade Detector
//!
//! Recognizes a prior installation on a disk and stages the configuration
//! worth keeping before anything is destroyed.
//!
//! Two on-disk generations exist and are tried in this order:
//!
//! 1. **Modern**: GPT with the boot pool on partition 2. The pool is imported
//!    without mounting, its `bootfs` environment is mounted, and the state
//!    directory `data/` is staged along with optional artifacts.
//! 2. **Legacy**: four-slice MBR. Slice 4 holds the state directory directly;
//!    the optional artifacts come from the `a` partition of the active slice.
//!
//! The bundle mirrors the layout of a boot environment (`data/...`,
//! `root/.ssh`, `boot/modules`, ...) so restoring it is a plain tree copy.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;
use crate::host::{partition_device, slice_device, FsType, Host, MountSpec};
use crate::product::{ProductIdentity, WorkPaths};
use crate::types::UpgradeStyle;

use super::partition::DATA_INDEX;
use super::{MountGuard, PoolImportGuard};

/// Directory holding the state file inside a boot environment.
pub const STATE_DIR: &str = "data";

/// Preserved when present; missing ones are not an error.
pub const OPTIONAL_ARTIFACTS: [&str; 5] = [
    "conf/base/etc/hostid",
    "root/.ssh",
    "boot/modules",
    "boot/loader.conf.local",
    "boot/device.hints",
];

/// Slice of a legacy layout that holds the state directory.
const LEGACY_DATA_SLICE: u32 = 4;

/// Configuration staged from a prior installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedConfigBundle {
    root: PathBuf,
    entries: Vec<PathBuf>,
}

impl PreservedConfigBundle {
    /// Staging directory the bundle lives in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Staged paths relative to the root, state directory first.
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn contains(&self, rel: impl AsRef<Path>) -> bool {
        self.entries.iter().any(|e| e == rel.as_ref())
    }

    /// Delete the staging directory.
    pub fn discard(self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}

/// Outcome of inspecting one or more disks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpgradeDetection {
    pub style: UpgradeStyle,
    /// Disk the installation was found on
    pub disk: Option<String>,
    /// Partition, slice, or dataset that was examined
    pub source: Option<String>,
    pub bundle: Option<PreservedConfigBundle>,
    /// Boot pool to upgrade in place (modern layout only)
    pub pool: Option<String>,
}

impl UpgradeDetection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn found(&self) -> bool {
        self.style != UpgradeStyle::None
    }
}

pub struct UpgradeDetector<'a> {
    host: &'a dyn Host,
    product: &'a ProductIdentity,
    paths: &'a WorkPaths,
}

impl<'a> UpgradeDetector<'a> {
    pub fn new(host: &'a dyn Host, product: &'a ProductIdentity, paths: &'a WorkPaths) -> Self {
        Self {
            host,
            product,
            paths,
        }
    }

    /// Inspect `disks` in order and stop at the first prior installation.
    ///
    /// Later disks are not looked at, so a second installation elsewhere in
    /// the set goes unnoticed.
    pub fn detect_first(&self, disks: &[String]) -> Result<UpgradeDetection> {
        for (i, disk) in disks.iter().enumerate() {
            let detection = self.detect(disk)?;
            if detection.found() {
                if i + 1 < disks.len() {
                    tracing::info!(
                        "Using {} installation on {}; not inspecting {}",
                        detection.style,
                        disk,
                        disks[i + 1..].join(" ")
                    );
                }
                return Ok(detection);
            }
        }
        Ok(UpgradeDetection::none())
    }

    /// Inspect one disk. Anything that cannot be read or mounted means "no
    /// prior installation"; only staging I/O errors are returned.
    pub fn detect(&self, disk: &str) -> Result<UpgradeDetection> {
        let partitions = match self.host.partitions(disk) {
            Ok(partitions) => partitions,
            Err(e) => {
                tracing::debug!("{}: no readable partition table ({})", disk, e);
                return Ok(UpgradeDetection::none());
            }
        };

        let data_partition = partition_device(disk, DATA_INDEX);
        let data_slice = slice_device(disk, LEGACY_DATA_SLICE);
        if partitions.iter().any(|p| p.name == data_partition) {
            if let Some(detection) = self.detect_modern(disk, &data_partition)? {
                return Ok(detection);
            }
        } else if partitions.iter().any(|p| p.name == data_slice) {
            if let Some(detection) = self.detect_legacy(disk, &data_slice)? {
                return Ok(detection);
            }
        }
        tracing::info!("No prior installation on {}", disk);
        Ok(UpgradeDetection::none())
    }

    fn detect_modern(&self, disk: &str, device: &str) -> Result<Option<UpgradeDetection>> {
        let pool = &self.product.pool_name;
        match self.host.pool_label(device) {
            Ok(Some(label)) if &label == pool => {}
            Ok(_) => return Ok(None),
            Err(e) => {
                tracing::debug!("Could not read ZFS label of {}: {}", device, e);
                return Ok(None);
            }
        }

        if let Err(e) = self.host.import_pool(pool, &self.paths.pool_altroot) {
            tracing::warn!("Could not import {} from {}: {}", pool, device, e);
            return Ok(None);
        }
        let _imported = PoolImportGuard::new(self.host, pool);

        let environment = match self.host.bootfs(pool) {
            Ok(Some(environment)) => environment,
            Ok(None) => {
                tracing::warn!("{} has no default boot environment", pool);
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!("Could not read bootfs of {}: {}", pool, e);
                return Ok(None);
            }
        };

        let Some(root) = self.mount_for_inspection(FsType::Zfs, &environment, &self.paths.inspect_root)
        else {
            return Ok(None);
        };
        let _mounted = MountGuard::new(self.host, &self.paths.inspect_root);

        let state_dir = root.join(STATE_DIR);
        if !state_dir.join(&self.product.state_file).is_file() {
            tracing::info!("{}: no {} in {}", disk, self.product.state_file, environment);
            return Ok(None);
        }
        if root.join(&self.product.retired_marker).exists() {
            tracing::warn!(
                "{}: {} belongs to an incompatible product generation",
                disk,
                environment
            );
            return Ok(None);
        }

        let mut stager = Stager::new(&self.paths.staging)?;
        stager.stage_state(&state_dir, &self.product.package_cache)?;
        stager.stage_artifacts(&root);

        tracing::info!("Found modern installation on {} ({})", disk, environment);
        Ok(Some(UpgradeDetection {
            style: UpgradeStyle::Modern,
            disk: Some(disk.to_string()),
            source: Some(environment),
            bundle: Some(stager.finish()),
            pool: Some(pool.clone()),
        }))
    }

    fn detect_legacy(&self, disk: &str, data_slice: &str) -> Result<Option<UpgradeDetection>> {
        let Some(data_root) = self.mount_for_inspection(FsType::Ufs, data_slice, &self.paths.inspect_root)
        else {
            return Ok(None);
        };
        let data_mount = MountGuard::new(self.host, &self.paths.inspect_root);

        if !data_root.join(&self.product.state_file).is_file() {
            tracing::info!("{}: no {} on {}", disk, self.product.state_file, data_slice);
            return Ok(None);
        }

        let mut stager = Stager::new(&self.paths.staging)?;
        stager.stage_state(&data_root, &self.product.package_cache)?;
        drop(data_mount);

        match self.host.active_slice(disk) {
            Ok(Some(active)) => {
                let system = format!("{}a", slice_device(disk, active));
                if let Some(system_root) =
                    self.mount_for_inspection(FsType::Ufs, &system, &self.paths.inspect_system_root)
                {
                    let _system_mount = MountGuard::new(self.host, &self.paths.inspect_system_root);
                    stager.stage_artifacts(&system_root);
                }
            }
            Ok(None) => tracing::warn!("{}: no active slice, skipping system files", disk),
            Err(e) => tracing::warn!("{}: could not read slice table: {}", disk, e),
        }

        tracing::info!("Found legacy installation on {}", disk);
        Ok(Some(UpgradeDetection {
            style: UpgradeStyle::Legacy,
            disk: Some(disk.to_string()),
            source: Some(data_slice.to_string()),
            bundle: Some(stager.finish()),
            pool: None,
        }))
    }

    fn mount_for_inspection(&self, fstype: FsType, device: &str, target: &Path) -> Option<PathBuf> {
        let spec = MountSpec {
            fstype,
            device: device.to_string(),
            target: target.to_path_buf(),
            options: vec!["noatime".to_string()],
        };
        match self.host.mount(&spec) {
            Ok(root) => Some(root),
            Err(e) => {
                tracing::info!("Could not mount {} for inspection: {}", device, e);
                None
            }
        }
    }
}

/// Builds a bundle in a fresh staging directory. The directory is removed
/// again unless the stager is finished into a bundle.
struct Stager {
    root: PathBuf,
    entries: Vec<PathBuf>,
}

impl Stager {
    fn new(root: &Path) -> io::Result<Self> {
        if root.exists() {
            fs::remove_dir_all(root)?;
        }
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            entries: Vec::new(),
        })
    }

    fn stage_state(&mut self, state_dir: &Path, package_cache: &str) -> io::Result<()> {
        let copied = copy_tree(state_dir, &self.root.join(STATE_DIR), Some(package_cache))?;
        tracing::info!("Staged {} files from {}", copied, state_dir.display());
        self.entries.push(PathBuf::from(STATE_DIR));
        Ok(())
    }

    /// Copy whichever optional artifacts exist under `source_root`. A failed
    /// copy is logged and its partial output removed.
    fn stage_artifacts(&mut self, source_root: &Path) {
        for artifact in OPTIONAL_ARTIFACTS {
            let source = source_root.join(artifact);
            if !source.exists() {
                continue;
            }
            let target = self.root.join(artifact);
            match copy_tree(&source, &target, None) {
                Ok(_) => self.entries.push(PathBuf::from(artifact)),
                Err(e) => {
                    tracing::warn!("Not preserving {}: {}", artifact, e);
                    let removed = if target.is_dir() {
                        fs::remove_dir_all(&target)
                    } else {
                        fs::remove_file(&target)
                    };
                    if let Err(e) = removed {
                        tracing::debug!("Could not remove partial copy {}: {}", target.display(), e);
                    }
                }
            }
        }
    }

    fn finish(mut self) -> PreservedConfigBundle {
        PreservedConfigBundle {
            root: std::mem::take(&mut self.root),
            entries: std::mem::take(&mut self.entries),
        }
    }
}

impl Drop for Stager {
    fn drop(&mut self) {
        if self.root.as_os_str().is_empty() || !self.root.exists() {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.root) {
            tracing::warn!("Could not remove {}: {}", self.root.display(), e);
        }
    }
}

/// Copy the bundle into a mounted boot environment. The bundle is discarded
/// whether or not the copy succeeds.
pub fn restore(bundle: PreservedConfigBundle, env_root: &Path) -> Result<()> {
    let copied = copy_tree(bundle.root(), env_root, None);
    let discarded = bundle.discard();
    let copied = copied?;
    tracing::info!(
        "Restored {} preserved files into {}",
        copied,
        env_root.display()
    );
    discarded
}

/// Recursively copy `src` (a file or a directory) to `dst`, skipping a
/// top-level entry named `skip`. Symbolic links are recreated, not
/// followed. Returns the number of files and links copied.
pub(crate) fn copy_tree(src: &Path, dst: &Path, skip: Option<&str>) -> io::Result<u64> {
    if src.is_symlink() {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        copy_link(src, dst)?;
        return Ok(1);
    }
    if src.is_file() {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dst)?;
        return Ok(1);
    }

    let mut copied = 0;
    let walker = WalkDir::new(src)
        .into_iter()
        .filter_entry(|entry| {
            skip.is_none_or(|skip| entry.depth() != 1 || entry.file_name() != OsStr::new(skip))
        });
    for entry in walker {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        if entry.file_type().is_symlink() {
            copy_link(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
        copied += 1;
    }
    Ok(copied)
}

/// Recreate the link at `src` as `dst`, replacing whatever `dst` holds.
fn copy_link(src: &Path, dst: &Path) -> io::Result<()> {
    let link = fs::read_link(src)?;
    if dst.is_symlink() || dst.is_file() {
        fs::remove_file(dst)?;
    }
    std::os::unix::fs::symlink(link, dst)
}
