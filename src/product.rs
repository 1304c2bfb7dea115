//! Product identity and scratch locations used during a run.

use std::path::PathBuf;

/// Names and marker files that identify an installation of this product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductIdentity {
    /// Name of the boot pool
    pub pool_name: String,
    /// Container dataset holding boot environments
    pub root_container: String,
    /// Boot environment name used by fresh installs
    pub default_environment: String,
    /// Primary state file, relative to the data area
    pub state_file: String,
    /// File only a retired, incompatible product generation carries (relative to a BE root)
    pub retired_marker: String,
    /// Package cache kept inside the data area, never preserved
    pub package_cache: String,
    /// Volume label prefix of the installation medium
    pub media_label: String,
}

impl Default for ProductIdentity {
    fn default() -> Self {
        Self {
            pool_name: "freenas-boot".to_string(),
            root_container: "ROOT".to_string(),
            default_environment: "default".to_string(),
            state_file: "freenas-v1.db".to_string(),
            retired_marker: "usr/local/sbin/dispatcherd".to_string(),
            package_cache: "pkgdb".to_string(),
            media_label: "iso9660/FREENAS".to_string(),
        }
    }
}

impl ProductIdentity {
    /// Dataset name of a boot environment inside the pool.
    pub fn environment_dataset(&self, name: &str) -> String {
        format!("{}/{}/{}", self.pool_name, self.root_container, name)
    }

    /// Dataset name of the ROOT container.
    pub fn root_dataset(&self) -> String {
        format!("{}/{}", self.pool_name, self.root_container)
    }
}

/// Scratch mount points and files owned by the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPaths {
    /// Mount point of the new boot environment
    pub working_root: PathBuf,
    /// Mount point used while inspecting a prior installation
    pub inspect_root: PathBuf,
    /// Second mount point for the legacy system slice
    pub inspect_system_root: PathBuf,
    /// Staging area for preserved configuration
    pub staging: PathBuf,
    /// Mount point for the EFI System Partition while stamping
    pub efi_mount: PathBuf,
    /// Alternate root for the boot pool
    pub pool_altroot: PathBuf,
    /// Pool cache file
    pub cachefile: PathBuf,
}

impl Default for WorkPaths {
    fn default() -> Self {
        Self {
            working_root: PathBuf::from("/tmp/data"),
            inspect_root: PathBuf::from("/tmp/data_old"),
            inspect_system_root: PathBuf::from("/tmp/data_old_system"),
            staging: PathBuf::from("/tmp/data_preserved"),
            efi_mount: PathBuf::from("/tmp/efi"),
            pool_altroot: PathBuf::from("/tmp/boot"),
            cachefile: PathBuf::from("/tmp/zpool.cache"),
        }
    }
}

impl WorkPaths {
    /// All paths rooted under `base` instead of `/tmp`.
    pub fn under(base: &std::path::Path) -> Self {
        Self {
            working_root: base.join("data"),
            inspect_root: base.join("data_old"),
            inspect_system_root: base.join("data_old_system"),
            staging: base.join("data_preserved"),
            efi_mount: base.join("efi"),
            pool_altroot: base.join("boot"),
            cachefile: base.join("zpool.cache"),
        }
    }
}
