//! Error handling for the provisioning core
//!
//! Every failure the engine can surface is a `ProvisionError` variant. The
//! variants mirror the points at which an install run can stop: before any
//! disk is touched (precondition failures) or inside the destructive critical
//! section, where nothing is unwound.

use thiserror::Error;

/// Main error type for the provisioning core
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// A selected disk has mounted partitions or is otherwise busy
    #[error("Disk {disk} is in use: {reason}")]
    DiskInUse { disk: String, reason: String },

    /// The common data slot size is below the supported floor
    #[error("Selected media too small: {available} bytes usable, {required} bytes required")]
    MediaTooSmall { available: u64, required: u64 },

    /// Upgrade requested but no known on-disk layout was found
    #[error("No upgradable installation found on {disks}")]
    UnknownUpgradeStyle { disks: String },

    /// A partition table or slot could not be written
    #[error("Failed to partition {disk}: {reason}")]
    PartitionCreate { disk: String, reason: String },

    /// The boot pool (or its ROOT container) could not be created
    #[error("Failed to create pool {pool}: {reason}")]
    PoolCreate { pool: String, reason: String },

    /// A boot environment could not be imported, created, or mounted
    #[error("Failed to prepare boot environment {name}: {reason}")]
    EnvironmentCreate { name: String, reason: String },

    /// Boot code could not be written to a disk
    #[error("Failed to install boot code on {disk}: {reason}")]
    BootloaderStamp { disk: String, reason: String },

    /// A filesystem could not be mounted or unmounted
    #[error("Mount of {device} failed: {reason}")]
    Mount { device: String, reason: String },

    /// An external tool exited unsuccessfully
    #[error("{program} failed (exit code {code}): {stderr}")]
    Tool {
        program: String,
        code: i32,
        stderr: String,
    },

    /// Enumeration and selection left nothing to install onto
    #[error("No eligible destination disk found")]
    NoEligibleDisks,

    /// `mirror=force` with fewer than two matching disks
    #[error("Mirror required but only {found} matching disk(s) found")]
    MirrorUnavailable { found: usize },

    /// The operator declined to continue
    #[error("Installation cancelled by operator")]
    Cancelled,

    /// Configuration errors (loading, parsing)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (selection, tool output)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Install state machine transition errors
    #[error("Install transition error: {0}")]
    InstallTransition(String),

    /// IO errors (staging, copy-back, sentinel files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

// Convenient error constructors
impl ProvisionError {
    /// Create a disk-in-use error
    pub fn disk_in_use(disk: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DiskInUse {
            disk: disk.into(),
            reason: reason.into(),
        }
    }

    /// Create a partitioning error
    pub fn partition(disk: impl Into<String>, reason: impl ToString) -> Self {
        Self::PartitionCreate {
            disk: disk.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a pool creation error
    pub fn pool(pool: impl Into<String>, reason: impl ToString) -> Self {
        Self::PoolCreate {
            pool: pool.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a boot environment error
    pub fn environment(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::EnvironmentCreate {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a boot code error
    pub fn bootloader(disk: impl Into<String>, reason: impl ToString) -> Self {
        Self::BootloaderStamp {
            disk: disk.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a mount error
    pub fn mount(device: impl Into<String>, reason: impl ToString) -> Self {
        Self::Mount {
            device: device.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Returns true if this error can only be raised once disks have been written.
    ///
    /// Everything else leaves the disks exactly as they were, so the run can be
    /// retried from the start.
    pub fn mutates_disks(&self) -> bool {
        matches!(
            self,
            Self::PartitionCreate { .. }
                | Self::PoolCreate { .. }
                | Self::EnvironmentCreate { .. }
                | Self::BootloaderStamp { .. }
        )
    }
}
