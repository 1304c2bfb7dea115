//! Type-safe values shared by the provisioning components
//!
//! Stringly-typed run state (yes/no flags, firmware names, post-install
//! actions) is replaced with enums that parse once at the edge and match
//! exhaustively everywhere else.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Boot firmware mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum BootMode {
    #[strum(to_string = "BIOS")]
    Bios,
    #[strum(to_string = "UEFI", serialize = "efi")]
    Uefi,
}

impl BootMode {
    /// Returns true for UEFI firmware.
    pub fn is_uefi(self) -> bool {
        matches!(self, Self::Uefi)
    }
}

/// Whether a swap slot is carved out of each disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SwapPolicy {
    Enabled,
    Disabled,
    /// Safe by measurement but the operator still has to agree
    NeedsConfirmation,
}

impl SwapPolicy {
    /// Returns true if the layout gets a swap slot.
    pub fn creates_swap(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// On-disk layout generation of a prior installation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum UpgradeStyle {
    /// No prior installation
    #[default]
    None,
    /// Multi-slice MBR layout with a UFS data slice
    Legacy,
    /// GPT layout with the boot pool on partition 2
    Modern,
}

/// Action taken once the install finishes successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum WhenDone {
    #[default]
    Reboot,
    Wait,
    Halt,
}

/// Mirror request from the headless config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MirrorMode {
    #[default]
    #[strum(to_string = "no", serialize = "false", serialize = "0")]
    No,
    #[strum(to_string = "yes", serialize = "true", serialize = "1")]
    Yes,
    Force,
}

impl MirrorMode {
    /// Returns true if more than one disk may be selected.
    pub fn allows_mirror(self) -> bool {
        !matches!(self, Self::No)
    }
}

/// How the disk is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Transport {
    #[default]
    Fixed,
    /// USB mass storage or another simulated SCSI bridge
    Removable,
}

/// A disk as seen by enumeration: name, raw size, and attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskCandidate {
    /// Device name without `/dev/` (e.g. `ada0`, `raid/r0`)
    pub name: String,
    /// Raw media size in bytes
    pub media_size: u64,
    pub transport: Transport,
    /// Vendor/model string, empty if unknown
    pub description: String,
}

/// Parse a yes/no answer, case-insensitively. Anything else is `None`.
pub fn parse_yes_no(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}
