//! Boot pool provisioning library
//!
//! Selects destination disks, lays out a GPT per disk, builds a ZFS boot
//! pool with a boot environment, carries configuration over from a prior
//! installation, and makes every disk bootable.

pub mod cli;
pub mod config_file;
pub mod engine;
pub mod error;
pub mod host;
pub mod install_state;
pub mod installer;
pub mod populate;
pub mod process_guard;
pub mod product;
pub mod prompt;
pub mod sanity;
pub mod tool_runner;
pub mod tool_traits;
pub mod tools;
pub mod types;
pub mod units;

// Re-export main types for convenience
pub use config_file::{HeadlessConfig, SelectionRules};
pub use error::{ProvisionError, Result};
pub use host::{Host, SystemHost};
pub use install_state::{InstallStage, InstallTransitionError, InstallerContext};
pub use installer::{perform_when_done, InstallOutcome, Orchestrator, RunConfig};
pub use process_guard::{ChildRegistry, CommandProcessGroup, CriticalSection};
pub use product::{ProductIdentity, WorkPaths};
pub use prompt::{ConsolePrompter, HeadlessPrompter, Prompter};
pub use types::{BootMode, DiskCandidate, MirrorMode, SwapPolicy, Transport, UpgradeStyle, WhenDone};
