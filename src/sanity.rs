//! Pre-flight sanity checks for the runtime environment
//!
//! Verified before the first prompt:
//! - the FreeBSD storage tools the host drives are present
//! - the process runs with root privileges (EUID 0)
//!
//! If any check fails, the program exits with a clear error message before a
//! disk is looked at.

use crate::tool_runner::{SystemRunner, ToolRunner};
use crate::tools::system::Which;

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root
    }
}

/// Binaries the system host invokes
const REQUIRED_BINARIES: &[&str] = &[
    "gpart",       // Partition tables and boot code
    "zpool",       // Boot pool
    "zfs",         // Boot environments
    "zdb",         // Pool labels on prior installs
    "mount",
    "umount",
    "newfs_msdos", // EFI System Partition
    "diskinfo",    // Media size
    "camcontrol",  // USB bridge detection
    "glabel",      // Installation medium
    "graid",       // Software RAID volumes
    "gmirror",     // Trial swap mirror cleanup
    "sysctl",      // Disk list and boot method
    "chroot",      // BIOS boot code from the new environment
];

/// Check if a binary is available in PATH
fn binary_exists(runner: &dyn ToolRunner, name: &str) -> bool {
    runner
        .run(&Which {
            name: name.to_string(),
        })
        .map(|output| output.success)
        .unwrap_or(false)
}

/// Check if running as root (EUID 0)
fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Perform all sanity checks and return the result
pub fn verify_environment(runner: &dyn ToolRunner) -> SanityCheckResult {
    let missing = REQUIRED_BINARIES
        .iter()
        .filter(|binary| !binary_exists(runner, binary))
        .map(|binary| (*binary).to_string())
        .collect();

    SanityCheckResult {
        missing_binaries: missing,
        is_root: is_running_as_root(),
    }
}

/// Print a pretty error message to stderr and exit
pub fn print_error_and_exit(result: &SanityCheckResult) -> ! {
    eprintln!();
    eprintln!("╔══════════════════════════════════════════════════════════════════╗");
    eprintln!("║              bootpool-install - Pre-flight Check Failed          ║");
    eprintln!("╚══════════════════════════════════════════════════════════════════╝");
    eprintln!();

    if !result.is_root {
        eprintln!("❌ ERROR: Root privileges required");
        eprintln!("   Partitioning disks and creating pools requires root.");
        eprintln!();
    }

    if !result.missing_binaries.is_empty() {
        eprintln!("❌ ERROR: Missing required binaries");
        eprintln!();
        for binary in &result.missing_binaries {
            eprintln!("   • {}", binary);
        }
        eprintln!();
        eprintln!("   These ship with the FreeBSD base system; check PATH on the install media.");
        eprintln!();
    }

    eprintln!("╔══════════════════════════════════════════════════════════════════╗");
    eprintln!("║  Fix the above issues and try again.                             ║");
    eprintln!("╚══════════════════════════════════════════════════════════════════╝");
    eprintln!();

    std::process::exit(1);
}

/// Set BOOTPOOL_SKIP_ROOT_CHECK=1 to skip the root check
pub fn should_skip_root_check() -> bool {
    std::env::var("BOOTPOOL_SKIP_ROOT_CHECK")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Run pre-flight checks, optionally without the root check
pub fn run_preflight_checks_with_options(skip_root: bool) {
    tracing::debug!("Running pre-flight sanity checks (skip_root={})...", skip_root);

    let mut result = verify_environment(&SystemRunner);

    if skip_root || should_skip_root_check() {
        tracing::warn!("Root check skipped");
        result.is_root = true;
    }

    if !result.is_ok() {
        print_error_and_exit(&result);
    }

    tracing::info!("Pre-flight checks passed");
}
