//! Safety Evaluator
//!
//! Decides once per run whether each disk gets a swap slot. Small disks and
//! USB-bridged disks never do; a managed product always does; everything
//! else is up to the operator.

use crate::prompt::Prompter;
use crate::types::{parse_yes_no, DiskCandidate, SwapPolicy, Transport};
use crate::units::GIB;

/// Disks below this size never get swap.
pub const SWAP_SAFETY_THRESHOLD: u64 = 60 * GIB;

/// Resolves and caches the run's `SwapPolicy`.
#[derive(Debug, Default)]
pub struct SafetyEvaluator {
    managed: bool,
    override_value: Option<String>,
    resolved: Option<SwapPolicy>,
}

impl SafetyEvaluator {
    /// `override_value` is the externally forced answer (`--swap`), if any.
    pub fn new(managed: bool, override_value: Option<String>) -> Self {
        Self {
            managed,
            override_value,
            resolved: None,
        }
    }

    /// Policy decided earlier in this run, if any.
    pub fn cached(&self) -> Option<SwapPolicy> {
        self.resolved
    }

    /// Resolve the policy for `disks`. The first resolution sticks; later
    /// calls return it without asking again.
    pub fn evaluate(&mut self, disks: &[DiskCandidate], prompter: &mut dyn Prompter) -> SwapPolicy {
        if let Some(policy) = self.resolved {
            return policy;
        }
        let policy = match self.preliminary(disks) {
            SwapPolicy::NeedsConfirmation => {
                if prompter.confirm("Create a 16 GiB swap partition on each boot disk?") {
                    SwapPolicy::Enabled
                } else {
                    SwapPolicy::Disabled
                }
            }
            decided => decided,
        };
        tracing::info!("Swap policy: {}", policy);
        self.resolved = Some(policy);
        policy
    }

    /// The decision before the operator is asked anything.
    pub fn preliminary(&self, disks: &[DiskCandidate]) -> SwapPolicy {
        if self.managed {
            return SwapPolicy::Enabled;
        }

        if let Some(value) = self.override_value.as_deref() {
            match parse_yes_no(value) {
                Some(true) => return SwapPolicy::Enabled,
                Some(false) => return SwapPolicy::Disabled,
                None => tracing::warn!("Ignoring swap override '{}': expected yes or no", value),
            }
        }

        if let Some(reason) = disks.iter().find_map(unsafe_for_swap) {
            tracing::info!("Swap disabled: {}", reason);
            return SwapPolicy::Disabled;
        }

        SwapPolicy::NeedsConfirmation
    }
}

fn unsafe_for_swap(disk: &DiskCandidate) -> Option<String> {
    if disk.media_size < SWAP_SAFETY_THRESHOLD {
        return Some(format!("{} is smaller than 60 GiB", disk.name));
    }
    if disk.transport == Transport::Removable {
        return Some(format!("{} is attached through USB mass storage", disk.name));
    }
    None
}
