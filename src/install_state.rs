//! Install State Machine
//!
//! The authoritative record of how far a provisioning run has progressed.
//! Transitions are forward-only and validated, and every stage from capacity
//! planning onward sits inside the destructive critical section: entering
//! the first of them requires an explicit confirmation on the context.
//!
//! # Stage Flow
//!
//! ```text
//! NotStarted
//!     ↓
//! ValidatingConfig
//!     ↓
//! SelectingDisks
//!     ↓
//! DetectingUpgrade
//!     ↓
//! EvaluatingSafety
//!     ↓
//! PlanningCapacity        ┐
//!     ↓                   │
//! Partitioning            │
//!     ↓                   │
//! CreatingEnvironment     │ critical section
//!     ↓                   │
//! RestoringConfig         │
//!     ↓                   │
//! InstallingBootloader    │
//!     ↓                   │
//! Finalizing              ┘
//!     ↓
//! Completed
//!
//! (Any non-terminal stage can transition to Failed)
//! ```

use std::fmt;
use thiserror::Error;

/// Provisioning stages in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum InstallStage {
    #[default]
    NotStarted = 0,
    ValidatingConfig = 1,
    /// Enumerating disks and applying the selection rules
    SelectingDisks = 2,
    /// Looking for a prior installation (upgrade runs only)
    DetectingUpgrade = 3,
    /// Resolving the swap policy
    EvaluatingSafety = 4,
    /// Trial layouts to measure the common data size (DESTRUCTIVE)
    PlanningCapacity = 5,
    /// Final layout and boot pool (DESTRUCTIVE)
    Partitioning = 6,
    /// New boot environment created, mounted and populated
    CreatingEnvironment = 7,
    /// Preserved configuration copied back, sentinels written
    RestoringConfig = 8,
    InstallingBootloader = 9,
    /// Unmount, export, release the working root
    Finalizing = 10,
    Completed = 11,
    Failed = 255,
}

impl InstallStage {
    /// Returns the numeric order of this stage (255 for Failed)
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if this stage is part of the destructive critical section
    #[inline]
    pub const fn is_destructive(self) -> bool {
        matches!(
            self,
            Self::PlanningCapacity
                | Self::Partitioning
                | Self::CreatingEnvironment
                | Self::RestoringConfig
                | Self::InstallingBootloader
                | Self::Finalizing
        )
    }

    /// Returns the next stage in the sequence, or None if at a terminal state
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::ValidatingConfig),
            Self::ValidatingConfig => Some(Self::SelectingDisks),
            Self::SelectingDisks => Some(Self::DetectingUpgrade),
            Self::DetectingUpgrade => Some(Self::EvaluatingSafety),
            Self::EvaluatingSafety => Some(Self::PlanningCapacity),
            Self::PlanningCapacity => Some(Self::Partitioning),
            Self::Partitioning => Some(Self::CreatingEnvironment),
            Self::CreatingEnvironment => Some(Self::RestoringConfig),
            Self::RestoringConfig => Some(Self::InstallingBootloader),
            Self::InstallingBootloader => Some(Self::Finalizing),
            Self::Finalizing => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    /// Returns a human-readable description of this stage
    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::ValidatingConfig => "Validating configuration",
            Self::SelectingDisks => "Selecting disks",
            Self::DetectingUpgrade => "Detecting prior installation",
            Self::EvaluatingSafety => "Evaluating swap safety",
            Self::PlanningCapacity => "Planning capacity",
            Self::Partitioning => "Partitioning disks",
            Self::CreatingEnvironment => "Creating boot environment",
            Self::RestoringConfig => "Restoring configuration",
            Self::InstallingBootloader => "Installing boot code",
            Self::Finalizing => "Finalizing installation",
            Self::Completed => "Installation complete",
            Self::Failed => "Installation failed",
        }
    }

    /// Returns all stages in order (excluding Failed)
    pub const fn all_stages() -> &'static [Self] {
        &[
            Self::NotStarted,
            Self::ValidatingConfig,
            Self::SelectingDisks,
            Self::DetectingUpgrade,
            Self::EvaluatingSafety,
            Self::PlanningCapacity,
            Self::Partitioning,
            Self::CreatingEnvironment,
            Self::RestoringConfig,
            Self::InstallingBootloader,
            Self::Finalizing,
            Self::Completed,
        ]
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallTransitionError {
    #[error("Cannot skip from {from} to {to} (must transition through intermediate stages)")]
    SkippedStage {
        from: InstallStage,
        to: InstallStage,
    },

    #[error("Cannot go backwards from {from} to {to} (installation is forward-only)")]
    BackwardTransition {
        from: InstallStage,
        to: InstallStage,
    },

    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: InstallStage },

    #[error("Stage {stage} requires explicit confirmation (destructive operation)")]
    MissingConfirmation { stage: InstallStage },

    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: InstallStage },
}

impl From<InstallTransitionError> for crate::error::ProvisionError {
    fn from(err: InstallTransitionError) -> Self {
        crate::error::ProvisionError::InstallTransition(err.to_string())
    }
}

/// Context for tracking one provisioning run.
///
/// # Example
///
/// ```
/// use bootpool_install::install_state::{InstallerContext, InstallStage};
///
/// let mut ctx = InstallerContext::new();
/// ctx.advance().unwrap();
/// assert_eq!(ctx.current_stage(), InstallStage::ValidatingConfig);
///
/// // Cannot skip stages
/// assert!(ctx.transition_to(InstallStage::Partitioning).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InstallerContext {
    current: InstallStage,
    failed_at: Option<InstallStage>,
    /// Completed stages with unix timestamps
    stage_history: Vec<(InstallStage, u64)>,
    destructive_confirmed: bool,
    /// Disks the run is about to write, named in failure reports
    target_disks: Vec<String>,
}

impl InstallerContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current_stage(&self) -> InstallStage {
        self.current
    }

    #[inline]
    pub fn failed_at(&self) -> Option<InstallStage> {
        self.failed_at
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current == InstallStage::Completed
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.current == InstallStage::Failed
    }

    /// Returns true once the run has entered the critical section
    #[inline]
    pub fn in_critical_section(&self) -> bool {
        self.current.is_destructive()
    }

    pub fn stage_history(&self) -> &[(InstallStage, u64)] {
        &self.stage_history
    }

    pub fn set_target_disks(&mut self, disks: &[String]) {
        self.target_disks = disks.to_vec();
    }

    pub fn target_disks(&self) -> &[String] {
        &self.target_disks
    }

    /// Authorize the destructive stages. One-way; cannot be revoked.
    pub fn confirm_destructive_operations(&mut self) {
        self.destructive_confirmed = true;
    }

    #[inline]
    pub fn is_destructive_confirmed(&self) -> bool {
        self.destructive_confirmed
    }

    /// Advance to the next stage in sequence.
    pub fn advance(&mut self) -> Result<InstallStage, InstallTransitionError> {
        let Some(next_stage) = self.current.next() else {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        };
        self.transition_to(next_stage)
    }

    /// Transition to a specific stage (must be the next stage in sequence).
    pub fn transition_to(
        &mut self,
        target: InstallStage,
    ) -> Result<InstallStage, InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }

        if target == self.current {
            return Err(InstallTransitionError::AlreadyAtStage { stage: target });
        }

        // Failed is only reachable through fail()
        if target == InstallStage::Failed {
            return Err(InstallTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        if target.order() < self.current.order() {
            return Err(InstallTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }

        if self.current.next() != Some(target) {
            return Err(InstallTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        if target.is_destructive() && !self.destructive_confirmed {
            return Err(InstallTransitionError::MissingConfirmation { stage: target });
        }

        tracing::info!("Stage: {}", target);
        self.record_stage_transition(target);
        self.current = target;
        Ok(target)
    }

    /// Mark the run as failed, recording the stage it failed in.
    pub fn fail(&mut self) -> Result<(), InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }

        self.failed_at = Some(self.current);
        self.record_stage_transition(InstallStage::Failed);
        self.current = InstallStage::Failed;
        Ok(())
    }

    fn record_stage_transition(&mut self, stage: InstallStage) {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.stage_history.push((stage, timestamp));
    }
}
