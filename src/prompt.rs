//! Operator interaction
//!
//! The engine never renders dialogs. Every question or message goes through
//! a `Prompter`; the binary picks a console prompter for interactive runs
//! and a headless one when a configuration file answers everything.

use std::io::{self, BufRead, Write};

use crossterm::style::Stylize;

use crate::error::{ProvisionError, Result};
use crate::types::{BootMode, DiskCandidate};
use crate::units::human;

/// Questions and messages the provisioning core needs answered or shown.
pub trait Prompter {
    /// Yes/no question. Any failure to answer counts as "no".
    fn confirm(&mut self, question: &str) -> bool;

    /// Choose destination disks from the eligible candidates.
    fn select_disks(&mut self, candidates: &[DiskCandidate]) -> Result<Vec<String>>;

    /// Offer to change the firmware mode the live environment reported.
    fn choose_boot_mode(&mut self, detected: BootMode) -> BootMode;

    /// Informational message.
    fn notify(&mut self, message: &str);

    /// The single terminal message of a failed run.
    fn report_failure(&mut self, message: &str);
}

/// Prompter for unattended runs: accepts every confirmation and takes the
/// first candidate when asked to choose.
#[derive(Debug, Default)]
pub struct HeadlessPrompter;

impl Prompter for HeadlessPrompter {
    fn confirm(&mut self, question: &str) -> bool {
        tracing::info!("Unattended: accepting '{}'", question);
        true
    }

    fn select_disks(&mut self, candidates: &[DiskCandidate]) -> Result<Vec<String>> {
        candidates
            .first()
            .map(|c| vec![c.name.clone()])
            .ok_or(ProvisionError::NoEligibleDisks)
    }

    fn choose_boot_mode(&mut self, detected: BootMode) -> BootMode {
        detected
    }

    fn notify(&mut self, message: &str) {
        tracing::info!("{}", message);
    }

    fn report_failure(&mut self, message: &str) {
        tracing::error!("{}", message);
        eprintln!("{}", message);
    }
}

/// Line-oriented prompter on stdin/stderr.
pub struct ConsolePrompter<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl ConsolePrompter<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> Option<String> {
        write!(self.output, "{} ", prompt.bold()).ok()?;
        self.output.flush().ok()?;
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl<R: BufRead, W: Write> Prompter for ConsolePrompter<R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        matches!(
            self.ask(&format!("{} [y/N]", question))
                .map(|a| a.to_ascii_lowercase())
                .as_deref(),
            Some("y") | Some("yes")
        )
    }

    fn select_disks(&mut self, candidates: &[DiskCandidate]) -> Result<Vec<String>> {
        if candidates.is_empty() {
            return Err(ProvisionError::NoEligibleDisks);
        }
        let _ = writeln!(self.output, "{}", "Destination disks:".cyan());
        for (i, c) in candidates.iter().enumerate() {
            let _ = writeln!(
                self.output,
                "  {}) {:<10} {:>10}  {}",
                i + 1,
                c.name,
                human(c.media_size),
                c.description
            );
        }
        let answer = self
            .ask("Select disks (e.g. 1 or 1,2):")
            .ok_or(ProvisionError::Cancelled)?;

        let mut chosen = Vec::new();
        for token in answer.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            let index: usize = token
                .parse()
                .map_err(|_| ProvisionError::validation(format!("'{}' is not a disk number", token)))?;
            let candidate = index
                .checked_sub(1)
                .and_then(|i| candidates.get(i))
                .ok_or_else(|| ProvisionError::validation(format!("no disk numbered {}", index)))?;
            if !chosen.contains(&candidate.name) {
                chosen.push(candidate.name.clone());
            }
        }
        if chosen.is_empty() {
            return Err(ProvisionError::Cancelled);
        }
        Ok(chosen)
    }

    fn choose_boot_mode(&mut self, detected: BootMode) -> BootMode {
        let other = match detected {
            BootMode::Uefi => BootMode::Bios,
            BootMode::Bios => BootMode::Uefi,
        };
        let question = format!(
            "The system booted via {}. Install {} boot code instead?",
            detected, other
        );
        if self.confirm(&question) {
            other
        } else {
            detected
        }
    }

    fn notify(&mut self, message: &str) {
        let _ = writeln!(self.output, "{}", message);
    }

    fn report_failure(&mut self, message: &str) {
        let _ = writeln!(self.output, "{}", message.red().bold());
    }
}
