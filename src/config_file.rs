//! Headless configuration file.
//!
//! An unattended install reads its answers from a `key=value` file:
//!
//! ```text
//! # install onto the two smallest disks of at least 16 GiB
//! minDiskSize=16g
//! mirror=yes
//! diskCount=2
//! whenDone=halt
//! ```
//!
//! Lines that are not `key=value` and lines starting with `#` are ignored, as
//! are unknown keys. A recognized key with a value that does not parse is an
//! error: guessing would risk writing to the wrong disk.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::ProvisionError;
use crate::types::{parse_yes_no, DiskCandidate, MirrorMode, WhenDone};
use crate::units::parse_size;

/// Answers read from a headless configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlessConfig {
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub when_done: Option<WhenDone>,
    pub min_disk_size: Option<u64>,
    pub max_disk_size: Option<u64>,
    /// Upper bound on the number of disks selected
    pub disk_count: Option<usize>,
    pub upgrade: Option<bool>,
    /// Explicit destination disks, without `/dev/`
    pub disks: Vec<String>,
    pub mirror: MirrorMode,
}

impl HeadlessConfig {
    /// Load and parse a configuration file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse `key=value` lines.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                tracing::debug!("Ignoring line {}: not key=value", number + 1);
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                tracing::debug!("Ignoring line {}: not key=value", number + 1);
                continue;
            }
            config
                .apply(key, value)
                .with_context(|| format!("line {}: {}", number + 1, key))?;
        }
        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "password" => self.password = Some(value.to_string()),
            "whenDone" => {
                self.when_done = Some(
                    value
                        .parse()
                        .map_err(|_| anyhow::anyhow!("expected reboot, wait or halt, got '{}'", value))?,
                )
            }
            "minDiskSize" => self.min_disk_size = Some(parse_size(value)?),
            "maxDiskSize" => self.max_disk_size = Some(parse_size(value)?),
            "diskCount" => {
                self.disk_count = Some(
                    value
                        .parse()
                        .with_context(|| format!("invalid disk count '{}'", value))?,
                )
            }
            "upgrade" => {
                self.upgrade = Some(
                    parse_yes_no(value)
                        .ok_or_else(|| anyhow::anyhow!("expected yes or no, got '{}'", value))?,
                )
            }
            "disk" | "disks" => self.disks.extend(
                value
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|d| !d.is_empty())
                    .map(|d| d.trim_start_matches("/dev/").to_string()),
            ),
            "mirror" => {
                self.mirror = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("expected yes, no or force, got '{}'", value))?
            }
            other => tracing::warn!("Ignoring unknown config key '{}'", other),
        }
        Ok(())
    }

    /// Reject combinations that can never select a disk.
    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_disk_size, self.max_disk_size) {
            if min > max {
                bail!("minDiskSize ({}) is larger than maxDiskSize ({})", min, max);
            }
        }
        if self.disk_count == Some(0) {
            bail!("diskCount must be at least 1");
        }
        if self.mirror == MirrorMode::Force && self.disk_count == Some(1) {
            bail!("mirror=force needs diskCount of at least 2");
        }
        Ok(())
    }

    /// Disk selection rules carried by this file.
    pub fn selection(&self) -> SelectionRules {
        SelectionRules {
            disks: self.disks.clone(),
            min_size: self.min_disk_size,
            max_size: self.max_disk_size,
            max_count: self.disk_count,
            mirror: self.mirror,
        }
    }
}

/// How an unattended run picks its destination disks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionRules {
    pub disks: Vec<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub max_count: Option<usize>,
    pub mirror: MirrorMode,
}

impl SelectionRules {
    /// Apply the rules to the eligible candidates, in their given order.
    ///
    /// An explicit disk list is taken as is, but every named disk must be
    /// eligible. Otherwise candidates are filtered by size and capped at
    /// `max_count`, and selection stops at the first match unless mirroring
    /// is allowed.
    pub fn select(&self, candidates: &[DiskCandidate]) -> std::result::Result<Vec<String>, ProvisionError> {
        let selected: Vec<String> = if !self.disks.is_empty() {
            if let Some(missing) = self
                .disks
                .iter()
                .find(|d| !candidates.iter().any(|c| &c.name == *d))
            {
                return Err(ProvisionError::validation(format!(
                    "disk {} is not an eligible destination",
                    missing
                )));
            }
            self.disks.clone()
        } else {
            let limit = if self.mirror.allows_mirror() {
                self.max_count.unwrap_or(usize::MAX)
            } else {
                1
            };
            candidates
                .iter()
                .filter(|c| self.min_size.is_none_or(|min| c.media_size >= min))
                .filter(|c| self.max_size.is_none_or(|max| c.media_size <= max))
                .take(limit)
                .map(|c| c.name.clone())
                .collect()
        };

        if self.mirror == MirrorMode::Force && selected.len() < 2 {
            return Err(ProvisionError::MirrorUnavailable {
                found: selected.len(),
            });
        }
        if selected.is_empty() {
            return Err(ProvisionError::NoEligibleDisks);
        }
        tracing::info!("Selected {}", selected.join(" "));
        Ok(selected)
    }
}
