//! Disk Enumerator
//!
//! Lists the disks a run may write to. The installation medium and anything
//! with a mounted partition are excluded, software RAID members are replaced
//! by their volume, and the result is sorted so that `ada2` comes before
//! `ada10`.

use std::cmp::Ordering;

use crate::host::Host;
use crate::tools::geom::device_belongs_to;
use crate::types::{DiskCandidate, Transport};

/// Eligible destination disks, naturally sorted.
///
/// A failing disk listing yields an empty vector; callers treat that as "no
/// eligible destination".
pub fn eligible_disks(host: &dyn Host, media_label: &str) -> Vec<String> {
    let mut disks = match host.list_disks() {
        Ok(disks) => disks,
        Err(e) => {
            tracing::warn!("Disk listing failed: {}", e);
            return Vec::new();
        }
    };

    let media: Vec<String> = host
        .labels()
        .unwrap_or_else(|e| {
            tracing::warn!("Could not read volume labels: {}", e);
            Vec::new()
        })
        .into_iter()
        .filter(|(label, _)| label.starts_with(media_label))
        .map(|(_, component)| component)
        .collect();

    let mounted: Vec<String> = host
        .mounts()
        .unwrap_or_else(|e| {
            tracing::warn!("Could not read mount table: {}", e);
            Vec::new()
        })
        .into_iter()
        .map(|record| record.device)
        .collect();

    disks.retain(|disk| {
        if let Some(component) = media.iter().find(|c| device_belongs_to(c, disk)) {
            tracing::info!("Skipping {}: installation medium ({})", disk, component);
            return false;
        }
        if let Some(device) = mounted.iter().find(|d| device_belongs_to(d, disk)) {
            tracing::info!("Skipping {}: {} is mounted", disk, device);
            return false;
        }
        true
    });

    match host.raid_volumes() {
        Ok(volumes) => {
            for volume in volumes {
                // Members listed under another name (a partition, a path) are not ours to drop
                disks.retain(|d| !volume.members.contains(d));
                tracing::debug!("{} replaces {:?}", volume.name, volume.members);
                if !disks.contains(&volume.name) {
                    disks.push(volume.name);
                }
            }
        }
        Err(e) => tracing::warn!("Could not read RAID status: {}", e),
    }

    disks.sort_by(|a, b| natural_cmp(a, b));
    disks
}

/// Attach size, transport and description to each name. Disks whose
/// information cannot be read are dropped with a warning.
pub fn candidates(host: &dyn Host, names: &[String]) -> Vec<DiskCandidate> {
    let removable = host.removable_disks().unwrap_or_else(|e| {
        tracing::warn!("Could not read device list: {}", e);
        Default::default()
    });

    names
        .iter()
        .filter_map(|name| match host.disk_info(name) {
            Ok(info) => Some(DiskCandidate {
                name: name.clone(),
                media_size: info.media_size,
                transport: if removable.contains(name) {
                    Transport::Removable
                } else {
                    Transport::Fixed
                },
                description: info.description,
            }),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", name, e);
                None
            }
        })
        .collect()
}

/// Describe why `disk` is busy, or `None` if nothing on it is mounted.
pub fn disk_in_use(host: &dyn Host, disk: &str) -> Option<String> {
    let mounts = host.mounts().ok()?;
    mounts
        .iter()
        .find(|record| device_belongs_to(&record.device, disk))
        .map(|record| format!("{} mounted on {}", record.device, record.mountpoint.display()))
}

/// Numeric-aware string comparison: digit runs compare by value.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = match (l, r) {
                    (Chunk::Digits(l), Chunk::Digits(r)) => {
                        let l = l.trim_start_matches('0');
                        let r = r.trim_start_matches('0');
                        l.len().cmp(&r.len()).then_with(|| l.cmp(r))
                    }
                    (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
                    (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
                    (Chunk::Text(l), Chunk::Text(r)) => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits {
            Chunk::Digits(chunk)
        } else {
            Chunk::Text(chunk)
        })
    }
}
