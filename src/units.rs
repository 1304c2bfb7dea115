//! Byte sizes: binary multiples, boundary rounding, and size literals.
//!
//! Size literals come from the headless config (`minDiskSize=16g`) and follow
//! the installer convention: an optional single-letter suffix `b`, `k`, `m`,
//! `g` or `t`, always a power-of-two multiple.

use crate::error::{ProvisionError, Result};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;
pub const TIB: u64 = 1024 * GIB;

/// Round `bytes` down to a multiple of `boundary`. A zero boundary is a no-op.
pub const fn round_down(bytes: u64, boundary: u64) -> u64 {
    if boundary == 0 {
        bytes
    } else {
        bytes - bytes % boundary
    }
}

/// Parse a size literal such as `512`, `8g`, `1T` or `4096b`.
pub fn parse_size(literal: &str) -> Result<u64> {
    let trimmed = literal.trim();
    if trimmed.is_empty() {
        return Err(ProvisionError::config("empty size literal"));
    }

    let (digits, multiplier) = match trimmed.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => {
            let multiplier = match c.to_ascii_lowercase() {
                'b' => 1,
                'k' => KIB,
                'm' => MIB,
                'g' => GIB,
                't' => TIB,
                _ => {
                    return Err(ProvisionError::config(format!(
                        "unknown size suffix in '{}'",
                        literal
                    )));
                }
            };
            (&trimmed[..trimmed.len() - 1], multiplier)
        }
        _ => (trimmed, 1),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| ProvisionError::config(format!("invalid size literal '{}'", literal)))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| ProvisionError::config(format!("size literal '{}' overflows", literal)))
}

/// Render a byte count with the largest binary unit that keeps one decimal.
pub fn human(bytes: u64) -> String {
    const UNITS: [(u64, &str); 4] = [(TIB, "TiB"), (GIB, "GiB"), (MIB, "MiB"), (KIB, "KiB")];
    for (unit, name) in UNITS {
        if bytes >= unit {
            return format!("{:.1} {}", bytes as f64 / unit as f64, name);
        }
    }
    format!("{} B", bytes)
}
