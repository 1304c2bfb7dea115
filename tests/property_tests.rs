//! Property-based tests for sizing, selection and ordering rules.

use proptest::prelude::*;
use std::cmp::Ordering;

use bootpool_install::config_file::SelectionRules;
use bootpool_install::engine::capacity::estimate_data_size;
use bootpool_install::engine::enumerate::natural_cmp;
use bootpool_install::engine::partition::{PartitionLayout, DATA_ROUNDING};
use bootpool_install::engine::safety::{SafetyEvaluator, SWAP_SAFETY_THRESHOLD};
use bootpool_install::types::{
    BootMode, DiskCandidate, MirrorMode, SwapPolicy, Transport, WhenDone,
};
use bootpool_install::units::{parse_size, round_down, GIB, KIB, MIB, TIB};

// =============================================================================
// Size arithmetic
// =============================================================================

proptest! {
    /// round_down: result is a multiple, never larger, and within one boundary
    #[test]
    fn round_down_bounds(bytes in any::<u64>(), boundary in 1u64..=(1 << 40)) {
        let rounded = round_down(bytes, boundary);
        prop_assert_eq!(rounded % boundary, 0);
        prop_assert!(rounded <= bytes);
        prop_assert!(bytes - rounded < boundary);
    }

    /// parse_size: every suffix is the matching binary multiple
    #[test]
    fn parse_size_suffixes(n in 0u64..(1 << 20), suffix in prop::sample::select(vec!['b', 'k', 'm', 'g', 't', 'K', 'G'])) {
        let unit = match suffix.to_ascii_lowercase() {
            'b' => 1,
            'k' => KIB,
            'm' => MIB,
            'g' => GIB,
            _ => TIB,
        };
        prop_assert_eq!(parse_size(&format!("{}{}", n, suffix)).unwrap(), n * unit);
        prop_assert_eq!(parse_size(&n.to_string()).unwrap(), n);
    }

    /// parse_size: overflow is an error, not a wrap
    #[test]
    fn parse_size_overflow(n in (u64::MAX / TIB + 1)..u64::MAX) {
        let result = parse_size(&format!("{}t", n));
        prop_assert!(result.is_err());
    }
}

// =============================================================================
// Natural ordering of disk names
// =============================================================================

proptest! {
    /// Same prefix: order follows the unit number, not the text
    #[test]
    fn natural_cmp_numeric(a in 0u32..10_000, b in 0u32..10_000) {
        let left = format!("ada{}", a);
        let right = format!("ada{}", b);
        prop_assert_eq!(natural_cmp(&left, &right), a.cmp(&b));
    }

    /// Antisymmetric and consistent with equality
    #[test]
    fn natural_cmp_antisymmetric(a in "[a-z]{1,4}[0-9]{0,3}", b in "[a-z]{1,4}[0-9]{0,3}") {
        prop_assert_eq!(natural_cmp(&a, &b), natural_cmp(&b, &a).reverse());
        prop_assert_eq!(natural_cmp(&a, &b) == Ordering::Equal, a == b);
    }
}

// =============================================================================
// Capacity and safety rules
// =============================================================================

fn disk_strategy() -> impl Strategy<Value = DiskCandidate> {
    (0u32..32, (1u64..4096).prop_map(|g| g * GIB + 512 * KIB), any::<bool>()).prop_map(
        |(unit, media_size, removable)| DiskCandidate {
            name: format!("ada{}", unit),
            media_size,
            transport: if removable {
                Transport::Removable
            } else {
                Transport::Fixed
            },
            description: String::new(),
        },
    )
}

fn boot_mode_strategy() -> impl Strategy<Value = BootMode> {
    prop_oneof![Just(BootMode::Uefi), Just(BootMode::Bios)]
}

proptest! {
    /// The common data size is a 16 MiB multiple that fits the smallest disk
    #[test]
    fn estimate_fits_smallest(
        disks in prop::collection::vec(disk_strategy(), 1..4),
        mode in boot_mode_strategy(),
        swap in any::<bool>(),
    ) {
        let swap = if swap { SwapPolicy::Enabled } else { SwapPolicy::Disabled };
        let layout = PartitionLayout::trial(mode, swap);
        let size = estimate_data_size(&disks, &layout);
        let smallest = disks.iter().map(|d| d.media_size).min().unwrap();
        prop_assert_eq!(size % DATA_ROUNDING, 0);
        prop_assert!(size == 0 || size + layout.overhead() <= smallest);
    }

    /// Without an override, one small or removable disk disables swap
    #[test]
    fn safety_disables_on_any_unsafe_disk(disks in prop::collection::vec(disk_strategy(), 1..4)) {
        let unsafe_disk = disks
            .iter()
            .any(|d| d.media_size < SWAP_SAFETY_THRESHOLD || d.transport == Transport::Removable);
        let policy = SafetyEvaluator::new(false, None).preliminary(&disks);
        if unsafe_disk {
            prop_assert_eq!(policy, SwapPolicy::Disabled);
        } else {
            prop_assert_eq!(policy, SwapPolicy::NeedsConfirmation);
        }
        prop_assert_eq!(SafetyEvaluator::new(true, None).preliminary(&disks), SwapPolicy::Enabled);
    }

    /// Selection returns eligible names only, one unless mirroring is allowed
    #[test]
    fn selection_respects_rules(
        disks in prop::collection::vec(disk_strategy(), 1..6),
        min in prop::option::of(1u64..2048),
        mirror in prop_oneof![Just(MirrorMode::No), Just(MirrorMode::Yes)],
    ) {
        let disks: Vec<DiskCandidate> = disks
            .into_iter()
            .enumerate()
            .map(|(i, mut d)| {
                d.name = format!("da{}", i);
                d
            })
            .collect();
        let rules = SelectionRules {
            min_size: min.map(|g| g * GIB),
            mirror,
            ..Default::default()
        };
        if let Ok(selected) = rules.select(&disks) {
            prop_assert!(!selected.is_empty());
            if mirror == MirrorMode::No {
                prop_assert_eq!(selected.len(), 1);
            }
            for name in &selected {
                let disk = disks.iter().find(|d| &d.name == name);
                prop_assert!(disk.is_some());
                prop_assert!(rules.min_size.is_none_or(|m| disk.unwrap().media_size >= m));
            }
        }
    }
}

// =============================================================================
// Enum string round-trips
// =============================================================================

fn when_done_strategy() -> impl Strategy<Value = WhenDone> {
    prop_oneof![Just(WhenDone::Reboot), Just(WhenDone::Wait), Just(WhenDone::Halt)]
}

proptest! {
    /// WhenDone: to_string → parse round-trip is identity
    #[test]
    fn when_done_roundtrip(action in when_done_strategy()) {
        let parsed: WhenDone = action.to_string().parse().expect("Should parse");
        prop_assert_eq!(action, parsed);
        let upper: WhenDone = action.to_string().to_uppercase().parse().expect("Case-insensitive");
        prop_assert_eq!(action, upper);
    }
}
