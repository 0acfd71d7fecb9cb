//! Donor → recipient compatibility table tests.

use blood_match_core::models::{compatible_recipients, is_compatible, BloodType};
use proptest::prelude::*;

const LABELS: [&str; 8] = ["O-", "O+", "A-", "A+", "B-", "B+", "AB-", "AB+"];

/// Expected table, rows are donors and columns recipients, both in `LABELS` order.
const TABLE: [[bool; 8]; 8] = [
    // O-    O+     A-     A+     B-     B+     AB-    AB+
    [true, true, true, true, true, true, true, true],         // O-
    [false, true, false, true, false, true, false, true],     // O+
    [false, false, true, true, false, false, true, true],     // A-
    [false, false, false, true, false, false, false, true],   // A+
    [false, false, false, false, true, true, true, true],     // B-
    [false, false, false, false, false, true, false, true],   // B+
    [false, false, false, false, false, false, true, true],   // AB-
    [false, false, false, false, false, false, false, true],  // AB+
];

#[test]
fn test_full_table() {
    for (d, donor) in LABELS.iter().enumerate() {
        for (r, recipient) in LABELS.iter().enumerate() {
            assert_eq!(
                is_compatible(Some(donor), Some(recipient)),
                TABLE[d][r],
                "{donor} -> {recipient}"
            );
        }
    }
}

#[test]
fn test_recipient_sets_match_table() {
    for (d, donor) in LABELS.iter().enumerate() {
        let expected: Vec<BloodType> = LABELS
            .iter()
            .enumerate()
            .filter(|(r, _)| TABLE[d][*r])
            .map(|(_, label)| BloodType::parse(label).unwrap())
            .collect();
        assert_eq!(compatible_recipients(donor), expected, "{donor}");
    }
}

#[test]
fn test_labels_are_normalized() {
    assert!(is_compatible(Some(" o- "), Some("ab+")));
    assert!(is_compatible(Some("b-"), Some(" B+")));
    assert_eq!(compatible_recipients(" ab- ").len(), 2);
}

#[test]
fn test_missing_or_unknown_is_never_compatible() {
    assert!(!is_compatible(None, Some("AB+")));
    assert!(!is_compatible(Some("O-"), None));
    assert!(!is_compatible(None, None));
    assert!(!is_compatible(Some("O"), Some("AB+")));
    assert!(!is_compatible(Some("O-"), Some("")));
    assert!(compatible_recipients("X+").is_empty());
    assert!(compatible_recipients("").is_empty());
}

proptest! {
    #[test]
    fn unknown_labels_never_match(raw in "\\PC{0,6}") {
        prop_assume!(BloodType::parse(&raw).is_none());
        for label in LABELS {
            prop_assert!(!is_compatible(Some(&raw), Some(label)));
            prop_assert!(!is_compatible(Some(label), Some(&raw)));
        }
        prop_assert!(compatible_recipients(&raw).is_empty());
    }

    #[test]
    fn every_type_can_receive_from_itself_and_o_negative(idx in 0usize..8) {
        let label = LABELS[idx];
        prop_assert!(is_compatible(Some(label), Some(label)));
        prop_assert!(is_compatible(Some("O-"), Some(label)));
        prop_assert!(is_compatible(Some(label), Some("AB+")));
    }
}
