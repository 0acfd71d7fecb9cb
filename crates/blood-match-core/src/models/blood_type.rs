//! ABO/Rh blood types and the donor → recipient compatibility table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the 8 recognized ABO/Rh blood types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "O-")]
    ONegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "AB+")]
    AbPositive,
}

impl BloodType {
    /// All types, universal donor first.
    pub const ALL: [BloodType; 8] = [
        BloodType::ONegative,
        BloodType::OPositive,
        BloodType::ANegative,
        BloodType::APositive,
        BloodType::BNegative,
        BloodType::BPositive,
        BloodType::AbNegative,
        BloodType::AbPositive,
    ];

    /// Canonical label, e.g. `"AB+"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BloodType::ONegative => "O-",
            BloodType::OPositive => "O+",
            BloodType::ANegative => "A-",
            BloodType::APositive => "A+",
            BloodType::BNegative => "B-",
            BloodType::BPositive => "B+",
            BloodType::AbNegative => "AB-",
            BloodType::AbPositive => "AB+",
        }
    }

    /// Parse a label after trimming and uppercasing it.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "O-" => Some(BloodType::ONegative),
            "O+" => Some(BloodType::OPositive),
            "A-" => Some(BloodType::ANegative),
            "A+" => Some(BloodType::APositive),
            "B-" => Some(BloodType::BNegative),
            "B+" => Some(BloodType::BPositive),
            "AB-" => Some(BloodType::AbNegative),
            "AB+" => Some(BloodType::AbPositive),
            _ => None,
        }
    }

    /// Recipient types this donor type may give to.
    pub fn recipients(&self) -> &'static [BloodType] {
        use BloodType::*;
        match self {
            ONegative => &[
                ONegative, OPositive, ANegative, APositive, BNegative, BPositive, AbNegative,
                AbPositive,
            ],
            OPositive => &[OPositive, APositive, BPositive, AbPositive],
            ANegative => &[ANegative, APositive, AbNegative, AbPositive],
            APositive => &[APositive, AbPositive],
            BNegative => &[BNegative, BPositive, AbNegative, AbPositive],
            BPositive => &[BPositive, AbPositive],
            AbNegative => &[AbNegative, AbPositive],
            AbPositive => &[AbPositive],
        }
    }

    /// Whether a donor of this type can give to `recipient`.
    pub fn can_donate_to(&self, recipient: BloodType) -> bool {
        self.recipients().contains(&recipient)
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a label is not one of the 8 recognized types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unrecognized blood type: {0:?}")]
pub struct UnknownBloodType(pub String);

impl FromStr for BloodType {
    type Err = UnknownBloodType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BloodType::parse(s).ok_or_else(|| UnknownBloodType(s.to_string()))
    }
}

/// Check whether a donor may give to a recipient.
///
/// Both labels are normalized (trimmed, uppercased). Missing or unrecognized
/// labels on either side are never compatible.
pub fn is_compatible(donor: Option<&str>, recipient: Option<&str>) -> bool {
    match (donor.and_then(BloodType::parse), recipient.and_then(BloodType::parse)) {
        (Some(donor), Some(recipient)) => donor.can_donate_to(recipient),
        _ => false,
    }
}

/// Recipient types for a donor label, empty when the label is unrecognized.
pub fn compatible_recipients(blood_type: &str) -> Vec<BloodType> {
    BloodType::parse(blood_type)
        .map(|t| t.recipients().to_vec())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(BloodType::parse(" ab+ "), Some(BloodType::AbPositive));
        assert_eq!(BloodType::parse("o-"), Some(BloodType::ONegative));
        assert_eq!(BloodType::parse("C+"), None);
        assert_eq!(BloodType::parse(""), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("b-".parse::<BloodType>(), Ok(BloodType::BNegative));
        assert_eq!(
            "Z+".parse::<BloodType>(),
            Err(UnknownBloodType("Z+".to_string()))
        );
    }

    #[test]
    fn test_display_round_trips_label() {
        for t in BloodType::ALL {
            assert_eq!(BloodType::parse(&t.to_string()), Some(t));
        }
    }

    #[test]
    fn test_universal_donor_and_recipient() {
        assert_eq!(BloodType::ONegative.recipients().len(), 8);
        for donor in BloodType::ALL {
            assert!(donor.can_donate_to(BloodType::AbPositive));
        }
    }

    #[test]
    fn test_is_compatible_rejects_missing_or_unknown() {
        assert!(!is_compatible(None, Some("A+")));
        assert!(!is_compatible(Some("A+"), None));
        assert!(!is_compatible(Some("Z+"), Some("A+")));
        assert!(!is_compatible(Some("O-"), Some("unknown")));
    }

    #[test]
    fn test_compatible_recipients() {
        assert_eq!(
            compatible_recipients("a+"),
            vec![BloodType::APositive, BloodType::AbPositive]
        );
        assert!(compatible_recipients("XY").is_empty());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&BloodType::AbNegative).unwrap();
        assert_eq!(json, "\"AB-\"");
        let parsed: BloodType = serde_json::from_str("\"O+\"").unwrap();
        assert_eq!(parsed, BloodType::OPositive);
    }
}
