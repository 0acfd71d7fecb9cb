//! Hospital records attached to blood requests.

use serde::{Deserialize, Serialize};

/// Placeholder used when no street address can be resolved.
pub const ADDRESS_NOT_AVAILABLE: &str = "Address not available";

/// Placeholder used when no contact number can be resolved.
pub const CONTACT_UNKNOWN: &str = "Unknown";

/// Hospital where the requested blood should be delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hospital {
    pub name: String,
    pub address: String,
    pub contact_number: String,
}

impl Hospital {
    pub fn new(name: impl Into<String>, address: impl Into<String>, contact_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            contact_number: contact_number.into(),
        }
    }

    /// True when the contact number is missing or a placeholder.
    pub fn lacks_contact(&self) -> bool {
        let contact = self.contact_number.trim();
        contact.is_empty() || contact == CONTACT_UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lacks_contact() {
        assert!(Hospital::new("General", "Main St", "").lacks_contact());
        assert!(Hospital::new("General", "Main St", CONTACT_UNKNOWN).lacks_contact());
        assert!(!Hospital::new("General", "Main St", "+961 1 123").lacks_contact());
    }
}
