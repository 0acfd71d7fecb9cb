//! Hospital lookup capability consumed by request creation.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::Hospital;

/// Finds the hospital nearest to a coordinate.
///
/// Implementations must not fail: network errors, timeouts and malformed
/// payloads degrade to `None`.
pub trait HospitalLocator: Send + Sync {
    /// Nearest hospital, if any.
    fn locate(&self, latitude: f64, longitude: f64) -> Option<Hospital>;

    /// Contact number of a named hospital near the coordinate.
    fn contact_for(&self, _latitude: f64, _longitude: f64, _hospital_name: &str) -> Option<String> {
        None
    }
}

/// Locator returning a fixed answer (for testing and offline setups).
#[derive(Debug, Default)]
pub struct FixedLocator {
    hospital: Option<Hospital>,
    contact: Option<String>,
    calls: AtomicUsize,
}

impl FixedLocator {
    /// Always finds `hospital`.
    pub fn found(hospital: Hospital) -> Self {
        Self {
            hospital: Some(hospital),
            ..Default::default()
        }
    }

    /// Never finds anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Answer `contact_for` lookups with `contact`.
    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    /// Number of `locate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HospitalLocator for FixedLocator {
    fn locate(&self, _latitude: f64, _longitude: f64) -> Option<Hospital> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hospital.clone()
    }

    fn contact_for(&self, _latitude: f64, _longitude: f64, _hospital_name: &str) -> Option<String> {
        self.contact.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_locator_counts_calls() {
        let locator = FixedLocator::found(Hospital::new("Test", "X", "1"));
        assert_eq!(locator.locate(0.0, 0.0), Some(Hospital::new("Test", "X", "1")));
        assert_eq!(locator.calls(), 1);
        assert!(FixedLocator::empty().locate(0.0, 0.0).is_none());
    }
}
