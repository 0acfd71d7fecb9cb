//! OpenStreetMap hospital locator for blood-match.
//!
//! Finds the hospital nearest to a request location through the Overpass
//! API and fills in a missing street address with a Nominatim reverse
//! lookup. Every failure degrades to "no hospital" or a placeholder; no
//! error ever reaches the caller of [`HospitalLocator`].
//!
//! [`HospitalLocator`]: blood_match_core::locator::HospitalLocator

pub mod client;
pub mod nominatim;
pub mod overpass;

pub use client::*;
pub use overpass::{OverpassElement, OverpassResponse, UNKNOWN_HOSPITAL};
