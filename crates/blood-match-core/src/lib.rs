//! Blood-Match Core Library
//!
//! Matching core for a blood-donation coordination service: requests for
//! blood are posted at a location, ranked by urgency, matched against
//! compatible donors, and announced to nearby requesters.
//!
//! # Architecture
//!
//! ```text
//! create(payload) → Validate → Resolve requester (role "user")
//!                                     │
//!                      hospital supplied? ──no──► HospitalLocator
//!                                     │                 │
//!                                     │◄────────────────┘ (None ⇒ NoNearbyHospital)
//!                                     ▼
//!                     ┌───────────────────────────────┐
//!                     │   Geospatial Request Store    │
//!                     │  SQLite + R*Tree + haversine  │
//!                     └───────────────┬───────────────┘
//!                                     │
//!                  nearby pending same-type requests (10 km)
//!                                     │
//!                     ┌───────────────▼───────────────┐
//!                     │          Notifier             │
//!                     │  one alert per requester,     │
//!                     │  then newBloodRequest to all  │
//!                     └───────────────────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **Blood-type compatibility is the only rule gating donor assignment.**
//! The fixed donor → recipient table in [`models::is_compatible`] is consulted
//! for every assignment; nothing else second-guesses it.
//!
//! # Modules
//!
//! - [`config`]: Layered runtime configuration
//! - [`db`]: SQLite store with the spatial index
//! - [`locator`]: Hospital lookup capability
//! - [`models`]: Domain types (BloodRequest, BloodType, User, etc.)
//! - [`notify`]: Per-user notification channels
//! - [`priority`]: Listing priority score
//! - [`service`]: Request lifecycle operations

pub mod config;
pub mod db;
pub mod locator;
pub mod models;
pub mod notify;
pub mod priority;
pub mod service;

// Re-export commonly used types
pub use config::{ConfigError, LocatorConfig, MatchConfig};
pub use db::Database;
pub use locator::{FixedLocator, HospitalLocator};
pub use models::{
    compatible_recipients, is_compatible, AssignmentResult, BloodRequest, BloodType, Hospital,
    NewBloodRequest, RequestPatch, RequestStatus, UrgencyLevel, User,
};
pub use notify::{Dispatcher, Notifier, RequestEvent, Subscription};
pub use priority::PriorityRanker;
pub use service::{BloodRequestService, BloodRequestView, ListQuery, Page, Pagination};

use models::BloodType as Bt;

// =========================================================================
// Error Type
// =========================================================================

/// Machine-checkable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    Incompatible,
    Duplicate,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Incompatible => "incompatible",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Persistence => "persistence",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BloodMatchError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No nearby hospital found. Please enter a hospital manually.")]
    NoNearbyHospital,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(
        "Donor blood type {donor} is not compatible with {recipient}; compatible recipients: [{}]",
        join_types(.compatible)
    )]
    Incompatible {
        donor: String,
        recipient: String,
        compatible: Vec<Bt>,
    },

    #[error("Donor {donor_id} is already assigned to request {request_id}")]
    DuplicateAssignment { request_id: String, donor_id: String },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

fn join_types(types: &[Bt]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl BloodMatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BloodMatchError::Validation(_) | BloodMatchError::NoNearbyHospital => {
                ErrorKind::Validation
            }
            BloodMatchError::NotFound(_) => ErrorKind::NotFound,
            BloodMatchError::Unauthorized(_) => ErrorKind::Authorization,
            BloodMatchError::Incompatible { .. } => ErrorKind::Incompatible,
            BloodMatchError::DuplicateAssignment { .. } => ErrorKind::Duplicate,
            BloodMatchError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// HTTP-equivalent status for the transport layer.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::Incompatible | ErrorKind::Duplicate => 400,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Persistence => 500,
        }
    }
}

impl From<db::DbError> for BloodMatchError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => BloodMatchError::NotFound(what),
            other => BloodMatchError::Persistence(other.to_string()),
        }
    }
}

impl From<models::CoordinateError> for BloodMatchError {
    fn from(e: models::CoordinateError) -> Self {
        BloodMatchError::Validation(format!("Invalid location: {e}"))
    }
}

impl From<models::UnknownBloodType> for BloodMatchError {
    fn from(e: models::UnknownBloodType) -> Self {
        BloodMatchError::Validation(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for BloodMatchError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        BloodMatchError::Persistence(format!("Lock poisoned: {}", e))
    }
}

pub type BloodMatchResult<T> = Result<T, BloodMatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_and_status() {
        let cases = [
            (BloodMatchError::Validation("x".into()), ErrorKind::Validation, 400),
            (BloodMatchError::NoNearbyHospital, ErrorKind::Validation, 400),
            (BloodMatchError::NotFound("x".into()), ErrorKind::NotFound, 404),
            (BloodMatchError::Unauthorized("x".into()), ErrorKind::Authorization, 403),
            (
                BloodMatchError::DuplicateAssignment {
                    request_id: "r".into(),
                    donor_id: "d".into(),
                },
                ErrorKind::Duplicate,
                400,
            ),
            (BloodMatchError::Persistence("x".into()), ErrorKind::Persistence, 500),
        ];
        for (error, kind, status) in cases {
            assert_eq!(error.kind(), kind);
            assert_eq!(error.status_code(), status);
        }
    }

    #[test]
    fn test_incompatible_message_lists_types() {
        let error = BloodMatchError::Incompatible {
            donor: "A+".into(),
            recipient: "O-".into(),
            compatible: vec![Bt::APositive, Bt::AbPositive],
        };
        assert_eq!(error.kind(), ErrorKind::Incompatible);
        assert!(error.to_string().contains("[A+, AB+]"));
    }

    #[test]
    fn test_db_error_conversion() {
        let not_found: BloodMatchError = db::DbError::NotFound("blood request r1".into()).into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let constraint: BloodMatchError = db::DbError::Constraint("bad row".into()).into();
        assert_eq!(constraint.kind(), ErrorKind::Persistence);
    }
}
