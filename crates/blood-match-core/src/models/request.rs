//! Blood request aggregate and the payloads that create and patch it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BloodType, GeoLocation, Hospital, LocationInput};

/// Coarse priority of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    High,
    Medium,
    Low,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::High => "high",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::Low => "low",
        }
    }

    /// Exact, case-sensitive match on `high | medium | low`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "high" => Some(UrgencyLevel::High),
            "medium" => Some(UrgencyLevel::Medium),
            "low" => Some(UrgencyLevel::Low),
            _ => None,
        }
    }

    /// Weight used by priority ranking.
    pub fn weight(&self) -> f64 {
        match self {
            UrgencyLevel::High => 3.0,
            UrgencyLevel::Medium => 2.0,
            UrgencyLevel::Low => 1.0,
        }
    }
}

/// Finer-grained urgency classification, independent of [`UrgencyLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrgencyDescription {
    Critical,
    High,
    Medium,
    Low,
}

impl UrgencyDescription {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyDescription::Critical => "Critical",
            UrgencyDescription::High => "High",
            UrgencyDescription::Medium => "Medium",
            UrgencyDescription::Low => "Low",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Critical" => Some(UrgencyDescription::Critical),
            "High" => Some(UrgencyDescription::High),
            "Medium" => Some(UrgencyDescription::Medium),
            "Low" => Some(UrgencyDescription::Low),
            _ => None,
        }
    }
}

/// Request status. `Fulfilled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Matched,
    Fulfilled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Matched => "matched",
            RequestStatus::Fulfilled => "fulfilled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(RequestStatus::Pending),
            "matched" => Some(RequestStatus::Matched),
            "fulfilled" => Some(RequestStatus::Fulfilled),
            _ => None,
        }
    }

    /// Nothing leaves `Fulfilled`; staying put is always allowed.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        *self == next || *self != RequestStatus::Fulfilled
    }
}

/// Contact details supplied by the requester.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// One entry of the append-only status log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusUpdate {
    pub status: RequestStatus,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

/// A persisted blood request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BloodRequest {
    pub id: String,
    /// Owning user id
    pub requested_by: String,
    pub blood_type: BloodType,
    pub location: GeoLocation,
    pub urgency_level: UrgencyLevel,
    pub urgency_description: Option<UrgencyDescription>,
    pub status: RequestStatus,
    /// Total units requested
    pub blood_units: f64,
    /// Units recorded as donated so far
    pub fulfilled_units: f64,
    /// Donor ids in assignment order, no duplicates
    pub assigned_donors: Vec<String>,
    pub expiration_date: DateTime<Utc>,
    pub additional_notes: Option<String>,
    pub contact_info: Option<ContactInfo>,
    pub tags: Vec<String>,
    pub hospital: Hospital,
    pub status_update_history: Vec<StatusUpdate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BloodRequest {
    /// Create a pending request with a fresh id and timestamps.
    pub fn new(
        requested_by: String,
        blood_type: BloodType,
        location: GeoLocation,
        urgency_level: UrgencyLevel,
        blood_units: f64,
        expiration_date: DateTime<Utc>,
        hospital: Hospital,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status_update_history: vec![StatusUpdate {
                status: RequestStatus::Pending,
                updated_at: now,
                updated_by: Some(requested_by.clone()),
            }],
            requested_by,
            blood_type,
            location,
            urgency_level,
            urgency_description: None,
            status: RequestStatus::Pending,
            blood_units,
            fulfilled_units: 0.0,
            assigned_donors: Vec::new(),
            expiration_date,
            additional_notes: None,
            contact_info: None,
            tags: Vec::new(),
            hospital,
            created_at: now,
            updated_at: now,
        }
    }

    /// Past its expiration instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date <= now
    }

    /// Set the status, logging the change. No-op when unchanged.
    pub fn record_status(&mut self, status: RequestStatus, updated_by: Option<String>) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.status_update_history.push(StatusUpdate {
            status,
            updated_at: Utc::now(),
            updated_by,
        });
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Creation payload. Loosely typed: validation happens in the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBloodRequest {
    pub requested_by: String,
    pub blood_type: String,
    pub location: LocationInput,
    pub urgency_level: String,
    #[serde(default)]
    pub urgency_description: Option<UrgencyDescription>,
    pub blood_units: f64,
    pub expiration_date: DateTime<Utc>,
    #[serde(default)]
    pub additional_notes: Option<String>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// When absent, the nearest hospital is looked up.
    #[serde(default)]
    pub hospital: Option<Hospital>,
}

/// Field patch for an existing request. Blood type is not patchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequestPatch {
    #[serde(default)]
    pub location: Option<LocationInput>,
    #[serde(default)]
    pub urgency_level: Option<String>,
    #[serde(default)]
    pub urgency_description: Option<UrgencyDescription>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub blood_units: Option<f64>,
    #[serde(default)]
    pub fulfilled_units: Option<f64>,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub additional_notes: Option<String>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub hospital: Option<Hospital>,
    /// Who is applying the patch; recorded in the status log.
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl RequestPatch {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.urgency_level.is_none()
            && self.urgency_description.is_none()
            && self.status.is_none()
            && self.blood_units.is_none()
            && self.fulfilled_units.is_none()
            && self.expiration_date.is_none()
            && self.additional_notes.is_none()
            && self.contact_info.is_none()
            && self.tags.is_none()
            && self.hospital.is_none()
    }
}

/// Result of a successful donor assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentResult {
    pub request_id: String,
    pub donor_id: String,
    pub donor_blood_type: BloodType,
    pub request_blood_type: BloodType,
    pub assigned_donors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    fn make_request() -> BloodRequest {
        BloodRequest::new(
            "user-1".into(),
            BloodType::OPositive,
            GeoLocation {
                point: GeoPoint::new(35.5, 33.9).unwrap(),
                city: Some("Beirut".into()),
            },
            UrgencyLevel::High,
            3.0,
            Utc::now() + chrono::Duration::days(2),
            Hospital::new("AUBMC", "Hamra", "01-350000"),
        )
    }

    #[test]
    fn test_new_request_is_pending_with_history() {
        let request = make_request();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.status_update_history.len(), 1);
        assert_eq!(request.fulfilled_units, 0.0);
        assert_eq!(request.id.len(), 36);
    }

    #[test]
    fn test_urgency_parse_is_exact() {
        assert_eq!(UrgencyLevel::parse("high"), Some(UrgencyLevel::High));
        assert_eq!(UrgencyLevel::parse("HIGH"), None);
        assert_eq!(UrgencyLevel::parse("urgent"), None);
    }

    #[test]
    fn test_fulfilled_is_terminal() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Matched));
        assert!(RequestStatus::Matched.can_transition_to(RequestStatus::Fulfilled));
        assert!(RequestStatus::Fulfilled.can_transition_to(RequestStatus::Fulfilled));
        assert!(!RequestStatus::Fulfilled.can_transition_to(RequestStatus::Pending));
        assert!(!RequestStatus::Fulfilled.can_transition_to(RequestStatus::Matched));
    }

    #[test]
    fn test_record_status_appends_once() {
        let mut request = make_request();
        request.record_status(RequestStatus::Matched, Some("admin".into()));
        request.record_status(RequestStatus::Matched, Some("admin".into()));
        assert_eq!(request.status_update_history.len(), 2);
        assert_eq!(request.status_update_history[1].status, RequestStatus::Matched);
    }

    #[test]
    fn test_is_expired() {
        let request = make_request();
        assert!(!request.is_expired(Utc::now()));
        assert!(request.is_expired(Utc::now() + chrono::Duration::days(3)));
    }

    #[test]
    fn test_empty_patch() {
        assert!(RequestPatch::default().is_empty());
        let patch = RequestPatch {
            updated_by: Some("x".into()),
            ..Default::default()
        };
        assert!(patch.is_empty());
        let patch = RequestPatch {
            tags: Some(vec!["rare".into()]),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
