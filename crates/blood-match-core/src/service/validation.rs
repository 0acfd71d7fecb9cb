//! Payload checks shared by create, update and list.

use chrono::{DateTime, Utc};

use super::ListQuery;
use crate::db::RequestFilter;
use crate::models::{BloodRequest, BloodType, Hospital, RequestPatch, RequestStatus, UrgencyLevel};
use crate::{BloodMatchError, BloodMatchResult};

pub(crate) fn parse_urgency(raw: &str) -> BloodMatchResult<UrgencyLevel> {
    UrgencyLevel::parse(raw).ok_or_else(|| {
        BloodMatchError::Validation(
            "Invalid urgencyLevel. Must be 'high', 'medium', or 'low'.".to_string(),
        )
    })
}

pub(crate) fn parse_blood_type(raw: &str) -> BloodMatchResult<BloodType> {
    if raw.trim().is_empty() {
        return Err(BloodMatchError::Validation(
            "Invalid bloodType. Must be a non-empty string.".to_string(),
        ));
    }
    Ok(raw.parse::<BloodType>()?)
}

pub(crate) fn parse_status(raw: &str) -> BloodMatchResult<RequestStatus> {
    RequestStatus::parse(raw).ok_or_else(|| {
        BloodMatchError::Validation(
            "Invalid status. Must be 'pending', 'matched', or 'fulfilled'.".to_string(),
        )
    })
}

pub(crate) fn check_units(blood_units: f64, fulfilled_units: f64) -> BloodMatchResult<()> {
    if !(blood_units.is_finite() && blood_units > 0.0) {
        return Err(BloodMatchError::Validation(format!(
            "bloodUnits must be a positive number, got {blood_units}"
        )));
    }
    if !(fulfilled_units.is_finite() && fulfilled_units >= 0.0) {
        return Err(BloodMatchError::Validation(format!(
            "fulfilledUnits must not be negative, got {fulfilled_units}"
        )));
    }
    Ok(())
}

pub(crate) fn check_hospital(hospital: &Hospital) -> BloodMatchResult<()> {
    if hospital.name.trim().is_empty() {
        return Err(BloodMatchError::Validation(
            "Hospital name must not be empty.".to_string(),
        ));
    }
    Ok(())
}

/// Apply `patch` to a copy of `request`, re-running every field check.
///
/// The original is left untouched when any field is rejected.
pub(crate) fn apply_patch(request: &BloodRequest, patch: &RequestPatch) -> BloodMatchResult<BloodRequest> {
    if patch.is_empty() {
        return Err(BloodMatchError::Validation(
            "Update patch must change at least one field.".to_string(),
        ));
    }

    let mut next = request.clone();
    if let Some(location) = &patch.location {
        next.location = location.validate()?;
    }
    if let Some(raw) = &patch.urgency_level {
        next.urgency_level = parse_urgency(raw)?;
    }
    if let Some(description) = patch.urgency_description {
        next.urgency_description = Some(description);
    }
    if let Some(units) = patch.blood_units {
        next.blood_units = units;
    }
    if let Some(units) = patch.fulfilled_units {
        next.fulfilled_units = units;
    }
    check_units(next.blood_units, next.fulfilled_units)?;
    if let Some(expiration) = patch.expiration_date {
        next.expiration_date = expiration;
    }
    if let Some(notes) = &patch.additional_notes {
        next.additional_notes = Some(notes.clone());
    }
    if let Some(contact) = &patch.contact_info {
        next.contact_info = Some(contact.clone());
    }
    if let Some(tags) = &patch.tags {
        next.tags = tags.clone();
    }
    if let Some(hospital) = &patch.hospital {
        check_hospital(hospital)?;
        next.hospital = hospital.clone();
    }
    if let Some(raw) = &patch.status {
        let status = parse_status(raw)?;
        if !request.status.can_transition_to(status) {
            return Err(BloodMatchError::Validation(format!(
                "Cannot change status from {} to {}.",
                request.status.as_str(),
                status.as_str()
            )));
        }
        next.record_status(status, patch.updated_by.clone());
    }

    next.touch();
    Ok(next)
}

/// Store filter for a listing query.
pub(crate) fn build_filter(query: &ListQuery, now: DateTime<Utc>) -> BloodMatchResult<RequestFilter> {
    Ok(RequestFilter {
        blood_type: query.blood_type.as_deref().map(parse_blood_type).transpose()?,
        city: query.city.clone(),
        urgency_level: query.urgency_level.as_deref().map(parse_urgency).transpose()?,
        status: query.status.as_deref().map(parse_status).transpose()?,
        requested_by: None,
        active_at: query.active_only.then_some(now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoLocation, GeoPoint, LocationInput};
    use crate::ErrorKind;

    fn make_request() -> BloodRequest {
        BloodRequest::new(
            "u1".into(),
            BloodType::OPositive,
            GeoLocation {
                point: GeoPoint::new(35.5, 33.9).unwrap(),
                city: Some("Beirut".into()),
            },
            UrgencyLevel::Medium,
            2.0,
            Utc::now() + chrono::Duration::days(1),
            Hospital::new("AUBMC", "Hamra", "01-350000"),
        )
    }

    #[test]
    fn test_blood_type_validation() {
        assert_eq!(parse_blood_type(" ab+ ").unwrap(), BloodType::AbPositive);
        assert_eq!(parse_blood_type("").unwrap_err().kind(), ErrorKind::Validation);
        match parse_blood_type("C+") {
            Err(BloodMatchError::Validation(msg)) => {
                assert_eq!(msg, "unrecognized blood type: \"C+\"")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_patch_rejected() {
        let request = make_request();
        let err = apply_patch(&request, &RequestPatch::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_patch_is_all_or_nothing() {
        let request = make_request();
        let patch = RequestPatch {
            tags: Some(vec!["rare".into()]),
            location: Some(LocationInput::new(200.0, 10.0)),
            ..Default::default()
        };
        assert!(apply_patch(&request, &patch).is_err());
        assert!(request.tags.is_empty());
    }

    #[test]
    fn test_status_patch_records_history() {
        let request = make_request();
        let patch = RequestPatch {
            status: Some("matched".into()),
            updated_by: Some("admin".into()),
            ..Default::default()
        };
        let updated = apply_patch(&request, &patch).unwrap();
        assert_eq!(updated.status, RequestStatus::Matched);
        let last = updated.status_update_history.last().unwrap();
        assert_eq!(last.updated_by.as_deref(), Some("admin"));
        assert!(updated.updated_at >= request.updated_at);
    }

    #[test]
    fn test_fulfilled_is_final() {
        let mut request = make_request();
        request.record_status(RequestStatus::Fulfilled, None);
        let patch = RequestPatch {
            status: Some("pending".into()),
            ..Default::default()
        };
        assert_eq!(apply_patch(&request, &patch).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_units_checks() {
        assert!(check_units(1.0, 0.0).is_ok());
        assert!(check_units(0.0, 0.0).is_err());
        assert!(check_units(1.0, -1.0).is_err());
        assert!(check_units(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_build_filter() {
        let now = Utc::now();
        let query = ListQuery {
            blood_type: Some("o+".into()),
            urgency_level: Some("high".into()),
            active_only: true,
            ..Default::default()
        };
        let filter = build_filter(&query, now).unwrap();
        assert_eq!(filter.blood_type, Some(BloodType::OPositive));
        assert_eq!(filter.urgency_level, Some(UrgencyLevel::High));
        assert_eq!(filter.active_at, Some(now));

        let bad = ListQuery {
            urgency_level: Some("urgent".into()),
            ..Default::default()
        };
        assert!(build_filter(&bad, now).is_err());
    }
}
