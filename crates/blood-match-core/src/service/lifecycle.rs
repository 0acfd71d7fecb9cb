//! Write-side operations: create, update, delete, assign.

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};

use super::validation::{apply_patch, check_hospital, check_units, parse_blood_type, parse_urgency};
use super::BloodRequestService;
use crate::db::RequestFilter;
use crate::models::{
    compatible_recipients, is_compatible, AssignmentResult, BloodRequest, BloodType, GeoPoint, Hospital,
    NewBloodRequest, RequestPatch, RequestStatus, CONTACT_UNKNOWN, ROLE_USER,
};
use crate::notify::{NearbyAlert, RequestEvent};
use crate::{BloodMatchError, BloodMatchResult};

impl BloodRequestService {
    /// Validate, attach a hospital, persist, then alert nearby requesters.
    #[instrument(
        skip(self, payload),
        fields(requested_by = %payload.requested_by, blood_type = %payload.blood_type)
    )]
    pub fn create_request(&self, payload: NewBloodRequest) -> BloodMatchResult<BloodRequest> {
        let urgency_level = parse_urgency(&payload.urgency_level)?;
        let location = payload.location.validate()?;
        let blood_type = parse_blood_type(&payload.blood_type)?;
        check_units(payload.blood_units, 0.0)?;

        {
            let db = self.db()?;
            let user = db
                .get_user(&payload.requested_by)?
                .ok_or_else(|| BloodMatchError::NotFound(format!("user {}", payload.requested_by)))?;
            if !user.has_role(ROLE_USER) {
                return Err(BloodMatchError::Unauthorized(
                    "Unauthorized to create requests.".to_string(),
                ));
            }
        }

        let hospital = self.resolve_hospital(payload.hospital, &location.point)?;

        let mut request = BloodRequest::new(
            payload.requested_by,
            blood_type,
            location,
            urgency_level,
            payload.blood_units,
            payload.expiration_date,
            hospital,
        );
        request.urgency_description = payload.urgency_description;
        request.additional_notes = payload.additional_notes;
        request.contact_info = payload.contact_info;
        request.tags = payload.tags;

        let nearby = {
            let db = self.db()?;
            db.insert_request(&request)?;
            let filter = RequestFilter {
                blood_type: Some(request.blood_type),
                status: Some(RequestStatus::Pending),
                ..Default::default()
            };
            db.find_within(&request.location.point, self.config.fanout_radius_m(), &filter)?
        };
        info!(request_id = %request.id, "blood request created");

        let notified = self.alert_nearby(&request, nearby);
        debug!(request_id = %request.id, notified, "nearby requesters alerted");

        self.notifier
            .broadcast(RequestEvent::NewBloodRequest(request.clone()));
        Ok(request)
    }

    /// Apply a field patch. Status changes are appended to the history.
    #[instrument(skip(self, patch), fields(request_id = %id))]
    pub fn update_request(&self, id: &str, patch: RequestPatch) -> BloodMatchResult<BloodRequest> {
        let updated = {
            let db = self.db()?;
            let current = db
                .get_request(id)?
                .ok_or_else(|| not_found_request(id))?;
            let updated = apply_patch(&current, &patch)?;
            if !db.update_request(&updated)? {
                return Err(not_found_request(id));
            }
            updated
        };
        info!(status = updated.status.as_str(), "blood request updated");

        self.notifier
            .broadcast(RequestEvent::BloodRequestUpdated(updated.clone()));
        Ok(updated)
    }

    #[instrument(skip(self), fields(request_id = %id))]
    pub fn delete_request(&self, id: &str) -> BloodMatchResult<()> {
        if !self.db()?.delete_request(id)? {
            return Err(not_found_request(id));
        }
        info!("blood request deleted");

        self.notifier.broadcast(RequestEvent::BloodRequestDeleted { id: id.to_string() });
        Ok(())
    }

    /// Add a compatible donor to a request's assignment set.
    ///
    /// The set insert is a single store statement, so concurrent or retried
    /// assignments of the same donor never produce a second entry.
    #[instrument(skip(self), fields(request_id = %request_id, donor_id = %donor_id))]
    pub fn assign_donor(&self, request_id: &str, donor_id: &str) -> BloodMatchResult<AssignmentResult> {
        let (request, donor_blood_type) = {
            let db = self.db()?;
            let request = db
                .get_request(request_id)?
                .ok_or_else(|| not_found_request(request_id))?;
            let donor = db
                .get_user(donor_id)?
                .ok_or_else(|| BloodMatchError::NotFound(format!("donor {donor_id}")))?;

            let recipient = request.blood_type.as_str();
            let donor_type = donor.blood_type.as_deref().and_then(BloodType::parse);
            let donor_blood_type = match donor_type {
                Some(parsed) if is_compatible(Some(parsed.as_str()), Some(recipient)) => {
                    parsed
                }
                _ => {
                    let donor_label = donor.blood_type.unwrap_or_default();
                    warn!(donor_type = %donor_label, recipient, "incompatible donor rejected");
                    return Err(BloodMatchError::Incompatible {
                        compatible: compatible_recipients(&donor_label),
                        donor: donor_label,
                        recipient: recipient.to_string(),
                    });
                }
            };

            if !db.add_donor_if_absent(request_id, donor_id)? {
                return Err(BloodMatchError::DuplicateAssignment {
                    request_id: request_id.to_string(),
                    donor_id: donor_id.to_string(),
                });
            }
            let request = db
                .get_request(request_id)?
                .ok_or_else(|| not_found_request(request_id))?;
            (request, donor_blood_type)
        };
        info!(assigned = request.assigned_donors.len(), "donor assigned");

        let result = AssignmentResult {
            request_id: request.id.clone(),
            donor_id: donor_id.to_string(),
            donor_blood_type,
            request_blood_type: request.blood_type,
            assigned_donors: request.assigned_donors.clone(),
        };
        self.notifier
            .broadcast(RequestEvent::BloodRequestUpdated(request));
        Ok(result)
    }

    /// Use the supplied hospital (backfilling its contact) or look one up.
    fn resolve_hospital(&self, supplied: Option<Hospital>, point: &GeoPoint) -> BloodMatchResult<Hospital> {
        match supplied {
            Some(mut hospital) => {
                check_hospital(&hospital)?;
                if hospital.lacks_contact() {
                    hospital.contact_number = self
                        .locator
                        .contact_for(point.latitude, point.longitude, &hospital.name)
                        .unwrap_or_else(|| CONTACT_UNKNOWN.to_string());
                }
                Ok(hospital)
            }
            None => match self.locator.locate(point.latitude, point.longitude) {
                Some(hospital) => {
                    debug!(hospital = %hospital.name, "hospital assigned from locator");
                    Ok(hospital)
                }
                None => {
                    warn!(
                        latitude = point.latitude,
                        longitude = point.longitude,
                        "no nearby hospital found"
                    );
                    Err(BloodMatchError::NoNearbyHospital)
                }
            },
        }
    }

    /// One alert per distinct requester of the nearby requests, skipping the
    /// new request itself. Returns how many were sent.
    fn alert_nearby(&self, created: &BloodRequest, nearby: Vec<BloodRequest>) -> usize {
        let mut notified = HashSet::new();
        for other in nearby {
            if other.id == created.id {
                continue;
            }
            if !notified.insert(other.requested_by.clone()) {
                continue;
            }
            let recipient = other.requested_by.clone();
            let alert = NearbyAlert::new(created.clone(), other);
            self.notifier
                .notify_user(&recipient, RequestEvent::NearbyBloodRequest(alert));
        }
        notified.len()
    }
}

fn not_found_request(id: &str) -> BloodMatchError {
    BloodMatchError::NotFound(format!("blood request {id}"))
}
