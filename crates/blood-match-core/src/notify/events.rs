//! Events pushed to connected clients.

use serde::{Deserialize, Serialize};

use crate::models::BloodRequest;

/// Message attached to nearby-request alerts.
pub const NEARBY_REQUEST_MESSAGE: &str = "A new blood request has been posted near your request!";

/// An event and its payload. Serializes as `{"event": ..., "payload": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "payload")]
pub enum RequestEvent {
    #[serde(rename = "newBloodRequest")]
    NewBloodRequest(BloodRequest),

    #[serde(rename = "bloodRequestUpdated")]
    BloodRequestUpdated(BloodRequest),

    #[serde(rename = "bloodRequestDeleted")]
    BloodRequestDeleted { id: String },

    #[serde(rename = "nearbyBloodRequest")]
    NearbyBloodRequest(NearbyAlert),
}

impl RequestEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            RequestEvent::NewBloodRequest(_) => "newBloodRequest",
            RequestEvent::BloodRequestUpdated(_) => "bloodRequestUpdated",
            RequestEvent::BloodRequestDeleted { .. } => "bloodRequestDeleted",
            RequestEvent::NearbyBloodRequest(_) => "nearbyBloodRequest",
        }
    }
}

/// Sent to owners of pending same-type requests near a newly created one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NearbyAlert {
    pub message: String,
    pub new_request: BloodRequest,
    pub nearby_request: BloodRequest,
}

impl NearbyAlert {
    pub fn new(new_request: BloodRequest, nearby_request: BloodRequest) -> Self {
        Self {
            message: NEARBY_REQUEST_MESSAGE.to_string(),
            new_request,
            nearby_request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = RequestEvent::BloodRequestDeleted { id: "r1".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(json["payload"]["id"], "r1");
    }
}
