//! User read model. Users are owned by the identity service; the core only
//! reads them.

use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// Role required to post blood requests.
pub const ROLE_USER: &str = "user";

/// A registered user as seen by the matching core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Raw label as entered at registration; may be absent or unrecognized.
    pub blood_type: Option<String>,
    pub roles: Vec<String>,
    pub location: Option<GeoPoint>,
    pub created_at: String,
}

impl User {
    /// Create a user holding the plain `user` role.
    pub fn new(first_name: String, last_name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            first_name,
            last_name,
            phone: None,
            email: None,
            blood_type: None,
            roles: vec![ROLE_USER.to_string()],
            location: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Minimal profile joined into request views.
    pub fn profile(&self) -> RequesterProfile {
        RequesterProfile {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            roles: self.roles.clone(),
        }
    }
}

/// Requester fields exposed alongside a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequesterProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_has_user_role() {
        let user = User::new("Lina".into(), "Haddad".into());
        assert!(user.has_role(ROLE_USER));
        assert!(!user.has_role("admin"));
        assert_eq!(user.id.len(), 36);
    }

    #[test]
    fn test_profile_copies_identity() {
        let mut user = User::new("Lina".into(), "Haddad".into());
        user.phone = Some("555-0100".into());
        let profile = user.profile();
        assert_eq!(profile.id, user.id);
        assert_eq!(profile.phone.as_deref(), Some("555-0100"));
    }
}
