//! Nominatim reverse geocoding response handling.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReverseResponse {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Query parameters for a reverse lookup of one point.
pub fn reverse_params(latitude: f64, longitude: f64) -> [(&'static str, String); 3] {
    [
        ("format", "json".to_string()),
        ("lat", latitude.to_string()),
        ("lon", longitude.to_string()),
    ]
}

/// Human-readable address from a reverse response, if it has one.
pub fn display_name(body: &str) -> serde_json::Result<Option<String>> {
    let response: ReverseResponse = serde_json::from_str(body)?;
    Ok(response
        .display_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let body = r#"{"place_id": 1, "display_name": "Nini Hospital, Tripoli, Lebanon"}"#;
        assert_eq!(
            display_name(body).unwrap().as_deref(),
            Some("Nini Hospital, Tripoli, Lebanon")
        );
    }

    #[test]
    fn test_missing_or_blank_display_name() {
        assert_eq!(display_name(r#"{"error": "Unable to geocode"}"#).unwrap(), None);
        assert_eq!(display_name(r#"{"display_name": "  "}"#).unwrap(), None);
        assert!(display_name("not json").is_err());
    }

    #[test]
    fn test_reverse_params() {
        let params = reverse_params(34.5, 35.25);
        assert_eq!(params[1], ("lat", "34.5".to_string()));
        assert_eq!(params[2], ("lon", "35.25".to_string()));
    }
}
