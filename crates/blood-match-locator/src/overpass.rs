//! Overpass points-of-interest query and response handling.

use std::collections::HashMap;

use blood_match_core::models::{Hospital, ADDRESS_NOT_AVAILABLE, CONTACT_UNKNOWN};
use serde::{Deserialize, Serialize};

/// Name used when the hospital node carries no `name` tag.
pub const UNKNOWN_HOSPITAL: &str = "Unknown Hospital";

/// Minimum Jaro-Winkler similarity for a fuzzy hospital name match.
pub const NAME_MATCH_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

/// One OSM node from the response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OverpassElement {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl OverpassElement {
    fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.tag("name")
    }

    /// Street address from `addr:full`, falling back to `addr:street`.
    pub fn address(&self) -> Option<&str> {
        self.tag("addr:full").or_else(|| self.tag("addr:street"))
    }

    /// Phone from `phone`, falling back to `contact:phone`.
    pub fn contact(&self) -> Option<&str> {
        self.tag("phone").or_else(|| self.tag("contact:phone"))
    }
}

/// Overpass QL for hospital nodes within `radius_m` of a point.
pub fn hospital_query(radius_m: u32, latitude: f64, longitude: f64) -> String {
    format!(
        r#"[out:json];node["amenity"="hospital"](around:{radius_m},{latitude},{longitude});out body;"#
    )
}

pub fn parse_response(body: &str) -> serde_json::Result<OverpassResponse> {
    serde_json::from_str(body)
}

/// Build a hospital record from a node.
///
/// `reverse_geocode` is only consulted when the node has no street address
/// and has coordinates; `None` from it yields the placeholder address.
pub fn hospital_from_element<F>(element: &OverpassElement, reverse_geocode: F) -> Hospital
where
    F: FnOnce(f64, f64) -> Option<String>,
{
    let address = match element.address() {
        Some(address) => address.to_string(),
        None => {
            let reversed = match (element.lat, element.lon) {
                (Some(lat), Some(lon)) => reverse_geocode(lat, lon),
                _ => None,
            };
            reversed.unwrap_or_else(|| ADDRESS_NOT_AVAILABLE.to_string())
        }
    };

    Hospital {
        name: element.name().unwrap_or(UNKNOWN_HOSPITAL).to_string(),
        address,
        contact_number: element.contact().unwrap_or(CONTACT_UNKNOWN).to_string(),
    }
}

/// Contact number of the node whose name best matches `hospital_name`.
///
/// A node whose name contains the query wins outright; otherwise the closest
/// name above [`NAME_MATCH_THRESHOLD`] is used. Nodes without a contact tag
/// are ignored.
pub fn find_contact(elements: &[OverpassElement], hospital_name: &str) -> Option<String> {
    let query = hospital_name.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    let candidates = elements
        .iter()
        .filter_map(|e| Some((e.name()?.to_lowercase(), e.contact()?)));

    let mut best: Option<(f64, &str)> = None;
    for (name, contact) in candidates {
        if name.contains(&query) {
            return Some(contact.to_string());
        }
        let score = strsim::jaro_winkler(&name, &query);
        if score >= NAME_MATCH_THRESHOLD && best.map_or(true, |(s, _)| score > s) {
            best = Some((score, contact));
        }
    }
    best.map(|(_, contact)| contact.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": 0.6,
        "elements": [
            {
                "type": "node", "id": 1, "lat": 34.43, "lon": 35.84,
                "tags": {"amenity": "hospital", "name": "Nini Hospital", "phone": "+961 6 431400"}
            },
            {
                "type": "node", "id": 2, "lat": 34.44, "lon": 35.83,
                "tags": {"amenity": "hospital", "name": "Islamic Hospital",
                         "addr:street": "Azmi Street", "contact:phone": "+961 6 440860"}
            },
            {
                "type": "node", "id": 3, "lat": 34.45, "lon": 35.82,
                "tags": {"amenity": "hospital"}
            }
        ]
    }"#;

    fn elements() -> Vec<OverpassElement> {
        parse_response(SAMPLE).unwrap().elements
    }

    #[test]
    fn test_query_shape() {
        let query = hospital_query(5000, 34.4389, 35.8482);
        assert_eq!(
            query,
            r#"[out:json];node["amenity"="hospital"](around:5000,34.4389,35.8482);out body;"#
        );
    }

    #[test]
    fn test_parse_response() {
        let elements = elements();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].name(), Some("Nini Hospital"));
        assert_eq!(elements[1].contact(), Some("+961 6 440860"));
        assert_eq!(elements[1].address(), Some("Azmi Street"));
    }

    #[test]
    fn test_missing_elements_is_empty() {
        assert!(parse_response("{}").unwrap().elements.is_empty());
        assert!(parse_response("<html>").is_err());
    }

    #[test]
    fn test_hospital_uses_reverse_geocode_without_address() {
        let elements = elements();
        let hospital = hospital_from_element(&elements[0], |lat, lon| {
            assert_eq!((lat, lon), (34.43, 35.84));
            Some("Tripoli, Lebanon".into())
        });
        assert_eq!(hospital, Hospital::new("Nini Hospital", "Tripoli, Lebanon", "+961 6 431400"));
    }

    #[test]
    fn test_hospital_skips_reverse_geocode_with_address() {
        let elements = elements();
        let hospital = hospital_from_element(&elements[1], |_, _| panic!("not needed"));
        assert_eq!(hospital.address, "Azmi Street");
    }

    #[test]
    fn test_hospital_placeholders() {
        let elements = elements();
        let hospital = hospital_from_element(&elements[2], |_, _| None);
        assert_eq!(hospital.name, UNKNOWN_HOSPITAL);
        assert_eq!(hospital.address, ADDRESS_NOT_AVAILABLE);
        assert_eq!(hospital.contact_number, CONTACT_UNKNOWN);
    }

    #[test]
    fn test_find_contact() {
        let elements = elements();
        assert_eq!(find_contact(&elements, "Nini").as_deref(), Some("+961 6 431400"));
        assert_eq!(
            find_contact(&elements, "islamic hospitl").as_deref(),
            Some("+961 6 440860")
        );
        assert_eq!(find_contact(&elements, "Mayo Clinic"), None);
        assert_eq!(find_contact(&elements, "  "), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn query_embeds_point_and_radius(
            lat in -90.0f64..=90.0,
            lng in -180.0f64..=180.0,
            radius in 1u32..50_000,
        ) {
            let query = hospital_query(radius, lat, lng);
            let expected = format!("(around:{},{},{})", radius, lat, lng);
            prop_assert!(query.contains(&expected));
            prop_assert!(query.starts_with("[out:json];"));
        }

        #[test]
        fn contact_match_never_panics(name in "\\PC{0,40}") {
            let element = OverpassElement {
                tags: [("name".to_string(), "General Hospital".to_string()),
                       ("phone".to_string(), "1".to_string())]
                    .into_iter()
                    .collect(),
                ..Default::default()
            };
            let _ = find_contact(&[element], &name);
        }
    }
}
