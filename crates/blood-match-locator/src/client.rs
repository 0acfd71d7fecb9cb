//! Blocking OpenStreetMap client implementing [`HospitalLocator`].

use std::time::Duration;

use anyhow::Context;
use blood_match_core::config::LocatorConfig;
use blood_match_core::locator::HospitalLocator;
use blood_match_core::models::Hospital;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::nominatim;
use crate::overpass::{self, OverpassElement};

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Hospital lookup through Overpass, with Nominatim address enrichment.
///
/// Uses a blocking HTTP client: call from a plain thread (or
/// `spawn_blocking`), never directly on an async executor.
pub struct OsmHospitalLocator {
    client: reqwest::blocking::Client,
    config: LocatorConfig,
}

impl OsmHospitalLocator {
    pub fn new(config: LocatorConfig) -> Result<Self, LocatorError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Hospital nodes around a point, in response order.
    fn fetch_hospitals(&self, latitude: f64, longitude: f64) -> anyhow::Result<Vec<OverpassElement>> {
        let query = overpass::hospital_query(self.config.search_radius_m, latitude, longitude);
        let body = self
            .client
            .get(&self.config.overpass_url)
            .query(&[("data", query)])
            .send()
            .context("Overpass request failed")?
            .error_for_status()
            .context("Overpass returned an error status")?
            .text()
            .context("failed to read Overpass response")?;
        let response = overpass::parse_response(&body).context("malformed Overpass response")?;
        Ok(response.elements)
    }

    fn reverse_geocode(&self, latitude: f64, longitude: f64) -> anyhow::Result<Option<String>> {
        let body = self
            .client
            .get(&self.config.nominatim_url)
            .query(&nominatim::reverse_params(latitude, longitude))
            .send()
            .context("Nominatim request failed")?
            .error_for_status()
            .context("Nominatim returned an error status")?
            .text()
            .context("failed to read Nominatim response")?;
        nominatim::display_name(&body).context("malformed Nominatim response")
    }
}

impl HospitalLocator for OsmHospitalLocator {
    #[instrument(skip(self))]
    fn locate(&self, latitude: f64, longitude: f64) -> Option<Hospital> {
        let elements = match self.fetch_hospitals(latitude, longitude) {
            Ok(elements) => elements,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "hospital lookup failed");
                return None;
            }
        };
        let Some(first) = elements.first() else {
            warn!("no hospitals found near point");
            return None;
        };

        let hospital = overpass::hospital_from_element(first, |lat, lon| {
            match self.reverse_geocode(lat, lon) {
                Ok(address) => address,
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "reverse geocoding failed");
                    None
                }
            }
        });
        debug!(hospital = %hospital.name, "nearest hospital resolved");
        Some(hospital)
    }

    #[instrument(skip(self))]
    fn contact_for(&self, latitude: f64, longitude: f64, hospital_name: &str) -> Option<String> {
        match self.fetch_hospitals(latitude, longitude) {
            Ok(elements) => overpass::find_contact(&elements, hospital_name),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "hospital contact lookup failed");
                None
            }
        }
    }
}
