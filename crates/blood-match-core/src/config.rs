//! Runtime configuration.
//!
//! Layering, lowest to highest precedence: built-in defaults, an optional
//! YAML file, then `BLOOD_MATCH_*` environment variables (nested keys are
//! separated by `__`, e.g. `BLOOD_MATCH_LOCATOR__TIMEOUT_SECS=3`).

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BLOOD_MATCH_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the matching core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// Radius of the nearby-request fan-out on creation, in km.
    pub fanout_radius_km: f64,
    /// Requests updated within this many hours get the ranking bonus.
    pub recent_update_window_hours: i64,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
    pub locator: LocatorConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fanout_radius_km: 10.0,
            recent_update_window_hours: 6,
            default_page_limit: 10,
            max_page_limit: 100,
            locator: LocatorConfig::default(),
        }
    }
}

/// Settings for the external hospital lookup services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocatorConfig {
    /// Points-of-interest search radius, in meters.
    pub search_radius_m: u32,
    /// Per-request timeout for outbound calls.
    pub timeout_secs: u64,
    /// Identifying client label sent on every outbound call.
    pub user_agent: String,
    pub overpass_url: String,
    pub nominatim_url: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            search_radius_m: 5000,
            timeout_secs: 10,
            user_agent: "BloodDonationApp/1.0".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            nominatim_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
        }
    }
}

impl MatchConfig {
    /// Load defaults, then `path` (if given), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(MatchConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: MatchConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make queries or pagination meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fanout_radius_km.is_finite() && self.fanout_radius_km > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "fanout_radius_km must be positive, got {}",
                self.fanout_radius_km
            )));
        }
        if self.recent_update_window_hours < 0 {
            return Err(ConfigError::Invalid(
                "recent_update_window_hours must not be negative".into(),
            ));
        }
        if self.default_page_limit == 0 || self.max_page_limit < self.default_page_limit {
            return Err(ConfigError::Invalid(format!(
                "page limits must satisfy 0 < default ({}) <= max ({})",
                self.default_page_limit, self.max_page_limit
            )));
        }
        if self.locator.search_radius_m == 0 || self.locator.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "locator radius and timeout must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Fan-out radius converted to meters.
    pub fn fanout_radius_m(&self) -> f64 {
        crate::db::km_to_meters(self.fanout_radius_km)
    }

    pub fn recent_update_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.recent_update_window_hours)
    }
}
