//! Geographic points and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean earth radius used for all spherical distance math, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// A WGS84 point. Longitude first, matching GeoJSON coordinate order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// Why a coordinate pair was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("coordinates must be [longitude, latitude], got {0} values")]
    WrongArity(usize),

    #[error("coordinates must be finite numbers")]
    NotFinite,

    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),
}

impl GeoPoint {
    /// Build a point, checking WGS84 bounds.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, CoordinateError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Build a point from a `[lng, lat]` array.
    pub fn from_coordinates(coordinates: &[f64]) -> Result<Self, CoordinateError> {
        match coordinates {
            [lng, lat] => Self::new(*lng, *lat),
            other => Err(CoordinateError::WrongArity(other.len())),
        }
    }

    /// `[lng, lat]` pair.
    pub fn coordinates(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Haversine distance to `other`, in meters.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlng = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();
        EARTH_RADIUS_M * c
    }
}

/// Where a request is located. `city` is free text used by listing filters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoLocation {
    pub point: GeoPoint,
    pub city: Option<String>,
}

/// Unvalidated location as supplied by callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationInput {
    /// `[longitude, latitude]`
    #[serde(default)]
    pub coordinates: Vec<f64>,
    #[serde(default)]
    pub city: Option<String>,
}

impl LocationInput {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            coordinates: vec![longitude, latitude],
            city: None,
        }
    }

    /// Validate into a [`GeoLocation`].
    pub fn validate(&self) -> Result<GeoLocation, CoordinateError> {
        Ok(GeoLocation {
            point: GeoPoint::from_coordinates(&self.coordinates)?,
            city: self.city.clone(),
        })
    }
}

impl From<&GeoLocation> for LocationInput {
    fn from(location: &GeoLocation) -> Self {
        Self {
            coordinates: location.point.coordinates().to_vec(),
            city: location.city.clone(),
        }
    }
}
