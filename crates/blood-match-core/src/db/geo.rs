//! Radius → bounding box math for the spatial index prefilter.

use crate::models::{GeoPoint, EARTH_RADIUS_M};

/// Convert a caller-facing radius in kilometers to store units (meters).
pub fn km_to_meters(radius_km: f64) -> f64 {
    radius_km * 1000.0
}

/// Axis-aligned box in degrees that fully contains a spherical cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lng: f64,
    pub max_lng: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Smallest lat/lng box containing every point within `radius_m` of `center`.
    ///
    /// Caps touching a pole or crossing the antimeridian widen to the full
    /// longitude range; the exact distance check discards the extra rows.
    pub fn around(center: &GeoPoint, radius_m: f64) -> Self {
        let angular = radius_m.max(0.0) / EARTH_RADIUS_M;
        let dlat = angular.to_degrees();
        let min_lat = center.latitude - dlat;
        let max_lat = center.latitude + dlat;

        if min_lat <= -90.0 || max_lat >= 90.0 {
            return Self {
                min_lng: -180.0,
                max_lng: 180.0,
                min_lat: min_lat.max(-90.0),
                max_lat: max_lat.min(90.0),
            };
        }

        let ratio = angular.sin() / center.latitude.to_radians().cos();
        if ratio >= 1.0 {
            return Self::full_longitude(min_lat, max_lat);
        }

        let dlng = ratio.asin().to_degrees();
        let min_lng = center.longitude - dlng;
        let max_lng = center.longitude + dlng;
        if min_lng < -180.0 || max_lng > 180.0 {
            return Self::full_longitude(min_lat, max_lat);
        }

        Self {
            min_lng,
            max_lng,
            min_lat,
            max_lat,
        }
    }

    fn full_longitude(min_lat: f64, max_lat: f64) -> Self {
        Self {
            min_lng: -180.0,
            max_lng: 180.0,
            min_lat,
            max_lat,
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lng..=self.max_lng).contains(&point.longitude)
            && (self.min_lat..=self.max_lat).contains(&point.latitude)
    }
}
