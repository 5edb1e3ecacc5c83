//! Location lookup for media files.
//!
//! Each camera family gets its own [`LocationService`] implementation, chosen when the
//! orchestrator is set up. Callers only see coordinates or an [`ExtractError`].

pub mod geocode;
pub mod services;

use crate::error::ExtractError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use services::{DjiLocation, GoProLocation, PhoneLocation};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Great-circle distance between two coordinates.
pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Best-effort position of a media file.
#[async_trait]
pub trait LocationService: Send + Sync {
    async fn location(&self, path: &Path) -> Result<Coordinates, ExtractError>;
}
