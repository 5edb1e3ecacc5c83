//! Offline reverse geocoding into folder-safe place labels.

use crate::config::{LocationConfig, LocationFormat};
use crate::location::Coordinates;
use reverse_geocoder::ReverseGeocoder;
use std::sync::OnceLock;

/// The parts of a reverse-geocoded address that labels are built from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Place {
    pub city: String,
    pub state: String,
    pub country: String,
}

/// Wraps the bundled GeoNames index. Building it is expensive, so it is only built on the first
/// lookup and one instance is shared per importer.
pub struct Geocoder {
    geocoder: OnceLock<ReverseGeocoder>,
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Geocoder {
    pub fn new() -> Self {
        Self {
            geocoder: OnceLock::new(),
        }
    }

    /// Nearest known place. The country is the ISO 3166 short name, or the bare code if unknown.
    pub fn place(&self, coordinates: &Coordinates) -> Place {
        let search_result = self
            .geocoder
            .get_or_init(ReverseGeocoder::new)
            .search((coordinates.latitude, coordinates.longitude));
        let record = search_result.record;
        let country = rust_iso3166::from_alpha2(&record.cc)
            .map_or_else(|| record.cc.clone(), |c| c.name.to_string());
        Place {
            city: record.name.clone(),
            state: record.admin1.clone(),
            country,
        }
    }

    /// The folder label for a coordinate, or the configured fallback when nothing usable comes out.
    pub fn label(&self, coordinates: &Coordinates, config: &LocationConfig) -> String {
        label_or_fallback(&format_label(&self.place(coordinates), config.format), config)
    }
}

/// Formats a place. The state is only included for short city names.
pub fn format_label(place: &Place, format: LocationFormat) -> String {
    let raw = match format {
        LocationFormat::CityStateCountry if place.city.len() < 9 && !place.state.is_empty() => {
            format!("{} {} {}", place.city, place.state, place.country)
        }
        LocationFormat::CityStateCountry => format!("{} {}", place.city, place.country),
        LocationFormat::Country => place.country.clone(),
    };
    clean_label(&raw)
}

/// Trims and replaces characters that would create extra path segments.
pub fn clean_label(raw: &str) -> String {
    raw.trim().replace(['/', ':', '\\', '.'], "_")
}

pub fn label_or_fallback(label: &str, config: &LocationConfig) -> String {
    if label.trim().is_empty() {
        config.fallback.clone()
    } else {
        label.to_string()
    }
}
