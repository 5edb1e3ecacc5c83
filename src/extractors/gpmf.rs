//! GPS selection on top of GoPro's GPMF telemetry track.
//!
//! The raw `gpmd` stream is decoded by [`gpmf_rs`]; this module only turns its GPS points into
//! [`TelemetrySample`]s and applies the configured quality policy.

use crate::config::{FixSelection, GpsConfig};
use crate::error::ExtractError;
use crate::location::{Coordinates, haversine_km};
use gpmf_rs::{GoProPoint, Gpmf};
use std::collections::HashMap;
use std::io::Cursor;

/// One GPS sample with the stream state that was current when it was recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// GPS fix type (0 = none, 2 = 2D, 3 = 3D); `None` if the stream did not report one.
    pub fix: Option<u32>,
    /// Dilution of precision x100; `None` if the stream did not report one.
    pub precision: Option<u16>,
}

impl TelemetrySample {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl From<&GoProPoint> for TelemetrySample {
    fn from(point: &GoProPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            altitude: point.altitude,
            fix: Some(point.fix),
            // GPSP is stored x100 on the camera; the decoder hands it back unscaled.
            precision: Some((point.dop * 100.0).round().clamp(0.0, f64::from(u16::MAX)) as u16),
        }
    }
}

/// Decodes every GPS sample in a raw GPMF buffer as dumped from the `gpmd` stream.
pub fn decode(data: Vec<u8>) -> Result<Vec<TelemetrySample>, ExtractError> {
    let mut cursor = Cursor::new(data);
    let gpmf = Gpmf::from_cursor(&mut cursor, false)
        .map_err(|err| ExtractError::MalformedTelemetry(err.to_string()))?;
    Ok(gpmf.gps().0.iter().map(TelemetrySample::from).collect())
}

/// Whether a sample passes the configured quality thresholds.
pub fn is_candidate(sample: &TelemetrySample, config: &GpsConfig) -> bool {
    if sample.latitude == 0.0 && sample.longitude == 0.0 {
        return false;
    }
    if sample.precision.is_some_and(|p| p > config.max_accuracy) {
        return false;
    }
    if sample.fix.is_some_and(|f| !config.accepted_fix.contains(&f)) {
        return false;
    }
    config
        .max_altitude
        .is_none_or(|ceiling| sample.altitude < ceiling)
}

/// Picks the representative fix of a track according to the configured policy.
pub fn select_fix(samples: &[TelemetrySample], config: &GpsConfig) -> Result<Coordinates, ExtractError> {
    let candidates: Vec<&TelemetrySample> =
        samples.iter().filter(|s| is_candidate(s, config)).collect();
    let first = candidates.first().ok_or(ExtractError::NoGpsData)?;

    match config.selection {
        FixSelection::FirstValid => Ok(first.coordinates()),
        FixSelection::MostFrequent => Ok(most_frequent(&candidates, first.coordinates())),
    }
}

fn most_frequent(candidates: &[&TelemetrySample], anchor: Coordinates) -> Coordinates {
    // Counted at ~1m resolution; keeps the first sample seen for each position.
    let key = |c: &Coordinates| {
        (
            (c.latitude * 1e5).round() as i64,
            (c.longitude * 1e5).round() as i64,
        )
    };
    let mut counts: HashMap<(i64, i64), (usize, Coordinates)> = HashMap::new();
    let mut order = Vec::new();
    for sample in candidates {
        let coords = sample.coordinates();
        let entry = counts.entry(key(&coords)).or_insert_with(|| {
            order.push(key(&coords));
            (0, coords)
        });
        entry.0 += 1;
    }

    let mut best: Option<(usize, f64, Coordinates)> = None;
    for k in order {
        let Some(&(count, coords)) = counts.get(&k) else {
            continue;
        };
        let distance = haversine_km(&anchor, &coords);
        let better = match best {
            None => true,
            Some((best_count, best_distance, _)) => {
                count > best_count || (count == best_count && distance < best_distance)
            }
        };
        if better {
            best = Some((count, distance, coords));
        }
    }
    best.map_or(anchor, |(_, _, coords)| coords)
}
