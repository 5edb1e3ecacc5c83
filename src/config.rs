//! Engine-wide settings that are not part of a single import request.
//!
//! Everything here has a sensible default, so an empty TOML document (or no file at all)
//! yields a working configuration.

use crate::error::ImportError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One segment of the destination directory built by the placement engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementComponent {
    Date,
    Location,
    Camera,
}

/// How a reverse-geocoded place is turned into a folder name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationFormat {
    /// `"<city> <state> <country>"` for short city names, `"<city> <country>"` otherwise.
    #[default]
    CityStateCountry,
    /// Only the country name.
    Country,
}

/// Policy for picking one representative GPS fix out of a telemetry track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixSelection {
    /// The first sample that passes every threshold.
    #[default]
    FirstValid,
    /// The coordinate that recurs most often among passing samples. Ties go to the
    /// coordinate closest to the first passing sample.
    MostFrequent,
}

/// Where the capture time of a filesystem item comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// The file modification time.
    #[default]
    Modified,
    /// `DateTimeOriginal` / `CreateDate` read with exiftool, falling back to the
    /// modification time.
    Embedded,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Order in which placement segments are joined under the output root.
    pub order: Vec<PlacementComponent>,
    /// Folder name format for a resolved place.
    pub format: LocationFormat,
    /// Folder name used when no location could be resolved.
    pub fallback: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            order: vec![
                PlacementComponent::Date,
                PlacementComponent::Location,
                PlacementComponent::Camera,
            ],
            format: LocationFormat::default(),
            fallback: "NoLocation".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GpsConfig {
    /// Fix types accepted as a usable position (2 = 2D lock, 3 = 3D lock).
    pub accepted_fix: Vec<u32>,
    /// Highest dilution of precision (x100) still accepted. 9999 means "no fix".
    pub max_accuracy: u16,
    /// Samples above this altitude in meters are discarded. `None` disables the check.
    pub max_altitude: Option<f64>,
    /// How the representative fix is chosen among passing samples.
    pub selection: FixSelection,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            accepted_fix: vec![2, 3],
            max_accuracy: 500,
            max_altitude: None,
            selection: FixSelection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-request timeout in seconds for calls to the camera's control API.
    pub timeout_secs: u64,
    /// Retries after the first attempt for connection errors and 5xx replies.
    pub retry_max: u32,
    /// Base wait between attempts; grows linearly with the attempt number.
    pub retry_wait_min_ms: u64,
    /// Upper bound for a single wait, before jitter.
    pub retry_wait_max_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 4,
            retry_max: 3,
            retry_wait_min_ms: 1_000,
            retry_wait_max_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Number of media items transferred at the same time.
    pub workers: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self { workers: 8 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Top-level engine settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub location: LocationConfig,
    pub gps: GpsConfig,
    pub network: NetworkConfig,
    pub transfer: TransferConfig,
    pub tools: ToolsConfig,
    pub date_source: DateSource,
    /// Time zone the camera clock is set to. Used to turn the wall-clock timestamps
    /// reported over the network into real instants. `None` uses the host zone.
    pub camera_timezone: Option<Tz>,
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ImportError> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads a TOML config file. A missing file is an error; use `EngineConfig::default()`
    /// when no file is configured.
    pub fn load(path: &Path) -> Result<Self, ImportError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
