//! JSON payloads of the camera's control API.
//!
//! Firmware is inconsistent about number encoding: the same field arrives as `"1234"` on one
//! model and `1234` on the next, so numeric fields go through [`lenient`].

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient<T> {
        Number(T),
        Text(String),
    }

    match Lenient::<T>::deserialize(deserializer)? {
        Lenient::Number(n) => Ok(n),
        Lenient::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceInfo {
    pub info: CameraInfo,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraInfo {
    pub model_name: String,
    pub firmware_version: String,
    #[serde(default)]
    pub serial_number: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MediaList {
    #[serde(default)]
    pub media: Vec<MediaFolder>,
}

/// One `DCIM` sub-folder, e.g. `100GOPRO`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaFolder {
    #[serde(rename = "d")]
    pub directory: String,
    #[serde(rename = "fs", default)]
    pub files: Vec<MediaEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MediaEntry {
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "s", default, deserialize_with = "lenient")]
    pub size: u64,
    /// Camera wall clock, encoded as if it were a UTC epoch.
    #[serde(rename = "mod", default, deserialize_with = "lenient")]
    pub modified: i64,
    /// Size of the low resolution proxy; 0 when the video has none.
    #[serde(default, deserialize_with = "lenient")]
    pub glrv: u64,
    /// `1` when a `.GPR` raw companion exists.
    #[serde(default, deserialize_with = "lenient")]
    pub raw: u32,
    /// First and last frame index of a burst or time-lapse group.
    #[serde(rename = "b", default, deserialize_with = "lenient_opt")]
    pub first: Option<u32>,
    #[serde(rename = "l", default, deserialize_with = "lenient_opt")]
    pub last: Option<u32>,
}

impl MediaEntry {
    pub fn has_raw(&self) -> bool {
        self.raw == 1
    }

    /// Frame indices of a multishot group, if the entry is one.
    pub fn frames(&self) -> Option<std::ops::RangeInclusive<u32>> {
        match (self.first, self.last) {
            (Some(first), Some(last)) if first <= last => Some(first..=last),
            _ => None,
        }
    }
}

fn lenient_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: Display,
{
    lenient(deserializer).map(Some)
}

/// Answer of the `v4info` metadata request for a video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct VideoMetadata {
    #[serde(rename = "dur", default, deserialize_with = "lenient")]
    pub duration_secs: u64,
    #[serde(rename = "w", default, deserialize_with = "lenient")]
    pub width: u64,
    #[serde(rename = "h", default, deserialize_with = "lenient")]
    pub height: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub fps: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub fps_denom: u64,
    /// Highlight timestamps in milliseconds.
    #[serde(rename = "hi", default)]
    pub highlights: Vec<u32>,
}
