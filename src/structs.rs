use crate::error::ItemError;
use crate::time::DateRange;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How the camera is attached to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connection {
    /// A mounted SD card or mass-storage device.
    #[default]
    SdCard,
    /// The camera's HTTP control API, reachable over Wi-Fi or USB ethernet.
    Network,
    /// A Media Transfer Protocol device exposed as a mount point.
    Mtp,
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SdCard => "sd_card",
            Self::Network => "connect",
            Self::Mtp => "mtp",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFamily {
    GoPro,
    Dji,
    Insta360,
    Phone,
}

impl fmt::Display for CameraFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GoPro => "gopro",
            Self::Dji => "dji",
            Self::Insta360 => "insta360",
            Self::Phone => "phone",
        };
        f.write_str(name)
    }
}

/// Optional placement segments the caller asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SortOptions {
    pub by_camera: bool,
    pub by_location: bool,
}

/// A fully resolved import request.
///
/// ```rust
/// # use media_importer::structs::{Connection, ImportParams, SortOptions};
/// let params = ImportParams::builder()
///     .input("/media/sdcard")
///     .output("/home/me/Footage")
///     .sort(SortOptions { by_camera: true, by_location: false })
///     .connection(Connection::SdCard)
///     .build();
/// assert_eq!(params.buffer_size, 1000);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ImportParams {
    /// Mount point, MTP device name or camera IP address, depending on `connection`.
    #[builder(into)]
    pub input: String,
    #[builder(into)]
    pub output: PathBuf,
    /// Replaces the device name reported by the camera.
    #[builder(into)]
    pub camera_name: Option<String>,
    /// Prepended to the device name, separated by a space.
    #[builder(into)]
    pub prefix: Option<String>,
    /// Date folder format using `dd`, `mm` and `yyyy` tokens.
    #[builder(into)]
    pub date_format: Option<String>,
    /// Size in bytes of the copy buffer.
    #[builder(default = 1000)]
    pub buffer_size: usize,
    pub date_range: Option<DateRange>,
    /// Skip proxies, thumbnails and subtitle tracks.
    #[builder(default)]
    pub skip_aux: bool,
    #[builder(default)]
    pub sort: SortOptions,
    /// Importance labels for highlight-based naming, least to most significant.
    #[builder(default)]
    pub tag_names: Vec<String>,
    #[builder(default)]
    pub connection: Connection,
    /// Camera family. Detected from the card layout when absent.
    pub camera: Option<CameraFamily>,
}

impl ImportParams {
    /// Applies the override and prefix to a device name reported by the camera.
    pub fn device_name(&self, reported: &str) -> String {
        let name = self.camera_name.as_deref().unwrap_or(reported);
        match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{prefix} {name}"),
            _ => name.to_string(),
        }
    }
}

/// Outcome of one import run.
#[derive(Debug, Default)]
pub struct ImportResult {
    pub files_imported: usize,
    pub files_not_imported: Vec<String>,
    pub errors: Vec<ItemError>,
}

impl ImportResult {
    /// Number of items that were attempted during the run.
    pub fn attempted(&self) -> usize {
        self.files_imported + self.files_not_imported.len()
    }
}
