//! Per-family file tables and naming rules.
//!
//! Each camera family classifies file names with an ordered regex table: the first row that
//! matches decides the [`FileKind`] and capture mode of the file.

pub mod dji;
pub mod gopro;
pub mod insta360;
pub mod phone;

use crate::error::ImportError;
use crate::structs::CameraFamily;
use crate::utils::static_regex;
use chrono::NaiveDateTime;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Classification of a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Video,
    Photo,
    RawPhoto,
    MultishotFrame,
    Subtitle,
    Audio,
    Thumbnail,
    LowResProxy,
}

impl FileKind {
    /// Proxies, thumbnails and subtitle tracks can be skipped on request.
    pub fn is_auxiliary(self) -> bool {
        matches!(self, Self::Thumbnail | Self::LowResProxy | Self::Subtitle)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Video => "video",
            Self::Photo => "photo",
            Self::RawPhoto => "raw photo",
            Self::MultishotFrame => "multishot",
            Self::Subtitle => "subtitle",
            Self::Audio => "audio",
            Self::Thumbnail => "thumbnail",
            Self::LowResProxy => "proxy",
        };
        f.write_str(name)
    }
}

/// How the item was captured, as far as placement cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaptureMode {
    /// Single lens ("hero" on GoPro, flat/steady-cam on Insta360).
    #[default]
    Standard,
    /// Multi-lens 360 capture.
    Spherical,
    /// Insta360 pro video mode.
    Pro,
}

/// One row of a family's classification table.
#[derive(Debug, Clone)]
pub struct FileTypeMatch {
    pub regex: Regex,
    pub kind: FileKind,
    pub mode: CaptureMode,
    /// Chaptered recordings get renamed so chapters sort next to each other.
    pub chaptered: bool,
}

impl FileTypeMatch {
    pub fn new(pattern: &str, kind: FileKind, mode: CaptureMode) -> Self {
        Self {
            regex: static_regex(pattern),
            kind,
            mode,
            chaptered: false,
        }
    }

    pub fn chaptered(mut self) -> Self {
        self.chaptered = true;
        self
    }
}

/// Returns the first table row matching `name`.
pub fn classify<'a>(table: &'a [FileTypeMatch], name: &str) -> Option<&'a FileTypeMatch> {
    table.iter().find(|row| row.regex.is_match(name))
}

/// Where the bytes of a media item live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// A file on a mounted filesystem.
    Local(PathBuf),
    /// A file served by the camera's HTTP API.
    Remote { folder: String, name: String },
    /// An object on an MTP device, addressed by its path on the device.
    Device(PathBuf),
}

/// A classified media item, ready for placement.
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub source: MediaSource,
    pub name: String,
    pub size: u64,
    /// Camera wall clock at capture; drives filtering and the date folder.
    pub captured: NaiveDateTime,
    /// Instant written to the destination's modification time.
    pub modified: SystemTime,
    pub kind: FileKind,
    pub mode: CaptureMode,
    pub chaptered: bool,
}

impl MediaItem {
    pub fn classified(
        source: MediaSource,
        name: impl Into<String>,
        size: u64,
        captured: NaiveDateTime,
        modified: SystemTime,
        row: &FileTypeMatch,
    ) -> Self {
        Self {
            source,
            name: name.into(),
            size,
            captured,
            modified,
            kind: row.kind,
            mode: row.mode,
            chaptered: row.chaptered,
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match &self.source {
            MediaSource::Local(path) => Some(path),
            _ => None,
        }
    }
}

/// Guesses the camera family from the layout of a mounted card.
pub fn detect_family(root: &Path) -> Result<CameraFamily, ImportError> {
    if root.join("MISC").join(gopro::VERSION_FILE).is_file() {
        return Ok(CameraFamily::GoPro);
    }

    let dcim = root.join("DCIM");
    if dcim.join(insta360::FILE_INFO_LIST).is_file() {
        return Ok(CameraFamily::Insta360);
    }
    if !dcim.is_dir() {
        return Err(ImportError::NoCameraDetected);
    }

    for entry in std::fs::read_dir(&dcim)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if insta360::media_folder().is_match(&name) {
            return Ok(CameraFamily::Insta360);
        }
        if dji::media_folder().is_match(&name) {
            return Ok(CameraFamily::Dji);
        }
    }
    Err(ImportError::NoCameraDetected)
}
