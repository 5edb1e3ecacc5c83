use crate::cameras::{CaptureMode, FileKind, FileTypeMatch};
use crate::error::ImportError;
use crate::utils::static_regex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

pub const VERSION_FILE: &str = "version.txt";
pub const GET_STARTED_FILE: &str = "Get_started_with_GoPro.url";

/// Media file generation used by the camera, decided from its firmware prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// HERO2 through HERO5: `GOPRxxxx` names, chapters as `GPccxxxx`.
    V1,
    /// HERO6 and newer (and MAX): `GXccxxxx` names.
    V2,
}

const V2_FIRMWARE: &[&str] = &["HD6", "HD7", "HD8", "H19", "HD9", "H21", "H22", "H23"];
const V1_FIRMWARE: &[&str] = &["HD2", "HD3", "HD4", "HX", "HD5"];

/// Firmware of cameras whose network API supports turbo transfer mode.
const TURBO_FIRMWARE: &[&str] = &["HD9", "H21", "H22", "H23"];
const NETWORK_V2_FIRMWARE: &[&str] = &["HD6", "HD7", "HD8"];

/// Contents of `MISC/version.txt` on a GoPro SD card.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GoProVersion {
    #[serde(rename = "info version", default)]
    pub info_version: String,
    #[serde(rename = "firmware version")]
    pub firmware_version: String,
    #[serde(rename = "wifi mac", default)]
    pub wifi_mac: String,
    #[serde(rename = "camera type")]
    pub camera_type: String,
    #[serde(rename = "camera serial number", default)]
    pub camera_serial_number: String,
}

/// Makes the almost-JSON written by GoPro firmware parseable.
///
/// Cameras leave a trailing comma before the closing brace, and HERO10/11 write the file
/// with embedded line breaks inside values.
fn clean_version(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    if text.contains("HERO10") || text.contains("HERO11") {
        text = text.replace(['\n', '\r'], "");
    }
    static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| static_regex(r",\s*}"));
    TRAILING_COMMA.replace_all(&text, "}").into_owned()
}

pub fn parse_version(raw: &str) -> Result<GoProVersion, ImportError> {
    Ok(serde_json::from_str(&clean_version(raw))?)
}

/// Reads `MISC/version.txt` below a card root.
pub fn read_version(card_root: &Path) -> Result<GoProVersion, ImportError> {
    let path = card_root.join("MISC").join(VERSION_FILE);
    let raw = std::fs::read_to_string(&path)
        .map_err(|_| ImportError::NotFound(path.display().to_string()))?;
    parse_version(&raw)
}

/// The part of a firmware string before the first dot, e.g. `HD9` for `HD9.01.01.60.00`.
pub fn firmware_root(firmware: &str) -> &str {
    firmware.split('.').next().unwrap_or(firmware)
}

/// Protocol version of a camera read from an SD card.
pub fn sd_card_version(firmware: &str) -> Result<ProtocolVersion, ImportError> {
    let root = firmware_root(firmware);
    if V2_FIRMWARE.contains(&root) {
        Ok(ProtocolVersion::V2)
    } else if V1_FIRMWARE.contains(&root) {
        Ok(ProtocolVersion::V1)
    } else {
        Err(ImportError::UnsupportedCamera(firmware.to_string()))
    }
}

/// Protocol version and turbo support of a camera reached over its network API.
pub fn network_profile(firmware: &str) -> (ProtocolVersion, bool) {
    let root = firmware_root(firmware);
    if TURBO_FIRMWARE.contains(&root) {
        (ProtocolVersion::V2, true)
    } else if NETWORK_V2_FIRMWARE.contains(&root) {
        (ProtocolVersion::V2, false)
    } else {
        (ProtocolVersion::V1, false)
    }
}

/// Camera series as announced by an MTP device name, e.g. `HERO9 BLACK` or a gvfs mount such
/// as `mtp:host=GoPro_HERO9_BLACK_C3441324500000`.
///
/// A series token anywhere in the name decides; a bare `GoPro` only counts when no series is
/// named.
pub fn mtp_version(device_name: &str) -> Result<ProtocolVersion, ImportError> {
    const V2_SERIES: &[&str] = &["HERO9", "HERO8", "HERO7", "HERO6"];
    const V1_SERIES: &[&str] = &["HERO5", "HERO", "HERO+", "HERO4", "HERO3"];

    let tokens: Vec<&str> = device_name
        .split(|c: char| c.is_whitespace() || matches!(c, '_' | '=' | ':' | ','))
        .filter(|t| !t.is_empty())
        .collect();
    let named = |series: &[&str]| {
        tokens
            .iter()
            .any(|t| series.iter().any(|s| t.eq_ignore_ascii_case(s)))
    };

    if named(V2_SERIES) {
        Ok(ProtocolVersion::V2)
    } else if named(V1_SERIES) {
        Ok(ProtocolVersion::V1)
    } else if tokens.iter().any(|t| t.eq_ignore_ascii_case("GoPro")) {
        Ok(ProtocolVersion::V2)
    } else {
        Err(ImportError::UnsupportedCamera(device_name.to_string()))
    }
}

static V2_TABLE: LazyLock<Vec<FileTypeMatch>> = LazyLock::new(|| {
    use CaptureMode::{Spherical, Standard};
    use FileKind::*;
    vec![
        FileTypeMatch::new(r"^GOPR\d+\.JPG$", Photo, Standard),
        FileTypeMatch::new(r"^GP\d+\.JPG$", Photo, Standard),
        FileTypeMatch::new(r"^GX\d+\.MP4$", Video, Standard).chaptered(),
        FileTypeMatch::new(r"^GX\d+\.WAV$", Audio, Standard),
        FileTypeMatch::new(r"^GH\d+\.MP4$", Video, Standard).chaptered(),
        // Live bursts
        FileTypeMatch::new(r"^GG\d+\.MP4$", Video, Standard).chaptered(),
        FileTypeMatch::new(r"^G\d+\.JPG$", MultishotFrame, Standard),
        FileTypeMatch::new(r"\.GPR$", RawPhoto, Standard),
        FileTypeMatch::new(r"^GS\d+\.360$", Video, Spherical).chaptered(),
        FileTypeMatch::new(r"^GS_+\d+\.JPG$", Photo, Spherical),
        FileTypeMatch::new(r"^GP_+\d+\.JPG$", Photo, Standard),
        FileTypeMatch::new(r"^GPA[A-Z]\d+\.JPG$", MultishotFrame, Standard),
        FileTypeMatch::new(r"^GSA[A-Z]\d+\.JPG$", MultishotFrame, Spherical),
        FileTypeMatch::new(r"^GL\d+\.LRV$", LowResProxy, Standard).chaptered(),
        FileTypeMatch::new(r"^G[XHS]\d+\.THM$", Thumbnail, Standard).chaptered(),
    ]
});

static V1_TABLE: LazyLock<Vec<FileTypeMatch>> = LazyLock::new(|| {
    use CaptureMode::Standard;
    use FileKind::*;
    vec![
        FileTypeMatch::new(r"^GOPR\d+\.JPG$", Photo, Standard),
        FileTypeMatch::new(r"^G\d+\.JPG$", MultishotFrame, Standard),
        FileTypeMatch::new(r"^GOPR\d+\.MP4$", Video, Standard),
        FileTypeMatch::new(r"^GP\d+\.MP4$", Video, Standard).chaptered(),
        FileTypeMatch::new(r"\.GPR$", RawPhoto, Standard),
        FileTypeMatch::new(r"^GOPR\d+\.LRV$", LowResProxy, Standard),
        FileTypeMatch::new(r"^GOPR\d+\.THM$", Thumbnail, Standard),
    ]
});

pub fn file_table(version: ProtocolVersion) -> &'static [FileTypeMatch] {
    match version {
        ProtocolVersion::V1 => &V1_TABLE,
        ProtocolVersion::V2 => &V2_TABLE,
    }
}

/// Media folders below `DCIM`, e.g. `100GOPRO`.
pub fn media_folder() -> &'static Regex {
    static RE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"^\d\d\dGOPRO$"));
    &RE
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) => (&name[..dot], &name[dot..]),
        None => (name, ""),
    }
}

/// Renames a chaptered recording so that chapters of one clip sort together.
///
/// V2 `GX010042.MP4` becomes `GX0042-01.MP4`; V1 chapter `GP010042.MP4` becomes
/// `GOPR004201.MP4`. Names that do not have the expected shape are returned unchanged.
pub fn chapter_name(version: ProtocolVersion, name: &str) -> String {
    let (stem, ext) = split_extension(name);
    let (Some(prefix), Some(chapter), Some(number)) =
        (stem.get(..2), stem.get(2..4), stem.get(4..8))
    else {
        return name.to_string();
    };
    match version {
        ProtocolVersion::V2 => format!("{prefix}{number}-{chapter}{ext}"),
        ProtocolVersion::V1 => format!("GOPR{number}{chapter}{ext}"),
    }
}

/// Name of the low-resolution proxy recorded next to a video on the card.
pub fn proxy_name(version: ProtocolVersion, video_name: &str) -> String {
    let (stem, _) = split_extension(video_name);
    match version {
        ProtocolVersion::V2 => match stem.get(2..) {
            Some(rest) if ["GX", "GH", "GM"].iter().any(|p| stem.starts_with(p)) => {
                format!("GL{rest}.LRV")
            }
            _ => format!("{stem}.LRV"),
        },
        ProtocolVersion::V1 => format!("{stem}.LRV"),
    }
}

/// Name of the raw companion of a photo.
pub fn raw_companion_name(photo_name: &str) -> String {
    let (stem, _) = split_extension(photo_name);
    format!("{stem}.GPR")
}

/// Folder grouping the frames of one burst or time-lapse, e.g. `G001` for `G0010042.JPG`.
pub fn multishot_root(name: &str) -> &str {
    name.get(..4).unwrap_or(name)
}

/// Name of frame `index` of the multishot sequence that starts with `first_name`.
pub fn multishot_frame_name(first_name: &str, index: u32) -> String {
    format!("{}{index:04}.JPG", multishot_root(first_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cameras::classify;

    #[test]
    fn test_parses_version_file_with_trailing_comma() -> Result<(), ImportError> {
        let raw = r#"{
"info version":"2.0",
"firmware version":"HD9.01.01.60.00",
"wifi mac":"0441693db024",
"camera type":"HERO9 Black",
"camera serial number":"C3441325268565",
}"#;
        let version = parse_version(raw)?;
        assert_eq!(version.firmware_version, "HD9.01.01.60.00");
        assert_eq!(version.camera_type, "HERO9 Black");
        assert_eq!(sd_card_version(&version.firmware_version)?, ProtocolVersion::V2);
        Ok(())
    }

    #[test]
    fn test_hero11_version_file_with_line_breaks() -> Result<(), ImportError> {
        let raw = "{\"info version\":\"2.0\",\"firmware version\":\"H22.01.01.10.00\",\n\"camera type\":\"HERO11\n Black\",\n}";
        let version = parse_version(raw)?;
        assert_eq!(version.camera_type, "HERO11 Black");
        Ok(())
    }

    #[test]
    fn test_firmware_tables() {
        assert_eq!(firmware_root("HD9.01.01.60.00"), "HD9");
        assert!(matches!(sd_card_version("HD5.02.01.02.00"), Ok(ProtocolVersion::V1)));
        assert!(matches!(
            sd_card_version("XYZ.01"),
            Err(ImportError::UnsupportedCamera(_))
        ));

        assert_eq!(network_profile("H22.01.02.32.00"), (ProtocolVersion::V2, true));
        assert_eq!(network_profile("HD8.01.02.51.00"), (ProtocolVersion::V2, false));
        assert_eq!(network_profile("HD5.02.01.02.00"), (ProtocolVersion::V1, false));

        assert!(matches!(mtp_version("HERO9 BLACK"), Ok(ProtocolVersion::V2)));
        assert!(matches!(mtp_version("HERO4 Silver"), Ok(ProtocolVersion::V1)));
        assert!(mtp_version("Pixel 7").is_err());
    }

    #[test]
    fn test_mtp_version_from_mount_folder_name() {
        assert!(matches!(
            mtp_version("mtp:host=GoPro_HERO9_BLACK_C3441324500000"),
            Ok(ProtocolVersion::V2)
        ));
        assert!(matches!(
            mtp_version("mtp:host=GoPro_HERO4_Silver_C3131125000000"),
            Ok(ProtocolVersion::V1)
        ));
        assert!(matches!(mtp_version("GoPro MAX"), Ok(ProtocolVersion::V2)));
        assert!(mtp_version("mtp:host=Google_Pixel_7_2A111FDH2000").is_err());
    }

    #[test]
    fn test_v2_table_classification() {
        let table = file_table(ProtocolVersion::V2);
        let kind = |name: &str| classify(table, name).map(|row| (row.kind, row.mode));

        assert_eq!(kind("GX010042.MP4"), Some((FileKind::Video, CaptureMode::Standard)));
        assert_eq!(kind("GS010042.360"), Some((FileKind::Video, CaptureMode::Spherical)));
        assert_eq!(kind("GOPR0042.JPG"), Some((FileKind::Photo, CaptureMode::Standard)));
        assert_eq!(kind("GS__0042.JPG"), Some((FileKind::Photo, CaptureMode::Spherical)));
        assert_eq!(kind("G0010042.JPG"), Some((FileKind::MultishotFrame, CaptureMode::Standard)));
        assert_eq!(kind("GOPR0042.GPR"), Some((FileKind::RawPhoto, CaptureMode::Standard)));
        assert_eq!(kind("GL010042.LRV"), Some((FileKind::LowResProxy, CaptureMode::Standard)));
        assert_eq!(kind("GX010042.THM"), Some((FileKind::Thumbnail, CaptureMode::Standard)));
        assert_eq!(kind("GX010042.WAV"), Some((FileKind::Audio, CaptureMode::Standard)));
        assert_eq!(kind("notes.txt"), None);
        assert_eq!(kind("XGX010042.MP4"), None, "Patterns are anchored");
    }

    #[test]
    fn test_v1_table_marks_chapters() {
        let table = file_table(ProtocolVersion::V1);
        let first = classify(table, "GOPR0042.MP4").map(|row| row.chaptered);
        let chapter = classify(table, "GP010042.MP4").map(|row| row.chaptered);
        assert_eq!(first, Some(false));
        assert_eq!(chapter, Some(true));
    }

    #[test]
    fn test_chapter_renames() {
        assert_eq!(chapter_name(ProtocolVersion::V2, "GX010042.MP4"), "GX0042-01.MP4");
        assert_eq!(chapter_name(ProtocolVersion::V2, "GS020007.360"), "GS0007-02.360");
        assert_eq!(chapter_name(ProtocolVersion::V1, "GP010042.MP4"), "GOPR004201.MP4");
        assert_eq!(chapter_name(ProtocolVersion::V2, "GX1.MP4"), "GX1.MP4");
    }

    #[test]
    fn test_companion_names() {
        assert_eq!(proxy_name(ProtocolVersion::V2, "GX010042.MP4"), "GL010042.LRV");
        assert_eq!(proxy_name(ProtocolVersion::V2, "GH010042.MP4"), "GL010042.LRV");
        assert_eq!(proxy_name(ProtocolVersion::V1, "GOPR0042.MP4"), "GOPR0042.LRV");
        assert_eq!(raw_companion_name("GOPR0042.JPG"), "GOPR0042.GPR");
        assert_eq!(multishot_root("G0010042.JPG"), "G001");
        assert_eq!(multishot_frame_name("G0010042.JPG", 43), "G0010043.JPG");
    }
}
