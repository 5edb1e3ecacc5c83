use crate::cameras::{CaptureMode, FileKind, FileTypeMatch};
use crate::utils::static_regex;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

pub const DEFAULT_DEVICE_NAME: &str = "Insta360 Camera";
pub const FILE_INFO_LIST: &str = "fileinfo_list.list";

const MODEL_MARKER: &[u8] = b"\x12\x0BInsta360";
const MODEL_END: &[u8] = &[0x1A, 0x0F];

static TABLE: LazyLock<Vec<FileTypeMatch>> = LazyLock::new(|| {
    use CaptureMode::{Pro, Spherical, Standard};
    use FileKind::*;
    vec![
        FileTypeMatch::new(r"^IMG_\d+_\d+_\d\d_\d+\.jpg$", Photo, Standard),
        FileTypeMatch::new(r"^IMG_\d+_\d+_\d\d_\d+\.insp$", Photo, Spherical),
        FileTypeMatch::new(r"^IMG_\d+_\d+_\d\d_\d+\.dng$", RawPhoto, Spherical),
        FileTypeMatch::new(r"^LRV_\d+_\d+_\d\d_\d+\.mp4$", LowResProxy, Standard),
        FileTypeMatch::new(r"^PRO_LRV_\d+_\d+_\d\d_\d+\.mp4$", LowResProxy, Pro),
        FileTypeMatch::new(r"^PRO_VID_\d+_\d+_\d\d_\d+\.mp4$", Video, Pro),
        FileTypeMatch::new(r"^VID_\d+_\d+_\d\d_\d+\.mp4$", Video, Standard),
        FileTypeMatch::new(r"^VID_\d+_\d+_\d\d_\d+\.insv$", Video, Spherical),
        FileTypeMatch::new(r"^LRV_\d+_\d+_\d\d_\d+\.insv$", LowResProxy, Spherical),
    ]
});

pub fn file_table() -> &'static [FileTypeMatch] {
    &TABLE
}

/// Media folders below `DCIM`, e.g. `Camera01`.
pub fn media_folder() -> &'static Regex {
    static RE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"^Camera\d+$"));
    &RE
}

/// Extracts the model name from the binary `fileinfo_list.list` manifest.
pub fn device_name_from_manifest(manifest: &[u8]) -> Option<String> {
    let start = find(manifest, MODEL_MARKER)? + MODEL_MARKER.len();
    let rest = &manifest[start..];
    let end = find(rest, MODEL_END)?;
    Some(format!("Insta360{}", String::from_utf8_lossy(&rest[..end])))
}

/// Reads the device name from `DCIM/fileinfo_list.list`, falling back to a generic name.
pub fn read_device_name(card_root: &Path) -> String {
    std::fs::read(card_root.join("DCIM").join(FILE_INFO_LIST))
        .ok()
        .and_then(|bytes| device_name_from_manifest(&bytes))
        .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Clip identifier used as the grouping folder: the capture time-of-day in the name.
///
/// `VID_20220723_134136_00_001.insv` groups under `134136`.
pub fn clip_id(name: &str, mode: CaptureMode) -> &str {
    let range = match mode {
        CaptureMode::Pro => 17..23,
        _ => 13..19,
    };
    name.get(range).unwrap_or(name)
}
