use crate::cameras::{CaptureMode, FileKind, FileTypeMatch};
use crate::utils::static_regex;
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_DEVICE_NAME: &str = "DJI Device";

static TABLE: LazyLock<Vec<FileTypeMatch>> = LazyLock::new(|| {
    use CaptureMode::Standard;
    use FileKind::*;
    vec![
        FileTypeMatch::new(r"(?i)\.JPG$", Photo, Standard),
        FileTypeMatch::new(r"(?i)\.MP4$", Video, Standard),
        FileTypeMatch::new(r"(?i)\.SRT$", Subtitle, Standard),
        FileTypeMatch::new(r"(?i)\.DNG$", RawPhoto, Standard),
        FileTypeMatch::new(r"(?i)\.AAC$", Audio, Standard),
    ]
});

pub fn file_table() -> &'static [FileTypeMatch] {
    &TABLE
}

/// Media folders below `DCIM`, e.g. `100MEDIA`.
pub fn media_folder() -> &'static Regex {
    static RE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"^\d+MEDIA$"));
    &RE
}

/// Camera model codes written to EXIF `Model` by DJI aircraft and handhelds.
const MODEL_NAMES: &[(&str, &str)] = &[
    ("FC220", "Mavic Pro"),
    ("FC2103", "Mavic Air"),
    ("FC2204", "Mavic 2 Zoom"),
    ("L1D-20c", "Mavic 2 Pro"),
    ("FC3170", "Mavic Air 2"),
    ("FC3411", "Air 2S"),
    ("FC7203", "Mavic Mini"),
    ("FC7303", "Mini 2"),
    ("FC3582", "Mini 3 Pro"),
    ("FC8482", "Mini 4 Pro"),
    ("FC4170", "Mavic 3"),
    ("FC3682", "Avata"),
];

/// Maps an EXIF `Model` value to a friendly device name; unknown models are kept as-is.
pub fn device_name_from_model(model: &str) -> String {
    let model = model.trim();
    MODEL_NAMES
        .iter()
        .find(|(code, _)| *code == model)
        .map_or_else(|| model.to_string(), |(_, name)| (*name).to_string())
}

/// Path of the subtitle track recorded next to a video.
pub fn subtitle_name(video_name: &str) -> String {
    match video_name.rfind('.') {
        Some(dot) => format!("{}.SRT", &video_name[..dot]),
        None => format!("{video_name}.SRT"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cameras::classify;

    #[test]
    fn test_classification_ignores_panorama_index() {
        let kind = |name: &str| classify(file_table(), name).map(|row| row.kind);
        assert_eq!(kind("DJI_0001.JPG"), Some(FileKind::Photo));
        assert_eq!(kind("DJI_0002.MP4"), Some(FileKind::Video));
        assert_eq!(kind("DJI_0002.SRT"), Some(FileKind::Subtitle));
        assert_eq!(kind("DJI_0003.DNG"), Some(FileKind::RawPhoto));
        assert_eq!(kind("DJI_0004.AAC"), Some(FileKind::Audio));
        assert_eq!(kind("PANORAMA.html"), None);
    }

    #[test]
    fn test_model_names() {
        assert_eq!(device_name_from_model("FC7303"), "Mini 2");
        assert_eq!(device_name_from_model(" FC3411 "), "Air 2S");
        assert_eq!(device_name_from_model("FC9999"), "FC9999");
    }

    #[test]
    fn test_subtitle_name() {
        assert_eq!(subtitle_name("DJI_0002.MP4"), "DJI_0002.SRT");
    }
}
