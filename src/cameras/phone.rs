use crate::cameras::{CaptureMode, FileKind, FileTypeMatch};
use std::sync::LazyLock;

/// Folder below `DCIM` where phone camera apps store their captures.
pub const MEDIA_FOLDER: &str = "Camera";

static TABLE: LazyLock<Vec<FileTypeMatch>> = LazyLock::new(|| {
    use CaptureMode::Standard;
    use FileKind::*;
    vec![
        FileTypeMatch::new(r"(?i)\.(jpe?g|heic)$", Photo, Standard),
        FileTypeMatch::new(r"(?i)\.dng$", RawPhoto, Standard),
        FileTypeMatch::new(r"(?i)\.(mp4|mov)$", Video, Standard),
    ]
});

pub fn file_table() -> &'static [FileTypeMatch] {
    &TABLE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cameras::classify;

    #[test]
    fn test_phone_classification_is_case_insensitive() {
        let kind = |name: &str| classify(file_table(), name).map(|row| row.kind);
        assert_eq!(kind("PXL_20250103_180944831.jpg"), Some(FileKind::Photo));
        assert_eq!(kind("IMG_1234.JPEG"), Some(FileKind::Photo));
        assert_eq!(kind("PXL_20250103_180944831.RAW-01.MP.COVER.dng"), Some(FileKind::RawPhoto));
        assert_eq!(kind("VID_20220723_134136.mp4"), Some(FileKind::Video));
        assert_eq!(kind(".thumbdata4"), None);
    }
}
