use crate::config::GpsConfig;
use crate::error::ExtractError;
use crate::extractors::subtitle::subtitle_location;
use crate::extractors::{Demuxer, ExifReader, demux, exif, gpmf};
use crate::location::{Coordinates, LocationService};
use crate::utils::static_regex;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn invalid_file(path: &Path) -> ExtractError {
    ExtractError::InvalidFile(path.display().to_string())
}

async fn exif_location(reader: &Arc<ExifReader>, path: &Path) -> Result<Coordinates, ExtractError> {
    exif::gps_coordinates(&reader.numeric(path).await?)
}

/// GoPro cameras: GPMF telemetry for videos, EXIF for photos.
pub struct GoProLocation {
    demuxer: Demuxer,
    exif: Arc<ExifReader>,
    gps: GpsConfig,
}

impl GoProLocation {
    pub fn new(demuxer: Demuxer, exif: Arc<ExifReader>, gps: GpsConfig) -> Self {
        Self { demuxer, exif, gps }
    }
}

#[async_trait]
impl LocationService for GoProLocation {
    async fn location(&self, path: &Path) -> Result<Coordinates, ExtractError> {
        match extension(path) {
            Some("MP4") => {
                let telemetry = self.demuxer.extract_telemetry(path).await?;
                let samples = gpmf::decode(telemetry)?;
                gpmf::select_fix(&samples, &self.gps)
            }
            Some("JPG") => exif_location(&self.exif, path).await,
            _ => Err(invalid_file(path)),
        }
    }
}

/// DJI drones: the flight subtitle track next to a video, EXIF for stills.
pub struct DjiLocation {
    exif: Arc<ExifReader>,
}

impl DjiLocation {
    pub fn new(exif: Arc<ExifReader>) -> Self {
        Self { exif }
    }
}

#[async_trait]
impl LocationService for DjiLocation {
    async fn location(&self, path: &Path) -> Result<Coordinates, ExtractError> {
        match extension(path) {
            Some("MP4") => subtitle_location(&path.with_extension("SRT")).await,
            Some("SRT") => subtitle_location(path).await,
            Some("JPG" | "DNG") => exif_location(&self.exif, path).await,
            _ => Err(invalid_file(path)),
        }
    }
}

/// Phones: the ISO 6709 `location` tag of a video container, EXIF for photos.
pub struct PhoneLocation {
    demuxer: Demuxer,
    exif: Arc<ExifReader>,
}

impl PhoneLocation {
    pub fn new(demuxer: Demuxer, exif: Arc<ExifReader>) -> Self {
        Self { demuxer, exif }
    }
}

#[async_trait]
impl LocationService for PhoneLocation {
    async fn location(&self, path: &Path) -> Result<Coordinates, ExtractError> {
        let ext = extension(path).map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("mp4") => {
                let probe = self.demuxer.probe(path).await?;
                let tag = demux::location_tag(&probe).ok_or(ExtractError::NoGpsData)?;
                parse_iso6709(tag)
            }
            Some("jpg" | "jpeg") => exif_location(&self.exif, path).await,
            _ => Err(invalid_file(path)),
        }
    }
}

/// Parses `+DD.DDDD+DDD.DDDD/`. Anything other than exactly two numbers is rejected,
/// so a tag that also carries an altitude is treated as malformed.
pub fn parse_iso6709(tag: &str) -> Result<Coordinates, ExtractError> {
    static NUMBER: LazyLock<Regex> = LazyLock::new(|| static_regex(r"[+-]?(\d+\.?\d*|\.\d+)"));
    let invalid = || ExtractError::InvalidCoordinatesFormat(tag.to_string());

    let parts: Vec<&str> = NUMBER.find_iter(tag).map(|m| m.as_str()).collect();
    let [latitude, longitude] = parts.as_slice() else {
        return Err(invalid());
    };
    Ok(Coordinates {
        latitude: latitude.parse().map_err(|_| invalid())?,
        longitude: longitude.parse().map_err(|_| invalid())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exif_reader() -> Arc<ExifReader> {
        Arc::new(ExifReader::new(Some("/nonexistent/exiftool".into())))
    }

    fn missing_tools() -> Demuxer {
        Demuxer::new("/nonexistent/ffprobe", "/nonexistent/ffmpeg")
    }

    #[test]
    fn test_parse_iso6709() -> Result<(), ExtractError> {
        let coords = parse_iso6709("+52.3791+004.8994/")?;
        assert_eq!(coords.latitude, 52.3791);
        assert_eq!(coords.longitude, 4.8994);

        let southern = parse_iso6709("-33.8688+151.2093/")?;
        assert_eq!(southern.latitude, -33.8688);
        assert_eq!(southern.longitude, 151.2093);
        Ok(())
    }

    #[test]
    fn test_parse_iso6709_rejects_other_shapes() {
        for tag in ["", "+52.3791/", "+52.3791+004.8994+012.000/"] {
            assert!(
                matches!(
                    parse_iso6709(tag),
                    Err(ExtractError::InvalidCoordinatesFormat(_))
                ),
                "{tag:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_dji_video_uses_paired_subtitle() -> Result<(), ExtractError> {
        let dir = TempDir::new()?;
        let video = dir.path().join("DJI_0042.MP4");
        std::fs::write(&video, b"not really a video")?;
        std::fs::write(
            dir.path().join("DJI_0042.SRT"),
            "1\n00:00:00,000 --> 00:00:00,033\n[latitude: 46.5197] [longitude: 6.6323]\n",
        )?;

        let coords = DjiLocation::new(exif_reader()).location(&video).await?;

        assert_eq!(coords.latitude, 46.5197);
        assert_eq!(coords.longitude, 6.6323);
        Ok(())
    }

    #[tokio::test]
    async fn test_dji_video_without_subtitle_is_io_error() -> Result<(), ExtractError> {
        let dir = TempDir::new()?;
        let video = dir.path().join("DJI_0043.MP4");
        std::fs::write(&video, b"")?;

        let result = DjiLocation::new(exif_reader()).location(&video).await;

        assert!(matches!(result, Err(ExtractError::Io(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_unsupported_extensions_are_invalid_files() {
        let gopro = GoProLocation::new(missing_tools(), exif_reader(), GpsConfig::default());
        let dji = DjiLocation::new(exif_reader());
        let phone = PhoneLocation::new(missing_tools(), exif_reader());

        let wav = Path::new("GX010001.WAV");
        assert!(matches!(gopro.location(wav).await, Err(ExtractError::InvalidFile(_))));
        assert!(matches!(
            dji.location(Path::new("DJI_0001.AAC")).await,
            Err(ExtractError::InvalidFile(_))
        ));
        assert!(matches!(
            phone.location(Path::new("IMG_0001.heic")).await,
            Err(ExtractError::InvalidFile(_))
        ));
    }

    #[tokio::test]
    async fn test_gopro_video_without_demuxer_fails_cleanly() {
        let gopro = GoProLocation::new(missing_tools(), exif_reader(), GpsConfig::default());
        let result = gopro.location(Path::new("GX010001.MP4")).await;
        assert!(matches!(result, Err(ExtractError::Io(_))));
    }
}
