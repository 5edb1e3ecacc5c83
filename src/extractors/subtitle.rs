//! GPS from DJI flight subtitle tracks (`.SRT`).

use crate::error::ExtractError;
use crate::location::Coordinates;
use crate::utils::static_regex;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tokio::io::AsyncReadExt;

/// Only the first few entries are needed; every entry repeats the position.
const READ_LIMIT: u64 = 2048;

struct SubtitleFormat {
    latitude: Regex,
    longitude: Regex,
}

static FORMATS: LazyLock<[SubtitleFormat; 2]> = LazyLock::new(|| {
    [
        // Newer aircraft: `[latitude: 52.3791] [longitude: 4.8994]` (sometimes `longtitude`)
        SubtitleFormat {
            latitude: static_regex(r"\[latitude[ ]?: ([+-]?(\d+\.?\d*)|(\.\d+))\]"),
            longitude: static_regex(r"\[long[t]?itude[ ]?: ([+-]?(\d+\.?\d*)|(\.\d+))\]"),
        },
        // Older aircraft: `GPS(52.3791,4.8994,19)`
        SubtitleFormat {
            latitude: static_regex(r"GPS[ ]?\(([+-]?(\d+\.?\d*)|(\.\d+))"),
            longitude: static_regex(r",[ ]?([+-]?(\d+\.?\d*)|(\.\d+)),[ ]?\d+\)"),
        },
    ]
});

fn first_float(regex: &Regex, text: &str) -> Option<f64> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Tries each known subtitle layout in turn and returns the first complete position.
pub fn parse_subtitle_gps(text: &str) -> Result<Coordinates, ExtractError> {
    FORMATS
        .iter()
        .find_map(|format| {
            Some(Coordinates {
                latitude: first_float(&format.latitude, text)?,
                longitude: first_float(&format.longitude, text)?,
            })
        })
        .ok_or(ExtractError::NoRecognizedTelemetryFormat)
}

/// Reads the head of a subtitle file and parses its GPS position.
pub async fn subtitle_location(path: &Path) -> Result<Coordinates, ExtractError> {
    let file = tokio::fs::File::open(path).await?;
    let mut head = Vec::new();
    file.take(READ_LIMIT).read_to_end(&mut head).await?;
    parse_subtitle_gps(&String::from_utf8_lossy(&head))
}

#[cfg(test)]
mod tests {
    use super::*;

    const AIR2S: &str = "1\n00:00:00,000 --> 00:00:00,033\n<font size=\"28\">FrameCnt: 1, DiffTime: 33ms\n2021-06-12 17:38:24.015\n[iso: 100] [shutter: 1/1000.0] [fnum: 280] [ev: 0] [ct: 5535] [color_md : default] [focal_len: 220] [latitude: 52.379189] [longitude: 4.899431] [rel_alt: 1.300 abs_alt: 29.166] </font>\n";

    const MINI_SE_TYPO: &str = "[latitude : 48.856600] [longtitude : 2.352200] [altitude: 35.000000]";

    const MAVIC_PRO: &str = "1\n00:00:00,000 --> 00:00:01,000\nHOME(4.8994,52.3791) 2017.08.05 14:11:51\nGPS(52.3791,4.8994,19) BAROMETER:1.9\nISO:100 Shutter:60 EV:0 Fnum:F2.2 \n";

    #[test]
    fn test_new_aircraft_format() -> Result<(), ExtractError> {
        let coords = parse_subtitle_gps(AIR2S)?;
        assert_eq!(coords.latitude, 52.379_189);
        assert_eq!(coords.longitude, 4.899_431);
        Ok(())
    }

    #[test]
    fn test_longitude_typo_is_accepted() -> Result<(), ExtractError> {
        let coords = parse_subtitle_gps(MINI_SE_TYPO)?;
        assert_eq!(coords.latitude, 48.8566);
        assert_eq!(coords.longitude, 2.3522);
        Ok(())
    }

    #[test]
    fn test_old_aircraft_format() -> Result<(), ExtractError> {
        let coords = parse_subtitle_gps(MAVIC_PRO)?;
        assert_eq!(coords.latitude, 52.3791);
        assert_eq!(coords.longitude, 4.8994);
        Ok(())
    }

    #[test]
    fn test_unknown_format() {
        let result = parse_subtitle_gps("1\n00:00:00,000 --> 00:00:01,000\nno telemetry here\n");
        assert!(matches!(result, Err(ExtractError::NoRecognizedTelemetryFormat)));
    }

    #[tokio::test]
    async fn test_reads_only_head_of_file() -> Result<(), ExtractError> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("DJI_0001.SRT");
        let mut content = "x".repeat(4096);
        content.push_str("[latitude: 1.0] [longitude: 2.0]");
        std::fs::write(&path, content)?;

        let result = subtitle_location(&path).await;

        assert!(
            matches!(result, Err(ExtractError::NoRecognizedTelemetryFormat)),
            "position past the read limit must not be found"
        );
        Ok(())
    }
}
