use crate::error::ExtractError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

/// Codec tag of GoPro's telemetry stream inside an MP4.
const TELEMETRY_CODEC_TAG: &str = "gpmd";

/// Thin wrapper around the external `ffprobe`/`ffmpeg` binaries.
#[derive(Debug, Clone)]
pub struct Demuxer {
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
}

impl Demuxer {
    pub fn new(ffprobe: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Runs `ffprobe` and returns its JSON description of streams and container.
    pub async fn probe(&self, path: &Path) -> Result<Value, ExtractError> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(path)
            .output()
            .await?;
        let output = check_status(&self.ffprobe, output)?;
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// Dumps the raw bytes of the telemetry stream of a video.
    pub async fn extract_telemetry(&self, path: &Path) -> Result<Vec<u8>, ExtractError> {
        let probe = self.probe(path).await?;
        let index = telemetry_stream_index(&probe).ok_or(ExtractError::NoGpsData)?;

        let output = Command::new(&self.ffmpeg)
            .args(["-y", "-v", "error", "-i"])
            .arg(path)
            .args(["-codec", "copy", "-map"])
            .arg(format!("0:{index}"))
            .args(["-f", "rawvideo", "-"])
            .output()
            .await?;
        Ok(check_status(&self.ffmpeg, output)?.stdout)
    }
}

fn check_status(tool: &Path, output: Output) -> Result<Output, ExtractError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(ExtractError::ExternalTool {
            tool: tool.display().to_string(),
            status: output.status.to_string(),
        })
    }
}

/// Index of the first stream tagged as GPMF telemetry.
pub fn telemetry_stream_index(probe: &Value) -> Option<u64> {
    probe
        .get("streams")?
        .as_array()?
        .iter()
        .find(|s| s.get("codec_tag_string").and_then(Value::as_str) == Some(TELEMETRY_CODEC_TAG))
        .and_then(|s| s.get("index"))
        .and_then(Value::as_u64)
}

/// Size and nominal frame rate of the first video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoStream {
    pub width: u64,
    pub height: u64,
    pub fps_num: u64,
    pub fps_den: u64,
}

/// Reads the first stream that reports a size, with `r_frame_rate` split as `num/den`.
pub fn video_stream(probe: &Value) -> Option<VideoStream> {
    let stream = probe
        .get("streams")?
        .as_array()?
        .iter()
        .find(|s| s.get("width").is_some() && s.get("height").is_some())?;
    let (num, den) = stream
        .get("r_frame_rate")
        .and_then(Value::as_str)
        .and_then(|rate| rate.split_once('/'))
        .unwrap_or(("0", "1"));
    Some(VideoStream {
        width: stream.get("width")?.as_u64()?,
        height: stream.get("height")?.as_u64()?,
        fps_num: num.trim().parse().ok()?,
        fps_den: den.trim().parse().ok()?,
    })
}

/// Container duration in seconds, as reported in `format.duration`.
pub fn duration_secs(probe: &Value) -> Option<f64> {
    probe
        .get("format")?
        .get("duration")?
        .as_str()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// The container-level `location` tag (ISO 6709) written by phone camera apps.
pub fn location_tag(probe: &Value) -> Option<&str> {
    let tags = probe.get("format")?.get("tags")?;
    tags.get("location")
        .or_else(|| tags.get("com.apple.quicktime.location.ISO6709"))
        .and_then(Value::as_str)
}
