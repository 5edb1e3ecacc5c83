use crate::error::ExtractError;
use crate::location::Coordinates;
use exiftool::ExifTool;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A shared `exiftool` process, started the first time a file is read.
///
/// Construction never touches the executable, so an importer can be built on a machine without
/// exiftool; only the items that actually need EXIF data fail.
pub struct ExifReader {
    executable: Option<PathBuf>,
    tool: Mutex<Option<ExifTool>>,
}

impl ExifReader {
    /// `executable` overrides the `exiftool` found on `PATH`.
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self {
            executable,
            tool: Mutex::new(None),
        }
    }

    /// Numeric (`-n`) tags of a file. Blocks on the exiftool process.
    pub fn numeric_blocking(&self, path: &Path) -> Result<Value, ExtractError> {
        let mut guard = self.tool.lock().map_err(|_| ExtractError::ExternalTool {
            tool: "exiftool".to_string(),
            status: "lock poisoned by an earlier panic".to_string(),
        })?;
        if guard.is_none() {
            let started = match &self.executable {
                Some(executable) => ExifTool::with_executable(executable)?,
                None => ExifTool::new()?,
            };
            *guard = Some(started);
        }
        match guard.as_mut() {
            Some(tool) => Ok(tool.json(path, &["-n"])?),
            None => Err(ExtractError::NoDataFound),
        }
    }

    /// Runs [`Self::numeric_blocking`] on the blocking thread pool.
    pub async fn numeric(self: &Arc<Self>, path: &Path) -> Result<Value, ExtractError> {
        let reader = Arc::clone(self);
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || reader.numeric_blocking(&path)).await?
    }
}

/// `GPSLatitude`/`GPSLongitude` from numeric exif output.
pub fn gps_coordinates(numeric_exif: &Value) -> Result<Coordinates, ExtractError> {
    let (Some(latitude), Some(longitude)) = (
        numeric_exif.get("GPSLatitude").and_then(Value::as_f64),
        numeric_exif.get("GPSLongitude").and_then(Value::as_f64),
    ) else {
        return Err(ExtractError::NoGpsData);
    };
    if latitude == 0.0 && longitude == 0.0 {
        return Err(ExtractError::NoGpsData);
    }
    Ok(Coordinates {
        latitude,
        longitude,
    })
}

pub fn camera_model(numeric_exif: &Value) -> Option<&str> {
    numeric_exif
        .get("Model")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|model| !model.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gps_coordinates_from_numeric_exif() -> Result<(), ExtractError> {
        let exif = json!({
            "GPSLatitude": 52.379_189,
            "GPSLongitude": 4.899_431,
            "GPSAltitude": 10.5,
        });
        let coords = gps_coordinates(&exif)?;
        assert_eq!(coords.latitude, 52.379_189);
        assert_eq!(coords.longitude, 4.899_431);
        Ok(())
    }

    #[test]
    fn test_missing_or_null_island_gps_is_no_data() {
        assert!(matches!(
            gps_coordinates(&json!({ "GPSLatitude": 52.0 })),
            Err(ExtractError::NoGpsData)
        ));
        assert!(matches!(
            gps_coordinates(&json!({ "GPSLatitude": 0.0, "GPSLongitude": 0.0 })),
            Err(ExtractError::NoGpsData)
        ));
        assert!(matches!(
            gps_coordinates(&json!({ "GPSLatitude": "52 deg 22' N", "GPSLongitude": 4.9 })),
            Err(ExtractError::NoGpsData)
        ));
    }

    #[test]
    fn test_camera_model() {
        assert_eq!(camera_model(&json!({ "Model": "FC3411 " })), Some("FC3411"));
        assert_eq!(camera_model(&json!({ "Model": "" })), None);
        assert_eq!(camera_model(&json!({})), None);
    }

    #[tokio::test]
    async fn test_missing_executable_fails_on_use_not_on_construction() {
        let reader = Arc::new(ExifReader::new(Some(PathBuf::from(
            "/nonexistent/bin/exiftool",
        ))));
        let result = reader.numeric(Path::new("photo.jpg")).await;
        assert!(result.is_err(), "reading must fail without an executable");
    }
}
