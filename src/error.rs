use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the media-importer crate.
///
/// Every variant here is fatal to a run: the orchestrator returns it before (or instead of)
/// producing an [`ImportResult`](crate::structs::ImportResult). Problems with a single media
/// item are recorded as an [`ItemError`] instead.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("No camera detected at the given input")]
    NoCameraDetected,

    #[error("Unsupported camera: {0}")]
    UnsupportedCamera(String),

    #[error("Unsupported connection: {0}")]
    UnsupportedConnection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid supplied data: {0}")]
    InvalidSuppliedData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Exiftool failed to execute or process the file")]
    Exiftool(#[from] exiftool::ExifToolError),

    #[error("Could not parse the configuration file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Could not parse the camera version file: {0}")]
    VersionFile(#[from] serde_json::Error),

    #[error("Failed to walk the media folder: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Failure while pulling metadata out of a media file.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No usable GPS data found")]
    NoGpsData,

    #[error("File invalid for location lookup: {0}")]
    InvalidFile(String),

    #[error("No recognized telemetry format in subtitle file")]
    NoRecognizedTelemetryFormat,

    #[error("Invalid coordinates format: {0}")]
    InvalidCoordinatesFormat(String),

    #[error("No data found")]
    NoDataFound,

    #[error("Malformed telemetry: {0}")]
    MalformedTelemetry(String),

    #[error("Could not read MP4 container: {0}")]
    Container(String),

    #[error("{tool} exited with {status}")]
    ExternalTool { tool: String, status: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Exiftool failed to execute or process the file")]
    Exiftool(#[from] exiftool::ExifToolError),

    #[error("Invalid JSON from external tool: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Metadata task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Failure while moving the bytes of one media item.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("File {} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("{} is not a regular file", .0.display())]
    NotARegularFile(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },
}

/// An error recorded against a single media item in the run's result.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("{file}: unrecognized media format")]
    UnrecognizedMediaFormat { file: String },

    #[error("{file}: {source}")]
    Transfer {
        file: String,
        #[source]
        source: TransferError,
    },

    #[error("{file}: {source}")]
    Extract {
        file: String,
        #[source]
        source: ExtractError,
    },

    #[error("{file}: could not create destination: {source}")]
    Placement {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: not transferred: {reason}")]
    Aborted { file: String, reason: String },
}

impl ItemError {
    pub fn transfer(file: impl Into<String>, source: impl Into<TransferError>) -> Self {
        Self::Transfer {
            file: file.into(),
            source: source.into(),
        }
    }

    pub fn placement(file: impl Into<String>, source: std::io::Error) -> Self {
        Self::Placement {
            file: file.into(),
            source,
        }
    }

    /// The name of the item this error was recorded against.
    pub fn file(&self) -> &str {
        match self {
            Self::UnrecognizedMediaFormat { file }
            | Self::Transfer { file, .. }
            | Self::Extract { file, .. }
            | Self::Placement { file, .. }
            | Self::Aborted { file, .. } => file,
        }
    }
}
