use crate::backends::mtp::{MountedMtpDevice, MtpDevice};
use crate::backends::network::CameraClient;
use crate::backends::{ImportContext, filesystem, mtp, network};
use crate::cameras::detect_family;
use crate::config::EngineConfig;
use crate::error::ImportError;
use crate::extractors::ExifReader;
use crate::location::geocode::Geocoder;
use crate::structs::{CameraFamily, Connection, ImportParams, ImportResult};
use crate::transfer::{ProgressSink, TracingProgress};
use bon::bon;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// The main entry point of the import engine.
///
/// Holds the long-lived services (exiftool process, reverse geocoder, HTTP client) so that
/// repeated imports share them. Create it once and call [`import`](Self::import) per card or
/// device:
/// ```rust,no_run
/// # use media_importer::{ImportError, MediaImporter};
/// # use media_importer::structs::ImportParams;
/// # #[tokio::main]
/// # async fn main() -> Result<(), ImportError> {
/// let importer = MediaImporter::builder().build()?;
/// let params = ImportParams::builder()
///     .input("/media/me/GOPRO")
///     .output("/home/me/Footage")
///     .build();
/// let result = importer.import(params).await?;
/// println!("{} imported, {} failed", result.files_imported, result.files_not_imported.len());
/// # Ok(())
/// # }
/// ```
pub struct MediaImporter {
    config: EngineConfig,
    exif: Arc<ExifReader>,
    geocoder: Arc<Geocoder>,
    http: reqwest::Client,
    progress: Arc<dyn ProgressSink>,
}

#[bon]
impl MediaImporter {
    /// Constructs a `MediaImporter`.
    ///
    /// # Builder Arguments
    ///
    /// * `exiftool_path: Option<PathBuf>` - A specific `exiftool` executable. If `None`, `exiftool` is looked up in the PATH the first time a file's EXIF data is needed.
    /// * `config: EngineConfig` - (Default: `EngineConfig::default()`) Placement order, GPS thresholds, network retry and worker settings.
    /// * `client: Option<reqwest::Client>` - HTTP client for network cameras. One is built from `config.network` when absent.
    /// * `progress: Option<Arc<dyn ProgressSink>>` - Receives per-file transfer progress. Defaults to `trace` events.
    ///
    /// # Errors
    ///
    /// Fails when the default HTTP client cannot be built.
    #[builder]
    pub fn new(
        exiftool_path: Option<PathBuf>,
        #[builder(default)] config: EngineConfig,
        client: Option<reqwest::Client>,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<Self, ImportError> {
        let http = match client {
            Some(client) => client,
            None => CameraClient::default_http(&config.network)?,
        };
        Ok(Self {
            exif: Arc::new(ExifReader::new(exiftool_path)),
            geocoder: Arc::new(Geocoder::new()),
            progress: progress.unwrap_or_else(|| Arc::new(TracingProgress)),
            config,
            http,
        })
    }

    fn context(&self, params: ImportParams) -> Arc<ImportContext> {
        Arc::new(ImportContext::new(
            params,
            self.config.clone(),
            Arc::clone(&self.geocoder),
            Arc::clone(&self.exif),
            Arc::clone(&self.progress),
        ))
    }

    /// Runs one import and returns its per-file outcome.
    ///
    /// # Errors
    ///
    /// Only problems with the source itself are returned as errors: a missing card, a camera
    /// that does not answer, unsupported firmware or an unsupported family and connection
    /// combination. Failures of single files end up in [`ImportResult::errors`].
    ///
    /// # Signals
    ///
    /// A network import takes over Ctrl-C and SIGTERM for the rest of the process. During the
    /// run an interrupt first switches the camera's turbo mode off; at any time it ends the
    /// process with status 130, as the default handler would.
    pub async fn import(&self, params: ImportParams) -> Result<ImportResult, ImportError> {
        match params.connection {
            Connection::SdCard => {
                let root = Path::new(&params.input);
                if !root.is_dir() {
                    return Err(ImportError::NotFound(params.input.clone()));
                }
                let family = match params.camera {
                    Some(family) => family,
                    None => detect_family(root)?,
                };
                info!(input = %params.input, %family, "Importing from card");
                filesystem::import(self.context(params), family).await
            }
            Connection::Network => match params.camera {
                None | Some(CameraFamily::GoPro) => {
                    info!(input = %params.input, "Importing from network camera");
                    network::import(self.context(params), self.http.clone()).await
                }
                Some(other) => Err(ImportError::UnsupportedConnection(format!(
                    "{other} cameras are not imported over the network"
                ))),
            },
            Connection::Mtp => {
                let device = MountedMtpDevice::open(&params.input, params.buffer_size)?;
                self.import_from_device(params, Arc::new(device)).await
            }
        }
    }

    /// Imports from an MTP device implementation supplied by the caller.
    pub async fn import_from_device(
        &self,
        params: ImportParams,
        device: Arc<dyn MtpDevice>,
    ) -> Result<ImportResult, ImportError> {
        info!(device = device.name(), "Importing from mtp device");
        mtp::import(self.context(params), device).await
    }
}
