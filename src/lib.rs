//! # Media Importer
//!
//! Offload photos, videos and their companion files from action cameras, drones, 360 cameras
//! and phones into a library sorted by capture date, location and device.
//!
//! ## Key Features
//!
//! - **SD cards**: GoPro (HERO2 and newer), DJI and Insta360 cards, with automatic detection.
//! - **Network cameras**: GoPro's HTTP API, including turbo transfer mode that is always switched
//!   off again, even when the process is interrupted.
//! - **MTP devices**: GoPro cameras and Android phones exposed over USB.
//! - **Location folders**: GPS from GoPro telemetry tracks, DJI subtitle files, phone video tags
//!   and EXIF, reverse geocoded offline.
//! - **Highlight sorting**: GoPro videos with many highlight marks near their end are sorted
//!   into more significant folders.
//!
//! Every run returns an [`ImportResult`](structs::ImportResult). A file that fails is recorded
//! with its error; the rest of the run carries on.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use media_importer::MediaImporter;
//! use media_importer::structs::{ImportParams, SortOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), media_importer::ImportError> {
//!     let importer = MediaImporter::builder().build()?;
//!
//!     let params = ImportParams::builder()
//!         .input("/media/me/GOPRO")
//!         .output("/home/me/Footage")
//!         .sort(SortOptions { by_camera: true, by_location: true })
//!         .build();
//!     let result = importer.import(params).await?;
//!
//!     println!("Imported: {}", result.files_imported);
//!     for error in &result.errors {
//!         println!("Failed: {error}");
//!     }
//!     Ok(())
//! }
//! ```

mod backends;
pub mod cameras;
pub mod config;
pub mod error;
pub mod extractors;
pub mod location;
pub mod media_importer;
pub mod naming;
pub mod placement;
pub mod structs;
pub mod time;
pub mod transfer;
pub mod utils;

pub use backends::mtp::{MountedMtpDevice, MtpDevice, MtpObject};
pub use config::EngineConfig;
pub use error::{ExtractError, ImportError, ItemError, TransferError};
pub use media_importer::MediaImporter;
pub use structs::{ImportParams, ImportResult};
