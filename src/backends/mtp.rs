//! Import from devices that expose their storage over MTP: GoPro cameras plugged in over USB
//! and Android phones.

use super::ImportContext;
use super::layout::{self, VideoFacts};
use crate::cameras::gopro::{self, ProtocolVersion};
use crate::cameras::{FileTypeMatch, MediaItem, MediaSource, classify, phone};
use crate::error::{ImportError, ItemError, TransferError};
use crate::location::{GoProLocation, LocationService, PhoneLocation};
use crate::structs::{CameraFamily, ImportResult};
use crate::time::{date_folder, local_wall_clock, wall_clock_to_system_time};
use crate::transfer::{ProgressSink, ResultCollector, WorkerPool, copy_file};
use crate::utils::file_name_string;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// A file or folder on the device, addressed relative to the device root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtpObject {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub created: NaiveDateTime,
    pub is_dir: bool,
}

/// The few operations the importer needs from an MTP device.
#[async_trait]
pub trait MtpDevice: Send + Sync {
    /// Name the device announces, e.g. `HERO9 BLACK`.
    fn name(&self) -> &str;

    /// Every object on the device's storage.
    async fn list(&self) -> Result<Vec<MtpObject>, ImportError>;

    /// Copies one object to a new file at `dest` and stamps it with `modified`.
    async fn copy_to(
        &self,
        object: &MtpObject,
        dest: &Path,
        modified: SystemTime,
        progress: &dyn ProgressSink,
    ) -> Result<u64, TransferError>;

    /// A path the object can be read from directly, if the device is mounted.
    fn local_path(&self, _object: &MtpObject) -> Option<PathBuf> {
        None
    }
}

/// An MTP device mounted into the filesystem by gvfs or jmtpfs.
#[derive(Debug, Clone)]
pub struct MountedMtpDevice {
    root: PathBuf,
    name: String,
    buffer_size: usize,
}

impl MountedMtpDevice {
    /// Opens a mount point. The device name is the mount folder's name, which for gvfs looks
    /// like `mtp:host=GoPro_HERO9_BLACK_<serial>`.
    pub fn open(root: impl Into<PathBuf>, buffer_size: usize) -> Result<Self, ImportError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ImportError::NotFound(root.display().to_string()));
        }
        let name = file_name_string(&root);
        Ok(Self {
            root,
            name,
            buffer_size,
        })
    }
}

fn skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name == "System Volume Information"
        || name.starts_with(".trashed-")
        || name == gopro::GET_STARTED_FILE
}

fn walk_objects(root: &Path) -> Result<Vec<MtpObject>, ImportError> {
    let mut objects = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !skipped(e))
    {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_file() && metadata.len() == 0 {
            continue;
        }
        // Mounts report the object's capture time as the modification time.
        let created = metadata.modified()?;
        let path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        objects.push(MtpObject {
            path,
            name: entry.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
            created: local_wall_clock(created),
            is_dir: metadata.is_dir(),
        });
    }
    Ok(objects)
}

#[async_trait]
impl MtpDevice for MountedMtpDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self) -> Result<Vec<MtpObject>, ImportError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || walk_objects(&root))
            .await
            .map_err(|err| ImportError::Io(std::io::Error::other(err)))?
    }

    async fn copy_to(
        &self,
        object: &MtpObject,
        dest: &Path,
        modified: SystemTime,
        progress: &dyn ProgressSink,
    ) -> Result<u64, TransferError> {
        copy_file(
            &self.root.join(&object.path),
            dest,
            self.buffer_size,
            modified,
            progress,
        )
        .await
    }

    fn local_path(&self, object: &MtpObject) -> Option<PathBuf> {
        Some(self.root.join(&object.path))
    }
}

/// How one device's files are recognized and located.
struct Profile {
    family: CameraFamily,
    version: Option<ProtocolVersion>,
    table: &'static [FileTypeMatch],
    locator: Arc<dyn LocationService>,
}

impl Profile {
    fn for_device(ctx: &ImportContext, device: &dyn MtpDevice) -> Result<Self, ImportError> {
        match ctx.params.camera.unwrap_or(CameraFamily::GoPro) {
            CameraFamily::GoPro => {
                let version = gopro::mtp_version(device.name())?;
                Ok(Self {
                    family: CameraFamily::GoPro,
                    version: Some(version),
                    table: gopro::file_table(version),
                    locator: Arc::new(GoProLocation::new(
                        ctx.demuxer.clone(),
                        Arc::clone(&ctx.exif),
                        ctx.config.gps.clone(),
                    )),
                })
            }
            CameraFamily::Phone => Ok(Self {
                family: CameraFamily::Phone,
                version: None,
                table: phone::file_table(),
                locator: Arc::new(PhoneLocation::new(
                    ctx.demuxer.clone(),
                    Arc::clone(&ctx.exif),
                )),
            }),
            other => Err(ImportError::UnsupportedConnection(format!(
                "{other} cameras are not imported over mtp"
            ))),
        }
    }

    /// Whether an object sits in one of the family's media folders below `DCIM`.
    fn in_media_folder(&self, object: &MtpObject) -> bool {
        let Some(parent) = object.path.parent() else {
            return false;
        };
        let in_dcim = parent
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|name| name == "DCIM");
        let folder = parent
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        in_dcim
            && match self.family {
                CameraFamily::Phone => folder == phone::MEDIA_FOLDER,
                _ => gopro::media_folder().is_match(&folder),
            }
    }
}

/// The device object an item was classified from.
fn object_of(item: &MediaItem) -> Option<MtpObject> {
    match &item.source {
        MediaSource::Device(path) => Some(MtpObject {
            path: path.clone(),
            name: item.name.clone(),
            size: item.size,
            created: item.captured,
            is_dir: false,
        }),
        _ => None,
    }
}

pub(crate) async fn import(
    ctx: Arc<ImportContext>,
    device: Arc<dyn MtpDevice>,
) -> Result<ImportResult, ImportError> {
    let profile = Arc::new(Profile::for_device(&ctx, device.as_ref())?);
    let device_name: Arc<str> = ctx.params.device_name(device.name()).into();
    info!(device = %device_name, family = %profile.family, "Importing over mtp");

    let mut items: Vec<MediaItem> = device
        .list()
        .await?
        .into_iter()
        .filter(|object| !object.is_dir && profile.in_media_folder(object))
        .filter_map(|object| {
            let Some(row) = classify(profile.table, &object.name) else {
                debug!(file = %object.name, "Not a recognized media file");
                return None;
            };
            let modified = wall_clock_to_system_time(&object.created, ctx.config.camera_timezone)
                .unwrap_or(SystemTime::UNIX_EPOCH);
            Some(MediaItem::classified(
                MediaSource::Device(object.path),
                object.name,
                object.size,
                object.created,
                modified,
                row,
            ))
        })
        .collect();
    ctx.retain_in_range(&mut items);
    if ctx.params.skip_aux {
        items.retain(|item| !item.kind.is_auxiliary());
    }

    let collector = ResultCollector::new();
    let mut pool = WorkerPool::new(ctx.config.transfer.workers, collector.clone());
    for item in items {
        pool.spawn(
            item.name.clone(),
            import_item(
                Arc::clone(&ctx),
                Arc::clone(&device),
                Arc::clone(&profile),
                Arc::clone(&device_name),
                item,
            ),
        );
    }
    pool.join().await;
    Ok(collector.finish())
}

async fn import_item(
    ctx: Arc<ImportContext>,
    device: Arc<dyn MtpDevice>,
    profile: Arc<Profile>,
    device_name: Arc<str>,
    item: MediaItem,
) -> Result<(), ItemError> {
    let Some(object) = object_of(&item) else {
        return Err(ItemError::UnrecognizedMediaFormat {
            file: item.name.clone(),
        });
    };
    let local = device.local_path(&object);
    let date = date_folder(&item.captured, ctx.params.date_format.as_deref());
    let base = ctx
        .placement
        .resolve(
            &ctx.params.output,
            &date,
            &device_name,
            local.as_deref().unwrap_or(object.path.as_path()),
            local.is_some().then(|| Arc::clone(&profile.locator)),
        )
        .await
        .map_err(|err| ItemError::placement(&item.name, err))?;

    let dir = base.join(layout::subdir(profile.family, &item, &VideoFacts::default()));
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|err| ItemError::placement(&item.name, err))?;
    let dest = dir.join(layout::file_name(profile.family, profile.version, &item));
    let bytes = device
        .copy_to(
            &object,
            &dest,
            ctx.destination_mtime(&item),
            ctx.progress.as_ref(),
        )
        .await
        .map_err(|err| ItemError::transfer(&item.name, err))?;
    debug!(file = %item.name, bytes, dest = %dest.display(), "Copied from device");
    Ok(())
}
