//! SD card and mass-storage import: walk the media folders, classify, filter and copy.

use super::ImportContext;
use super::layout::{self, VideoFacts};
use crate::cameras::gopro::{self, ProtocolVersion};
use crate::cameras::{FileKind, FileTypeMatch, MediaItem, MediaSource, classify, dji, insta360};
use crate::error::{ImportError, ItemError};
use crate::extractors::exif;
use crate::location::{DjiLocation, GoProLocation, LocationService};
use crate::structs::{CameraFamily, ImportResult};
use crate::time::{date_folder, local_wall_clock};
use crate::transfer::{ResultCollector, WorkerPool, copy_file};
use crate::utils::{file_name_string, list_files_walkdir_filtered, matching_folders};
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What is known about the card before its files are looked at.
struct Card {
    family: CameraFamily,
    version: Option<ProtocolVersion>,
    table: &'static [FileTypeMatch],
    folder: &'static Regex,
    locator: Option<Arc<dyn LocationService>>,
}

impl Card {
    /// Reads the card's identity. Returns the card and the device name it reports, if any.
    fn open(
        ctx: &ImportContext,
        root: &Path,
        family: CameraFamily,
    ) -> Result<(Self, Option<String>), ImportError> {
        match family {
            CameraFamily::GoPro => {
                let version_info = gopro::read_version(root)?;
                let version = gopro::sd_card_version(&version_info.firmware_version)?;
                info!(
                    camera = %version_info.camera_type,
                    firmware = %version_info.firmware_version,
                    serial = %version_info.camera_serial_number,
                    "Found GoPro card"
                );
                let locator = GoProLocation::new(
                    ctx.demuxer.clone(),
                    Arc::clone(&ctx.exif),
                    ctx.config.gps.clone(),
                );
                Ok((
                    Self {
                        family,
                        version: Some(version),
                        table: gopro::file_table(version),
                        folder: gopro::media_folder(),
                        locator: Some(Arc::new(locator)),
                    },
                    Some(version_info.camera_type),
                ))
            }
            CameraFamily::Dji => Ok((
                Self {
                    family,
                    version: None,
                    table: dji::file_table(),
                    folder: dji::media_folder(),
                    locator: Some(Arc::new(DjiLocation::new(Arc::clone(&ctx.exif)))),
                },
                None,
            )),
            CameraFamily::Insta360 => Ok((
                Self {
                    family,
                    version: None,
                    table: insta360::file_table(),
                    folder: insta360::media_folder(),
                    locator: None,
                },
                Some(insta360::read_device_name(root)),
            )),
            CameraFamily::Phone => Err(ImportError::UnsupportedConnection(format!(
                "{family} cameras are imported over mtp"
            ))),
        }
    }
}

/// Classifies one walked file, reading its size and modification time.
fn classify_local(path: &Path, table: &[FileTypeMatch]) -> Option<MediaItem> {
    let name = file_name_string(path);
    let Some(row) = classify(table, &name) else {
        debug!(file = %name, "Not a recognized media file");
        return None;
    };
    let modified = match std::fs::metadata(path).and_then(|m| Ok((m.len(), m.modified()?))) {
        Ok(found) => found,
        Err(err) => {
            warn!(file = %name, error = %err, "Could not read file metadata");
            return None;
        }
    };
    let (size, modified) = modified;
    Some(MediaItem::classified(
        MediaSource::Local(path.to_path_buf()),
        name,
        size,
        local_wall_clock(modified),
        modified,
        row,
    ))
}

/// Walks every media folder below `DCIM` and classifies what it finds.
fn scan(root: &Path, folder: &Regex, table: &[FileTypeMatch]) -> Result<Vec<MediaItem>, ImportError> {
    let dcim = root.join("DCIM");
    let mut files = Vec::new();
    for media_folder in matching_folders(&dcim, folder)? {
        debug!(folder = %media_folder.display(), "Scanning media folder");
        files.extend(list_files_walkdir_filtered(&media_folder)?);
    }
    Ok(files
        .par_iter()
        .filter_map(|path| classify_local(path, table))
        .collect())
}

/// Device name of a DJI card: the first photo's camera model, mapped to a product name.
async fn dji_device_name(ctx: &ImportContext, items: &[MediaItem]) -> String {
    let Some(path) = items
        .iter()
        .find(|item| item.kind == FileKind::Photo)
        .and_then(MediaItem::local_path)
    else {
        return dji::DEFAULT_DEVICE_NAME.to_string();
    };
    match ctx.exif.numeric(path).await {
        Ok(numeric) => exif::camera_model(&numeric)
            .map_or_else(|| dji::DEFAULT_DEVICE_NAME.to_string(), dji::device_name_from_model),
        Err(err) => {
            debug!(file = %path.display(), error = %err, "Could not read camera model");
            dji::DEFAULT_DEVICE_NAME.to_string()
        }
    }
}

/// Pulls GoPro proxies out of the item list and pairs them with their videos by name.
fn pair_proxies(
    version: ProtocolVersion,
    items: Vec<MediaItem>,
) -> (Vec<(MediaItem, Option<MediaItem>)>, Vec<MediaItem>) {
    let (proxies, media): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| item.kind == FileKind::LowResProxy);
    let mut proxies: HashMap<String, MediaItem> = proxies
        .into_iter()
        .map(|proxy| (proxy.name.clone(), proxy))
        .collect();

    let paired = media
        .into_iter()
        .map(|item| {
            let proxy = (item.kind == FileKind::Video)
                .then(|| proxies.remove(&gopro::proxy_name(version, &item.name)))
                .flatten();
            (item, proxy)
        })
        .collect();
    let mut orphans: Vec<MediaItem> = proxies.into_values().collect();
    orphans.sort_by(|a, b| a.name.cmp(&b.name));
    (paired, orphans)
}

pub(crate) async fn import(
    ctx: Arc<ImportContext>,
    family: CameraFamily,
) -> Result<ImportResult, ImportError> {
    let root = PathBuf::from(&ctx.params.input);
    if !root.is_dir() {
        return Err(ImportError::NotFound(ctx.params.input.clone()));
    }
    let (card, reported_name) = Card::open(&ctx, &root, family)?;

    let mut items = {
        let root = root.clone();
        let (folder, table) = (card.folder, card.table);
        tokio::task::spawn_blocking(move || scan(&root, folder, table))
            .await
            .map_err(|err| ImportError::Io(std::io::Error::other(err)))??
    };
    ctx.apply_embedded_dates(&mut items).await;
    ctx.retain_in_range(&mut items);
    if ctx.params.skip_aux {
        items.retain(|item| !item.kind.is_auxiliary());
    }

    let reported_name = match reported_name {
        Some(name) => name,
        None if ctx.params.camera_name.is_some() => String::new(),
        None => dji_device_name(&ctx, &items).await,
    };
    let device_name: Arc<str> = ctx.params.device_name(&reported_name).into();
    info!(device = %device_name, items = items.len(), "Importing from card");

    let (jobs, orphans) = match card.version {
        Some(version) => pair_proxies(version, items),
        None => (items.into_iter().map(|item| (item, None)).collect(), Vec::new()),
    };

    let card = Arc::new(card);
    let collector = ResultCollector::new();
    let mut pool = WorkerPool::new(ctx.config.transfer.workers, collector.clone());
    for (item, proxy) in jobs
        .into_iter()
        .chain(orphans.into_iter().map(|orphan| (orphan, None)))
    {
        let name = item.name.clone();
        pool.spawn(
            name,
            import_item(
                Arc::clone(&ctx),
                Arc::clone(&card),
                Arc::clone(&device_name),
                item,
                proxy,
                collector.clone(),
            ),
        );
    }
    pool.join().await;
    Ok(collector.finish())
}

fn copy_error(err: &std::io::Error) -> std::io::Error {
    std::io::Error::new(err.kind(), err.to_string())
}

async fn import_item(
    ctx: Arc<ImportContext>,
    card: Arc<Card>,
    device_name: Arc<str>,
    item: MediaItem,
    proxy: Option<MediaItem>,
    collector: ResultCollector,
) -> Result<(), ItemError> {
    let Some(source) = item.local_path() else {
        return Err(ItemError::UnrecognizedMediaFormat {
            file: item.name.clone(),
        });
    };
    let date = date_folder(&item.captured, ctx.params.date_format.as_deref());
    let base = ctx
        .placement
        .resolve(
            &ctx.params.output,
            &date,
            &device_name,
            source,
            card.locator.clone(),
        )
        .await;

    let facts = if item.kind == FileKind::Video && card.family != CameraFamily::Insta360 {
        ctx.local_video_facts(source, card.family == CameraFamily::GoPro)
            .await
    } else {
        VideoFacts::default()
    };

    let outcome = match &base {
        Ok(base) => {
            let dest_dir = base.join(layout::subdir(card.family, &item, &facts));
            let dest_name = layout::file_name(card.family, card.version, &item);
            copy_into(&ctx, source, &dest_dir, &dest_name, &item).await
        }
        Err(err) => Err(ItemError::placement(&item.name, copy_error(err))),
    };

    if let Some(proxy) = proxy {
        let proxy_outcome = match (&base, proxy.local_path()) {
            (Ok(base), Some(proxy_source)) => {
                let dest_dir = base.join(layout::subdir(card.family, &proxy, &facts));
                // Named after the renamed video so editors pick it up as its proxy.
                let dest_name = layout::file_name(card.family, card.version, &item);
                copy_into(&ctx, proxy_source, &dest_dir, &dest_name, &proxy).await
            }
            (Err(err), _) => Err(ItemError::placement(&proxy.name, copy_error(err))),
            (_, None) => Err(ItemError::UnrecognizedMediaFormat {
                file: proxy.name.clone(),
            }),
        };
        collector.record(&proxy.name, proxy_outcome);
    }
    outcome
}

async fn copy_into(
    ctx: &ImportContext,
    source: &Path,
    dest_dir: &Path,
    dest_name: &str,
    item: &MediaItem,
) -> Result<(), ItemError> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|err| ItemError::placement(&item.name, err))?;
    let dest = dest_dir.join(dest_name);
    let bytes = copy_file(
        source,
        &dest,
        ctx.params.buffer_size,
        ctx.destination_mtime(item),
        ctx.progress.as_ref(),
    )
    .await
    .map_err(|err| ItemError::transfer(&item.name, err))?;
    debug!(file = %item.name, bytes, dest = %dest.display(), "Copied");
    Ok(())
}
