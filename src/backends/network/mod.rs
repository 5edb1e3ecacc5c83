//! GoPro import over the camera's HTTP API.
//!
//! The run probes the camera, switches turbo transfer mode on where supported, stages every
//! download in `<output>/unsorted`, moves it into place once its destination is known and
//! switches turbo mode off again, also when the process is interrupted.

mod client;
mod models;
mod session;

pub(crate) use client::CameraClient;
use client::CameraEndpoints;
use session::{DeviceSession, Interrupt, spawn_interrupt_guard};

use super::ImportContext;
use super::layout::{self, VideoFacts};
use crate::cameras::gopro;
use crate::cameras::{CaptureMode, FileKind, MediaItem, MediaSource, classify};
use crate::error::{ImportError, ItemError, TransferError};
use crate::extractors::mp4::HighlightSet;
use crate::location::{GoProLocation, LocationService};
use crate::naming::{frame_rate, importance_label, rfps_folder};
use crate::structs::{CameraFamily, ImportResult};
use crate::time::{date_folder, in_range, wall_clock_from_epoch, wall_clock_to_system_time};
use crate::transfer::{ResultCollector, WorkerPool, download_to};
use models::MediaEntry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const STAGING_DIR: &str = "unsorted";

pub(crate) async fn import(
    ctx: Arc<ImportContext>,
    http: reqwest::Client,
) -> Result<ImportResult, ImportError> {
    import_with_interrupt(ctx, http, Interrupt::process()).await
}

pub(crate) async fn import_with_interrupt(
    ctx: Arc<ImportContext>,
    http: reqwest::Client,
    interrupt: Interrupt,
) -> Result<ImportResult, ImportError> {
    let endpoints = CameraEndpoints::from_input(&ctx.params.input)?;
    let client = Arc::new(CameraClient::new(http, endpoints, &ctx.config.network));
    let session = Arc::new(DeviceSession::open(client).await?);

    let guard = spawn_interrupt_guard(Arc::clone(&session), interrupt);
    session.enable_fast_mode().await;
    let turbo = session.fast_mode_enabled().await;
    debug!(turbo, "Camera session ready");

    let outcome = run(&ctx, &session).await;

    session.disable_fast_mode().await;
    guard.release();
    outcome
}

/// Name the pool records a job under: multishot groups are known by their first frame.
fn job_name(entry: &MediaEntry, kind: FileKind) -> String {
    match (kind, entry.frames()) {
        (FileKind::MultishotFrame, Some(frames)) => {
            gopro::multishot_frame_name(&entry.name, *frames.start())
        }
        _ => entry.name.clone(),
    }
}

async fn run(
    ctx: &Arc<ImportContext>,
    session: &Arc<DeviceSession>,
) -> Result<ImportResult, ImportError> {
    let media = session.client().media_list().await?;
    let staging = ctx.params.output.join(STAGING_DIR);
    tokio::fs::create_dir_all(&staging).await?;

    let collector = ResultCollector::new();
    let remote = Arc::new(RemoteImport {
        ctx: Arc::clone(ctx),
        session: Arc::clone(session),
        device_name: ctx.params.device_name(&session.model),
        locator: Arc::new(GoProLocation::new(
            ctx.demuxer.clone(),
            Arc::clone(&ctx.exif),
            ctx.config.gps.clone(),
        )),
        staging: staging.clone(),
        collector: collector.clone(),
    });
    let table = gopro::file_table(session.version);
    let mut pool = WorkerPool::new(ctx.config.transfer.workers, collector.clone());

    for folder in media.media {
        for entry in folder.files {
            let captured = wall_clock_from_epoch(entry.modified).unwrap_or_default();
            if !in_range(ctx.params.date_range.as_ref(), &captured) {
                debug!(file = %entry.name, %captured, "Outside date range");
                continue;
            }
            let Some(row) = classify(table, &entry.name) else {
                collector.failure(ItemError::UnrecognizedMediaFormat { file: entry.name });
                continue;
            };
            let modified = wall_clock_to_system_time(&captured, ctx.config.camera_timezone)
                .unwrap_or(SystemTime::UNIX_EPOCH + Duration::from_secs(entry.modified.max(0) as u64));
            let item = MediaItem::classified(
                MediaSource::Remote {
                    folder: folder.directory.clone(),
                    name: entry.name.clone(),
                },
                entry.name.clone(),
                entry.size,
                captured,
                modified,
                row,
            );
            if ctx.params.skip_aux && item.kind.is_auxiliary() {
                debug!(file = %item.name, "Skipping auxiliary file");
                continue;
            }
            pool.spawn(
                job_name(&entry, item.kind),
                Arc::clone(&remote).import(folder.directory.clone(), entry, item),
            );
        }
    }
    pool.join().await;

    if let Err(err) = tokio::fs::remove_dir_all(&staging).await {
        warn!(dir = %staging.display(), error = %err, "Could not remove staging directory");
    }
    let result = collector.finish();
    info!(
        imported = result.files_imported,
        failed = result.files_not_imported.len(),
        "Network import finished"
    );
    Ok(result)
}

/// Shared state of the transfer jobs of one network run.
struct RemoteImport {
    ctx: Arc<ImportContext>,
    session: Arc<DeviceSession>,
    device_name: String,
    locator: Arc<dyn LocationService>,
    staging: PathBuf,
    collector: ResultCollector,
}

impl RemoteImport {
    fn client(&self) -> &CameraClient {
        self.session.client()
    }

    async fn import(
        self: Arc<Self>,
        folder: String,
        entry: MediaEntry,
        item: MediaItem,
    ) -> Result<(), ItemError> {
        match item.kind {
            FileKind::Video => self.video(&folder, &entry, item).await,
            FileKind::Photo => self.photo(&folder, &entry, item).await,
            FileKind::MultishotFrame => self.multishot(&folder, &entry, item).await,
            _ => {
                let (staged, base) = self.stage_and_locate(&folder, &item).await?;
                self.settle(&staged, &base, &item, &VideoFacts::default())
                    .await
            }
        }
    }

    async fn fetch(
        &self,
        folder: &str,
        dest: &Path,
        item: &MediaItem,
    ) -> Result<u64, ItemError> {
        let response = self
            .client()
            .download(folder, &item.name)
            .await
            .map_err(|err| ItemError::transfer(&item.name, err))?;
        download_to(
            response,
            dest,
            self.ctx.destination_mtime(item),
            self.ctx.progress.as_ref(),
        )
        .await
        .map_err(|err| ItemError::transfer(&item.name, err))
    }

    /// Downloads into `<staging>/<folder>` and resolves the placement folder from the
    /// downloaded file. Names repeat across DCIM folders, so the folder is kept.
    async fn stage_and_locate(
        &self,
        folder: &str,
        item: &MediaItem,
    ) -> Result<(PathBuf, PathBuf), ItemError> {
        let dir = self.staging.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| ItemError::placement(&item.name, err))?;
        let staged = dir.join(&item.name);
        self.fetch(folder, &staged, item).await?;

        let date = date_folder(&item.captured, self.ctx.params.date_format.as_deref());
        let base = self
            .ctx
            .placement
            .resolve(
                &self.ctx.params.output,
                &date,
                &self.device_name,
                &staged,
                Some(Arc::clone(&self.locator)),
            )
            .await
            .map_err(|err| ItemError::placement(&item.name, err))?;
        Ok((staged, base))
    }

    async fn destination_dir(
        &self,
        base: &Path,
        item: &MediaItem,
        facts: &VideoFacts,
    ) -> Result<PathBuf, ItemError> {
        let dir = base.join(layout::subdir(CameraFamily::GoPro, item, facts));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| ItemError::placement(&item.name, err))?;
        Ok(dir)
    }

    /// Moves a staged download to its final place.
    async fn settle(
        &self,
        staged: &Path,
        base: &Path,
        item: &MediaItem,
        facts: &VideoFacts,
    ) -> Result<(), ItemError> {
        let dir = self.destination_dir(base, item, facts).await?;
        let dest = dir.join(layout::file_name(
            CameraFamily::GoPro,
            Some(self.session.version),
            item,
        ));
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            return Err(ItemError::transfer(
                &item.name,
                TransferError::AlreadyExists(dest),
            ));
        }
        tokio::fs::rename(staged, &dest)
            .await
            .map_err(|err| ItemError::transfer(&item.name, err))?;
        debug!(file = %item.name, dest = %dest.display(), "Placed");
        Ok(())
    }

    /// A companion of `parent` that can no longer be transferred.
    fn abandon(&self, companions: impl IntoIterator<Item = String>, parent: &str) {
        for file in companions {
            self.collector.failure(ItemError::Aborted {
                file,
                reason: format!("{parent} was not imported"),
            });
        }
    }

    fn companion(&self, folder: &str, name: &str, parent: &MediaItem, size: u64) -> Option<MediaItem> {
        let row = classify(gopro::file_table(self.session.version), name)?;
        Some(MediaItem::classified(
            MediaSource::Remote {
                folder: folder.to_string(),
                name: name.to_string(),
            },
            name,
            size,
            parent.captured,
            parent.modified,
            row,
        ))
    }

    async fn video_facts(&self, folder: &str, item: &MediaItem) -> VideoFacts {
        let metadata = match self.client().metadata(folder, &item.name).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(
                    file = %item.name,
                    error = %err,
                    "No video metadata, placing without importance and resolution folders"
                );
                return VideoFacts::default();
            }
        };
        let highlights = HighlightSet {
            count: metadata.highlights.len() as u32,
            timestamps_ms: metadata.highlights,
        };
        VideoFacts {
            importance: importance_label(
                metadata.duration_secs,
                &highlights,
                &self.ctx.params.tag_names,
            )
            .map(str::to_string),
            rfps: (item.mode != CaptureMode::Spherical).then(|| {
                rfps_folder(
                    metadata.width,
                    metadata.height,
                    frame_rate(metadata.fps, metadata.fps_denom),
                )
            }),
        }
    }

    async fn video(
        &self,
        folder: &str,
        entry: &MediaEntry,
        item: MediaItem,
    ) -> Result<(), ItemError> {
        let proxy_name = (entry.glrv > 0 && !self.ctx.params.skip_aux)
            .then(|| gopro::proxy_name(self.session.version, &item.name));

        let (staged, base) = match self.stage_and_locate(folder, &item).await {
            Ok(prepared) => prepared,
            Err(err) => {
                self.abandon(proxy_name, &item.name);
                return Err(err);
            }
        };
        let facts = self.video_facts(folder, &item).await;
        let placed = self.settle(&staged, &base, &item, &facts).await;

        if let Some(proxy_name) = proxy_name {
            let outcome = match self.companion(folder, &proxy_name, &item, entry.glrv) {
                Some(proxy) => self.proxy(folder, &proxy, &base, &facts, &item).await,
                None => Err(ItemError::UnrecognizedMediaFormat {
                    file: proxy_name.clone(),
                }),
            };
            self.collector.record(&proxy_name, outcome);
        }
        placed
    }

    /// Downloads a proxy straight to `videos/proxy`, named after the renamed video.
    async fn proxy(
        &self,
        folder: &str,
        proxy: &MediaItem,
        base: &Path,
        facts: &VideoFacts,
        video: &MediaItem,
    ) -> Result<(), ItemError> {
        let dir = self.destination_dir(base, proxy, facts).await?;
        let dest = dir.join(layout::file_name(
            CameraFamily::GoPro,
            Some(self.session.version),
            video,
        ));
        self.fetch(folder, &dest, proxy).await?;
        Ok(())
    }

    async fn photo(
        &self,
        folder: &str,
        entry: &MediaEntry,
        item: MediaItem,
    ) -> Result<(), ItemError> {
        let raw_name = entry
            .has_raw()
            .then(|| gopro::raw_companion_name(&item.name));

        let (staged, base) = match self.stage_and_locate(folder, &item).await {
            Ok(prepared) => prepared,
            Err(err) => {
                self.abandon(raw_name, &item.name);
                return Err(err);
            }
        };
        let placed = self
            .settle(&staged, &base, &item, &VideoFacts::default())
            .await;

        if let Some(raw_name) = raw_name {
            let size = self.client().content_length(folder, &raw_name).await;
            debug!(file = %raw_name, size, "Raw companion");
            let outcome = match self.companion(folder, &raw_name, &item, size.unwrap_or(0)) {
                Some(raw) => self.direct(folder, &raw, &base).await,
                None => Err(ItemError::UnrecognizedMediaFormat {
                    file: raw_name.clone(),
                }),
            };
            self.collector.record(&raw_name, outcome);
        }
        placed
    }

    /// Downloads an item whose folder is already known, skipping the staging directory.
    async fn direct(&self, folder: &str, item: &MediaItem, base: &Path) -> Result<(), ItemError> {
        let dir = self
            .destination_dir(base, item, &VideoFacts::default())
            .await?;
        self.fetch(folder, &dir.join(&item.name), item).await?;
        Ok(())
    }

    /// A burst or time-lapse group: the first frame decides the placement of the whole group.
    async fn multishot(
        &self,
        folder: &str,
        entry: &MediaEntry,
        item: MediaItem,
    ) -> Result<(), ItemError> {
        let Some(frames) = entry.frames() else {
            let (staged, base) = self.stage_and_locate(folder, &item).await?;
            return self
                .settle(&staged, &base, &item, &VideoFacts::default())
                .await;
        };
        let frame = |name: String| MediaItem {
            source: MediaSource::Remote {
                folder: folder.to_string(),
                name: name.clone(),
            },
            name,
            ..item.clone()
        };
        let mut names = frames.map(|i| gopro::multishot_frame_name(&item.name, i));
        let Some(first) = names.next().map(&frame) else {
            return Err(ItemError::UnrecognizedMediaFormat {
                file: item.name.clone(),
            });
        };

        let (staged, base) = match self.stage_and_locate(folder, &first).await {
            Ok(prepared) => prepared,
            Err(err) => {
                self.abandon(names, &first.name);
                return Err(err);
            }
        };
        let placed = self
            .settle(&staged, &base, &first, &VideoFacts::default())
            .await;
        for name in names {
            let next = frame(name);
            let outcome = self.direct(folder, &next, &base).await;
            self.collector.record(&next.name, outcome);
        }
        placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::tests::context;
    use crate::config::{EngineConfig, PlacementComponent};
    use crate::structs::{Connection, ImportParams, SortOptions};
    use axum::extract::{Path as UrlPath, Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::net::TcpListener;
    use tokio::sync::{Notify, oneshot};

    #[derive(Default)]
    struct MockCamera {
        firmware: String,
        media: Value,
        metadata: Option<Value>,
        files: HashMap<String, Vec<u8>>,
        file_delay: Duration,
        turbo_delay: Duration,
        turbo_on: AtomicUsize,
        turbo_off: AtomicUsize,
        turbo_on_requested: Notify,
        turbo_off_requested: Notify,
        first_download: Notify,
    }

    async fn info(State(camera): State<Arc<MockCamera>>) -> Json<Value> {
        Json(json!({
            "info": {
                "model_name": "HERO9 Black",
                "firmware_version": camera.firmware,
                "serial_number": "C3441324500000",
            }
        }))
    }

    async fn turbo(
        State(camera): State<Arc<MockCamera>>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        let (counter, requested) = match query.get("p").map(String::as_str) {
            Some("1") => (&camera.turbo_on, &camera.turbo_on_requested),
            _ => (&camera.turbo_off, &camera.turbo_off_requested),
        };
        requested.notify_one();
        tokio::time::sleep(camera.turbo_delay).await;
        counter.fetch_add(1, Ordering::SeqCst);
        Json(json!({}))
    }

    async fn media_list(State(camera): State<Arc<MockCamera>>) -> Json<Value> {
        Json(camera.media.clone())
    }

    async fn metadata(State(camera): State<Arc<MockCamera>>) -> Result<Json<Value>, StatusCode> {
        camera
            .metadata
            .clone()
            .map(Json)
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    async fn file(
        State(camera): State<Arc<MockCamera>>,
        UrlPath((folder, name)): UrlPath<(String, String)>,
    ) -> Result<Vec<u8>, StatusCode> {
        camera.first_download.notify_one();
        tokio::time::sleep(camera.file_delay).await;
        camera
            .files
            .get(&format!("{folder}/{name}"))
            .or_else(|| camera.files.get(&name))
            .cloned()
            .ok_or(StatusCode::NOT_FOUND)
    }

    async fn serve(camera: MockCamera) -> std::io::Result<(SocketAddr, Arc<MockCamera>)> {
        let camera = Arc::new(camera);
        let app = Router::new()
            .route("/gp/gpControl/info", get(info))
            .route("/gp/gpTurbo", get(turbo))
            .route("/gp/gpMediaList", get(media_list))
            .route("/gp/gpMediaMetadata", get(metadata))
            .route("/videos/DCIM/{folder}/{name}", get(file))
            .with_state(Arc::clone(&camera));
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok((addr, camera))
    }

    fn files(names: &[&str]) -> HashMap<String, Vec<u8>> {
        names
            .iter()
            .map(|name| (name.to_string(), format!("bytes of {name}").into_bytes()))
            .collect()
    }

    fn params(addr: SocketAddr, out: &Path) -> ImportParams {
        ImportParams::builder()
            .input(addr.to_string())
            .output(out)
            .connection(Connection::Network)
            .sort(SortOptions {
                by_camera: true,
                by_location: false,
            })
            .tag_names(vec![
                "Marked 1".to_string(),
                "Lit AF".to_string(),
                "Important".to_string(),
            ])
            .build()
    }

    fn fast_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.location.order = vec![PlacementComponent::Date, PlacementComponent::Camera];
        config.network.retry_max = 1;
        config.network.retry_wait_min_ms = 1;
        config.network.retry_wait_max_ms = 5;
        config.camera_timezone = Some(chrono_tz::UTC);
        config
    }

    fn never() -> Interrupt {
        Interrupt {
            signal: Box::pin(std::future::pending()),
            on_exit: Box::new(|| {}),
        }
    }

    fn hero9() -> MockCamera {
        MockCamera {
            firmware: "HD9.01.01.60.00".to_string(),
            media: json!({
                "id": "1",
                "media": [{
                    "d": "100GOPRO",
                    "fs": [
                        {"n": "GX010042.MP4", "mod": "1672916400", "s": "40", "glrv": "20"},
                        {"n": "GOPR0043.JPG", "mod": "1672916460", "s": "20", "raw": "1"},
                        {"n": "G0010001.JPG", "mod": "1672916520", "s": "20", "b": "1", "l": "3"},
                        {"n": "NOTES.TXT", "mod": "1672916580", "s": "3"},
                    ]
                }]
            }),
            metadata: Some(json!({
                "dur": "24", "w": "3840", "h": "2160", "fps": "60000", "fps_denom": "1001",
                "hi": [18880, 20440],
            })),
            files: files(&[
                "GX010042.MP4",
                "GL010042.LRV",
                "GOPR0043.JPG",
                "GOPR0043.GPR",
                "G0010001.JPG",
                "G0010002.JPG",
                "G0010003.JPG",
            ]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_full_network_run() -> Result<(), ImportError> {
        let (addr, camera) = serve(hero9()).await?;
        let out = TempDir::new()?;

        let result = import_with_interrupt(
            context(params(addr, out.path()), fast_config()),
            reqwest::Client::new(),
            never(),
        )
        .await?;

        assert_eq!(result.files_imported, 7, "errors: {:?}", result.errors);
        assert_eq!(result.files_not_imported, vec!["NOTES.TXT".to_string()]);
        assert_eq!(result.attempted(), 8);

        let base = out.path().join("05-01-2023").join("HERO9 Black");
        let video = base.join("videos/Lit AF/3840x2160 59/GX0042-01.MP4");
        assert_eq!(std::fs::read(&video)?, b"bytes of GX010042.MP4");
        assert_eq!(
            std::fs::metadata(&video)?.modified()?,
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_672_916_400)
        );
        let proxy = base.join("videos/proxy/3840x2160 59/GX0042-01.MP4");
        assert_eq!(std::fs::read(&proxy)?, b"bytes of GL010042.LRV");
        assert!(base.join("photos/GOPR0043.JPG").is_file());
        assert!(base.join("photos/raw/GOPR0043.GPR").is_file());
        for frame in ["G0010001.JPG", "G0010002.JPG", "G0010003.JPG"] {
            assert!(base.join("multishot/G001").join(frame).is_file(), "{frame}");
        }
        assert!(!out.path().join(STAGING_DIR).exists(), "staging dir is removed");

        assert_eq!(camera.turbo_on.load(Ordering::SeqCst), 1);
        assert_eq!(camera.turbo_off.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_turbo_untouched_on_older_firmware() -> Result<(), ImportError> {
        let (addr, camera) = serve(MockCamera {
            firmware: "HD7.01.01.90.00".to_string(),
            ..hero9()
        })
        .await?;
        let out = TempDir::new()?;

        let result = import_with_interrupt(
            context(params(addr, out.path()), fast_config()),
            reqwest::Client::new(),
            never(),
        )
        .await?;

        assert_eq!(result.files_imported, 7, "errors: {:?}", result.errors);
        assert_eq!(camera.turbo_on.load(Ordering::SeqCst), 0);
        assert_eq!(camera.turbo_off.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_metadata_and_proxy() -> Result<(), ImportError> {
        let (addr, _camera) = serve(MockCamera {
            metadata: None,
            files: files(&["GX010042.MP4", "GOPR0043.JPG", "G0010001.JPG"]),
            ..hero9()
        })
        .await?;
        let out = TempDir::new()?;

        let result = import_with_interrupt(
            context(params(addr, out.path()), fast_config()),
            reqwest::Client::new(),
            never(),
        )
        .await?;

        let base = out.path().join("05-01-2023").join("HERO9 Black");
        assert!(base.join("videos/GX0042-01.MP4").is_file());
        let mut failed = result.files_not_imported.clone();
        failed.sort();
        assert_eq!(
            failed,
            vec![
                "G0010002.JPG",
                "G0010003.JPG",
                "GL010042.LRV",
                "GOPR0043.GPR",
                "NOTES.TXT"
            ]
        );
        assert_eq!(result.files_imported, 3);
        assert_eq!(result.attempted(), 8);
        Ok(())
    }

    #[tokio::test]
    async fn test_interrupt_disables_fast_mode_once() -> Result<(), ImportError> {
        let (addr, camera) = serve(MockCamera {
            file_delay: Duration::from_millis(300),
            ..hero9()
        })
        .await?;
        let out = TempDir::new()?;
        let (trigger, signal) = oneshot::channel::<()>();
        let (exited, on_exit) = oneshot::channel::<()>();
        let interrupt = Interrupt {
            signal: Box::pin(async move {
                let _ = signal.await;
            }),
            on_exit: Box::new(move || {
                let _ = exited.send(());
            }),
        };

        let run = tokio::spawn(import_with_interrupt(
            context(params(addr, out.path()), fast_config()),
            reqwest::Client::new(),
            interrupt,
        ));
        camera.first_download.notified().await;
        let _ = trigger.send(());
        let _ = on_exit.await;

        assert_eq!(camera.turbo_on.load(Ordering::SeqCst), 1);
        assert_eq!(camera.turbo_off.load(Ordering::SeqCst), 1);

        // The exit hook does not stop the process here, so the run also reaches its own end.
        let _ = run.await;
        assert_eq!(camera.turbo_off.load(Ordering::SeqCst), 1);
        Ok(())
    }

    /// An interrupt whose exit hook reports the turbo counters at the moment it runs.
    fn watched_interrupt(
        camera: &Arc<MockCamera>,
    ) -> (oneshot::Sender<()>, oneshot::Receiver<(usize, usize)>, Interrupt) {
        let (trigger, signal) = oneshot::channel::<()>();
        let (exited, on_exit) = oneshot::channel::<(usize, usize)>();
        let camera = Arc::clone(camera);
        let interrupt = Interrupt {
            signal: Box::pin(async move {
                let _ = signal.await;
            }),
            on_exit: Box::new(move || {
                let _ = exited.send((
                    camera.turbo_on.load(Ordering::SeqCst),
                    camera.turbo_off.load(Ordering::SeqCst),
                ));
            }),
        };
        (trigger, on_exit, interrupt)
    }

    #[tokio::test]
    async fn test_interrupt_while_enabling_waits_and_disables() -> Result<(), ImportError> {
        let (addr, camera) = serve(MockCamera {
            turbo_delay: Duration::from_millis(300),
            ..hero9()
        })
        .await?;
        let out = TempDir::new()?;
        let (trigger, on_exit, interrupt) = watched_interrupt(&camera);

        let run = tokio::spawn(import_with_interrupt(
            context(params(addr, out.path()), fast_config()),
            reqwest::Client::new(),
            interrupt,
        ));
        camera.turbo_on_requested.notified().await;
        let _ = trigger.send(());
        let at_exit = on_exit.await;

        assert_eq!(at_exit.ok(), Some((1, 1)), "turbo is switched off before the exit hook");

        let _ = run.await;
        assert_eq!(camera.turbo_on.load(Ordering::SeqCst), 1);
        assert_eq!(camera.turbo_off.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_interrupt_while_disabling_waits_for_request() -> Result<(), ImportError> {
        let (addr, camera) = serve(MockCamera {
            turbo_delay: Duration::from_millis(200),
            ..hero9()
        })
        .await?;
        let out = TempDir::new()?;
        let (trigger, on_exit, interrupt) = watched_interrupt(&camera);

        let run = tokio::spawn(import_with_interrupt(
            context(params(addr, out.path()), fast_config()),
            reqwest::Client::new(),
            interrupt,
        ));
        camera.turbo_off_requested.notified().await;
        let _ = trigger.send(());
        let at_exit = on_exit.await;

        assert_eq!(at_exit.ok(), Some((1, 1)), "the exit hook runs after the disable completed");
        let _ = run.await;
        assert_eq!(camera.turbo_off.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_interrupt_after_run_still_exits() -> Result<(), ImportError> {
        let (addr, camera) = serve(hero9()).await?;
        let out = TempDir::new()?;
        let (trigger, on_exit, interrupt) = watched_interrupt(&camera);

        let result = import_with_interrupt(
            context(params(addr, out.path()), fast_config()),
            reqwest::Client::new(),
            interrupt,
        )
        .await?;
        assert_eq!(result.files_imported, 7, "errors: {:?}", result.errors);

        let _ = trigger.send(());
        let at_exit = tokio::time::timeout(Duration::from_secs(5), on_exit).await;

        assert!(matches!(at_exit, Ok(Ok((1, 1)))), "got {at_exit:?}");
        Ok(())
    }

    #[tokio::test]
    async fn test_same_name_in_two_folders() -> Result<(), ImportError> {
        let (addr, _camera) = serve(MockCamera {
            media: json!({
                "id": "1",
                "media": [
                    {"d": "100GOPRO", "fs": [{"n": "GOPR0001.JPG", "mod": "1672916400", "s": "24"}]},
                    {"d": "101GOPRO", "fs": [{"n": "GOPR0001.JPG", "mod": "1673002800", "s": "24"}]},
                ]
            }),
            files: HashMap::from([
                ("100GOPRO/GOPR0001.JPG".to_string(), b"first card folder".to_vec()),
                ("101GOPRO/GOPR0001.JPG".to_string(), b"second card folder".to_vec()),
            ]),
            file_delay: Duration::from_millis(50),
            ..hero9()
        })
        .await?;
        let out = TempDir::new()?;

        let result = import_with_interrupt(
            context(params(addr, out.path()), fast_config()),
            reqwest::Client::new(),
            never(),
        )
        .await?;

        assert_eq!(result.files_imported, 2, "errors: {:?}", result.errors);
        let photo = |date: &str| out.path().join(date).join("HERO9 Black/photos/GOPR0001.JPG");
        assert_eq!(std::fs::read(photo("05-01-2023"))?, b"first card folder");
        assert_eq!(std::fs::read(photo("06-01-2023"))?, b"second card folder");
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_camera() -> Result<(), ImportError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);
        let out = TempDir::new()?;

        let result = import_with_interrupt(
            context(params(addr, out.path()), fast_config()),
            reqwest::Client::new(),
            never(),
        )
        .await;

        assert!(matches!(result, Err(ImportError::NoCameraDetected)));
        Ok(())
    }

    #[tokio::test]
    async fn test_date_range_applies_to_camera_clock() -> Result<(), ImportError> {
        let (addr, _camera) = serve(hero9()).await?;
        let out = TempDir::new()?;
        let mut params = params(addr, out.path());
        params.date_range = Some(crate::time::DateRange::new(
            wall_clock_from_epoch(1_672_916_450).unwrap_or_default(),
            wall_clock_from_epoch(1_672_916_500).unwrap_or_default(),
        ));

        let result = import_with_interrupt(
            context(params, fast_config()),
            reqwest::Client::new(),
            never(),
        )
        .await?;

        assert_eq!(result.files_imported, 2, "errors: {:?}", result.errors);
        assert!(result.files_not_imported.is_empty());
        Ok(())
    }
}
