//! One orchestrator per connection kind. Each enumerates media, filters by date, classifies
//! files and fans the transfers out over a [`WorkerPool`](crate::transfer::WorkerPool).

pub(crate) mod filesystem;
pub(crate) mod layout;
pub(crate) mod mtp;
pub(crate) mod network;

use crate::cameras::{FileKind, MediaItem};
use crate::config::{DateSource, EngineConfig};
use crate::extractors::{Demuxer, ExifReader, demux, mp4};
use crate::location::geocode::Geocoder;
use crate::naming::importance_label;
use crate::placement::PlacementEngine;
use crate::structs::ImportParams;
use crate::time::{embedded_capture_time, in_range, wall_clock_to_system_time};
use crate::transfer::ProgressSink;
use layout::VideoFacts;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Everything a backend needs for one run, shared by all of its transfer tasks.
pub(crate) struct ImportContext {
    pub params: ImportParams,
    pub config: EngineConfig,
    pub placement: PlacementEngine,
    pub exif: Arc<ExifReader>,
    pub demuxer: Demuxer,
    pub progress: Arc<dyn ProgressSink>,
}

impl ImportContext {
    pub fn new(
        params: ImportParams,
        config: EngineConfig,
        geocoder: Arc<Geocoder>,
        exif: Arc<ExifReader>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        let placement = PlacementEngine::new(config.location.clone(), params.sort, geocoder);
        let demuxer = Demuxer::new(config.tools.ffprobe.clone(), config.tools.ffmpeg.clone());
        Self {
            params,
            config,
            placement,
            exif,
            demuxer,
            progress,
        }
    }

    /// Capture instant written to the destination file.
    pub fn destination_mtime(&self, item: &MediaItem) -> SystemTime {
        match self.config.date_source {
            DateSource::Modified => item.modified,
            DateSource::Embedded => {
                wall_clock_to_system_time(&item.captured, self.config.camera_timezone)
                    .unwrap_or(item.modified)
            }
        }
    }

    /// Replaces the capture time with the embedded one where configured and available.
    pub async fn apply_embedded_dates(&self, items: &mut [MediaItem]) {
        if self.config.date_source != DateSource::Embedded {
            return;
        }
        for item in items.iter_mut() {
            if !matches!(item.kind, FileKind::Photo | FileKind::Video | FileKind::RawPhoto) {
                continue;
            }
            let Some(path) = item.local_path() else {
                continue;
            };
            match self.exif.numeric(path).await {
                Ok(exif) => {
                    if let Some(captured) = embedded_capture_time(&exif) {
                        item.captured = captured;
                    }
                }
                Err(err) => debug!(file = %item.name, error = %err, "Keeping file time"),
            }
        }
    }

    /// Drops items outside the requested date range.
    pub fn retain_in_range(&self, items: &mut Vec<MediaItem>) {
        items.retain(|item| {
            let keep = in_range(self.params.date_range.as_ref(), &item.captured);
            if !keep {
                debug!(file = %item.name, captured = %item.captured, "Outside date range");
            }
            keep
        });
    }

    /// Resolution and importance folders of a local video. Anything unreadable is left out.
    pub async fn local_video_facts(&self, path: &Path, with_highlights: bool) -> VideoFacts {
        let mut facts = VideoFacts::default();
        let name = path.display();
        let spherical = path.extension().is_some_and(|ext| ext == "360");
        let wants_highlights = with_highlights && !self.params.tag_names.is_empty();
        if spherical && !wants_highlights {
            debug!(file = %name, "Spherical video, no resolution folder");
            return facts;
        }

        let probe = match self.demuxer.probe(path).await {
            Ok(probe) => probe,
            Err(err) => {
                warn!(file = %name, error = %err, "Could not probe video, placing without resolution folder");
                return facts;
            }
        };
        if !spherical {
            facts.rfps = demux::video_stream(&probe).map(|s| VideoFacts::rfps_from_stream(&s));
        }

        if wants_highlights {
            let Some(duration) = demux::duration_secs(&probe) else {
                debug!(file = %name, "No container duration, skipping highlights");
                return facts;
            };
            let owned = path.to_path_buf();
            match tokio::task::spawn_blocking(move || mp4::read_highlights(&owned)).await {
                Ok(Ok(highlights)) => {
                    facts.importance =
                        importance_label(duration as u64, &highlights, &self.params.tag_names)
                            .map(str::to_string);
                }
                Ok(Err(err)) => debug!(file = %name, error = %err, "No highlight data"),
                Err(err) => warn!(file = %name, error = %err, "Highlight task failed"),
            }
        }
        facts
    }
}
