//! Where an item goes below its placement directory, per camera family.

use crate::cameras::gopro::{self, ProtocolVersion};
use crate::cameras::{CaptureMode, FileKind, MediaItem, insta360};
use crate::extractors::demux::VideoStream;
use crate::naming::{frame_rate, rfps_folder};
use crate::structs::CameraFamily;
use std::path::PathBuf;

/// Optional video sub-folders; either may be missing when metadata could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoFacts {
    pub importance: Option<String>,
    pub rfps: Option<String>,
}

impl VideoFacts {
    pub fn rfps_from_stream(stream: &VideoStream) -> String {
        rfps_folder(
            stream.width,
            stream.height,
            frame_rate(stream.fps_num, stream.fps_den),
        )
    }
}

fn spherical(mode: CaptureMode) -> Option<&'static str> {
    (mode == CaptureMode::Spherical).then_some("360")
}

/// Directory below the placement folder, e.g. `videos/360/Important/3840x2160 59`.
pub fn subdir(family: CameraFamily, item: &MediaItem, facts: &VideoFacts) -> PathBuf {
    let mut dir = PathBuf::new();
    match (family, item.kind) {
        (CameraFamily::Insta360, FileKind::Photo | FileKind::RawPhoto) => {
            dir.push("photos");
            dir.push(insta360::clip_id(&item.name, item.mode));
        }
        (CameraFamily::Insta360, FileKind::Video | FileKind::LowResProxy) => {
            dir.push("videos");
            match item.mode {
                CaptureMode::Spherical => dir.push("360"),
                CaptureMode::Pro => dir.push("flat/pro_mode"),
                CaptureMode::Standard => dir.push("flat"),
            }
            dir.push(insta360::clip_id(&item.name, item.mode));
        }
        (_, FileKind::Video) => {
            dir.push("videos");
            dir.extend(spherical(item.mode));
            dir.extend(facts.importance.as_deref());
            dir.extend(facts.rfps.as_deref());
        }
        (CameraFamily::Dji, FileKind::Subtitle) => dir.push("videos"),
        (_, FileKind::LowResProxy) => {
            dir.push("videos/proxy");
            dir.extend(facts.rfps.as_deref());
        }
        (_, FileKind::Thumbnail | FileKind::Subtitle) => dir.push("videos/proxy"),
        (_, FileKind::Photo) => {
            dir.push("photos");
            dir.extend(spherical(item.mode));
        }
        (_, FileKind::RawPhoto) => dir.push("photos/raw"),
        (_, FileKind::MultishotFrame) => {
            dir.push("multishot");
            dir.extend(spherical(item.mode));
            dir.push(gopro::multishot_root(&item.name));
        }
        (_, FileKind::Audio) => dir.push("audios"),
    }
    dir
}

/// Destination file name: GoPro chapters are renamed so a recording's chapters sort together.
pub fn file_name(family: CameraFamily, version: Option<ProtocolVersion>, item: &MediaItem) -> String {
    match (family, version) {
        (CameraFamily::GoPro, Some(version)) if item.chaptered => {
            gopro::chapter_name(version, &item.name)
        }
        _ => item.name.clone(),
    }
}
