//! Readers for the metadata embedded in media files: GPMF telemetry, the GoPro highlight atom,
//! drone subtitle tracks and EXIF tags.

pub mod demux;
pub mod exif;
pub mod gpmf;
pub mod mp4;
pub mod subtitle;

pub use demux::Demuxer;
pub use exif::ExifReader;
