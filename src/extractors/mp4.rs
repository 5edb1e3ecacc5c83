//! GoPro's highlight atom (`HMMT`), read from the `moov/udta` user data of a video.

use crate::error::ExtractError;
use mp4iter::Mp4;
use std::fmt::Display;
use std::path::Path;

const HIGHLIGHT_ATOM: &str = "HMMT";

/// User-marked moments in a video, in milliseconds from the start.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HighlightSet {
    pub count: u32,
    pub timestamps_ms: Vec<u32>,
}

fn container_error(err: impl Display) -> ExtractError {
    ExtractError::Container(err.to_string())
}

/// Decodes an `HMMT` payload: a big-endian 32-bit count followed by that many 32-bit
/// timestamps. The count is capped by what the payload actually holds.
pub fn parse_highlights(payload: &[u8]) -> Result<HighlightSet, ExtractError> {
    let (count, rest) = payload
        .split_first_chunk::<4>()
        .ok_or(ExtractError::NoDataFound)?;
    let count = u32::from_be_bytes(*count) as usize;
    let timestamps_ms: Vec<u32> = rest
        .chunks_exact(4)
        .take(count)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(HighlightSet {
        count: timestamps_ms.len() as u32,
        timestamps_ms,
    })
}

/// Reads the highlight atom of a video file, failing with `NoDataFound` when there is none.
/// Blocking.
pub fn read_highlights(path: &Path) -> Result<HighlightSet, ExtractError> {
    let mut mp4 = Mp4::new(path).map_err(container_error)?;
    let atoms = mp4.user_data_cursors().map_err(container_error)?;
    let (_, cursor) = atoms
        .into_iter()
        .find(|(name, _)| name.to_string() == HIGHLIGHT_ATOM)
        .ok_or(ExtractError::NoDataFound)?;
    parse_highlights(cursor.get_ref())
}
