//! Sub-folder names derived from video metadata: the highlight "importance" bucket and the
//! resolution/frame-rate folder.

use crate::extractors::mp4::HighlightSet;

/// Clips shorter than this never get an importance folder.
const MIN_DURATION_SECS: u64 = 20;
/// Highlights inside this window at the end of a clip count towards its importance.
const TAIL_WINDOW_MS: i64 = 10_000;
const MIN_TAG_NAMES: usize = 3;

/// Picks an importance label from the highlights marked near the end of a clip.
///
/// The more highlights land in the last ten seconds, the further along `names` the label is
/// taken from. Returns `None` for short clips, fewer than three names or no late highlights.
///
/// ```rust
/// # use media_importer::extractors::mp4::HighlightSet;
/// # use media_importer::naming::importance_label;
/// let names = ["Marked 1", "Lit AF", "Important"].map(String::from);
/// let highlights = HighlightSet { count: 2, timestamps_ms: vec![18880, 20440] };
/// assert_eq!(importance_label(24, &highlights, &names), Some("Lit AF"));
/// ```
pub fn importance_label<'a>(
    duration_secs: u64,
    highlights: &HighlightSet,
    names: &'a [String],
) -> Option<&'a str> {
    if duration_secs < MIN_DURATION_SECS || names.len() < MIN_TAG_NAMES {
        return None;
    }
    let tail_start = duration_secs as i64 * 1000 - TAIL_WINDOW_MS;
    let late = highlights
        .timestamps_ms
        .iter()
        .filter(|&&ts| i64::from(ts) > tail_start)
        .count();
    if late == 0 {
        return None;
    }
    Some(names[late.min(names.len()) - 1].as_str())
}

/// Whole frames per second from a rate given as a fraction.
///
/// Some firmware reports the fraction upside down; when `fps / denom` rounds to zero the
/// inverse is used instead.
pub fn frame_rate(fps: u64, denom: u64) -> u64 {
    let denom = denom.max(1);
    match fps / denom {
        0 if fps > 0 => denom / fps,
        rate => rate,
    }
}

/// `"<W>x<H> <fps>"`
pub fn rfps_folder(width: u64, height: u64, fps: u64) -> String {
    format!("{width}x{height} {fps}")
}
