use checker_core::ManifestSignal;

use crate::decode::decode_window;

const PLAYLIST_MAGIC: &str = "#EXTM3U";
const VARIANT_STREAM_TAG: &str = "#EXT-X-STREAM-INF";
const SEGMENT_INFO_TAG: &str = "#EXTINF:";
const NESTED_PLAYLIST_EXT: &str = ".m3u8";

/// Syntax-only plausibility check over the leading body window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeuristicClassifier {
    /// Windows shorter than this are inconclusive.
    pub min_bytes: usize,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self { min_bytes: 1 }
    }
}

impl HeuristicClassifier {
    pub fn new(min_bytes: usize) -> Self {
        Self { min_bytes }
    }

    /// `Some(signal)` when the window looks like a live manifest, `None` when inconclusive.
    pub fn classify(&self, window: &[u8], content_type: Option<&str>) -> Option<ManifestSignal> {
        if window.is_empty() || window.len() < self.min_bytes {
            return None;
        }
        let decoded = decode_window(window, content_type);
        let text = decoded.text.trim_start_matches('\u{feff}').trim();
        if !text.starts_with(PLAYLIST_MAGIC) {
            return None;
        }

        let mut segment = None;
        let mut nested = None;
        for line in text.lines() {
            if line.starts_with(VARIANT_STREAM_TAG) {
                return Some(ManifestSignal::VariantStream);
            }
            if segment.is_none() && line.starts_with(SEGMENT_INFO_TAG) {
                segment = Some(ManifestSignal::SegmentInfo);
            }
            if nested.is_none() && line.contains(NESTED_PLAYLIST_EXT) {
                nested = Some(ManifestSignal::NestedPlaylist);
            }
        }
        segment.or(nested)
    }
}
