//! Source classification
//!
//! Maps a playback URL onto the delivery mechanism it needs: adaptive
//! segmented streaming (HLS manifest) or direct progressive playback.

use serde::{Deserialize, Serialize};

/// Manifest extension that marks a URL as adaptive
const MANIFEST_EXTENSION: &str = ".m3u8";

/// Delivery mechanism required by a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Manifest-described segmented stream
    Adaptive,
    /// Single URL playable without manifest negotiation
    Direct,
}

/// A playback URL together with its delivery kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub url: String,
    pub kind: SourceKind,
}

impl Source {
    /// Resolve a URL into a Source; None for an empty URL ("no source")
    pub fn resolve(url: &str) -> Option<Self> {
        classify(url).map(|kind| Source {
            url: url.to_string(),
            kind,
        })
    }

    pub fn is_adaptive(&self) -> bool {
        self.kind == SourceKind::Adaptive
    }
}

/// Classify a URL by the extension of its path component
///
/// The path component is everything before the first `?` or `#`. It is
/// adaptive iff it ends in `.m3u8` (any case). Empty URLs are not classified.
pub fn classify(url: &str) -> Option<SourceKind> {
    if url.is_empty() {
        return None;
    }

    let path = match url.find(['?', '#']) {
        Some(idx) => &url[..idx],
        None => url,
    };

    let is_manifest = path.len() >= MANIFEST_EXTENSION.len()
        && path.is_char_boundary(path.len() - MANIFEST_EXTENSION.len())
        && path[path.len() - MANIFEST_EXTENSION.len()..].eq_ignore_ascii_case(MANIFEST_EXTENSION);

    if is_manifest {
        Some(SourceKind::Adaptive)
    } else {
        Some(SourceKind::Direct)
    }
}
