//! Remote media source abstraction.
//!
//! The rest of the pipeline never talks to a specific video site. It sees a
//! [`MediaProvider`]: probe a URL for its advertised encodings, then download
//! a chosen encoding to a local path. The production implementation shells
//! out to yt-dlp for inspection and pulls stream bytes over HTTP; the
//! simulated implementation serves an in-memory catalog for development and
//! tests.

pub mod simulation;
pub mod ytdlp;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

pub use simulation::SimulatedProvider;
pub use ytdlp::YtDlpProvider;

/// Errors raised while inspecting a source or downloading stream bytes.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source could not be resolved or inspected (network/lookup failure).
    #[error("Source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    /// The reference itself is malformed or rejected by the provider.
    #[error("Unsupported source: {url}")]
    UnsupportedSource { url: String },

    /// A stream download failed partway (network or write error).
    #[error("Fetch failed: {reason}")]
    FetchFailed { reason: String },
}

/// A validated reference to a remote video.
///
/// Opaque to the pipeline; only providers interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl(Url);

impl SourceUrl {
    /// Parses and validates a user-submitted URL.
    ///
    /// # Errors
    ///
    /// - `SourceError::UnsupportedSource` - Not a parseable http(s) URL
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let trimmed = raw.trim();
        let url = Url::parse(trimmed).map_err(|_| SourceError::UnsupportedSource {
            url: trimmed.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(SourceError::UnsupportedSource {
                url: trimmed.to_string(),
            });
        }

        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of elementary stream a variant carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    /// Picture only
    Video,
    /// Sound only
    Audio,
    /// Pre-muxed picture + sound; never selected by the fetcher
    Combined,
}

/// One advertised encoding of a source video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamVariant {
    /// Provider-assigned identifier for the encoding
    pub format_id: String,
    pub kind: StreamKind,
    /// Container extension, e.g. "mp4" or "webm"
    pub container: String,
    /// Pixel height for video variants, None for audio
    pub height: Option<u32>,
    /// Direct download URL for the stream bytes
    pub url: String,
}

/// Probe result: preview metadata plus every advertised encoding,
/// in provider-reported order.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<f64>,
    pub variants: Vec<StreamVariant>,
}

/// Abstraction over a remote media source.
///
/// Implementations must be deterministic about variant order per source:
/// the fetcher's tie-break is "first match in reported order".
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Inspects the source and returns its metadata and encodings.
    ///
    /// # Errors
    ///
    /// - `SourceError::SourceUnavailable` - Network or lookup failure
    /// - `SourceError::UnsupportedSource` - Provider rejected the reference
    async fn probe(&self, source: &SourceUrl) -> Result<MediaInfo, SourceError>;

    /// Downloads one variant's bytes to `dest`, returning the byte count.
    ///
    /// On failure no partial file may remain at `dest`.
    ///
    /// # Errors
    ///
    /// - `SourceError::FetchFailed` - Network or write error mid-transfer
    async fn download(&self, variant: &StreamVariant, dest: &Path) -> Result<u64, SourceError>;
}
