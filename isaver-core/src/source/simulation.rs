//! Simulated media provider for development mode and tests.
//!
//! Serves a fixed catalog of sources from memory with the same interface as
//! the production provider, so the whole pipeline (including error paths)
//! runs offline and deterministically.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use super::{MediaInfo, MediaProvider, SourceError, SourceUrl, StreamKind, StreamVariant};

/// One simulated encoding: the advertised variant plus its payload bytes.
#[derive(Debug, Clone)]
pub struct SimulatedStream {
    pub variant: StreamVariant,
    pub payload: Vec<u8>,
}

/// In-memory source entry.
#[derive(Debug, Clone)]
struct SimulatedSource {
    title: String,
    thumbnail_url: Option<String>,
    streams: Vec<SimulatedStream>,
}

/// Media provider backed by an in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct SimulatedProvider {
    sources: HashMap<String, SimulatedSource>,
    fail_downloads: bool,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source URL with its advertised streams, in order.
    pub fn with_source(
        mut self,
        url: &str,
        title: &str,
        streams: Vec<SimulatedStream>,
    ) -> Self {
        self.sources.insert(
            url.to_string(),
            SimulatedSource {
                title: title.to_string(),
                thumbnail_url: Some(format!("{url}/thumbnail.jpg")),
                streams,
            },
        );
        self
    }

    /// Makes every download fail with `FetchFailed`, for error-path tests.
    pub fn failing_downloads(mut self) -> Self {
        self.fail_downloads = true;
        self
    }

    /// A source with the catalog the pipeline tests expect: three video
    /// tiers (one duplicated height) and one audio stream.
    pub fn with_default_catalog(self, url: &str) -> Self {
        let video = |format_id: &str, height: u32, payload: &[u8]| SimulatedStream {
            variant: StreamVariant {
                format_id: format_id.to_string(),
                kind: StreamKind::Video,
                container: "mp4".to_string(),
                height: Some(height),
                url: format!("{url}/{format_id}"),
            },
            payload: payload.to_vec(),
        };

        let audio = SimulatedStream {
            variant: StreamVariant {
                format_id: "140".to_string(),
                kind: StreamKind::Audio,
                container: "m4a".to_string(),
                height: None,
                url: format!("{url}/140"),
            },
            payload: vec![0xAA; 256],
        };

        self.with_source(
            url,
            "Simulated Video",
            vec![
                video("137", 1080, &[0x56; 1024]),
                video("136", 720, &[0x57; 512]),
                video("136-alt", 720, &[0x58; 512]),
                video("135", 480, &[0x59; 256]),
                audio,
            ],
        )
    }
}

#[async_trait]
impl MediaProvider for SimulatedProvider {
    async fn probe(&self, source: &SourceUrl) -> Result<MediaInfo, SourceError> {
        let entry =
            self.sources
                .get(source.as_str())
                .ok_or_else(|| SourceError::SourceUnavailable {
                    reason: format!("no simulated source registered for {source}"),
                })?;

        Ok(MediaInfo {
            title: entry.title.clone(),
            thumbnail_url: entry.thumbnail_url.clone(),
            duration_seconds: Some(60.0),
            variants: entry.streams.iter().map(|s| s.variant.clone()).collect(),
        })
    }

    async fn download(&self, variant: &StreamVariant, dest: &Path) -> Result<u64, SourceError> {
        if self.fail_downloads {
            return Err(SourceError::FetchFailed {
                reason: "simulated transfer failure".to_string(),
            });
        }

        let stream = self
            .sources
            .values()
            .flat_map(|source| source.streams.iter())
            .find(|stream| stream.variant.format_id == variant.format_id)
            .ok_or_else(|| SourceError::FetchFailed {
                reason: format!("unknown simulated format {}", variant.format_id),
            })?;

        tokio::fs::write(dest, &stream.payload)
            .await
            .map_err(|e| SourceError::FetchFailed {
                reason: format!("write error: {e}"),
            })?;

        Ok(stream.payload.len() as u64)
    }
}
