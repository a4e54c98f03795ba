//! Production media provider backed by the yt-dlp binary.
//!
//! Probing runs `yt-dlp --dump-json` as an argument vector (never through a
//! shell) and parses the format list it prints. Stream bytes are then pulled
//! directly from the format URLs with a shared HTTP client, so yt-dlp is
//! only responsible for site extraction.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use super::{MediaInfo, MediaProvider, SourceError, SourceUrl, StreamKind, StreamVariant};
use crate::config::{FetchConfig, NetworkConfig};

/// Media provider that shells out to yt-dlp for source inspection.
pub struct YtDlpProvider {
    fetch_config: FetchConfig,
    client: reqwest::Client,
}

impl YtDlpProvider {
    /// Creates a provider with a shared HTTP client for stream downloads.
    ///
    /// # Errors
    ///
    /// - `SourceError::SourceUnavailable` - HTTP client could not be built
    pub fn new(fetch_config: FetchConfig, network: &NetworkConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(network.user_agent)
            .connect_timeout(network.connect_timeout)
            .build()
            .map_err(|e| SourceError::SourceUnavailable {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            fetch_config,
            client,
        })
    }

    /// Check if the yt-dlp binary is available.
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.fetch_config.ytdlp_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// Subset of the yt-dlp `--dump-json` document the pipeline needs.
#[derive(Debug, Deserialize)]
struct ProbeDocument {
    title: Option<String>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_id: String,
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    url: Option<String>,
}

impl ProbeFormat {
    /// Classifies a yt-dlp format entry. Formats without a usable codec on
    /// either track (storyboards, manifests) return None.
    fn kind(&self) -> Option<StreamKind> {
        let has_video = self.vcodec.as_deref().is_some_and(|c| c != "none");
        let has_audio = self.acodec.as_deref().is_some_and(|c| c != "none");

        match (has_video, has_audio) {
            (true, false) => Some(StreamKind::Video),
            (false, true) => Some(StreamKind::Audio),
            (true, true) => Some(StreamKind::Combined),
            (false, false) => None,
        }
    }
}

#[async_trait]
impl MediaProvider for YtDlpProvider {
    async fn probe(&self, source: &SourceUrl) -> Result<MediaInfo, SourceError> {
        tracing::info!("Probing source {}", source);

        let mut command = tokio::process::Command::new(&self.fetch_config.ytdlp_path);
        command
            .arg("--no-warnings")
            .arg("--no-progress")
            .arg("--no-playlist")
            .arg("--dump-json")
            .arg(source.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.fetch_config.probe_timeout, command.output())
            .await
            .map_err(|_| SourceError::SourceUnavailable {
                reason: format!(
                    "source probe timed out after {}s",
                    self.fetch_config.probe_timeout.as_secs()
                ),
            })?
            .map_err(|e| SourceError::SourceUnavailable {
                reason: format!("failed to execute yt-dlp: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!("yt-dlp probe failed for {}: {}", source, stderr.trim());

            // yt-dlp reports extractor rejections on stderr; distinguish a
            // bad reference from a flaky network the same way it does.
            if stderr.contains("Unsupported URL") || stderr.contains("is not a valid URL") {
                return Err(SourceError::UnsupportedSource {
                    url: source.to_string(),
                });
            }
            return Err(SourceError::SourceUnavailable {
                reason: stderr.trim().to_string(),
            });
        }

        let document: ProbeDocument =
            serde_json::from_slice(&output.stdout).map_err(|e| SourceError::SourceUnavailable {
                reason: format!("unreadable probe output: {e}"),
            })?;

        let variants = document
            .formats
            .into_iter()
            .filter_map(|format| {
                let kind = format.kind()?;
                let url = format.url?;
                Some(StreamVariant {
                    format_id: format.format_id,
                    kind,
                    container: format.ext.unwrap_or_default(),
                    height: format.height,
                    url,
                })
            })
            .collect();

        Ok(MediaInfo {
            title: document.title.unwrap_or_else(|| "Untitled".to_string()),
            thumbnail_url: document.thumbnail,
            duration_seconds: document.duration,
            variants,
        })
    }

    async fn download(&self, variant: &StreamVariant, dest: &Path) -> Result<u64, SourceError> {
        tracing::info!(
            "Downloading format {} to {}",
            variant.format_id,
            dest.display()
        );

        let written = match self.stream_to_file(variant, dest).await {
            Ok(written) => written,
            Err(error) => {
                // A partial file must never back a returned handle.
                let _ = tokio::fs::remove_file(dest).await;
                return Err(error);
            }
        };

        tracing::debug!(
            "Downloaded {} bytes for format {}",
            written,
            variant.format_id
        );
        Ok(written)
    }
}

impl YtDlpProvider {
    async fn stream_to_file(
        &self,
        variant: &StreamVariant,
        dest: &Path,
    ) -> Result<u64, SourceError> {
        let response = self
            .client
            .get(&variant.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| SourceError::FetchFailed {
                reason: format!("request for format {} failed: {e}", variant.format_id),
            })?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| SourceError::FetchFailed {
                reason: format!("cannot create {}: {e}", dest.display()),
            })?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SourceError::FetchFailed {
                reason: format!("transfer error: {e}"),
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| SourceError::FetchFailed {
                    reason: format!("write error: {e}"),
                })?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| SourceError::FetchFailed {
            reason: format!("flush error: {e}"),
        })?;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(vcodec: &str, acodec: &str) -> ProbeFormat {
        ProbeFormat {
            format_id: "137".to_string(),
            ext: Some("mp4".to_string()),
            vcodec: Some(vcodec.to_string()),
            acodec: Some(acodec.to_string()),
            height: Some(1080),
            url: Some("https://cdn.example.com/137".to_string()),
        }
    }

    #[test]
    fn classifies_video_only_formats() {
        assert_eq!(format("avc1.640028", "none").kind(), Some(StreamKind::Video));
    }

    #[test]
    fn classifies_audio_only_formats() {
        assert_eq!(format("none", "mp4a.40.2").kind(), Some(StreamKind::Audio));
    }

    #[test]
    fn classifies_progressive_formats_as_combined() {
        assert_eq!(
            format("avc1.640028", "mp4a.40.2").kind(),
            Some(StreamKind::Combined)
        );
    }

    #[test]
    fn skips_formats_without_any_codec() {
        // Storyboard entries carry vcodec = acodec = "none".
        assert_eq!(format("none", "none").kind(), None);
    }

    #[test]
    fn probe_document_parses_ytdlp_output() {
        let json = r#"{
            "title": "Test Video",
            "thumbnail": "https://i.example.com/t.jpg",
            "duration": 212.5,
            "formats": [
                {"format_id": "137", "ext": "mp4", "vcodec": "avc1", "acodec": "none",
                 "height": 1080, "url": "https://cdn.example.com/137"},
                {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a",
                 "url": "https://cdn.example.com/140"}
            ]
        }"#;

        let document: ProbeDocument = serde_json::from_str(json).unwrap();
        assert_eq!(document.title.as_deref(), Some("Test Video"));
        assert_eq!(document.formats.len(), 2);
        assert_eq!(document.formats[0].height, Some(1080));
        assert_eq!(document.formats[1].kind(), Some(StreamKind::Audio));
    }
}
