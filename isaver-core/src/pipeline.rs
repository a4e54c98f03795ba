//! Per-request orchestration of the acquisition-mux pipeline.
//!
//! One request walks a fixed sequence of stages; a failure at any stage is
//! terminal (no automatic retries) and records where it happened so the
//! caller can render it. The workspace created here travels with the
//! prepared download and is removed when its final owner drops it - on the
//! success path that owner is the HTTP response body.

use std::fmt;

use crate::IsaverError;
use crate::config::IsaverConfig;
use crate::fetch::{self, FetchError};
use crate::mux::{DeliverableFile, Muxer};
use crate::source::{MediaInfo, MediaProvider};
use crate::workspace::ScopedWorkspace;

/// Stage of the per-request pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovering,
    Fetching,
    Muxing,
    Delivering,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Discovering => write!(f, "resolution discovery"),
            Stage::Fetching => write!(f, "stream fetch"),
            Stage::Muxing => write!(f, "muxing"),
            Stage::Delivering => write!(f, "delivery"),
        }
    }
}

/// A pipeline failure annotated with the stage that produced it.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: IsaverError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: impl Into<IsaverError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// A muxed file ready for delivery, together with the workspace that owns
/// every byte of it.
///
/// The workspace must not be dropped until the response body has been fully
/// streamed (or the request has definitively failed).
#[derive(Debug)]
pub struct PreparedDownload {
    pub file: DeliverableFile,
    pub workspace: ScopedWorkspace,
}

/// Runs fetch and mux for an already-probed source.
///
/// Creates the request workspace, downloads the video/audio pair for the
/// chosen resolution, and merges them. On any failure the workspace is
/// dropped here, which removes everything fetched so far.
///
/// # Errors
///
/// - `PipelineError` - The failing stage plus the underlying error
pub async fn prepare_download(
    provider: &dyn MediaProvider,
    muxer: &dyn Muxer,
    config: &IsaverConfig,
    info: &MediaInfo,
    resolution: u32,
) -> Result<PreparedDownload, PipelineError> {
    let workspace = ScopedWorkspace::create(config.delivery.temp_root.as_deref())
        .map_err(|e| PipelineError::new(Stage::Fetching, IsaverError::Io(e)))?;

    let (video, audio) = fetch_pair(provider, info, resolution, &workspace, config).await?;

    let file = muxer
        .mux(&video, &audio, workspace.path())
        .await
        .map_err(|e| PipelineError::new(Stage::Muxing, e))?;

    tracing::info!(
        "Prepared {} ({} bytes) at {}p",
        file.file_name,
        file.size,
        resolution
    );

    Ok(PreparedDownload { file, workspace })
}

async fn fetch_pair(
    provider: &dyn MediaProvider,
    info: &MediaInfo,
    resolution: u32,
    workspace: &ScopedWorkspace,
    config: &IsaverConfig,
) -> Result<(fetch::StreamHandle, fetch::StreamHandle), PipelineError> {
    fetch::fetch_pair(provider, info, resolution, workspace, &config.fetch)
        .await
        .map_err(|e: FetchError| PipelineError::new(Stage::Fetching, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::ConcatMuxer;
    use crate::source::{SimulatedProvider, SourceUrl};

    const URL: &str = "https://example.com/watch?v=sim";

    async fn probe(provider: &SimulatedProvider) -> MediaInfo {
        let source = SourceUrl::parse(URL).unwrap();
        provider.probe(&source).await.unwrap()
    }

    #[tokio::test]
    async fn pipeline_produces_a_deliverable() {
        let provider = SimulatedProvider::new().with_default_catalog(URL);
        let muxer = ConcatMuxer::new();
        let config = IsaverConfig::for_testing();
        let info = probe(&provider).await;

        let prepared = prepare_download(&provider, &muxer, &config, &info, 1080)
            .await
            .unwrap();

        // Catalog: 1024-byte video + 256-byte audio, concatenated.
        assert_eq!(prepared.file.size, 1280);
        assert!(prepared.file.path.starts_with(prepared.workspace.path()));
    }

    #[tokio::test]
    async fn fetch_failure_removes_the_workspace() {
        let provider = SimulatedProvider::new()
            .with_default_catalog(URL)
            .failing_downloads();
        let muxer = ConcatMuxer::new();
        let config = IsaverConfig::for_testing();
        let info = probe(&provider).await;

        let temp_root = tempfile::tempdir().unwrap();
        let mut config = config;
        config.delivery.temp_root = Some(temp_root.path().to_path_buf());

        let error = prepare_download(&provider, &muxer, &config, &info, 1080)
            .await
            .unwrap_err();
        assert_eq!(error.stage, Stage::Fetching);

        // The request workspace under our root must be gone.
        assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn mux_failure_removes_the_workspace() {
        let provider = SimulatedProvider::new().with_default_catalog(URL);
        let muxer = ConcatMuxer::failing();
        let mut config = IsaverConfig::for_testing();
        let temp_root = tempfile::tempdir().unwrap();
        config.delivery.temp_root = Some(temp_root.path().to_path_buf());
        let info = probe(&provider).await;

        let error = prepare_download(&provider, &muxer, &config, &info, 1080)
            .await
            .unwrap_err();
        assert_eq!(error.stage, Stage::Muxing);
        assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unavailable_resolution_leaves_no_temp_files() {
        let provider = SimulatedProvider::new().with_default_catalog(URL);
        let muxer = ConcatMuxer::new();
        let mut config = IsaverConfig::for_testing();
        let temp_root = tempfile::tempdir().unwrap();
        config.delivery.temp_root = Some(temp_root.path().to_path_buf());
        let info = probe(&provider).await;

        let error = prepare_download(&provider, &muxer, &config, &info, 144)
            .await
            .unwrap_err();
        assert_eq!(error.stage, Stage::Fetching);
        assert!(error.source.to_string().contains("144p not available"));
        assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
    }
}
