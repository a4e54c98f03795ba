//! Resolution discovery and elementary stream fetching.
//!
//! Discovery derives the selectable quality tiers from a probe result.
//! Fetching selects one video-only and one audio-only encoding and downloads
//! both into the request's workspace, concurrently - the two writes target
//! distinct files, and both must land before muxing starts.

use std::path::PathBuf;

use crate::config::FetchConfig;
use crate::source::{MediaInfo, MediaProvider, SourceError, SourceUrl, StreamKind, StreamVariant};
use crate::workspace::ScopedWorkspace;

/// Errors raised while selecting or fetching elementary streams.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// No video-only encoding matches the exact requested height.
    #[error("Resolution {requested}p not available (available: {available:?})")]
    ResolutionUnavailable {
        requested: u32,
        available: Vec<u32>,
    },

    /// The source exposes no audio-only encoding at all.
    #[error("No audio-only stream available")]
    AudioUnavailable,

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// One fetched elementary stream inside a workspace.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    pub path: PathBuf,
    /// Byte size read from filesystem metadata after the download completed
    pub size: u64,
    pub kind: StreamKind,
}

/// Derives the selectable quality tiers from a probe result.
///
/// Considers only video-only variants whose container matches the target
/// delivery format. Returns distinct pixel heights, descending. An empty
/// result is valid: the source simply exposes nothing selectable.
pub fn available_resolutions(info: &MediaInfo, target_container: &str) -> Vec<u32> {
    let mut heights: Vec<u32> = info
        .variants
        .iter()
        .filter(|v| v.kind == StreamKind::Video && v.container == target_container)
        .filter_map(|v| v.height)
        .collect();

    heights.sort_unstable_by(|a, b| b.cmp(a));
    heights.dedup();
    heights
}

/// Probes a source and returns its selectable resolutions.
///
/// # Errors
///
/// - `SourceError::SourceUnavailable` - Source cannot be resolved or inspected
/// - `SourceError::UnsupportedSource` - Reference is malformed
pub async fn list_resolutions(
    provider: &dyn MediaProvider,
    source: &SourceUrl,
    config: &FetchConfig,
) -> Result<Vec<u32>, SourceError> {
    let info = provider.probe(source).await?;
    Ok(available_resolutions(&info, &config.target_container))
}

/// Selects the video variant for an exact requested height.
///
/// First match in provider-reported order wins; there is deliberately no
/// fallback to the nearest available height.
fn select_video<'a>(
    info: &'a MediaInfo,
    resolution: u32,
    target_container: &str,
) -> Option<&'a StreamVariant> {
    info.variants.iter().find(|v| {
        v.kind == StreamKind::Video
            && v.container == target_container
            && v.height == Some(resolution)
    })
}

/// Selects the audio variant: first audio-only encoding, any container.
fn select_audio(info: &MediaInfo) -> Option<&StreamVariant> {
    info.variants.iter().find(|v| v.kind == StreamKind::Audio)
}

/// Fetches the video/audio pair for a chosen resolution into `workspace`.
///
/// Both downloads run concurrently; the join point is here, before any
/// muxing. Handle sizes come from filesystem metadata, and an empty file is
/// treated as a failed fetch.
///
/// # Errors
///
/// - `FetchError::ResolutionUnavailable` - No exact video match
/// - `FetchError::AudioUnavailable` - No audio-only encoding exists
/// - `FetchError::Source` - A download failed (no partial handle escapes)
pub async fn fetch_pair(
    provider: &dyn MediaProvider,
    info: &MediaInfo,
    resolution: u32,
    workspace: &ScopedWorkspace,
    config: &FetchConfig,
) -> Result<(StreamHandle, StreamHandle), FetchError> {
    let video = select_video(info, resolution, &config.target_container).ok_or_else(|| {
        FetchError::ResolutionUnavailable {
            requested: resolution,
            available: available_resolutions(info, &config.target_container),
        }
    })?;
    let audio = select_audio(info).ok_or(FetchError::AudioUnavailable)?;

    let video_path = workspace.file(&format!("video.{}", video.container));
    let audio_path = workspace.file(&format!("audio.{}", audio.container));

    tracing::info!(
        "Fetching streams: video {} ({}p) + audio {}",
        video.format_id,
        resolution,
        audio.format_id
    );

    tokio::try_join!(
        provider.download(video, &video_path),
        provider.download(audio, &audio_path)
    )?;

    let video_handle = handle_for(video_path, StreamKind::Video).await?;
    let audio_handle = handle_for(audio_path, StreamKind::Audio).await?;

    Ok((video_handle, audio_handle))
}

async fn handle_for(path: PathBuf, kind: StreamKind) -> Result<StreamHandle, FetchError> {
    let size = tokio::fs::metadata(&path)
        .await
        .map_err(|e| SourceError::FetchFailed {
            reason: format!("cannot stat {}: {e}", path.display()),
        })?
        .len();

    if size == 0 {
        return Err(SourceError::FetchFailed {
            reason: format!("{} is empty after download", path.display()),
        }
        .into());
    }

    Ok(StreamHandle { path, size, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IsaverConfig;
    use crate::source::SimulatedProvider;

    const URL: &str = "https://example.com/watch?v=sim";

    fn catalog_provider() -> SimulatedProvider {
        SimulatedProvider::new().with_default_catalog(URL)
    }

    async fn probe(provider: &SimulatedProvider) -> MediaInfo {
        let source = SourceUrl::parse(URL).unwrap();
        provider.probe(&source).await.unwrap()
    }

    #[tokio::test]
    async fn resolutions_are_distinct_and_descending() {
        let provider = catalog_provider();
        let info = probe(&provider).await;

        // The catalog advertises 1080, 720, 720, 480.
        let resolutions = available_resolutions(&info, "mp4");
        assert_eq!(resolutions, vec![1080, 720, 480]);
    }

    #[tokio::test]
    async fn resolutions_ignore_other_containers_and_audio() {
        let provider = catalog_provider();
        let mut info = probe(&provider).await;
        info.variants.push(StreamVariant {
            format_id: "248".to_string(),
            kind: StreamKind::Video,
            container: "webm".to_string(),
            height: Some(2160),
            url: "https://cdn.example.com/248".to_string(),
        });

        let resolutions = available_resolutions(&info, "mp4");
        assert!(!resolutions.contains(&2160));
    }

    #[tokio::test]
    async fn empty_source_yields_empty_resolution_set() {
        let provider = SimulatedProvider::new().with_source(URL, "Empty", vec![]);
        let info = probe(&provider).await;
        assert!(available_resolutions(&info, "mp4").is_empty());
    }

    #[tokio::test]
    async fn fetch_pair_returns_two_nonempty_handles() {
        let provider = catalog_provider();
        let info = probe(&provider).await;
        let config = IsaverConfig::for_testing();
        let workspace = ScopedWorkspace::create(None).unwrap();

        let (video, audio) = fetch_pair(&provider, &info, 720, &workspace, &config.fetch)
            .await
            .unwrap();

        assert_eq!(video.kind, StreamKind::Video);
        assert_eq!(audio.kind, StreamKind::Audio);
        assert!(video.size > 0);
        assert!(audio.size > 0);
        assert!(video.path.exists());
        assert!(audio.path.exists());
    }

    #[tokio::test]
    async fn fetch_pair_picks_first_variant_at_equal_heights() {
        let provider = catalog_provider();
        let info = probe(&provider).await;
        let config = IsaverConfig::for_testing();
        let workspace = ScopedWorkspace::create(None).unwrap();

        // Formats 136 and 136-alt both advertise 720p; 136 is reported first
        // and carries a 512-byte payload.
        let (video, _) = fetch_pair(&provider, &info, 720, &workspace, &config.fetch)
            .await
            .unwrap();
        assert_eq!(video.size, 512);
    }

    #[tokio::test]
    async fn unknown_resolution_is_rejected_without_fallback() {
        let provider = catalog_provider();
        let info = probe(&provider).await;
        let config = IsaverConfig::for_testing();
        let workspace = ScopedWorkspace::create(None).unwrap();

        let result = fetch_pair(&provider, &info, 1081, &workspace, &config.fetch).await;
        match result {
            Err(FetchError::ResolutionUnavailable {
                requested,
                available,
            }) => {
                assert_eq!(requested, 1081);
                assert_eq!(available, vec![1080, 720, 480]);
            }
            other => panic!("expected ResolutionUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_audio_is_its_own_error() {
        let provider = SimulatedProvider::new().with_source(
            URL,
            "Video only",
            vec![crate::source::simulation::SimulatedStream {
                variant: StreamVariant {
                    format_id: "137".to_string(),
                    kind: StreamKind::Video,
                    container: "mp4".to_string(),
                    height: Some(1080),
                    url: "https://cdn.example.com/137".to_string(),
                },
                payload: vec![1; 64],
            }],
        );
        let info = probe(&provider).await;
        let config = IsaverConfig::for_testing();
        let workspace = ScopedWorkspace::create(None).unwrap();

        let result = fetch_pair(&provider, &info, 1080, &workspace, &config.fetch).await;
        assert!(matches!(result, Err(FetchError::AudioUnavailable)));
    }

    #[tokio::test]
    async fn failed_download_surfaces_fetch_failed() {
        let provider = catalog_provider().failing_downloads();
        let info = probe(&provider).await;
        let config = IsaverConfig::for_testing();
        let workspace = ScopedWorkspace::create(None).unwrap();

        let result = fetch_pair(&provider, &info, 1080, &workspace, &config.fetch).await;
        assert!(matches!(
            result,
            Err(FetchError::Source(SourceError::FetchFailed { .. }))
        ));
    }
}
