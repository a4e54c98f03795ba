//! Centralized configuration for Isaver.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;
use std::time::Duration;

/// Central configuration for all Isaver components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct IsaverConfig {
    pub network: NetworkConfig,
    pub fetch: FetchConfig,
    pub mux: MuxConfig,
    pub delivery: DeliveryConfig,
}

/// HTTP client configuration for talking to remote media sources.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// User agent for outbound HTTP requests
    pub user_agent: &'static str,
    /// Connect timeout for stream downloads
    pub connect_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: "isaver/0.1.0",
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Source probing and stream fetching configuration.
///
/// Controls how available encodings are discovered and which container
/// the selected video stream must carry.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Path to the yt-dlp binary used for source inspection
    pub ytdlp_path: PathBuf,
    /// Maximum time a source probe may take before the process is killed
    pub probe_timeout: Duration,
    /// Container extension a selectable video-only stream must match
    pub target_container: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: PathBuf::from("yt-dlp"),
            probe_timeout: Duration::from_secs(60),
            target_container: "mp4".to_string(),
        }
    }
}

/// External encoder configuration.
///
/// The encoder is always invoked with stream-copy codecs; transcoding is
/// out of scope for this pipeline.
#[derive(Debug, Clone)]
pub struct MuxConfig {
    /// Path to the ffmpeg binary
    pub ffmpeg_path: PathBuf,
    /// Output container format passed to the encoder
    pub output_format: String,
    /// Maximum time a mux may take before the child process is terminated
    /// (None = no limit)
    pub mux_timeout: Option<Duration>,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            output_format: "mp4".to_string(),
            mux_timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// HTTP delivery configuration.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Chunk size for streamed response bodies
    pub chunk_size: usize,
    /// Root directory for request-scoped temporary workspaces
    /// (None = system default)
    pub temp_root: Option<PathBuf>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            chunk_size: 65536, // 64 KiB
            temp_root: None,
        }
    }
}

impl IsaverConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Supported overrides: `ISAVER_YTDLP_PATH`, `ISAVER_FFMPEG_PATH`,
    /// `ISAVER_TEMP_ROOT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("ISAVER_YTDLP_PATH") {
            config.fetch.ytdlp_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("ISAVER_FFMPEG_PATH") {
            config.mux.ffmpeg_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("ISAVER_TEMP_ROOT") {
            config.delivery.temp_root = Some(PathBuf::from(path));
        }

        config
    }

    /// Creates configuration suitable for tests: short timeouts, small
    /// delivery chunks so chunked streaming paths are actually exercised.
    pub fn for_testing() -> Self {
        let mut config = Self::default();
        config.fetch.probe_timeout = Duration::from_secs(5);
        config.mux.mux_timeout = Some(Duration::from_secs(10));
        config.delivery.chunk_size = 64;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_stream_copy_friendly_settings() {
        let config = IsaverConfig::default();
        assert_eq!(config.fetch.target_container, "mp4");
        assert_eq!(config.mux.output_format, "mp4");
        assert!(config.mux.mux_timeout.is_some());
    }

    #[test]
    fn testing_config_shrinks_chunk_size() {
        let config = IsaverConfig::for_testing();
        assert!(config.delivery.chunk_size < IsaverConfig::default().delivery.chunk_size);
    }
}
