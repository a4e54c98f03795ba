//! Isaver Core - media acquisition, muxing and delivery pipeline
//!
//! This crate provides the fundamental building blocks for turning a remote
//! video URL into one downloadable file: source probing and resolution
//! discovery, elementary stream fetching into request-scoped temporary
//! storage, external-encoder muxing with stream copy, and the per-request
//! orchestration tying them together.

pub mod config;
pub mod fetch;
pub mod mode;
pub mod mux;
pub mod pipeline;
pub mod source;
pub mod tracing_setup;
pub mod workspace;

// Re-export main types for convenient access
pub use config::IsaverConfig;
pub use fetch::{FetchError, StreamHandle};
pub use mode::RuntimeMode;
pub use mux::{ConcatMuxer, DeliverableFile, FfmpegMuxer, MuxError, Muxer};
pub use pipeline::{PipelineError, PreparedDownload, Stage};
pub use source::{
    MediaInfo, MediaProvider, SimulatedProvider, SourceError, SourceUrl, StreamKind,
    StreamVariant, YtDlpProvider,
};
pub use workspace::ScopedWorkspace;

/// Core errors that can bubble up from any Isaver subsystem.
#[derive(Debug, thiserror::Error)]
pub enum IsaverError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Mux error: {0}")]
    Mux(#[from] MuxError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IsaverError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            IsaverError::Source(e) => match e {
                SourceError::SourceUnavailable { .. } => {
                    "The video source could not be reached".to_string()
                }
                SourceError::UnsupportedSource { url } => {
                    format!("Not a usable video URL: {url}")
                }
                SourceError::FetchFailed { .. } => {
                    "Downloading the streams failed".to_string()
                }
            },
            IsaverError::Fetch(e) => match e {
                FetchError::ResolutionUnavailable { requested, .. } => {
                    format!("{requested}p is not available for this video")
                }
                FetchError::AudioUnavailable => {
                    "This video exposes no audio stream".to_string()
                }
                FetchError::Source(_) => "Downloading the streams failed".to_string(),
            },
            IsaverError::Mux(_) => "Combining the streams failed".to_string(),
            IsaverError::Configuration { .. } => "Configuration error occurred".to_string(),
            IsaverError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input rather than a system fault.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            IsaverError::Source(SourceError::UnsupportedSource { .. })
                | IsaverError::Fetch(FetchError::ResolutionUnavailable { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, IsaverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_hide_internals() {
        let error = IsaverError::Fetch(FetchError::ResolutionUnavailable {
            requested: 1080,
            available: vec![720, 480],
        });
        assert_eq!(error.user_message(), "1080p is not available for this video");
        assert!(error.is_user_error());
    }

    #[test]
    fn mux_failures_are_not_user_errors() {
        let error = IsaverError::Mux(MuxError::MuxFailed {
            exit_code: 1,
            stderr: "codec mismatch".to_string(),
        });
        assert!(!error.is_user_error());
        assert_eq!(error.user_message(), "Combining the streams failed");
    }
}
