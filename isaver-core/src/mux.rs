//! Muxing abstraction for combining fetched elementary streams.
//!
//! The external encoder is the single authoritative merge step. It always
//! runs with stream-copy codecs; a mux failure is terminal for the request
//! because retrying an encoder on incompatible codec data cannot succeed.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use rand::Rng;

use crate::config::MuxConfig;
use crate::fetch::StreamHandle;

/// Errors raised while merging streams.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// The encoder process exited non-zero (or was terminated on timeout).
    #[error("Mux failed with exit code {exit_code}: {stderr}")]
    MuxFailed { exit_code: i32, stderr: String },

    /// The encoder binary could not be executed at all.
    #[error("Encoder unavailable: {reason}")]
    EncoderUnavailable { reason: String },

    /// I/O error around the encoder invocation.
    #[error("IO error during {operation}: {source}")]
    Io {
        operation: String,
        source: std::io::Error,
    },
}

/// The muxed output of one request.
#[derive(Debug)]
pub struct DeliverableFile {
    pub path: PathBuf,
    /// Byte size read from filesystem metadata, never assumed
    pub size: u64,
    pub mime_type: &'static str,
    /// Unique output name, e.g. `isaver_1f2e3d4c.mp4`
    pub file_name: String,
}

/// Abstraction over the merge step so the pipeline can run against either a
/// real encoder or a deterministic stand-in.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Combines a video-only and an audio-only stream into one container
    /// file under `output_dir`.
    ///
    /// # Errors
    ///
    /// - `MuxError::MuxFailed` - Encoder exited non-zero; terminal, no retry
    /// - `MuxError::EncoderUnavailable` - Encoder could not be spawned
    async fn mux(
        &self,
        video: &StreamHandle,
        audio: &StreamHandle,
        output_dir: &Path,
    ) -> Result<DeliverableFile, MuxError>;
}

/// Generates a fresh collision-resistant output name.
///
/// Requests can share a temp root namespace, so every invocation gets its
/// own random token.
fn output_file_name(extension: &str) -> String {
    let token: [u8; 4] = rand::rng().random();
    format!("isaver_{}.{extension}", hex::encode(token))
}

/// Reads the finished output's size from the filesystem and assembles the
/// deliverable.
async fn deliverable_from(path: PathBuf, file_name: String) -> Result<DeliverableFile, MuxError> {
    let size = tokio::fs::metadata(&path)
        .await
        .map_err(|e| MuxError::Io {
            operation: "stat mux output".to_string(),
            source: e,
        })?
        .len();

    Ok(DeliverableFile {
        path,
        size,
        mime_type: "application/octet-stream",
        file_name,
    })
}

/// Production muxer invoking the ffmpeg binary.
pub struct FfmpegMuxer {
    config: MuxConfig,
}

impl FfmpegMuxer {
    pub fn new(config: MuxConfig) -> Self {
        Self { config }
    }

    /// Check if the ffmpeg binary is available.
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(
        &self,
        video: &StreamHandle,
        audio: &StreamHandle,
        output_dir: &Path,
    ) -> Result<DeliverableFile, MuxError> {
        let file_name = output_file_name(&self.config.output_format);
        let output_path = output_dir.join(&file_name);

        tracing::info!(
            "Muxing {} + {} -> {}",
            video.path.display(),
            audio.path.display(),
            output_path.display()
        );

        // Argument vector, never a shell string: file names are
        // user-influenced and must not reach a shell.
        let mut command = tokio::process::Command::new(&self.config.ffmpeg_path);
        command
            .arg("-y")
            .arg("-i")
            .arg(&video.path)
            .arg("-i")
            .arg(&audio.path)
            .arg("-c:v")
            .arg("copy")
            .arg("-c:a")
            .arg("copy")
            .arg("-movflags")
            .arg("+faststart")
            .arg("-f")
            .arg(&self.config.output_format)
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.config.mux_timeout {
            Some(timeout) => tokio::time::timeout(timeout, command.output())
                .await
                .map_err(|_| MuxError::MuxFailed {
                    exit_code: -1,
                    stderr: format!("encoder timed out after {}s", timeout.as_secs()),
                })?,
            None => command.output().await,
        }
        .map_err(|e| MuxError::EncoderUnavailable {
            reason: format!("failed to execute ffmpeg: {e}"),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            tracing::error!("ffmpeg failed with exit code {exit_code}: {stderr}");
            return Err(MuxError::MuxFailed { exit_code, stderr });
        }

        let deliverable = deliverable_from(output_path, file_name).await?;
        tracing::info!(
            "Muxed {} bytes into {}",
            deliverable.size,
            deliverable.file_name
        );
        Ok(deliverable)
    }
}

/// Deterministic stand-in muxer for development mode and tests.
///
/// Concatenates the two inputs into the output file. Useless as media, but
/// it honors the naming, sizing and error contracts of the real muxer.
#[derive(Debug, Clone, Default)]
pub struct ConcatMuxer {
    fail: bool,
}

impl ConcatMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every mux fail, for terminal-error-path tests.
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl Muxer for ConcatMuxer {
    async fn mux(
        &self,
        video: &StreamHandle,
        audio: &StreamHandle,
        output_dir: &Path,
    ) -> Result<DeliverableFile, MuxError> {
        if self.fail {
            return Err(MuxError::MuxFailed {
                exit_code: 1,
                stderr: "simulated encoder failure".to_string(),
            });
        }

        let file_name = output_file_name("mp4");
        let output_path = output_dir.join(&file_name);

        let io_error = |operation: &str| {
            let operation = operation.to_string();
            move |source| MuxError::Io { operation, source }
        };

        let mut merged = tokio::fs::read(&video.path)
            .await
            .map_err(io_error("read video stream"))?;
        let audio_bytes = tokio::fs::read(&audio.path)
            .await
            .map_err(io_error("read audio stream"))?;
        merged.extend_from_slice(&audio_bytes);

        tokio::fs::write(&output_path, &merged)
            .await
            .map_err(io_error("write mux output"))?;

        deliverable_from(output_path, file_name).await
    }
}
