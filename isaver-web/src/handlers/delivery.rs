//! Range-aware delivery of a prepared download.
//!
//! Streams the muxed file in bounded chunks so peak memory stays flat
//! regardless of file size. The response body owns the request workspace:
//! whether the body is streamed to completion or the client disconnects
//! mid-transfer, dropping the stream removes the temporary directory
//! exactly once.

use std::io::SeekFrom;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use bytes::Bytes;
use futures::Stream;
use isaver_core::{PreparedDownload, ScopedWorkspace};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::range::parse_range_header;

/// Body stream that keeps the request workspace alive until dropped.
struct WorkspaceStream<S> {
    inner: S,
    _workspace: ScopedWorkspace,
}

impl<S> Stream for WorkspaceStream<S>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

/// Builds the 200/206 download response for a prepared file.
///
/// A valid `Range` header selects a partial-content response; anything else
/// serves the whole file. The workspace travels inside the body stream, so
/// cleanup fires after the final chunk (or the client going away), never
/// before.
///
/// # Errors
///
/// - `std::io::Error` - The muxed file could not be opened or seeked; the
///   workspace is dropped (and removed) on this path too
pub async fn serve_deliverable(
    prepared: PreparedDownload,
    range_header: Option<&str>,
    chunk_size: usize,
) -> std::io::Result<Response<Body>> {
    let PreparedDownload { file, workspace } = prepared;
    let total = file.size;

    let range = range_header.and_then(|header| parse_range_header(header, total));

    let mut media = tokio::fs::File::open(&file.path).await?;

    let (status, content_length) = match range {
        Some(range) => {
            media.seek(SeekFrom::Start(range.start)).await?;
            (StatusCode::PARTIAL_CONTENT, range.len())
        }
        None => (StatusCode::OK, total),
    };

    let reader = media.take(content_length);
    let stream = WorkspaceStream {
        inner: ReaderStream::with_capacity(reader, chunk_size),
        _workspace: workspace,
    };

    let mut response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, file.mime_type)
        .header(header::CONTENT_LENGTH, content_length.to_string())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.file_name),
        );

    if let Some(range) = range {
        response = response.header(header::CONTENT_RANGE, range.content_range());
    }

    tracing::info!(
        "Delivering {} ({} of {} bytes, status {})",
        file.file_name,
        content_length,
        total,
        status.as_u16()
    );

    response
        .body(Body::from_stream(stream))
        .map_err(std::io::Error::other)
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use isaver_core::{DeliverableFile, ScopedWorkspace};

    use super::*;

    /// A 1000-byte deliverable (bytes 0..=255 repeating) in its own workspace.
    fn prepared_download() -> PreparedDownload {
        let workspace = ScopedWorkspace::create(None).unwrap();
        let payload: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
        let path = workspace.file("isaver_test.mp4");
        std::fs::write(&path, &payload).unwrap();

        PreparedDownload {
            file: DeliverableFile {
                path,
                size: 1000,
                mime_type: "application/octet-stream",
                file_name: "isaver_test.mp4".to_string(),
            },
            workspace,
        }
    }

    fn header_str<'a>(response: &'a Response<Body>, name: header::HeaderName) -> &'a str {
        response.headers().get(name).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn full_download_without_range_header() {
        let response = serve_deliverable(prepared_download(), None, 64).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), "1000");
        assert_eq!(header_str(&response, header::ACCEPT_RANGES), "bytes");
        assert!(header_str(&response, header::CONTENT_DISPOSITION).starts_with("attachment"));
        assert!(response.headers().get(header::CONTENT_RANGE).is_none());

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), 1000);
    }

    #[tokio::test]
    async fn bounded_range_returns_exact_slice() {
        let response = serve_deliverable(prepared_download(), Some("bytes=200-499"), 64)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            header_str(&response, header::CONTENT_RANGE),
            "bytes 200-499/1000"
        );
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), "300");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), 300);
        let expected: Vec<u8> = (200..500u32).map(|i| (i % 256) as u8).collect();
        assert_eq!(body.as_ref(), expected.as_slice());
    }

    #[tokio::test]
    async fn open_ended_range_runs_to_last_byte() {
        let response = serve_deliverable(prepared_download(), Some("bytes=900-"), 64)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            header_str(&response, header::CONTENT_RANGE),
            "bytes 900-999/1000"
        );
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), "100");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), 100);
    }

    #[tokio::test]
    async fn malformed_range_serves_full_content() {
        let response = serve_deliverable(prepared_download(), Some("chunks=1-2"), 64)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), "1000");
    }

    #[tokio::test]
    async fn workspace_is_removed_after_body_is_consumed() {
        let prepared = prepared_download();
        let dir = prepared.workspace.path().to_path_buf();

        let response = serve_deliverable(prepared, None, 64).await.unwrap();
        assert!(dir.exists(), "workspace must live while the body streams");

        let _ = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(!dir.exists(), "workspace must be gone after the last chunk");
    }

    #[tokio::test]
    async fn workspace_is_removed_when_client_disconnects() {
        let prepared = prepared_download();
        let dir = prepared.workspace.path().to_path_buf();

        let response = serve_deliverable(prepared, None, 64).await.unwrap();
        // Dropping the body without reading it models a client disconnect.
        drop(response);
        assert!(!dir.exists());
    }
}
