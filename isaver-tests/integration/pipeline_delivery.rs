//! End-to-end pipeline tests: probe, fetch, mux and range-aware delivery
//! with the simulated provider and the concatenating muxer.

use axum::body::to_bytes;
use isaver_core::pipeline::prepare_download;
use isaver_core::{ConcatMuxer, IsaverConfig, MediaProvider, SimulatedProvider, SourceUrl};
use isaver_web::serve_deliverable;
use tempfile::TempDir;

const URL: &str = "https://example.com/watch?v=sim";

fn test_config(temp_root: &TempDir) -> IsaverConfig {
    let mut config = IsaverConfig::for_testing();
    config.delivery.temp_root = Some(temp_root.path().to_path_buf());
    config
}

async fn prepare(
    provider: &SimulatedProvider,
    config: &IsaverConfig,
    resolution: u32,
) -> isaver_core::PreparedDownload {
    let source = SourceUrl::parse(URL).unwrap();
    let info = provider.probe(&source).await.unwrap();
    prepare_download(provider, &ConcatMuxer::new(), config, &info, resolution)
        .await
        .unwrap()
}

#[tokio::test]
async fn pipeline_then_full_delivery_cleans_up() {
    let temp_root = TempDir::new().unwrap();
    let config = test_config(&temp_root);
    let provider = SimulatedProvider::new().with_default_catalog(URL);

    let prepared = prepare(&provider, &config, 1080).await;
    assert_eq!(prepared.file.size, 1280); // 1024-byte video + 256-byte audio

    let response = serve_deliverable(prepared, None, config.delivery.chunk_size)
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 1280);
    assert!(body[..1024].iter().all(|&b| b == 0x56));
    assert!(body[1024..].iter().all(|&b| b == 0xAA));

    assert_eq!(
        std::fs::read_dir(temp_root.path()).unwrap().count(),
        0,
        "workspace must be removed after the body is fully streamed"
    );
}

#[tokio::test]
async fn pipeline_then_range_delivery_returns_exact_slice() {
    let temp_root = TempDir::new().unwrap();
    let config = test_config(&temp_root);
    let provider = SimulatedProvider::new().with_default_catalog(URL);

    let prepared = prepare(&provider, &config, 1080).await;

    // The last 256 bytes of the concatenated output are the audio payload.
    let response = serve_deliverable(prepared, Some("bytes=1024-"), config.delivery.chunk_size)
        .await
        .unwrap();
    assert_eq!(response.status(), 206);
    assert_eq!(
        response.headers().get("content-range").unwrap(),
        "bytes 1024-1279/1280"
    );
    assert_eq!(response.headers().get("content-length").unwrap(), "256");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 256);
    assert!(body.iter().all(|&b| b == 0xAA));

    assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn aborted_delivery_still_cleans_up() {
    let temp_root = TempDir::new().unwrap();
    let config = test_config(&temp_root);
    let provider = SimulatedProvider::new().with_default_catalog(URL);

    let prepared = prepare(&provider, &config, 720).await;
    let response = serve_deliverable(prepared, None, config.delivery.chunk_size)
        .await
        .unwrap();

    // Client goes away before reading a single chunk.
    drop(response);

    assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn every_failure_stage_leaves_no_temp_files() {
    let temp_root = TempDir::new().unwrap();
    let config = test_config(&temp_root);
    let source = SourceUrl::parse(URL).unwrap();

    // Unavailable resolution.
    let provider = SimulatedProvider::new().with_default_catalog(URL);
    let info = provider.probe(&source).await.unwrap();
    let result = prepare_download(&provider, &ConcatMuxer::new(), &config, &info, 360).await;
    assert!(result.is_err());
    assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);

    // Download failure.
    let failing = SimulatedProvider::new()
        .with_default_catalog(URL)
        .failing_downloads();
    let result = prepare_download(&failing, &ConcatMuxer::new(), &config, &info, 1080).await;
    assert!(result.is_err());
    assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);

    // Mux failure.
    let result = prepare_download(&provider, &ConcatMuxer::failing(), &config, &info, 1080).await;
    assert!(result.is_err());
    assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn concurrent_requests_get_independent_workspaces() {
    let temp_root = TempDir::new().unwrap();
    let config = test_config(&temp_root);
    let provider = SimulatedProvider::new().with_default_catalog(URL);

    let (first, second) = tokio::join!(
        prepare(&provider, &config, 1080),
        prepare(&provider, &config, 480)
    );

    assert_ne!(first.workspace.path(), second.workspace.path());
    assert_ne!(first.file.file_name, second.file.file_name);

    drop(first);
    drop(second);
    assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
}
