//! End-to-end HTTP tests: the form endpoint, resolution selection, binary
//! delivery and error rendering, driven through the router with oneshot
//! requests.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use isaver_core::{ConcatMuxer, IsaverConfig, Muxer, SimulatedProvider};
use isaver_web::{AppState, build_router};
use tempfile::TempDir;
use tower::ServiceExt;

const URL: &str = "https://example.com/watch?v=sim";
const ENCODED_URL: &str = "https%3A%2F%2Fexample.com%2Fwatch%3Fv%3Dsim";

fn test_router(temp_root: &TempDir, muxer: Arc<dyn Muxer>) -> Router {
    let mut config = IsaverConfig::for_testing();
    config.delivery.temp_root = Some(temp_root.path().to_path_buf());

    let provider = Arc::new(SimulatedProvider::new().with_default_catalog(URL));
    build_router(AppState::with_components(config, provider, muxer))
}

fn form_post(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn index_renders_the_url_form() {
    let temp_root = TempDir::new().unwrap();
    let router = test_router(&temp_root, Arc::new(ConcatMuxer::new()));

    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = body_string(response).await;
    assert!(page.contains(r#"name="url""#));
}

#[tokio::test]
async fn url_submission_lists_resolutions_descending() {
    let temp_root = TempDir::new().unwrap();
    let router = test_router(&temp_root, Arc::new(ConcatMuxer::new()));

    let response = router
        .oneshot(form_post(&format!("url={ENCODED_URL}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = body_string(response).await;
    assert!(page.contains("Simulated Video"));

    // 1080p, 720p, 480p in that order; the duplicate 720p advert collapses.
    let p1080 = page.find("1080p").unwrap();
    let p720 = page.find(r#"value="720p""#).unwrap();
    let p480 = page.find(r#"value="480p""#).unwrap();
    assert!(p1080 < p720 && p720 < p480);
    assert_eq!(page.matches(r#"value="720p""#).count(), 1);
}

#[tokio::test]
async fn resolution_choice_streams_the_muxed_file() {
    let temp_root = TempDir::new().unwrap();
    let router = test_router(&temp_root, Arc::new(ConcatMuxer::new()));

    let response = router
        .oneshot(form_post(&format!("url={ENCODED_URL}&resolution=1080p")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );
    assert_eq!(response.headers().get(header::ACCEPT_RANGES).unwrap(), "bytes");
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"isaver_"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.len(), 1280);

    assert_eq!(
        std::fs::read_dir(temp_root.path()).unwrap().count(),
        0,
        "temporary directory must be gone after delivery"
    );
}

#[tokio::test]
async fn range_request_gets_partial_content() {
    let temp_root = TempDir::new().unwrap();
    let router = test_router(&temp_root, Arc::new(ConcatMuxer::new()));

    let mut request = form_post(&format!("url={ENCODED_URL}&resolution=1080p"));
    request
        .headers_mut()
        .insert(header::RANGE, "bytes=200-499".parse().unwrap());

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 200-499/1280"
    );
    assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "300");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.len(), 300);
}

#[tokio::test]
async fn unknown_resolution_renders_error_with_form_state() {
    let temp_root = TempDir::new().unwrap();
    let router = test_router(&temp_root, Arc::new(ConcatMuxer::new()));

    let response = router
        .oneshot(form_post(&format!("url={ENCODED_URL}&resolution=144p")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let page = body_string(response).await;
    assert!(page.contains("144p is not available"));
    // Selection state survives so the user can pick another tier.
    assert!(page.contains("Simulated Video"));
    assert!(page.contains(r#"value="720p""#));

    assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn mux_failure_renders_error_and_cleans_up() {
    let temp_root = TempDir::new().unwrap();
    let router = test_router(&temp_root, Arc::new(ConcatMuxer::failing()));

    let response = router
        .oneshot(form_post(&format!("url={ENCODED_URL}&resolution=1080p")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let page = body_string(response).await;
    assert!(page.contains("Combining the streams failed"));

    assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn malformed_url_is_rejected_without_probing() {
    let temp_root = TempDir::new().unwrap();
    let router = test_router(&temp_root, Arc::new(ConcatMuxer::new()));

    let response = router
        .oneshot(form_post("url=not%20a%20url"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let page = body_string(response).await;
    assert!(page.contains("Not a usable video URL"));
}

#[tokio::test]
async fn health_endpoint_reports_mode() {
    let temp_root = TempDir::new().unwrap();
    let router = test_router(&temp_root, Arc::new(ConcatMuxer::new()));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let document: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(document["status"], "healthy");
    assert_eq!(document["mode"], "DEVELOPMENT");
}
