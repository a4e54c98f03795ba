//! Request orchestrator: the single endpoint walking a request through
//! discovery, fetch, mux and delivery.
//!
//! One handler, one state machine. A submission without a resolution stops
//! at the selection page; a submission with one runs the pipeline and
//! streams the deliverable. Any failure is terminal for the request and
//! renders the form with the error and whatever metadata is already known.

use axum::body::Body;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, Response, StatusCode};
use axum::response::{Html, IntoResponse};
use isaver_core::fetch::available_resolutions;
use isaver_core::pipeline::prepare_download;
use isaver_core::{IsaverError, MediaInfo, SourceUrl};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::delivery::serve_deliverable;
use super::range::extract_range_header;
use crate::pages::{self, FormState};
use crate::server::AppState;

/// Form fields of the download endpoint.
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    /// Chosen quality tier of the form `<int>p`, absent on first submission
    pub resolution: Option<String>,
}

/// Renders the empty form.
pub async fn index() -> Html<String> {
    pages::form_page(&FormState::default(), None)
}

/// Handles both form submissions: URL lookup, then resolution choice.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(request): Form<DownloadRequest>,
) -> Response<Body> {
    let mut form = FormState {
        url: request.url.trim().to_string(),
        ..FormState::default()
    };

    let source = match SourceUrl::parse(&form.url) {
        Ok(source) => source,
        Err(e) => {
            warn!("Rejected source URL: {e}");
            return error_response(&form, &IsaverError::from(e));
        }
    };

    let info = match state.provider.probe(&source).await {
        Ok(info) => info,
        Err(e) => {
            warn!("Probe failed for {source}: {e}");
            return error_response(&form, &IsaverError::from(e));
        }
    };

    form.title = Some(info.title.clone());
    form.thumbnail_url = info.thumbnail_url.clone();
    form.resolutions = available_resolutions(&info, &state.config.fetch.target_container);

    let Some(raw_resolution) = request.resolution.as_deref() else {
        info!(
            "Listed {} resolutions for {source}",
            form.resolutions.len()
        );
        return pages::form_page(&form, None).into_response();
    };

    let Some(resolution) = parse_resolution(raw_resolution) else {
        return pages::form_page(&form, Some("Choose a resolution like 720p")).into_response();
    };

    deliver(&state, &headers, &form, &info, resolution).await
}

/// Runs fetch + mux + delivery for a chosen resolution.
async fn deliver(
    state: &AppState,
    headers: &HeaderMap,
    form: &FormState,
    info: &MediaInfo,
    resolution: u32,
) -> Response<Body> {
    let prepared = match prepare_download(
        state.provider.as_ref(),
        state.muxer.as_ref(),
        &state.config,
        info,
        resolution,
    )
    .await
    {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("Pipeline failed at {}: {}", e.stage, e.source);
            return error_response(form, &e.source);
        }
    };

    let range_header = extract_range_header(headers);
    match serve_deliverable(
        prepared,
        range_header.as_deref(),
        state.config.delivery.chunk_size,
    )
    .await
    {
        Ok(response) => response,
        Err(e) => {
            error!("Delivery failed: {e}");
            error_response(form, &IsaverError::Io(e))
        }
    }
}

/// Parses the `<int>p` resolution field.
fn parse_resolution(raw: &str) -> Option<u32> {
    raw.trim().strip_suffix('p')?.parse().ok()
}

fn error_response(form: &FormState, error: &IsaverError) -> Response<Body> {
    let status = if error.is_user_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::BAD_GATEWAY
    };

    (status, pages::form_page(form, Some(&error.user_message()))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_field_requires_p_suffix() {
        assert_eq!(parse_resolution("1080p"), Some(1080));
        assert_eq!(parse_resolution(" 720p "), Some(720));
        assert_eq!(parse_resolution("1080"), None);
        assert_eq!(parse_resolution("p"), None);
        assert_eq!(parse_resolution("abcp"), None);
    }
}
