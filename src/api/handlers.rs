use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::api::state::AppState;
use crate::error::{PropensityError, Result};

/// Media type accepted by `/invocations` and returned on success.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// True when the declared media type is `text/csv`, ignoring parameters
/// such as `charset` and letter case.
pub fn is_csv(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(CSV_CONTENT_TYPE))
}

/// GET /ping -- 200 once the artifact is loaded, 404 otherwise
pub async fn ping(State(state): State<AppState>) -> StatusCode {
    if state.pipeline.health_check().await {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

/// POST /invocations -- CSV rows in, rows plus `propensity_output` out (TSV)
pub async fn invocations(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    if !is_csv(&headers) {
        let declared = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<none>")
            .to_string();
        return Err(PropensityError::UnsupportedMediaType(declared));
    }

    let invocation = state.pipeline.invoke(body.to_vec()).await.inspect_err(|e| {
        warn!("Invocation failed: {}", e);
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, CSV_CONTENT_TYPE)],
        invocation.body,
    )
        .into_response())
}
