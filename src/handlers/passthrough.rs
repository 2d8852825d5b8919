//! # Generic Passthrough
//!
//! Forwards any other path under the proxy prefix to the same path upstream.
//! The path is taken still percent-encoded from the request line, so encoded
//! `?`, `#` and `/` stay inside their segment.

use axum::{
    Json,
    body::Bytes,
    extract::{OriginalUri, RawQuery, State},
};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::server::{API_PREFIX, AppState};

/// Raw upstream path for a request under the proxy prefix.
///
/// Dot segments are refused, encoded or not.
fn upstream_path(uri: &axum::http::Uri) -> Result<String, ApiError> {
    let raw = uri.path();
    let path = raw.strip_prefix(API_PREFIX).unwrap_or(raw);

    let normalized = path
        .to_ascii_lowercase()
        .replace("%2e", ".")
        .replace("%2f", "/")
        .replace("%5c", "/")
        .replace('\\', "/");
    if normalized.split('/').any(|segment| segment == ".." || segment == ".") {
        return Err(ApiError::validation("path must not contain dot segments"));
    }

    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Ok(format!("/{}", path))
    }
}

/// Forwards a GET, keeping the query string
#[utoipa::path(
    get,
    path = "/api/saltedge/{path}",
    params(("path" = String, Path, description = "Upstream path, may contain slashes")),
    responses(
        (status = 200, description = "Upstream response body"),
        (status = 400, description = "Path contains dot segments", body = ApiError),
        (status = 500, description = "Upstream or configuration failure", body = ApiError)
    ),
    tag = "passthrough"
)]
pub async fn forward_get(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, ApiError> {
    let path = upstream_path(&uri)?;
    let endpoint = match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };

    debug!(endpoint = %endpoint, "Passthrough GET");
    Ok(Json(state.upstream.forward(&endpoint, Method::GET, None).await?))
}

/// Forwards a POST; the body is wrapped in the data envelope upstream
#[utoipa::path(
    post,
    path = "/api/saltedge/{path}",
    params(("path" = String, Path, description = "Upstream path, may contain slashes")),
    request_body = Object,
    responses(
        (status = 200, description = "Upstream response body"),
        (status = 400, description = "Body is not JSON or path contains dot segments", body = ApiError),
        (status = 500, description = "Upstream or configuration failure", body = ApiError)
    ),
    tag = "passthrough"
)]
pub async fn forward_post(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let endpoint = upstream_path(&uri)?;
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(
            serde_json::from_slice::<Value>(&body)
                .map_err(|err| ApiError::validation(format!("JSON syntax error: {}", err)))?,
        )
    };

    debug!(endpoint = %endpoint, "Passthrough POST");
    Ok(Json(
        state
            .upstream
            .forward(&endpoint, Method::POST, payload)
            .await?,
    ))
}
