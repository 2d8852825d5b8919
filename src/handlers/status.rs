//! # Credential Status Handler

use axum::{Json, extract::State};

use crate::models::StatusReport;
use crate::server::AppState;

/// Reports which service credentials are configured, with masked values
#[utoipa::path(
    get,
    path = "/api/saltedge/status",
    responses(
        (status = 200, description = "Credential presence and masks; raw values are never returned", body = StatusReport)
    ),
    tag = "status"
)]
pub async fn get_status(State(state): State<AppState>) -> Json<StatusReport> {
    let config = &state.config;
    let mode = if state.upstream.has_credentials() {
        "live"
    } else {
        "unconfigured"
    };

    Json(StatusReport::from_credentials(
        config.saltedge_app_id.as_deref().unwrap_or_default(),
        config.saltedge_secret.as_deref().unwrap_or_default(),
        config.saltedge_private_key.as_deref(),
        config.profile.as_str(),
        state.upstream.version().as_str(),
        mode,
    ))
}
