use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::ApiResponse;
use crate::proxy::middleware::SessionId;
use crate::proxy::server::AppState;

/// Connectivity probe: forces a fresh token acquisition for this session and
/// returns whatever the authority answered.
pub async fn check_token(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResponse {
    match state.token_manager.acquire_token(&session.0).await {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(failure) => (failure.status, Json(failure.body)),
    }
}
