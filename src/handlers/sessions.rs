// Administrative session endpoints
// Enumeration and forced termination; store failures pass through as 500s,
// this layer adds no retries of its own.

use crate::session::registry::RegistryState;
use crate::session::store::StoreError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    pub user: Option<String>,
}

/// GET /api/v1/sessions
/// Without `?user=`, returns all sessions grouped by user; with `?user=<id>`,
/// returns that user's sessions (empty list when the user has none).
pub async fn list_sessions(
    State(state): State<RegistryState>,
    Query(query): Query<SessionsQuery>,
) -> Response {
    match query.user {
        Some(user_id) => match state.registry.find_user_sessions(&user_id).await {
            Ok(sessions) => (StatusCode::OK, Json(sessions)).into_response(),
            Err(e) => store_error_response(e),
        },
        None => match state.registry.find_sessions().await {
            Ok(groups) => (StatusCode::OK, Json(groups)).into_response(),
            Err(e) => store_error_response(e),
        },
    }
}

/// DELETE /api/v1/session/:session_id
pub async fn kill_session(
    State(state): State<RegistryState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.registry.kill_session(&session_id).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({
                "id": session_id,
                "receipt": receipt,
            })),
        )
            .into_response(),
        Err(e) => store_error_response(e),
    }
}

/// DELETE /api/v1/sessions?user=<id>
pub async fn kill_user_sessions(
    State(state): State<RegistryState>,
    Query(query): Query<SessionsQuery>,
) -> Response {
    let Some(user_id) = query.user else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing required query parameter 'user'" })),
        )
            .into_response();
    };

    match state.registry.kill_user_sessions(&user_id).await {
        Ok(receipts) => (
            StatusCode::OK,
            Json(json!({
                "user_id": user_id,
                "killed": receipts.len(),
                "receipts": receipts,
            })),
        )
            .into_response(),
        Err(e) => store_error_response(e),
    }
}

fn store_error_response(e: StoreError) -> Response {
    error!("Session store operation failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
        .into_response()
}
