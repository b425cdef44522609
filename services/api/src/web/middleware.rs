//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use support_chat_core::PortError;
use tracing::{error, warn};

use crate::web::{auth::extract_token, state::AppState};

/// Middleware that validates the access token and extracts the user_id.
///
/// If valid, inserts the user_id into request extensions for handlers to use.
/// If missing, unknown or expired, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_token(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let user_id = state
        .db
        .validate_auth_session(token)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized => {
                warn!("Rejected unknown or expired token");
                StatusCode::UNAUTHORIZED
            }
            other => {
                error!("Failed to validate auth session: {:?}", other);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
