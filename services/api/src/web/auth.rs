//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration, login, and logout.
//!
//! Tokens are opaque random ids stored with an expiry; the stored row carries
//! the user identity. Clients may present them as a bearer token or through
//! the `session` cookie set on register/login.

use crate::{error::ApiError, web::state::AppState};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use support_chat_core::{AuthSession, PortError};
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const SESSION_COOKIE: &str = "session";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageBody {
    pub message: String,
}

//=========================================================================================
// Token Helpers
//=========================================================================================

/// Pulls the access token from `Authorization: Bearer` or, failing that, the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|token| !token.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (name, value) = c.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
        })
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Stores a fresh token for `user_id`, valid for the configured lifetime.
async fn issue_token(state: &AppState, user_id: Uuid) -> Result<AuthSession, ApiError> {
    let session = AuthSession {
        id: Uuid::new_v4().to_string(),
        user_id,
        expires_at: Utc::now() + state.config.access_token_ttl,
    };
    state
        .db
        .create_auth_session(&session.id, session.user_id, session.expires_at)
        .await?;
    Ok(session)
}

fn token_reply(
    status: StatusCode,
    state: &AppState,
    session: AuthSession,
    email: String,
) -> impl IntoResponse {
    let cookie = session_cookie(&session.id, state.config.access_token_ttl.num_seconds());
    let body = TokenResponse {
        access_token: session.id,
        token_type: "bearer".to_string(),
        user_id: session.user_id,
        email,
    };
    (status, [(header::SET_COOKIE, cookie)], Json(body))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = TokenResponse),
        (status = 400, description = "Invalid request or email already registered"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim();
    let email = req.email.trim();
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::Validation("name and email must not be empty".to_string()));
    }
    if req.password.is_empty() {
        return Err(ApiError::Validation("password must not be empty".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let user = state.db.create_user(name, email, &password_hash).await?;
    let session = issue_token(&state, user.id).await?;
    info!(user_id = %user.id, "User registered");

    Ok(token_reply(StatusCode::CREATED, &state, session, user.email))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_creds = match state.db.get_user_by_email(req.email.trim()).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => {
            warn!("Login attempt for unknown email");
            return Err(PortError::Unauthorized.into());
        }
        Err(e) => return Err(e.into()),
    };

    if !verify_password(&req.password, &user_creds.hashed_password)? {
        warn!(user_id = %user_creds.user_id, "Login attempt with wrong password");
        return Err(PortError::Unauthorized.into());
    }

    let session = issue_token(&state, user_creds.user_id).await?;
    info!(user_id = %user_creds.user_id, "User logged in");

    Ok(token_reply(StatusCode::OK, &state, session, user_creds.email))
}

/// POST /auth/logout - Logout and revoke the token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful", body = MessageBody),
        (status = 401, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_token(&headers).ok_or(PortError::Unauthorized)?;
    state.db.delete_auth_session(token).await?;

    let cookie = session_cookie("", 0);
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(MessageBody {
            message: "Logged out".to_string(),
        }),
    ))
}
