//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::{
    error::ApiError,
    web::{
        auth::{self, LoginRequest, MessageBody, RegisterRequest, TokenResponse},
        chat_task::{run_chat_turn, ChatTurnRequest, PersistOutcome},
        state::AppState,
    },
};
use axum::{
    extract::{Extension, Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use support_chat_core::{parse_id, Chat, Message};
use tracing::info;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        chat_handler,
        chat_history_handler,
        get_chat_handler,
        delete_chat_handler,
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
    ),
    components(
        schemas(
            ChatRequest,
            ChatTurnResponse,
            ChatResponse,
            MessageResponse,
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            TokenResponse,
            MessageBody,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "chat", description = "Retrieval-augmented support chat."),
        (name = "auth", description = "Registration and bearer tokens."),
        (name = "health", description = "Liveness probe.")
    )
)]
pub struct ApiDoc;

/// Registers the bearer scheme referenced by the protected chat routes.
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A single support question, optionally tied to a user and an existing chat.
#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

/// The answer to a turn. `title` and `chat_id` are present only when a chat was created.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ChatTurnResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub chat_id: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct MessageResponse {
    /// One of `user`, `assistant`, `system`.
    pub role: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            text: message.text,
            created_at: message.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ChatResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub messages: Vec<MessageResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            user_id: chat.user_id,
            title: chat.title,
            messages: chat.messages.into_iter().map(Into::into).collect(),
            created_at: chat.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct HealthResponse {
    pub status: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Answer a support question.
///
/// With a `user_id` and no `chat_id`, a new chat is created and its id returned.
/// With both, the turn is appended to that chat. Without a `user_id` nothing is stored.
#[utoipa::path(
    post,
    path = "/chats",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Generated answer", body = ChatTurnResponse),
        (status = 400, description = "Blank prompt or malformed user id"),
        (status = 404, description = "The referenced chat does not exist"),
        (status = 502, description = "A model or search provider failed")
    ),
    tag = "chat"
)]
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatTurnResponse>, ApiError> {
    let outcome = run_chat_turn(
        &app_state,
        ChatTurnRequest {
            prompt: req.prompt,
            user_id: req.user_id,
            chat_id: req.chat_id,
        },
    )
    .await?;

    let (title, chat_id) = match outcome.persistence {
        PersistOutcome::Created(chat) => (Some(chat.title), Some(chat.id.to_string())),
        _ => (None, None),
    };
    Ok(Json(ChatTurnResponse {
        response: outcome.answer,
        title,
        chat_id,
    }))
}

/// List the caller's chats, newest first.
#[utoipa::path(
    get,
    path = "/chats/history",
    responses(
        (status = 200, description = "The caller's chats", body = [ChatResponse]),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "chat"
)]
pub async fn chat_history_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<ChatResponse>>, ApiError> {
    let chats = app_state.db.list_chats_for_user(user_id).await?;
    Ok(Json(chats.into_iter().map(Into::into).collect()))
}

/// Fetch one of the caller's chats.
#[utoipa::path(
    get,
    path = "/chats/{chat_id}",
    params(("chat_id" = String, Path, description = "The chat id.")),
    responses(
        (status = 200, description = "The chat", body = ChatResponse),
        (status = 400, description = "Malformed chat id"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Chat not found")
    ),
    security(("bearer" = [])),
    tag = "chat"
)]
pub async fn get_chat_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatResponse>, ApiError> {
    let chat_id = parse_id(&chat_id)?;
    let chat = app_state.db.get_chat(chat_id, user_id).await?;
    Ok(Json(chat.into()))
}

/// Delete one of the caller's chats.
#[utoipa::path(
    delete,
    path = "/chats/{chat_id}",
    params(("chat_id" = String, Path, description = "The chat id.")),
    responses(
        (status = 200, description = "Chat deleted", body = MessageBody),
        (status = 400, description = "Malformed chat id"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Chat not found")
    ),
    security(("bearer" = [])),
    tag = "chat"
)]
pub async fn delete_chat_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(chat_id): Path<String>,
) -> Result<Json<MessageBody>, ApiError> {
    let chat_id = parse_id(&chat_id)?;
    app_state.db.delete_chat(chat_id, user_id).await?;
    info!(%chat_id, %user_id, "Chat deleted");
    Ok(Json(MessageBody {
        message: "Chat deleted".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
