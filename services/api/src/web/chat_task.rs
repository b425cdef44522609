//! services/api/src/web/chat_task.rs
//!
//! The request orchestrator for a single support-chat turn:
//! classify, retrieve and rerank context, load history, answer, persist.
//!
//! Each step consumes the previous one's output, so the turn runs strictly
//! in sequence. Provider failures abort the turn with no partial answer;
//! persistence outcomes that the caller does not need to act on are logged
//! and reported through [`PersistOutcome`].

use crate::{error::ApiError, web::state::AppState};
use std::time::Instant;
use support_chat_core::{
    parse_id, retrieval_query_text, AppendOutcome, Chat, Message, PortError, Role,
};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

/// One inbound turn, with ids still in their raw wire form.
#[derive(Debug, Clone)]
pub struct ChatTurnRequest {
    pub prompt: String,
    pub user_id: Option<String>,
    pub chat_id: Option<String>,
}

/// What happened to the turn after the answer was generated.
#[derive(Debug, Clone)]
pub enum PersistOutcome {
    /// A new chat was created with the user/assistant pair.
    Created(Chat),
    /// The pair was appended to the caller's existing chat.
    Appended,
    /// The supplied chat id was malformed; nothing was written.
    InvalidChatId,
    /// The chat vanished before the append; nothing was written.
    ChatNotFound,
    /// The user id is well-formed but names no user; nothing was written.
    UserNotFound,
    /// No user id was supplied; the turn is not stored.
    Ephemeral,
}

#[derive(Debug, Clone)]
pub struct ChatTurnOutcome {
    pub answer: String,
    pub persistence: PersistOutcome,
}

/// The caller's chat reference after parsing.
enum ChatRef {
    Absent,
    Malformed(String),
    Id(Uuid),
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|value| !value.trim().is_empty())
}

/// Runs one full turn against the services in `app_state`.
pub async fn run_chat_turn(
    app_state: &AppState,
    request: ChatTurnRequest,
) -> Result<ChatTurnOutcome, ApiError> {
    let start_time = Instant::now();

    // --- Validation ---
    let prompt = request.prompt;
    if prompt.trim().is_empty() {
        return Err(ApiError::Validation("prompt must not be empty".to_string()));
    }
    let user_id = non_blank(request.user_id)
        .map(|raw| parse_id(&raw))
        .transpose()?;
    let chat_ref = match non_blank(request.chat_id) {
        None => ChatRef::Absent,
        Some(raw) => match parse_id(&raw) {
            Ok(id) => ChatRef::Id(id),
            Err(_) => ChatRef::Malformed(raw),
        },
    };

    // --- Classification (best effort, bounded) ---
    let category = match timeout(
        app_state.config.classify_timeout,
        app_state.classifier_adapter.classify_category(&prompt),
    )
    .await
    {
        Ok(category) => category,
        Err(_) => {
            warn!(
                budget = ?app_state.config.classify_timeout,
                "Classification timed out; continuing without a category"
            );
            None
        }
    };
    match &category {
        Some(category) => info!(category = %category, known = category.is_known(), "Query classified"),
        None => info!("Query left uncategorized"),
    }

    // --- Retrieval ---
    let query_text = retrieval_query_text(&prompt, category.as_ref());
    let retrieval = &app_state.retrieval_adapter;
    let vector = retrieval.embed_query(&query_text).await?;
    let candidates = retrieval
        .query_documents(&vector, app_state.config.retrieval_top_k)
        .await?;
    let docs = retrieval
        .rerank_documents(&prompt, &candidates, app_state.config.rerank_top_n)
        .await?;
    info!(
        candidates = candidates.len(),
        context_docs = docs.len(),
        "Context retrieved"
    );

    // --- History ---
    let history = match (user_id, &chat_ref) {
        (Some(user_id), ChatRef::Id(chat_id)) => {
            app_state.db.get_chat(*chat_id, user_id).await?.messages
        }
        _ => Vec::new(),
    };

    // --- Answer ---
    let answer = app_state
        .answer_adapter
        .generate_answer(&prompt, &docs, &history)
        .await?;

    // --- Persistence ---
    let persistence = persist_turn(app_state, &prompt, &answer, user_id, chat_ref).await?;
    info!(
        outcome = persistence_label(&persistence),
        elapsed = ?start_time.elapsed(),
        "Chat turn complete"
    );

    Ok(ChatTurnOutcome {
        answer,
        persistence,
    })
}

/// Exactly one of create or append runs when a user is present.
async fn persist_turn(
    app_state: &AppState,
    prompt: &str,
    answer: &str,
    user_id: Option<Uuid>,
    chat_ref: ChatRef,
) -> Result<PersistOutcome, ApiError> {
    let Some(user_id) = user_id else {
        if !matches!(chat_ref, ChatRef::Absent) {
            warn!("chat_id supplied without user_id; turn not stored");
        }
        return Ok(PersistOutcome::Ephemeral);
    };

    let turn = [
        Message::new(Role::User, prompt),
        Message::new(Role::Assistant, answer),
    ];

    match chat_ref {
        ChatRef::Malformed(raw) => {
            warn!(%user_id, chat_id = %raw, "Invalid chat_id provided; turn not stored");
            Ok(PersistOutcome::InvalidChatId)
        }
        ChatRef::Id(chat_id) => match app_state.db.append_messages(chat_id, user_id, &turn).await? {
            AppendOutcome::Persisted => {
                info!(%chat_id, %user_id, "Appended turn to chat");
                Ok(PersistOutcome::Appended)
            }
            AppendOutcome::NotFound => {
                warn!(%chat_id, %user_id, "No chat matched for append; turn not stored");
                Ok(PersistOutcome::ChatNotFound)
            }
        },
        ChatRef::Absent => {
            // The user can disappear between the lookup and the insert; both report NotFound.
            let created = match app_state.db.get_user_by_id(user_id).await {
                Ok(_) => app_state.db.create_chat(user_id, prompt, &turn).await,
                Err(e) => Err(e),
            };
            match created {
                Ok(chat) => {
                    info!(chat_id = %chat.id, %user_id, "Created chat");
                    Ok(PersistOutcome::Created(chat))
                }
                Err(PortError::NotFound(_)) => {
                    warn!(%user_id, "Unknown user; turn not stored");
                    Ok(PersistOutcome::UserNotFound)
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

fn persistence_label(outcome: &PersistOutcome) -> &'static str {
    match outcome {
        PersistOutcome::Created(_) => "created",
        PersistOutcome::Appended => "appended",
        PersistOutcome::InvalidChatId => "invalid_chat_id",
        PersistOutcome::ChatNotFound => "chat_not_found",
        PersistOutcome::UserNotFound => "user_not_found",
        PersistOutcome::Ephemeral => "ephemeral",
    }
}
