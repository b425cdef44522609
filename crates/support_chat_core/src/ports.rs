//! crates/support_chat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{Category, Chat, Doc, Message, User, UserCredentials};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// An outbound model or vector-search call failed; safe to retry.
    #[error("Provider call failed: {0}")]
    Provider(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Whether the failure is transient and the call may be attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Provider(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Parses an opaque identifier in the store's native format.
pub fn parse_id(raw: &str) -> PortResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| PortError::InvalidId(raw.to_string()))
}

/// The result of appending a turn to an existing chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Persisted,
    /// No chat matched both the id and the owning user; nothing was written.
    NotFound,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(&self, name: &str, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    // --- Auth Tokens ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Chat Sessions ---
    /// Creates a chat with its first messages and returns it with its assigned id.
    async fn create_chat(&self, user_id: Uuid, title: &str, messages: &[Message])
        -> PortResult<Chat>;

    /// Appends all `messages` atomically to the chat matching both ids.
    async fn append_messages(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        messages: &[Message],
    ) -> PortResult<AppendOutcome>;

    /// Loads a chat owned by `user_id`.
    async fn get_chat(&self, chat_id: Uuid, user_id: Uuid) -> PortResult<Chat>;

    /// All chats owned by `user_id`, newest first.
    async fn list_chats_for_user(&self, user_id: Uuid) -> PortResult<Vec<Chat>>;

    async fn delete_chat(&self, chat_id: Uuid, user_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait RetrievalService: Send + Sync {
    /// Embeds a query string into a dense vector.
    async fn embed_query(&self, text: &str) -> PortResult<Vec<f32>>;

    /// Returns the `top_k` nearest documents, most similar first.
    async fn query_documents(&self, vector: &[f32], top_k: usize) -> PortResult<Vec<Doc>>;

    /// Re-scores `documents` against the raw query text and keeps the best `top_n`.
    async fn rerank_documents(
        &self,
        query: &str,
        documents: &[Doc],
        top_n: usize,
    ) -> PortResult<Vec<Doc>>;
}

#[async_trait]
pub trait CategoryClassificationService: Send + Sync {
    /// Best-effort classification. `None` means "skip category tagging".
    async fn classify_category(&self, query: &str) -> Option<Category>;
}

#[async_trait]
pub trait AnswerGenerationService: Send + Sync {
    /// Generates a grounded answer from the query, retrieved docs and prior turns.
    async fn generate_answer(
        &self,
        user_query: &str,
        docs: &[Doc],
        prev_messages: &[Message],
    ) -> PortResult<String>;
}
