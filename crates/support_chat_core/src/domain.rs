//! crates/support_chat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or wire format.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Conversation Types
//=========================================================================================

/// The author of a message, doubling as the role tag sent to the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Parses a stored role tag. Anything unrecognised is treated as `User`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "assistant" => Role::Assistant,
            "system" => Role::System,
            _ => Role::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored contribution to a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// A conversation thread owned by a single user.
///
/// `messages` only ever grows, one user/assistant pair per turn.
#[derive(Debug, Clone)]
pub struct Chat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Retrieval Types
//=========================================================================================

/// A knowledge-base snippet returned by retrieval. Never persisted.
///
/// `question` is the field the reranker scores against; `text` is the
/// grounding content handed to the answer generator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Doc {
    pub id: String,
    pub question: String,
    pub text: String,
}

/// The support domain a query was classified into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    AccountRegistration,
    PaymentsTransactions,
    TechnicalSupport,
    RegulationsCompliance,
    SecurityFraudPrevention,
    /// A label outside the known set, kept as the model produced it (normalized).
    Other(String),
}

impl Category {
    pub const KNOWN: [Category; 5] = [
        Category::AccountRegistration,
        Category::PaymentsTransactions,
        Category::TechnicalSupport,
        Category::RegulationsCompliance,
        Category::SecurityFraudPrevention,
    ];

    /// Normalizes raw model output (trim + lowercase) into a category.
    ///
    /// Returns `None` when the output is empty or literally `unknown`.
    pub fn from_model_output(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() || normalized == "unknown" {
            return None;
        }
        let known = Self::KNOWN
            .iter()
            .find(|category| category.label() == normalized)
            .cloned();
        Some(known.unwrap_or(Category::Other(normalized)))
    }

    /// The normalized label used when tagging retrieval queries.
    pub fn label(&self) -> &str {
        match self {
            Category::AccountRegistration => "account & registration",
            Category::PaymentsTransactions => "payments & transactions",
            Category::TechnicalSupport => "technical support & troubleshooting",
            Category::RegulationsCompliance => "regulations & compliance",
            Category::SecurityFraudPrevention => "security & fraud prevention",
            Category::Other(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Other(_))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Builds the text sent for embedding, prefixed with the category when one is known.
pub fn retrieval_query_text(prompt: &str, category: Option<&Category>) -> String {
    match category {
        Some(category) => format!("Category: {} | Query: {}", category.label(), prompt),
        None => prompt.to_string(),
    }
}

//=========================================================================================
// Users & Auth
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/register - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents an issued bearer token
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
