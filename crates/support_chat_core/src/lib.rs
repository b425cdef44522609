pub mod domain;
pub mod ports;
pub mod prompts;
pub mod retry;

pub use domain::{
    retrieval_query_text, AuthSession, Category, Chat, Doc, Message, Role, User, UserCredentials,
};
pub use ports::{
    parse_id, AnswerGenerationService, AppendOutcome, CategoryClassificationService,
    DatabaseService, PortError, PortResult, RetrievalService,
};
pub use prompts::{PromptConfig, PromptMessage};
pub use retry::{classify_with_retries, retry, RetryPolicy};
