pub mod answer_llm;
pub mod classifier_llm;
pub mod db;
pub mod pinecone;

pub use answer_llm::OpenAiAnswerAdapter;
pub use classifier_llm::OpenAiClassifierAdapter;
pub use db::DbAdapter;
pub use pinecone::PineconeAdapter;

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;
use support_chat_core::{PortError, PortResult};

/// Builds the shared OpenAI-compatible client with a per-call timeout.
pub fn openai_client(api_base: &str, api_key: &str, timeout: Duration) -> PortResult<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PortError::Unexpected(format!("Failed to create HTTP client: {}", e)))?;
    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);
    Ok(Client::with_config(config).with_http_client(http_client))
}
