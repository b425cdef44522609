//! services/api/src/adapters/classifier_llm.rs
//!
//! This module contains the adapter for the category-classification LLM.
//! It implements the `CategoryClassificationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use support_chat_core::{
    classify_with_retries, Category, CategoryClassificationService, PortError, PortResult,
    PromptConfig, RetryPolicy,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CategoryClassificationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiClassifierAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    prompts: PromptConfig,
    retry_policy: RetryPolicy,
}

impl OpenAiClassifierAdapter {
    /// Creates a new `OpenAiClassifierAdapter`.
    pub fn new(
        client: Client<OpenAIConfig>,
        model: String,
        prompts: PromptConfig,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            model,
            prompts,
            retry_policy,
        }
    }

    /// One single-turn completion; returns the raw text (empty if the model sent none).
    async fn classify_once(&self, prompt: &str) -> PortResult<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into()])
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Provider(e.to_string()))?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

//=========================================================================================
// `CategoryClassificationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CategoryClassificationService for OpenAiClassifierAdapter {
    async fn classify_category(&self, query: &str) -> Option<Category> {
        let prompt = self.prompts.render_classifier(query);
        let prompt = prompt.as_str();
        classify_with_retries(&self.retry_policy, || self.classify_once(prompt)).await
    }
}
