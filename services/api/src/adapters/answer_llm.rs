//! services/api/src/adapters/answer_llm.rs
//!
//! This module contains the adapter for the grounded answer-generation LLM.
//! It implements the `AnswerGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use support_chat_core::{
    retry, AnswerGenerationService, Doc, Message, PortError, PortResult, PromptConfig,
    PromptMessage, RetryPolicy, Role,
};
use tracing::{debug, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnswerGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnswerAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    prompts: PromptConfig,
    retry_policy: RetryPolicy,
}

impl OpenAiAnswerAdapter {
    /// Creates a new `OpenAiAnswerAdapter`.
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

    async fn complete(&self, messages: &[ChatCompletionRequestMessage]) -> PortResult<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages.to_vec())
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Provider(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Provider("Answer LLM response contained no text content.".to_string())
            })
    }
}

fn to_request_message(message: &PromptMessage) -> PortResult<ChatCompletionRequestMessage> {
    let content = message.content.as_str();
    let built: Result<ChatCompletionRequestMessage, OpenAIError> = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map(Into::into),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map(Into::into),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map(Into::into),
    };
    built.map_err(|e| PortError::Unexpected(e.to_string()))
}

//=========================================================================================
// `AnswerGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnswerGenerationService for OpenAiAnswerAdapter {
    /// Returns the model's text verbatim; the token hint in the prompt is advisory only.
    async fn generate_answer(
        &self,
        user_query: &str,
        docs: &[Doc],
        prev_messages: &[Message],
    ) -> PortResult<String> {
        let prompt_messages = self
            .prompts
            .build_answer_messages(user_query, docs, prev_messages);
        debug!(?prompt_messages, "Messages sent to the answer model");

        let messages = prompt_messages
            .iter()
            .map(to_request_message)
            .collect::<PortResult<Vec<_>>>()?;
        let messages = messages.as_slice();

        let answer = retry(&self.retry_policy, "generate_answer", || self.complete(messages)).await?;
        info!(
            context_docs = docs.len(),
            history = prev_messages.len(),
            "Generated answer"
        );
        Ok(answer)
    }
}
