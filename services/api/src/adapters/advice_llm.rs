//! services/api/src/adapters/advice_llm.rs
//!
//! The adapter for the remote chat-completion endpoint that writes financial advice.
//! It implements the `AdviceService` port from the `core` crate against any
//! OpenAI-compatible API (Groq by default).

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use finance_core::domain::{ChatMessage, ChatRole};
use finance_core::ports::{AdviceService, PortError, PortResult};
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::Config;

pub struct OpenAiAdviceAdapter {
    /// `None` when no API key is configured; every call then fails fast.
    client: Option<Client<OpenAIConfig>>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiAdviceAdapter {
    pub fn new(
        client: Option<Client<OpenAIConfig>>,
        model: String,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self { client, model, temperature, timeout }
    }

    pub fn from_config(config: &Config) -> Self {
        let client = config.advice_api_key.as_ref().map(|key| {
            Client::with_config(
                OpenAIConfig::new()
                    .with_api_key(key)
                    .with_api_base(&config.advice_api_base),
            )
        });
        Self::new(
            client,
            config.advice_model.clone(),
            config.advice_temperature,
            config.advice_timeout,
        )
    }
}

fn to_request_message(message: &ChatMessage) -> PortResult<ChatCompletionRequestMessage> {
    let built = match message.role {
        ChatRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.as_str())
            .build()
            .map(ChatCompletionRequestMessage::System),
        ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.as_str())
            .build()
            .map(ChatCompletionRequestMessage::User),
        ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.content.as_str())
            .build()
            .map(ChatCompletionRequestMessage::Assistant),
    };
    built.map_err(|e| PortError::Unexpected(e.to_string()))
}

/// A reply that arrived but could not be used is the upstream's fault; anything
/// that kept the reply from arriving means the service is unavailable.
fn classify(err: OpenAIError) -> PortError {
    match err {
        OpenAIError::JSONDeserialize(..) | OpenAIError::ApiError(_) => {
            PortError::Upstream(err.to_string())
        }
        OpenAIError::InvalidArgument(_) => PortError::Unexpected(err.to_string()),
        _ => PortError::Unavailable(err.to_string()),
    }
}

#[async_trait]
impl AdviceService for OpenAiAdviceAdapter {
    async fn complete(&self, messages: &[ChatMessage]) -> PortResult<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| PortError::Unavailable("GROQ_API_KEY is not configured".to_string()))?;

        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<PortResult<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let started = Instant::now();
        let response = tokio::time::timeout(self.timeout, client.chat().create(request))
            .await
            .map_err(|_| {
                PortError::Unavailable(format!("no reply within {}s", self.timeout.as_secs()))
            })?
            .map_err(classify)?;
        info!("Advice completion took {:?}", started.elapsed());

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::Upstream("reply carried no message content".to_string()))
    }
}
