//! Chat-completion client with fallback models.
//!
//! Requests go to an OpenAI-compatible `/chat/completions` endpoint. When
//! the configured primary model fails, the fallback list is tried in order
//! (skipping the primary); if every model fails, the primary's error is the
//! one surfaced, since it describes the configuration the user chose.

use crate::config::CompletionConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Sampling settings for file-analysis turns.
pub const ANALYSIS_TEMPERATURE: f64 = 0.3;
pub const ANALYSIS_MAX_TOKENS: u32 = 2000;

/// Sampling settings for plain conversation turns.
pub const CONVERSATION_TEMPERATURE: f64 = 0.7;
pub const CONVERSATION_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Completion failures, rendered as the user-facing message shown in chat.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    #[error(
        "OpenAI API key is not configured. Please set your API key in the configuration file."
    )]
    NotConfigured,
    #[error("Error: OpenAI client not initialized. Please check your API key.")]
    NotInitialized,
    #[error("Error: Invalid OpenAI API key. Please check your API key in the configuration file.")]
    Unauthorized,
    #[error(
        "Error: The model '{0}' is not available. Please check your completion model setting."
    )]
    UnknownModel(String),
    #[error(
        "Error: The file content is too large for the AI model to process. Please try with a smaller file or extract the most important parts."
    )]
    ContextTooLarge,
    #[error("Error generating response: {0}")]
    Backend(String),
}

/// A backend that can run one chat completion. Implemented over HTTP for
/// production and by fakes in tests.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// HTTP backend for OpenAI-compatible APIs.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn classify(model: &str, status: reqwest::StatusCode, body: &str) -> CompletionError {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return CompletionError::Unauthorized;
        }
        if status == reqwest::StatusCode::NOT_FOUND
            || body.contains("model_not_found")
            || body.contains("does not exist")
        {
            return CompletionError::UnknownModel(model.to_string());
        }
        if body.contains("maximum context length")
            || body.contains("context_length_exceeded")
            || body.contains("too many tokens")
        {
            return CompletionError::ContextTooLarge;
        }
        CompletionError::Backend(format!("{status}: {body}"))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        let request = CompletionRequest {
            model,
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| CompletionError::Backend(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify(model, status, &body));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|err| CompletionError::Backend(err.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                CompletionError::Backend("response contained no completion choices".to_string())
            })
    }
}

/// Client holding the primary model, the fallback chain, and the backend.
#[derive(Clone)]
pub struct CompletionClient {
    backend: Option<Arc<dyn CompletionBackend>>,
    model: String,
    fallback_models: Vec<String>,
}

impl CompletionClient {
    /// Build a client from configuration. A missing or placeholder API key
    /// leaves the client unconfigured; every generate call then reports it.
    pub fn new(config: &CompletionConfig) -> Self {
        let backend: Option<Arc<dyn CompletionBackend>> = if config.is_configured() {
            Some(Arc::new(OpenAiBackend::new(
                config.api_base.clone(),
                config.api_key.clone(),
            )))
        } else {
            None
        };

        Self {
            backend,
            model: config.model.clone(),
            fallback_models: config.fallback_models.clone(),
        }
    }

    /// Build a client over an explicit backend. Used by tests.
    pub fn with_backend(
        backend: Arc<dyn CompletionBackend>,
        model: impl Into<String>,
        fallback_models: Vec<String>,
    ) -> Self {
        Self {
            backend: Some(backend),
            model: model.into(),
            fallback_models,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run a completion against the primary model, falling back through the
    /// configured chain on failure.
    pub async fn generate(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        let Some(backend) = &self.backend else {
            return Err(CompletionError::NotConfigured);
        };

        let primary_error = match backend
            .complete(&self.model, messages, temperature, max_tokens)
            .await
        {
            Ok(content) => return Ok(content),
            Err(err) => err,
        };
        tracing::warn!(model = %self.model, error = %primary_error, "primary model failed");

        for fallback in &self.fallback_models {
            if *fallback == self.model {
                continue;
            }
            match backend
                .complete(fallback, messages, temperature, max_tokens)
                .await
            {
                Ok(content) => {
                    tracing::info!(model = %fallback, "fallback model succeeded");
                    return Ok(content);
                }
                Err(err) => {
                    tracing::warn!(model = %fallback, error = %err, "fallback model failed");
                }
            }
        }

        Err(primary_error)
    }
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
