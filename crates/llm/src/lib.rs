//! Language-model collaborator boundary.
//!
//! The pipeline only ever talks to [`LanguageModel`]; the bundled backend is
//! an OpenAI-compatible HTTP client. When no backend is configured the stage
//! handlers fall back to their deterministic templates, so nothing in this
//! crate is required for offline operation.

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::OpenAiModel;

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} — {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Trait for language-model backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a chat completion request and return the assistant's text.
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
    ) -> Result<String, LlmError>;

    /// Embed a batch of texts, one vector per input (in order).
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}

/// An optionally-configured backend plus its request defaults.
///
/// `chat` returns `Ok(None)` when no backend is installed — the caller's cue
/// to use its deterministic template fallback. A configured backend that
/// fails still surfaces the error.
#[derive(Clone)]
pub struct ModelHandle {
    backend: Option<std::sync::Arc<dyn LanguageModel>>,
    model: String,
    temperature: f32,
}

impl ModelHandle {
    pub fn new(
        backend: Option<std::sync::Arc<dyn LanguageModel>>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            temperature,
        }
    }

    /// A handle with no backend; every `chat` call reports offline.
    pub fn offline() -> Self {
        Self::new(None, "", 0.0)
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn chat(&self, messages: &[Message]) -> Result<Option<String>, LlmError> {
        match &self.backend {
            Some(backend) => backend
                .chat(&self.model, messages, self.temperature)
                .await
                .map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_form_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(
            serde_json::to_string(&Message::user("hi")).unwrap(),
            r#"{"role":"user","content":"hi"}"#
        );
    }
}
