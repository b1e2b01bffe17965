use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::{LanguageModel, LlmError, Message, Role};

/// OpenAI-compatible chat + embedding backend.
pub struct OpenAiModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    embedding_model: String,
    max_tokens: u32,
}

impl OpenAiModel {
    pub fn new(
        api_key: String,
        base_url: String,
        embedding_model: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key,
            base_url,
            embedding_model,
            max_tokens,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
struct EmbedItem {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
    ) -> Result<String, LlmError> {
        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect();

        let body = json!({
            "model": model,
            "messages": api_messages,
            "temperature": temperature,
            "max_tokens": self.max_tokens,
        });

        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(model = %model, "chat request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::Parse("missing choices[0].message.content".into()))?
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(LlmError::Parse("empty completion".into()));
        }
        Ok(content)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let request = EmbedRequest {
            model: self.embedding_model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let mut resp: EmbedResponse = response.json().await?;

        // Restore input order.
        resp.data.sort_by_key(|item| item.index);
        Ok(resp.data.into_iter().map(|item| item.embedding).collect())
    }
}
