use std::sync::Arc;

use tracing::warn;

use clipforge_core::{PipelineError, Topic};
use clipforge_llm::{Message, ModelHandle};
use clipforge_store::Store;

/// Everything a stage handler needs: the store, the (optional) model and the
/// grounding lookup.
#[derive(Clone)]
pub struct StageContext {
    pub store: Arc<dyn Store>,
    pub model: ModelHandle,
}

/// Prompt grounding for the content-producing stages.
///
/// `block` is `None` on the title-only path (no extracted text or insights).
/// Trend keywords double as anti-copy seed material.
#[derive(Debug, Default, Clone)]
pub struct Grounding {
    pub block: Option<String>,
    pub trend_keywords: Vec<String>,
}

impl StageContext {
    pub fn new(store: Arc<dyn Store>, model: ModelHandle) -> Self {
        Self { store, model }
    }

    /// `Ok(None)` means no model is configured — use the template fallback.
    pub async fn chat(&self, messages: &[Message]) -> Result<Option<String>, PipelineError> {
        self.model
            .chat(messages)
            .await
            .map_err(|e| PipelineError::Upstream(e.to_string()))
    }

    /// Build the grounded-path prompt block from the topic's extraction
    /// output, enriched with the latest trend snapshot. Trend lookup is
    /// best-effort: a failure degrades to the ungrounded block, never fails
    /// the stage.
    pub async fn grounding(&self, topic: &Topic) -> Grounding {
        let mut parts: Vec<String> = Vec::new();

        if let Some(insights) = topic.insights.as_deref() {
            parts.push(format!("Key facts and angles:\n{insights}"));
        } else if let Some(text) = topic.extracted_text.as_deref() {
            let excerpt: String = text.chars().take(1500).collect();
            parts.push(format!("Source excerpt:\n{excerpt}"));
        }

        if parts.is_empty() {
            // Title-only path.
            return Grounding::default();
        }

        let mut trend_keywords = Vec::new();
        match self.store.latest_trends().await {
            Ok(Some(snapshot)) if !snapshot.signals.is_empty() => {
                let lines: Vec<String> = snapshot
                    .signals
                    .iter()
                    .map(|s| format!("- {}: {}", s.keyword, s.angle))
                    .collect();
                trend_keywords = snapshot.signals.iter().map(|s| s.keyword.clone()).collect();
                parts.push(format!("Current trend signals:\n{}", lines.join("\n")));
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "trend lookup failed — continuing without trend signals");
            }
        }

        Grounding {
            block: Some(parts.join("\n\n")),
            trend_keywords,
        }
    }
}
