//! Topic-side job handlers: content extraction, translation, trend
//! extraction, source auto-discovery and source health checks.
//!
//! Handlers return `Result` and never write job status themselves — the
//! worker's single execution boundary does that. They do mutate the domain
//! state they own (extraction status, source health, trend snapshot).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use clipforge_core::{
    ExtractionStatus, FeedSource, PipelineError, ProgressHandle, SourcePatch, TopicPatch,
    TrendSignal, TrendSnapshot,
};
use clipforge_llm::{Message, ModelHandle};
use clipforge_store::Store;

use crate::fetcher::FeedFetcher;
use crate::text::{leading_sentences, top_words, truncate_chars};

/// Article text beyond this many characters is not sent to the model.
const ARTICLE_PROMPT_BUDGET: usize = 6000;

/// Trend extraction looks at topics from this window.
const TREND_WINDOW_DAYS: i64 = 7;

pub struct EnrichContext {
    pub store: Arc<dyn Store>,
    pub fetcher: Arc<dyn FeedFetcher>,
    pub model: ModelHandle,
}

impl EnrichContext {
    async fn chat(&self, messages: &[Message]) -> Result<Option<String>, PipelineError> {
        self.model
            .chat(messages)
            .await
            .map_err(|e| PipelineError::Upstream(e.to_string()))
    }

    // ── extract-content ─────────────────────────────────────────────

    /// Fetch the topic's linked article, store its text and derive the
    /// insights the grounded generation path feeds on.
    pub async fn extract_content(
        &self,
        topic_id: Uuid,
        progress: &ProgressHandle,
    ) -> Result<(), PipelineError> {
        let topic = self
            .store
            .topic(topic_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("topic", topic_id))?;

        self.store
            .update_topic(
                topic_id,
                TopicPatch {
                    extraction_status: Some(ExtractionStatus::Extracting),
                    ..Default::default()
                },
            )
            .await?;
        progress.set(10);

        let article = match self.fetcher.fetch_article(&topic.link).await {
            Ok(text) => text,
            Err(e) => {
                self.mark_extraction_failed(topic_id).await;
                return Err(PipelineError::Upstream(format!(
                    "article fetch failed: {e}"
                )));
            }
        };
        let article = truncate_chars(&article, ARTICLE_PROMPT_BUDGET);
        progress.set(50);

        let insights = match self.derive_insights(&topic.title, &article).await {
            Ok(insights) => insights,
            Err(e) => {
                self.mark_extraction_failed(topic_id).await;
                return Err(e);
            }
        };

        self.store
            .update_topic(
                topic_id,
                TopicPatch {
                    extracted_text: Some(article),
                    insights: Some(insights),
                    extraction_status: Some(ExtractionStatus::Done),
                    ..Default::default()
                },
            )
            .await?;
        progress.set(95);
        Ok(())
    }

    async fn derive_insights(&self, title: &str, article: &str) -> Result<String, PipelineError> {
        let messages = [
            Message::system(
                "You distill news articles. Reply with 3-5 bullet lines, each one \
                 key fact or angle, nothing else.",
            ),
            Message::user(format!("Title: {title}\n\nArticle:\n{article}")),
        ];
        match self.chat(&messages).await? {
            Some(text) => Ok(text),
            None => Ok(fallback_insights(article)),
        }
    }

    async fn mark_extraction_failed(&self, topic_id: Uuid) {
        let patch = TopicPatch {
            extraction_status: Some(ExtractionStatus::Failed),
            ..Default::default()
        };
        if let Err(e) = self.store.update_topic(topic_id, patch).await {
            warn!(topic_id = %topic_id, error = %e, "failed to record extraction failure");
        }
    }

    // ── translate-topic ─────────────────────────────────────────────

    /// Translate the topic's title (and extracted text, when present) into
    /// `language`. Already-matching language is a successful no-op.
    pub async fn translate_topic(
        &self,
        topic_id: Uuid,
        language: &str,
        progress: &ProgressHandle,
    ) -> Result<(), PipelineError> {
        let topic = self
            .store
            .topic(topic_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("topic", topic_id))?;
        if topic.language == language {
            info!(topic_id = %topic_id, language, "topic already in target language");
            return Ok(());
        }
        progress.set(20);

        let body = topic.body_text();
        let messages = [
            Message::system(format!(
                "Translate into {language}. First line: the translated title. \
                 Remaining lines: the translated text. No commentary.",
            )),
            Message::user(format!("{}\n{}", topic.title, truncate_chars(body, 4000))),
        ];

        let patch = match self.chat(&messages).await? {
            Some(text) => {
                let mut lines = text.lines();
                let title = lines.next().unwrap_or(&topic.title).trim().to_string();
                let rest = lines.collect::<Vec<_>>().join("\n").trim().to_string();
                TopicPatch {
                    title: Some(title),
                    extracted_text: if rest.is_empty() { None } else { Some(rest) },
                    language: Some(language.to_string()),
                    ..Default::default()
                }
            }
            // Offline: keep the text, record the requested language.
            None => TopicPatch {
                language: Some(language.to_string()),
                ..Default::default()
            },
        };

        self.store.update_topic(topic_id, patch).await?;
        progress.set(95);
        Ok(())
    }

    // ── extract-trends ──────────────────────────────────────────────

    /// Derive trend signals from recent topic titles and persist them as the
    /// latest snapshot.
    pub async fn extract_trends(
        &self,
        now: DateTime<Utc>,
        progress: &ProgressHandle,
    ) -> Result<(), PipelineError> {
        let cutoff = now - Duration::days(TREND_WINDOW_DAYS);
        let topics = self.store.topics_since(cutoff).await?;
        if topics.is_empty() {
            info!("no recent topics — nothing to extract trends from");
            return Ok(());
        }
        progress.set(20);

        let titles: Vec<String> = topics.iter().map(|t| t.title.clone()).collect();
        let messages = [
            Message::system(
                "You spot trends across headlines. Reply with up to 8 lines in the \
                 form 'keyword | angle', nothing else.",
            ),
            Message::user(titles.join("\n")),
        ];

        let signals = match self.chat(&messages).await? {
            Some(text) => parse_trend_lines(&text),
            None => top_words(&titles, 5)
                .into_iter()
                .map(|keyword| TrendSignal {
                    keyword,
                    angle: "recurring theme across recent items".into(),
                })
                .collect(),
        };

        if signals.is_empty() {
            return Err(PipelineError::Invalid(
                "trend extraction produced no signals".into(),
            ));
        }

        self.store
            .put_trends(TrendSnapshot {
                signals,
                captured_at: now,
            })
            .await?;
        progress.set(95);
        Ok(())
    }

    // ── auto-discovery ──────────────────────────────────────────────

    /// Ask the model for new feed URLs worth following; persist unknown ones
    /// as disabled sources for a human to review. Offline this is a no-op.
    pub async fn auto_discovery(&self, progress: &ProgressHandle) -> Result<u32, PipelineError> {
        let sources = self.store.sources().await?;
        let existing: Vec<String> = sources.iter().map(|s| s.url.clone()).collect();
        progress.set(20);

        let messages = [
            Message::system(
                "You suggest JSON news feeds. Reply with up to 3 lines in the form \
                 'name | url', nothing else.",
            ),
            Message::user(format!("Feeds already followed:\n{}", existing.join("\n"))),
        ];

        let Some(text) = self.chat(&messages).await? else {
            info!("no model configured — skipping source discovery");
            return Ok(0);
        };

        let mut added = 0u32;
        for line in text.lines() {
            let Some((name, url)) = line.split_once('|') else {
                continue;
            };
            let (name, url) = (name.trim(), url.trim());
            if !url.starts_with("http") || existing.iter().any(|u| u == url) {
                continue;
            }
            let mut source = FeedSource::new(name, url, "en");
            source.enabled = false;
            self.store.create_source(source).await?;
            added += 1;
        }
        info!(added, "source discovery finished");
        progress.set(95);
        Ok(added)
    }

    // ── health checks ───────────────────────────────────────────────

    /// Probe one source and record the outcome. An unreachable feed is a
    /// recorded result, not a job failure.
    pub async fn health_check(&self, source_id: Uuid) -> Result<(), PipelineError> {
        let source = self
            .store
            .source(source_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("source", source_id))?;
        self.probe(&source).await
    }

    /// Probe every configured source. No sources is a successful no-op.
    pub async fn health_check_all(&self, progress: &ProgressHandle) -> Result<(), PipelineError> {
        let sources = self.store.sources().await?;
        let total = sources.len().max(1);
        for (index, source) in sources.iter().enumerate() {
            self.probe(source).await?;
            progress.set((95 * (index + 1) / total) as u8);
        }
        Ok(())
    }

    async fn probe(&self, source: &FeedSource) -> Result<(), PipelineError> {
        let outcome = self.fetcher.fetch(source).await;
        let patch = match &outcome {
            Ok(items) => {
                info!(source = %source.name, items = items.len(), "source healthy");
                SourcePatch {
                    healthy: Some(true),
                    last_checked_at: Some(Utc::now()),
                    last_error: Some(None),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                }
            }
            Err(e) => {
                warn!(source = %source.name, error = %e, "source unhealthy");
                SourcePatch {
                    healthy: Some(false),
                    last_checked_at: Some(Utc::now()),
                    last_error: Some(Some(e.to_string())),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                }
            }
        };
        self.store.update_source(source.id, patch).await?;
        Ok(())
    }
}

fn fallback_insights(article: &str) -> String {
    let sentences = leading_sentences(article, 3);
    if sentences.is_empty() {
        "- no article text available".to_string()
    } else {
        sentences
            .into_iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn parse_trend_lines(text: &str) -> Vec<TrendSignal> {
    text.lines()
        .filter_map(|line| {
            let (keyword, angle) = line.split_once('|')?;
            let keyword = keyword.trim().trim_start_matches('-').trim();
            if keyword.is_empty() {
                return None;
            }
            Some(TrendSignal {
                keyword: keyword.to_string(),
                angle: angle.trim().to_string(),
            })
        })
        .take(8)
        .collect()
}
