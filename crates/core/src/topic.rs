use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Status enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    /// Freshly admitted by the intake pipeline.
    New,
    /// Picked (by a user or automation) for script generation.
    Selected,
    /// Kept for the dedup window but no longer a candidate.
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Pending,
    Extracting,
    Done,
    Failed,
}

// ── Topic ────────────────────────────────────────────────────────────

/// A candidate content item derived from one feed source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub source_id: Uuid,
    pub title: String,
    /// Article URL, used by the content-extraction handler.
    pub link: String,
    /// Markup-stripped feed description.
    pub raw_text: String,
    /// Full article text, filled in by the extract-content handler.
    pub extracted_text: Option<String>,
    /// Key facts/angles derived at extraction time; feeds the grounded
    /// generation path.
    pub insights: Option<String>,
    pub tags: Vec<String>,
    pub score: f32,
    pub language: String,
    pub image_url: Option<String>,
    pub status: TopicStatus,
    pub extraction_status: ExtractionStatus,
    pub created_at: DateTime<Utc>,
}

impl Topic {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_id: Uuid,
        title: impl Into<String>,
        link: impl Into<String>,
        raw_text: impl Into<String>,
        tags: Vec<String>,
        score: f32,
        language: impl Into<String>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            title: title.into(),
            link: link.into(),
            raw_text: raw_text.into(),
            extracted_text: None,
            insights: None,
            tags,
            score,
            language: language.into(),
            image_url,
            status: TopicStatus::New,
            extraction_status: ExtractionStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Best text available for similarity comparison.
    pub fn body_text(&self) -> &str {
        self.extracted_text.as_deref().unwrap_or(&self.raw_text)
    }
}

/// Partial-field merge for [`Topic`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicPatch {
    pub title: Option<String>,
    pub extracted_text: Option<String>,
    pub insights: Option<String>,
    pub language: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<TopicStatus>,
    pub extraction_status: Option<ExtractionStatus>,
    pub score: Option<f32>,
}

impl TopicPatch {
    pub fn apply(self, topic: &mut Topic) {
        if let Some(title) = self.title {
            topic.title = title;
        }
        if let Some(text) = self.extracted_text {
            topic.extracted_text = Some(text);
        }
        if let Some(insights) = self.insights {
            topic.insights = Some(insights);
        }
        if let Some(language) = self.language {
            topic.language = language;
        }
        if let Some(url) = self.image_url {
            topic.image_url = Some(url);
        }
        if let Some(status) = self.status {
            topic.status = status;
        }
        if let Some(status) = self.extraction_status {
            topic.extraction_status = status;
        }
        if let Some(score) = self.score {
            topic.score = score;
        }
    }
}

// ── Trend signals ────────────────────────────────────────────────────

/// One externally derived trend signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSignal {
    pub keyword: String,
    pub angle: String,
}

/// The latest trend extraction result. Read best-effort by the grounded
/// generation path; its absence never fails a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub signals: Vec<TrendSignal>,
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic() -> Topic {
        Topic::new(
            Uuid::new_v4(),
            "Quantum breakthrough announced",
            "https://example.com/q",
            "Researchers announced a new result.",
            vec!["quantum".into()],
            70.0,
            "en",
            None,
        )
    }

    #[test]
    fn new_topic_starts_pending() {
        let t = topic();
        assert_eq!(t.status, TopicStatus::New);
        assert_eq!(t.extraction_status, ExtractionStatus::Pending);
        assert!(t.extracted_text.is_none());
    }

    #[test]
    fn body_text_prefers_extracted() {
        let mut t = topic();
        assert_eq!(t.body_text(), "Researchers announced a new result.");
        t.extracted_text = Some("Full article body.".into());
        assert_eq!(t.body_text(), "Full article body.");
    }

    #[test]
    fn patch_merges_extraction_result() {
        let mut t = topic();
        TopicPatch {
            extracted_text: Some("Full text".into()),
            insights: Some("- key fact".into()),
            extraction_status: Some(ExtractionStatus::Done),
            ..Default::default()
        }
        .apply(&mut t);

        assert_eq!(t.extraction_status, ExtractionStatus::Done);
        assert_eq!(t.extracted_text.as_deref(), Some("Full text"));
        assert_eq!(t.title, "Quantum breakthrough announced");
    }

    #[test]
    fn status_wire_form_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&TopicStatus::Selected).unwrap(),
            r#""selected""#
        );
        assert_eq!(
            serde_json::to_string(&ExtractionStatus::Pending).unwrap(),
            r#""pending""#
        );
    }
}
