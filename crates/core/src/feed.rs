use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A configured external content feed.
///
/// Removing a source cascades to the topics it produced — the only way a
/// topic is ever deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub language: String,
    pub enabled: bool,
    /// Result of the most recent health check, if any.
    pub healthy: Option<bool>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, language: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            url: url.into(),
            language: language.into(),
            enabled: true,
            healthy: None,
            last_checked_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial-field merge for [`FeedSource`]. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcePatch {
    pub enabled: Option<bool>,
    pub healthy: Option<bool>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SourcePatch {
    pub fn apply(self, source: &mut FeedSource) {
        if let Some(enabled) = self.enabled {
            source.enabled = enabled;
        }
        if let Some(healthy) = self.healthy {
            source.healthy = Some(healthy);
        }
        if let Some(at) = self.last_checked_at {
            source.last_checked_at = Some(at);
        }
        if let Some(err) = self.last_error {
            source.last_error = err;
        }
        if let Some(at) = self.updated_at {
            source.updated_at = at;
        }
    }
}

/// One normalized item as returned by the feed-fetch collaborator.
/// Wire-format parsing is entirely that collaborator's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}
