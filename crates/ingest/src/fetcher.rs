//! Feed-fetch collaborator boundary.
//!
//! Wire-format parsing is this collaborator's responsibility; the pipeline
//! only ever sees normalized [`FeedItem`]s. The bundled [`HttpFeedFetcher`]
//! consumes JSON feeds (a bare item array, or an object with an `items`
//! array) and plain article pages.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use clipforge_core::{FeedItem, FeedSource};

use crate::text::strip_markup;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed returned status {status}")]
    Status { status: u16 },
    #[error("failed to decode feed: {0}")]
    Decode(String),
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch and normalize every current item of `source`.
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>, FetchError>;

    /// Fetch one linked article as plain text.
    async fn fetch_article(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedDocument {
    Wrapped { items: Vec<FeedItem> },
    Bare(Vec<FeedItem>),
}

pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .user_agent("clipforge/0.1")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>, FetchError> {
        debug!(source = %source.name, url = %source.url, "fetching feed");
        let response = self.client.get(&source.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let document: FeedDocument =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        let items = match document {
            FeedDocument::Wrapped { items } => items,
            FeedDocument::Bare(items) => items,
        };
        debug!(source = %source.name, count = items.len(), "feed fetched");
        Ok(items)
    }

    async fn fetch_article(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        Ok(strip_markup(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_document_accepts_bare_array() {
        let json = r#"[{"title":"A","link":"https://example.com/a"}]"#;
        let doc: FeedDocument = serde_json::from_str(json).unwrap();
        let items = match doc {
            FeedDocument::Bare(items) => items,
            _ => panic!("expected bare array"),
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "A");
    }

    #[test]
    fn feed_document_accepts_wrapped_items() {
        let json = r#"{"items":[{"title":"B","link":"https://example.com/b","description":"x"}]}"#;
        let doc: FeedDocument = serde_json::from_str(json).unwrap();
        let items = match doc {
            FeedDocument::Wrapped { items } => items,
            _ => panic!("expected wrapped items"),
        };
        assert_eq!(items[0].description, "x");
    }
}
