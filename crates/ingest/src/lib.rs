//! Feed ingestion: quota throttle, content heuristics, the feed-fetch
//! collaborator boundary, the topic intake pipeline, and the topic-side job
//! handlers (extraction, translation, trends, discovery, health checks).

pub mod enrich;
pub mod fetcher;
pub mod intake;
pub mod text;
pub mod throttle;

pub use enrich::EnrichContext;
pub use fetcher::{FeedFetcher, FetchError, HttpFeedFetcher};
pub use intake::{IntakePipeline, IntakeReport};
pub use throttle::{Admission, Throttle};
