//! Shared domain model for the clipforge pipeline: feed sources, topics,
//! generation artifacts, jobs, quota state, configuration and the error
//! taxonomy every other crate builds on.

pub mod config;
pub mod error;
pub mod feed;
pub mod job;
pub mod quota;
pub mod script;
pub mod topic;

pub use config::Config;
pub use error::PipelineError;
pub use feed::{FeedItem, FeedSource, SourcePatch};
pub use job::{Job, JobPatch, JobPayload, JobStatus, ProgressHandle};
pub use quota::QuotaState;
pub use script::{
    ExportBundle, MusicPick, Scene, Script, ScriptConfig, ScriptPatch, ScriptStatus, SeoBlock,
};
pub use topic::{ExtractionStatus, Topic, TopicPatch, TopicStatus, TrendSignal, TrendSnapshot};
