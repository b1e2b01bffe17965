use thiserror::Error;

/// Failure kinds that can surface from a running job.
///
/// Handlers return these; the worker's single execution boundary turns them
/// into job/artifact status. Skips (thin content, ingest-time duplicates) and
/// exhausted quotas are *not* errors — they are successful outcomes reported
/// through the intake report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A job payload referenced an entity that no longer exists. Payload
    /// references are not foreign-key enforced, so this is an expected,
    /// non-retriable failure kind.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The language-model or feed collaborator failed.
    #[error("upstream service failure: {0}")]
    Upstream(String),

    /// The anti-copy validator exhausted its attempts.
    #[error("generated script too similar to existing content ({percent}% match)")]
    TooSimilar { percent: u32 },

    /// The persistence collaborator failed.
    #[error("store failure: {0}")]
    Store(String),

    /// Input or state that cannot be processed: unusable collaborator
    /// output, or an artifact in the wrong state for the requested step.
    #[error("{0}")]
    Invalid(String),
}

impl PipelineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_similar_message_names_percentage() {
        let err = PipelineError::TooSimilar { percent: 40 };
        assert!(err.to_string().contains("40%"));
    }

    #[test]
    fn not_found_names_entity_and_id() {
        let err = PipelineError::not_found("topic", "abc-123");
        let msg = err.to_string();
        assert!(msg.contains("topic"));
        assert!(msg.contains("abc-123"));
    }
}
