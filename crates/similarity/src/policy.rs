//! The two dedup policies built on the fingerprint/Jaccard primitive.

use crate::{fingerprint, jaccard};

/// Topic-scope duplicate threshold (near-identical-text sensitivity).
pub const TOPIC_THRESHOLD: f32 = 0.7;

/// Script-scope similarity threshold (paraphrase sensitivity; applied over
/// the whole corpus, no recency window).
pub const SCRIPT_THRESHOLD: f32 = 0.35;

/// Title-word weight in the combined topic score.
const TITLE_WEIGHT: f32 = 0.4;
/// Body n-gram weight in the combined topic score.
const BODY_WEIGHT: f32 = 0.6;

/// N-gram width for body/script comparison.
const BODY_NGRAM: usize = 3;

/// Topic-scope similarity between a candidate (title, body) pair and an
/// existing one. Combines title-word Jaccard with body trigram Jaccard when
/// both bodies are non-empty, else falls back to title-only. The caller is
/// responsible for restricting the comparison set to the recency window.
pub fn topic_similarity(
    candidate_title: &str,
    candidate_body: &str,
    existing_title: &str,
    existing_body: &str,
) -> f32 {
    let title_score = jaccard(
        &fingerprint(candidate_title, 1),
        &fingerprint(existing_title, 1),
    );

    if candidate_body.trim().is_empty() || existing_body.trim().is_empty() {
        return title_score;
    }

    let body_score = jaccard(
        &fingerprint(candidate_body, BODY_NGRAM),
        &fingerprint(existing_body, BODY_NGRAM),
    );
    TITLE_WEIGHT * title_score + BODY_WEIGHT * body_score
}

/// Script-scope similarity between a generated candidate and one corpus text.
pub fn script_similarity(candidate: &str, existing: &str) -> f32 {
    jaccard(
        &fingerprint(candidate, BODY_NGRAM),
        &fingerprint(existing, BODY_NGRAM),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_identical_titles_cross_topic_threshold() {
        // 5 shared words of 7 distinct → Jaccard ≈ 0.714
        let score = topic_similarity(
            "Moscow court rules on this case",
            "",
            "Moscow court rules on the case",
            "",
        );
        assert!(score >= TOPIC_THRESHOLD, "score {score} should flag a duplicate");
    }

    #[test]
    fn unrelated_titles_stay_below_threshold() {
        let score = topic_similarity(
            "Local bakery wins regional award",
            "",
            "Moscow court rules on the case",
            "",
        );
        assert!(score < TOPIC_THRESHOLD);
    }

    #[test]
    fn body_dominates_when_both_present() {
        let body = "the committee approved the proposal after a long debate over funding";
        let score = topic_similarity("First headline here", body, "Second headline there", body);
        // Identical bodies contribute the full 0.6 weight.
        assert!(score >= BODY_WEIGHT - f32::EPSILON);
        assert!(score < TOPIC_THRESHOLD + BODY_WEIGHT);
    }

    #[test]
    fn missing_body_falls_back_to_title_only() {
        let with_body = topic_similarity("Same title here now", "", "Same title here now", "body");
        // One empty body → title path, and identical titles score 1.0.
        assert!((with_body - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn paraphrase_scores_above_script_threshold() {
        let a = "scientists discover a new species of deep sea fish near the trench floor";
        let b = "scientists discover a new species of deep sea crab on the trench floor";
        assert!(script_similarity(a, b) >= SCRIPT_THRESHOLD);
    }

    #[test]
    fn short_scripts_carry_no_signal() {
        assert_eq!(script_similarity("too short here", "too short here"), 0.0);
    }
}
