//! The anti-copy validator gating the script-text stage.
//!
//! Two checks, in order: an exact match of the leading normalized words
//! against any seed title (hard block), then script-scope similarity against
//! the full existing corpus — no recency window, since anti-plagiarism must
//! hold over everything ever generated.

use clipforge_similarity::{leading_words, script_similarity, SCRIPT_THRESHOLD};

/// How many leading normalized words form the hard-block key.
pub const LEAD_WORDS: usize = 4;

/// Total generation attempts: one initial plus two retries.
pub const MAX_ATTEMPTS: u32 = 3;

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The candidate opens with a seed title's opening words.
    LeadingMatch { seed: String },
    /// Too similar to an existing script.
    TooSimilar { percent: u32 },
}

impl Rejection {
    /// The similarity percentage reported in the stage error.
    pub fn percent(&self) -> u32 {
        match self {
            Rejection::LeadingMatch { .. } => 100,
            Rejection::TooSimilar { percent } => *percent,
        }
    }
}

/// Validate a freshly generated candidate against the seed titles that fed
/// the prompt and the full corpus of existing script texts.
pub fn check(candidate: &str, seed_titles: &[String], corpus: &[String]) -> Result<(), Rejection> {
    let lead = leading_words(candidate, LEAD_WORDS);
    if !lead.is_empty() {
        for seed in seed_titles {
            let seed_lead = leading_words(seed, LEAD_WORDS);
            if !seed_lead.is_empty() && seed_lead == lead {
                return Err(Rejection::LeadingMatch { seed: seed.clone() });
            }
        }
    }

    let mut worst = 0.0f32;
    for existing in corpus {
        worst = worst.max(script_similarity(candidate, existing));
    }
    if worst >= SCRIPT_THRESHOLD {
        return Err(Rejection::TooSimilar {
            percent: (worst * 100.0).round() as u32,
        });
    }

    Ok(())
}
