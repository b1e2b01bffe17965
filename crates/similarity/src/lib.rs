//! Text fingerprinting and near-duplicate scoring.
//!
//! One cheap primitive — token n-gram sets compared with Jaccard — backs two
//! policies with different scope and threshold: ingestion-time topic dedup
//! (recent items, high threshold) and generation-time anti-copy checks
//! (whole corpus, low threshold, tuned for paraphrase sensitivity). The
//! policies live in [`policy`].

pub mod policy;

use std::collections::HashSet;

pub use policy::{
    script_similarity, topic_similarity, SCRIPT_THRESHOLD, TOPIC_THRESHOLD,
};

/// Sets with fewer n-grams than this carry no signal and compare as
/// not-similar.
pub const MIN_NGRAMS: usize = 3;

/// Lowercase, fold diacritics, and drop punctuation, yielding the token
/// stream every comparison is built on.
pub fn normalize_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter_map(|word| {
            let token: String = word
                .chars()
                .flat_map(fold_char)
                .filter(|c| c.is_alphanumeric())
                .collect();
            if token.is_empty() {
                None
            } else {
                Some(token)
            }
        })
        .collect()
}

/// Lowercase one character, then fold common diacritics.
fn fold_char(c: char) -> impl Iterator<Item = char> {
    c.to_lowercase().map(fold_accent)
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'ñ' => 'n',
        'ç' => 'c',
        'ё' => 'е',
        'й' => 'и',
        _ => c,
    }
}

/// The set of contiguous `n`-token substrings of the normalized text.
/// `n = 1` yields the word set used for title comparison.
pub fn fingerprint(text: &str, n: usize) -> HashSet<String> {
    let tokens = normalize_tokens(text);
    if n == 0 || tokens.len() < n {
        return HashSet::new();
    }
    tokens
        .windows(n)
        .map(|window| window.join(" "))
        .collect()
}

/// Jaccard coefficient with the no-signal rule: either set smaller than
/// [`MIN_NGRAMS`] scores 0 (treat as not-similar).
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.len() < MIN_NGRAMS || b.len() < MIN_NGRAMS {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f32 / union as f32
}

/// The first `k` normalized words, joined — the anti-copy hard-block key.
pub fn leading_words(text: &str, k: usize) -> String {
    normalize_tokens(text)
        .into_iter()
        .take(k)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_folds_case_punctuation_and_accents() {
        assert_eq!(
            normalize_tokens("Café, RÉSUMÉ — done!"),
            vec!["cafe", "resume", "done"]
        );
    }

    #[test]
    fn fingerprint_unigrams_are_the_word_set() {
        let fp = fingerprint("Moscow court rules on the case", 1);
        assert_eq!(fp.len(), 6);
        assert!(fp.contains("moscow"));
        assert!(fp.contains("case"));
    }

    #[test]
    fn fingerprint_trigrams_are_contiguous() {
        let fp = fingerprint("alpha beta gamma delta", 3);
        assert_eq!(fp.len(), 2);
        assert!(fp.contains("alpha beta gamma"));
        assert!(fp.contains("beta gamma delta"));
    }

    #[test]
    fn fingerprint_short_text_is_empty() {
        assert!(fingerprint("too short", 3).is_empty());
    }

    #[test]
    fn jaccard_identical_sets_score_one() {
        let a = fingerprint("one two three four five", 1);
        assert!((jaccard(&a, &a) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn jaccard_disjoint_sets_score_zero() {
        let a = fingerprint("one two three four", 1);
        let b = fingerprint("five six seven eight", 1);
        assert_eq!(jaccard(&a, &b), 0.0);
    }

    #[test]
    fn tiny_sets_carry_no_signal() {
        let a = fingerprint("ok go", 1);
        let b = fingerprint("ok go", 1);
        assert_eq!(a.len(), 2);
        assert_eq!(jaccard(&a, &b), 0.0, "sets below MIN_NGRAMS never match");
    }

    #[test]
    fn leading_words_normalizes() {
        assert_eq!(
            leading_words("The QUICK, brown fox jumps", 4),
            "the quick brown fox"
        );
    }
}
