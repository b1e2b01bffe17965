//! Plain-text heuristics used by the intake pipeline: markup stripping, the
//! minimum-content check, and tag extraction.

/// Words that never become tags and never count toward tag frequency.
const STOP_WORDS: &[&str] = &[
    // English
    "a", "an", "the", "and", "or", "but", "if", "then", "so", "as", "at", "by", "for", "from",
    "in", "into", "of", "on", "to", "with", "is", "are", "was", "were", "be", "been", "being",
    "has", "have", "had", "do", "does", "did", "will", "would", "can", "could", "should", "may",
    "might", "this", "that", "these", "those", "it", "its", "his", "her", "their", "our", "your",
    "not", "no", "new", "more", "most", "after", "before", "over", "under", "about", "up", "down",
    "out", "how", "what", "when", "where", "who", "why", "which", "than", "says", "said",
    // Russian
    "и", "в", "на", "не", "что", "он", "она", "они", "это", "как", "его", "ее", "из", "за", "по",
    "от", "до", "для", "при", "был", "была", "были", "будет", "также", "уже", "еще",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Strip HTML/XML tags and decode the common entities, collapsing whitespace.
pub fn strip_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    let decoded = out
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&mdash;", "—");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The minimum-content heuristic: reject only when the text is short in
/// characters AND in words.
pub fn is_too_thin(text: &str, min_chars: usize, min_words: usize) -> bool {
    text.chars().count() < min_chars && text.split_whitespace().count() < min_words
}

/// Lowercased word with punctuation trimmed; empty for pure punctuation.
fn clean_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Whether two tags share a sub-word (one tag's word contained in a word of
/// the other). Keeps "supreme court" and "court ruling" from both surviving.
fn shares_subword(a: &str, b: &str) -> bool {
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    a_words
        .iter()
        .any(|aw| b_words.iter().any(|bw| aw.contains(bw) || bw.contains(aw)))
}

/// Extract 2–5 tags from a title and body.
///
/// Candidates, in descending priority: quoted phrases, proper nouns, then
/// frequent words — always excluding stop-words, never keeping two tags that
/// share a sub-word.
pub fn extract_tags(title: &str, body: &str) -> Vec<String> {
    let combined = format!("{} {}", title, body);
    let mut scored: Vec<(String, u32)> = Vec::new();

    // Quoted phrases (up to 4 words) score highest.
    for phrase in quoted_phrases(&combined) {
        push_candidate(&mut scored, phrase, 30);
    }

    // Proper nouns: capitalized words anywhere but a sentence start.
    for noun in proper_nouns(&combined) {
        push_candidate(&mut scored, noun, 20);
    }

    // Frequent meaningful words.
    for (word, count) in word_frequencies(&combined) {
        if count >= 2 && word.chars().count() >= 4 {
            push_candidate(&mut scored, word, count);
        }
    }

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut tags: Vec<String> = Vec::new();
    for (candidate, _) in scored {
        if tags.len() == 5 {
            break;
        }
        if tags.iter().any(|kept| shares_subword(kept, &candidate)) {
            continue;
        }
        tags.push(candidate);
    }

    // Pad from title words so every topic carries at least two tags.
    if tags.len() < 2 {
        for word in title.split_whitespace() {
            let word = clean_word(word);
            if word.len() >= 3
                && !is_stop_word(&word)
                && !tags.iter().any(|kept| shares_subword(kept, &word))
            {
                tags.push(word);
            }
            if tags.len() == 2 {
                break;
            }
        }
    }

    tags
}

fn push_candidate(scored: &mut Vec<(String, u32)>, candidate: String, weight: u32) {
    if candidate.is_empty() || is_stop_word(&candidate) {
        return;
    }
    match scored.iter_mut().find(|(c, _)| *c == candidate) {
        Some((_, score)) => *score += weight,
        None => scored.push((candidate, weight)),
    }
}

fn quoted_phrases(text: &str) -> Vec<String> {
    let mut phrases = Vec::new();
    for open in ['"', '“', '«'] {
        let close = match open {
            '“' => '”',
            '«' => '»',
            other => other,
        };
        let mut rest = text;
        while let Some(start) = rest.find(open) {
            let after = &rest[start + open.len_utf8()..];
            match after.find(close) {
                Some(end) => {
                    let phrase = after[..end]
                        .split_whitespace()
                        .map(clean_word)
                        .filter(|w| !w.is_empty())
                        .collect::<Vec<_>>();
                    if !phrase.is_empty() && phrase.len() <= 4 {
                        phrases.push(phrase.join(" "));
                    }
                    rest = &after[end + close.len_utf8()..];
                }
                None => break,
            }
        }
    }
    phrases
}

fn proper_nouns(text: &str) -> Vec<String> {
    let mut nouns = Vec::new();
    let mut sentence_start = true;
    for word in text.split_whitespace() {
        let starts_upper = word.chars().next().is_some_and(|c| c.is_uppercase());
        let cleaned = clean_word(word);
        if starts_upper && !sentence_start && !cleaned.is_empty() && !is_stop_word(&cleaned) {
            nouns.push(cleaned);
        }
        sentence_start = word.ends_with(['.', '!', '?', ':']);
    }
    nouns
}

fn word_frequencies(text: &str) -> Vec<(String, u32)> {
    let mut counts: Vec<(String, u32)> = Vec::new();
    for word in text.split_whitespace() {
        let word = clean_word(word);
        if word.is_empty() || is_stop_word(&word) {
            continue;
        }
        match counts.iter_mut().find(|(w, _)| *w == word) {
            Some((_, c)) => *c += 1,
            None => counts.push((word, 1)),
        }
    }
    counts
}

/// Most frequent meaningful words across several texts — the offline
/// fallback for trend extraction.
pub fn top_words(texts: &[String], k: usize) -> Vec<String> {
    let combined = texts.join(" ");
    let mut counts = word_frequencies(&combined);
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.into_iter().take(k).map(|(w, _)| w).collect()
}

/// First `n` sentences, for template fallbacks.
pub fn leading_sentences(text: &str, n: usize) -> Vec<String> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(n)
        .map(String::from)
        .collect()
}

/// Truncate to at most `max_chars` characters on a word boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out = String::new();
    for word in text.split_whitespace() {
        if out.chars().count() + word.chars().count() + 1 > max_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
