//! Word normalization
//!
//! Lower-cases, trims and de-duplicates raw words before any lookup sees them.
//! Entries that are empty, longer than `MAX_WORD_LEN` characters, or contain
//! anything other than ASCII letters, apostrophes and hyphens are dropped.

use std::collections::HashSet;

/// Longest accepted word, in characters
pub const MAX_WORD_LEN: usize = 50;

/// Normalize a single word; `None` when it fails validation
pub fn normalize_word(raw: &str) -> Option<String> {
    let word: String = raw
        .trim()
        .chars()
        // Typographic apostrophes are common in text pasted from documents
        .map(|c| if c == '\u{2019}' || c == '\u{2018}' { '\'' } else { c })
        .collect::<String>()
        .to_lowercase();

    if word.is_empty() || word.chars().count() > MAX_WORD_LEN {
        return None;
    }

    let valid_chars = word
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c == '\'' || c == '-');
    let has_letter = word.chars().any(|c| c.is_ascii_alphabetic());

    if valid_chars && has_letter {
        Some(word)
    } else {
        None
    }
}

/// Normalize and de-duplicate a batch, keeping first-seen order
pub fn normalize<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(words.len());
    let mut normalized = Vec::with_capacity(words.len());

    for raw in words {
        match normalize_word(raw.as_ref()) {
            Some(word) => {
                if seen.insert(word.clone()) {
                    normalized.push(word);
                }
            }
            None => {
                tracing::trace!(word = raw.as_ref(), "Dropping invalid word");
            }
        }
    }

    normalized
}
