//! Query text canonicalization.
//!
//! [`normalize_query`] produces the cache key and the text the classifier
//! and translator read, so every stage sees the same canonical form.

/// Trim, lowercase, and collapse runs of whitespace to a single space.
pub fn normalize_query(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '+' | '#' | '.' | '-')
}

/// Split text into lowercase words.
///
/// Words keep `_ + # . -` so that `c++`, `c#`, `node.js` and column names
/// like `annual_salary` survive; sentence punctuation at the end of a word
/// (`python.`) is stripped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !is_word_char(c))
        .map(|w| w.trim_end_matches(['.', '-']).trim_start_matches(['.', '-']))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Whether `token` is `word` or a simple plural of it.
pub fn word_matches(token: &str, word: &str) -> bool {
    token == word
        || token
            .strip_prefix(word)
            .map(|rest| rest == "s" || rest == "es")
            .unwrap_or(false)
}

/// Find a (possibly multi-word) phrase in a token sequence.
///
/// Each phrase word may match a plural token. Returns the index of the
/// first token of the earliest occurrence.
pub fn find_phrase(tokens: &[String], phrase: &str) -> Option<usize> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.is_empty() || words.len() > tokens.len() {
        return None;
    }
    (0..=tokens.len() - words.len()).find(|&start| {
        words
            .iter()
            .enumerate()
            .all(|(i, w)| word_matches(&tokens[start + i], w))
    })
}

pub fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    find_phrase(tokens, phrase).is_some()
}
