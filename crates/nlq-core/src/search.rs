//! Keyword search over ingested documents.
//!
//! A literal, case-insensitive substring match. There is no index and no
//! ranking: matches come back in store-insertion order, one per text
//! document (its first occurrence) and one per matching CSV row.
//!
//! [`search`] returns a lazy [`DocumentMatches`] iterator. It borrows the
//! snapshot it was created from, is finite, and can be restarted by cloning
//! it before iteration or calling [`search`] again.

use std::sync::Arc;

use crate::documents::DocumentSnapshot;
use crate::models::{DocumentContent, DocumentMatch, DocumentRecord};

/// Characters of context kept on each side of a hit.
pub const DEFAULT_EXCERPT_CHARS: usize = 80;

/// Search `snapshot` for `keyword` with the default excerpt width.
pub fn search<'a>(keyword: &str, snapshot: &'a DocumentSnapshot) -> DocumentMatches<'a> {
    search_with(keyword, snapshot, DEFAULT_EXCERPT_CHARS)
}

pub fn search_with<'a>(
    keyword: &str,
    snapshot: &'a DocumentSnapshot,
    excerpt_chars: usize,
) -> DocumentMatches<'a> {
    DocumentMatches {
        documents: snapshot.documents(),
        needle: fold(keyword.trim()),
        excerpt_chars,
        doc: 0,
        row: 0,
    }
}

/// Iterator over the matches of one keyword in one snapshot.
#[derive(Debug, Clone)]
pub struct DocumentMatches<'a> {
    documents: &'a [Arc<DocumentRecord>],
    needle: Vec<char>,
    excerpt_chars: usize,
    doc: usize,
    /// Next row to test in the current CSV document.
    row: usize,
}

impl Iterator for DocumentMatches<'_> {
    type Item = DocumentMatch;

    fn next(&mut self) -> Option<DocumentMatch> {
        if self.needle.is_empty() {
            return None;
        }
        while let Some(record) = self.documents.get(self.doc) {
            match &record.content {
                DocumentContent::Text(text) => {
                    self.doc += 1;
                    if let Some((begin, end)) = find_folded(text, &self.needle) {
                        return Some(DocumentMatch {
                            filename: record.filename.clone(),
                            row: None,
                            excerpt: excerpt(text, begin, end, self.excerpt_chars),
                        });
                    }
                }
                DocumentContent::Rows { rows, .. } => {
                    while let Some(row) = rows.get(self.row) {
                        let index = self.row;
                        self.row += 1;
                        let flat = row.join(", ");
                        if let Some((begin, end)) = find_folded(&flat, &self.needle) {
                            return Some(DocumentMatch {
                                filename: record.filename.clone(),
                                row: Some(index),
                                excerpt: excerpt(&flat, begin, end, self.excerpt_chars),
                            });
                        }
                    }
                    self.doc += 1;
                    self.row = 0;
                }
            }
        }
        None
    }
}

fn fold(s: &str) -> Vec<char> {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Whether `haystack` contains `needle`, ignoring case.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = fold(needle.trim());
    !needle.is_empty() && find_folded(haystack, &needle).is_some()
}

/// Byte range in `haystack` of the first case-insensitive occurrence of
/// the already-folded `needle`.
///
/// Folding can change a character's byte length, so the comparison runs
/// on lowercase chars tagged with their original byte offsets.
fn find_folded(haystack: &str, needle: &[char]) -> Option<(usize, usize)> {
    let folded: Vec<(usize, char)> = haystack
        .char_indices()
        .flat_map(|(i, c)| c.to_lowercase().map(move |l| (i, l)))
        .collect();
    if needle.is_empty() || needle.len() > folded.len() {
        return None;
    }
    (0..=folded.len() - needle.len())
        .find(|&start| {
            folded[start..start + needle.len()]
                .iter()
                .zip(needle)
                .all(|((_, a), b)| a == b)
        })
        .map(|start| {
            let begin = folded[start].0;
            let last = folded[start + needle.len() - 1].0;
            let end = last + haystack[last..].chars().next().map_or(0, char::len_utf8);
            (begin, end)
        })
}

/// Up to `radius` chars either side of `begin..end`, whitespace collapsed,
/// with `...` where the text was cut.
fn excerpt(text: &str, begin: usize, end: usize, radius: usize) -> String {
    let start = text[..begin]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(begin, |(i, _)| i);
    let stop = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(i, _)| end + i);

    let body = text[start..stop].split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(body.len() + 6);
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(&body);
    if stop < text.len() {
        out.push_str("...");
    }
    out
}
