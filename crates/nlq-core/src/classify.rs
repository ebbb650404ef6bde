//! Query classification.
//!
//! Decides whether a question is answered from the database (`sql`), from
//! ingested documents (`document`), from both (`hybrid`), or not at all
//! (`unknown`), and pulls out the parameters later stages need.
//!
//! Classification is word-level keyword spotting against two families:
//!
//! | Family | Examples |
//! |--------|----------|
//! | document | resume, cv, document, file, mentioning, skill |
//! | sql | how many, average, salary, hired, employee, department, and every table/column name in the schema |
//!
//! A bare phrase with no recognized word of either family is `unknown`;
//! it is never defaulted to `sql`.

use crate::models::{Category, SchemaInfo};
use crate::normalize::{contains_phrase, normalize_query, tokenize, word_matches};

/// Words that signal a document search.
pub const DOCUMENT_KEYWORDS: &[&str] = &[
    "resume",
    "cv",
    "document",
    "file",
    "mention",
    "mentioning",
    "skill",
    "experience",
    "containing",
    "uploaded",
    "upload",
];

/// Phrases that signal a database question, in addition to schema names.
pub const SQL_KEYWORDS: &[&str] = &[
    "how many",
    "average",
    "avg",
    "count",
    "total",
    "sum",
    "salary",
    "salaries",
    "payroll",
    "paid",
    "hired",
    "joined",
    "highest",
    "lowest",
    "employee",
    "department",
    "dept",
    "manager",
    "headcount",
];

/// Words after which the search term usually follows.
const KEYWORD_CUES: &[&str] = &[
    "mentioning",
    "mention",
    "with",
    "about",
    "containing",
    "contain",
    "know",
    "knowing",
    "regarding",
];

const STOPWORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "anyone", "are", "as", "at", "be", "by", "can",
    "could", "did", "do", "does", "each", "every", "find", "for", "from", "get", "give", "had",
    "has", "have", "how", "i", "in", "is", "it", "its", "know", "knowing", "knows", "list",
    "many", "me", "much", "of", "on", "or", "our", "people", "per", "please", "regarding",
    "show", "some", "someone", "tell", "that", "the", "their", "there", "these", "this",
    "those", "to", "us", "was", "we", "were", "what", "which", "who", "whose", "with", "within",
    "year", "you",
];

const DEPARTMENT_NOUNS: &[&str] = &["department", "dept", "team"];

/// A year reference extracted from the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearRef {
    /// "this year", resolved when the statement is built.
    Current,
    Exact(i32),
}

/// Values pulled from the query text for templates and search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Search term for the document half.
    pub keyword: Option<String>,
    pub department: Option<String>,
    pub year: Option<YearRef>,
    /// The `N` in "top N".
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryClassification {
    pub category: Category,
    /// Canonical text (see [`normalize_query`]).
    pub normalized: String,
    pub tokens: Vec<String>,
    pub params: QueryParams,
    /// Database words found in the text.
    pub sql_signals: Vec<String>,
    /// Document words found in the text.
    pub document_signals: Vec<String>,
}

/// Classify a raw query against the vocabulary of `schema`.
pub fn classify(raw_text: &str, schema: &SchemaInfo) -> QueryClassification {
    let normalized = normalize_query(raw_text);
    let tokens = tokenize(&normalized);
    let vocabulary = schema.vocabulary();

    let document_signals: Vec<String> = DOCUMENT_KEYWORDS
        .iter()
        .filter(|k| contains_phrase(&tokens, k))
        .map(|k| k.to_string())
        .collect();

    let mut sql_signals: Vec<String> = SQL_KEYWORDS
        .iter()
        .filter(|k| contains_phrase(&tokens, k))
        .map(|k| k.to_string())
        .collect();
    for word in &vocabulary {
        if !sql_signals.contains(word) && contains_phrase(&tokens, word) {
            sql_signals.push(word.clone());
        }
    }

    let category = match (!sql_signals.is_empty(), !document_signals.is_empty()) {
        (true, true) => Category::Hybrid,
        (false, true) => Category::Document,
        (true, false) => Category::Sql,
        (false, false) => Category::Unknown,
    };

    let params = QueryParams {
        keyword: extract_keyword(raw_text, &tokens, &vocabulary),
        department: extract_department(&tokens, &vocabulary),
        year: extract_year(&tokens),
        limit: extract_limit(&tokens),
    };

    QueryClassification {
        category,
        normalized,
        tokens,
        params,
        sql_signals,
        document_signals,
    }
}

fn any_phrase_has_word<'a>(phrases: impl IntoIterator<Item = &'a str>, token: &str) -> bool {
    phrases
        .into_iter()
        .any(|phrase| phrase.split_whitespace().any(|w| word_matches(token, w)))
}

fn is_signal_word(token: &str, vocabulary: &[String]) -> bool {
    any_phrase_has_word(DOCUMENT_KEYWORDS.iter().copied(), token)
        || any_phrase_has_word(SQL_KEYWORDS.iter().copied(), token)
        || any_phrase_has_word(vocabulary.iter().map(String::as_str), token)
}

fn is_number(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// A word that could be a search term or an entity value.
fn is_content_word(token: &str, vocabulary: &[String]) -> bool {
    !STOPWORDS.contains(&token) && !is_number(token) && !is_signal_word(token, vocabulary)
}

fn quoted_phrase(raw_text: &str) -> Option<String> {
    let start = raw_text.find('"')?;
    let rest = &raw_text[start + 1..];
    let end = rest.find('"')?;
    let phrase = normalize_query(&rest[..end]);
    (!phrase.is_empty()).then_some(phrase)
}

fn extract_keyword(raw_text: &str, tokens: &[String], vocabulary: &[String]) -> Option<String> {
    if let Some(phrase) = quoted_phrase(raw_text) {
        return Some(phrase);
    }

    let after_cue = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| KEYWORD_CUES.iter().any(|cue| word_matches(t, cue)))
        .find_map(|(i, _)| {
            tokens[i + 1..]
                .iter()
                .find(|t| is_content_word(t, vocabulary))
        });

    after_cue
        .or_else(|| tokens.iter().find(|t| is_content_word(t, vocabulary)))
        .cloned()
}

fn extract_department(tokens: &[String], vocabulary: &[String]) -> Option<String> {
    // "... engineering department ..."
    for (i, token) in tokens.iter().enumerate().skip(1) {
        if DEPARTMENT_NOUNS.iter().any(|n| word_matches(token, n)) {
            let prev = &tokens[i - 1];
            if is_content_word(prev, vocabulary) {
                return Some(prev.clone());
            }
        }
    }

    // "... in engineering", "... from the data team"
    for (i, token) in tokens.iter().enumerate() {
        if !matches!(token.as_str(), "in" | "from" | "within") {
            continue;
        }
        let next = tokens[i + 1..].iter().find(|t| t.as_str() != "the");
        if let Some(next) = next {
            if is_content_word(next, vocabulary) {
                return Some(next.clone());
            }
        }
    }
    None
}

fn extract_year(tokens: &[String]) -> Option<YearRef> {
    let exact = tokens
        .iter()
        .filter(|t| t.len() == 4 && is_number(t))
        .filter_map(|t| t.parse::<i32>().ok())
        .find(|y| (1900..=2100).contains(y));
    if let Some(year) = exact {
        return Some(YearRef::Exact(year));
    }
    contains_phrase(tokens, "this year").then_some(YearRef::Current)
}

fn extract_limit(tokens: &[String]) -> Option<u32> {
    tokens
        .windows(2)
        .find(|w| w[0] == "top")
        .and_then(|w| w[1].parse::<u32>().ok())
}
