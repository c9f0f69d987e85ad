use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Normalized keywords derived from one query.
pub type KeywordSet = BTreeSet<String>;

/// Standard English stop-word list.
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Canonical keyword -> surface synonyms. Expansion is one hop: a token that
/// appears in a synonym list pulls in its key, never the other way round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl Default for SynonymTable {
    fn default() -> Self {
        let entries = [
            ("basics", &["fundamentals", "introduction", "beginner"][..]),
            ("variables", &["data", "types"][..]),
            ("functions", &["methods", "procedures"][..]),
            ("classes", &["objects", "oop"][..]),
        ]
        .into_iter()
        .map(|(k, syns)| (k.to_string(), syns.iter().map(|s| s.to_string()).collect()))
        .collect();
        Self { entries }
    }
}

impl SynonymTable {
    pub fn new(entries: BTreeMap<String, Vec<String>>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(k, syns)| {
                (
                    k.to_lowercase(),
                    syns.into_iter().map(|s| s.to_lowercase()).collect(),
                )
            })
            .collect();
        Self { entries }
    }

    /// Load a table from a JSON object of `{"key": ["synonym", ...]}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read synonym table {}", path.display()))?;
        let entries: BTreeMap<String, Vec<String>> = serde_json::from_str(&text)
            .with_context(|| format!("Invalid synonym table {}", path.display()))?;
        Ok(Self::new(entries))
    }

    /// Keys whose synonym list contains `token`.
    pub fn keys_for<'a>(&'a self, token: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(_, syns)| syns.iter().any(|s| s == token))
            .map(|(k, _)| k.as_str())
    }
}

/// Split a query into lowercase word tokens. Surrounding punctuation is
/// stripped and a trailing possessive `'s` is split off; whatever is left
/// must be purely alphanumeric to survive.
fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter_map(|word| {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            let word = word
                .strip_suffix("'s")
                .or_else(|| word.strip_suffix("’s"))
                .unwrap_or(word);
            (!word.is_empty() && word.chars().all(char::is_alphanumeric))
                .then(|| word.to_string())
        })
        .collect()
}

/// Normalize a raw query into a deduplicated, synonym-expanded keyword set.
/// Empty or whitespace-only queries produce an empty set.
pub fn normalize(query: &str, synonyms: &SynonymTable) -> KeywordSet {
    let mut keywords = KeywordSet::new();
    for token in tokenize(query) {
        if STOP_WORDS.contains(&token.as_str()) {
            continue;
        }
        for key in synonyms.keys_for(&token) {
            keywords.insert(key.to_string());
        }
        keywords.insert(token);
    }
    debug!(query, keywords = ?keywords, "query normalized");
    keywords
}
