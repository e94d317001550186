//! Capability catalog entries and keyword search.
//!
//! Scoring is a deliberately small heuristic, computed independently against
//! an entry's name and description with the higher value winning:
//!
//! | Match | Score |
//! |-------|-------|
//! | exact (case-insensitive) | 1.0 |
//! | query contained in text | 0.8 |
//! | otherwise | 0.6 × fraction of query words found in text |
//!
//! Names are also compared with `_`, `-` and spaces removed, so the query
//! `web search` finds `webSearchPrime` as a containment match.

use crate::providers::{ProviderName, RemoteTool};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scores below this are discarded.
pub const MIN_SCORE: f64 = 0.1;

const EXACT: f64 = 1.0;
const CONTAINS: f64 = 0.8;
const WORD_WEIGHT: f64 = 0.6;

/// One capability as seen by discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub provider: ProviderName,
}

impl CatalogEntry {
    pub fn from_remote(provider: ProviderName, tool: &RemoteTool) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema.clone(),
            provider,
        }
    }

    /// Relevance of this entry to `query`, in `0.0..=1.0`.
    pub fn score(&self, query: &str) -> f64 {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return 0.0;
        }

        let name = self.name.to_lowercase();
        let name_score = score_text(&name, &query).max(score_compact(&name, &query));
        let description_score = score_text(&self.description.to_lowercase(), &query);
        name_score.max(description_score)
    }
}

/// A catalog entry paired with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    pub entry: &'a CatalogEntry,
    pub score: f64,
}

fn score_text(text: &str, query: &str) -> f64 {
    if text == query {
        return EXACT;
    }
    if text.contains(query) {
        return CONTAINS;
    }

    let words: Vec<&str> = query.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let found = words.iter().filter(|w| text.contains(*w)).count();
    WORD_WEIGHT * found as f64 / words.len() as f64
}

fn compact(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '_' | '-' | ' ')).collect()
}

fn score_compact(name: &str, query: &str) -> f64 {
    let (name, query) = (compact(name), compact(query));
    if query.is_empty() {
        0.0
    } else if name == query {
        EXACT
    } else if name.contains(&query) {
        CONTAINS
    } else {
        0.0
    }
}

/// Rank `entries` against `query`, drop weak matches, keep the best `limit`.
///
/// Ties keep catalog order.
pub fn search<'a>(entries: &'a [CatalogEntry], query: &str, limit: usize) -> Vec<SearchHit<'a>> {
    let mut hits: Vec<SearchHit<'a>> = entries
        .iter()
        .map(|entry| SearchHit {
            entry,
            score: entry.score(query),
        })
        .filter(|hit| hit.score >= MIN_SCORE)
        .collect();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}
