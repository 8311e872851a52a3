//! Deduplication and ordering of aggregated articles.
//!
//! Two granularities exist. [`dedupe_by_identifier`] collapses exact
//! `source_identifier` repeats and runs before persistence.
//! [`dedupe_by_title`] collapses near-identical titles from different URLs
//! and is only used for display feeds; persisted rows are never merged by
//! title.

use std::collections::HashSet;

use mavs_core::ArticleInput;

/// Case-folds, drops punctuation and collapses whitespace.
///
/// Letters and digits of any script are kept, so non-Latin titles still
/// compare meaningfully.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let folded: String = title
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps the first article for each normalized title.
#[must_use]
pub fn dedupe_by_title(articles: Vec<ArticleInput>) -> Vec<ArticleInput> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|a| seen.insert(normalize_title(&a.title)))
        .collect()
}

/// Keeps the first article for each exact (trimmed) source identifier.
#[must_use]
pub fn dedupe_by_identifier(articles: Vec<ArticleInput>) -> Vec<ArticleInput> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|a| seen.insert(a.source_identifier.trim().to_string()))
        .collect()
}

/// Newest first, truncated to `limit`.
#[must_use]
pub fn rank_latest(mut articles: Vec<ArticleInput>, limit: usize) -> Vec<ArticleInput> {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    articles.truncate(limit);
    articles
}

/// Display feed: title dedup, then recency sort and truncation.
#[must_use]
pub fn collect_latest(articles: Vec<ArticleInput>, limit: usize) -> Vec<ArticleInput> {
    rank_latest(dedupe_by_title(articles), limit)
}
