//! One scheduler pass: crawl all sources, upsert the results, then run a
//! paced, budgeted translation pass over pending articles.
//!
//! Per-source, per-item and per-call failures become counters and log
//! lines. Only a systemic problem (no translation credentials, a store that
//! cannot be queried) fails the run.

mod recorded;
mod run;
mod translate;

use std::time::Duration;

use mavs_db::{DbError, UpsertSummary};
use mavs_sources::SourceReport;
use serde::Serialize;
use thiserror::Error;

pub use recorded::RecordedRun;
pub use run::Pipeline;
pub use translate::{translate_article, ArticleTranslationOutcome};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("translation API key is not configured (set TRANSLATION_API_KEY)")]
    MissingApiKey,

    #[error("article store unavailable: {0}")]
    Store(#[from] DbError),
}

/// Bounds for one pipeline pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Articles requested from each source.
    pub per_source_limit: usize,
    /// Pending articles to translate in this pass.
    pub translate_limit: usize,
    /// Pause between translation calls.
    pub delay: Duration,
    /// Wall-clock budget for the translation phase; `None` is unbounded.
    pub budget: Option<Duration>,
}

impl RunOptions {
    #[must_use]
    pub fn from_app_config(config: &mavs_core::AppConfig) -> Self {
        Self {
            per_source_limit: config.pipeline_per_source_limit,
            translate_limit: config.pipeline_translate_limit,
            delay: Duration::from_millis(config.pipeline_delay_ms),
            budget: (config.pipeline_budget_secs > 0)
                .then(|| Duration::from_secs(config.pipeline_budget_secs)),
        }
    }
}

/// Result of the crawl + upsert phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlSummary {
    /// Articles returned by all sources, before identifier dedup.
    pub crawled: usize,
    /// Articles handed to the store after identifier dedup.
    pub unique: usize,
    pub upsert: UpsertSummary,
    pub sources: Vec<SourceReport>,
}

/// Result of the translation phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TranslationSummary {
    pub translated: usize,
    pub failed: usize,
    /// Articles still pending after the pass.
    pub remaining: i64,
    /// The time budget ran out before the selection was worked through.
    pub stopped_early: bool,
}

/// Structured summary returned by a full pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub crawled: usize,
    pub saved: usize,
    pub updated: usize,
    pub errors: usize,
    pub translated: usize,
    pub failed: usize,
    pub remaining: i64,
    pub stopped_early: bool,
    pub sources: Vec<SourceReport>,
}

impl RunSummary {
    #[must_use]
    pub fn from_parts(crawl: CrawlSummary, translation: TranslationSummary) -> Self {
        Self {
            crawled: crawl.crawled,
            saved: crawl.upsert.saved,
            updated: crawl.upsert.updated,
            errors: crawl.upsert.errors,
            translated: translation.translated,
            failed: translation.failed,
            remaining: translation.remaining,
            stopped_early: translation.stopped_early,
            sources: crawl.sources,
        }
    }
}
