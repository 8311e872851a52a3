//! Storage seam used by the ingestion and translation pipeline.

use std::future::Future;
use std::sync::Arc;

use mavs_core::ArticleInput;
use serde::Serialize;
use sqlx::PgPool;

use crate::articles::{self, ArticleRow, ArticleTranslations, UpsertOutcome};
use crate::DbError;

/// Article persistence as seen by the pipeline.
///
/// Implemented for [`PgPool`] and for the in-process
/// [`MemoryArticleStore`](crate::MemoryArticleStore).
pub trait ArticleStore: Send + Sync {
    fn upsert_article(
        &self,
        input: &ArticleInput,
    ) -> impl Future<Output = Result<UpsertOutcome, DbError>> + Send;

    fn list_pending_translation(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ArticleRow>, DbError>> + Send;

    fn count_pending_translation(&self) -> impl Future<Output = Result<i64, DbError>> + Send;

    fn save_translations(
        &self,
        article_id: i64,
        translations: &ArticleTranslations,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Records a pass that left at least one field of the article
    /// untranslated, pushing it behind articles with fewer failures.
    fn record_translation_failure(
        &self,
        article_id: i64,
    ) -> impl Future<Output = Result<(), DbError>> + Send;
}

impl ArticleStore for PgPool {
    async fn upsert_article(&self, input: &ArticleInput) -> Result<UpsertOutcome, DbError> {
        articles::upsert_article(self, input).await
    }

    async fn list_pending_translation(&self, limit: i64) -> Result<Vec<ArticleRow>, DbError> {
        articles::list_pending_translation(self, limit).await
    }

    async fn count_pending_translation(&self) -> Result<i64, DbError> {
        articles::count_pending_translation(self).await
    }

    async fn save_translations(
        &self,
        article_id: i64,
        translations: &ArticleTranslations,
    ) -> Result<(), DbError> {
        articles::save_article_translations(self, article_id, translations).await
    }

    async fn record_translation_failure(&self, article_id: i64) -> Result<(), DbError> {
        articles::record_translation_failure(self, article_id).await
    }
}

impl<T: ArticleStore> ArticleStore for Arc<T> {
    fn upsert_article(
        &self,
        input: &ArticleInput,
    ) -> impl Future<Output = Result<UpsertOutcome, DbError>> + Send {
        (**self).upsert_article(input)
    }

    fn list_pending_translation(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ArticleRow>, DbError>> + Send {
        (**self).list_pending_translation(limit)
    }

    fn count_pending_translation(&self) -> impl Future<Output = Result<i64, DbError>> + Send {
        (**self).count_pending_translation()
    }

    fn save_translations(
        &self,
        article_id: i64,
        translations: &ArticleTranslations,
    ) -> impl Future<Output = Result<(), DbError>> + Send {
        (**self).save_translations(article_id, translations)
    }

    fn record_translation_failure(
        &self,
        article_id: i64,
    ) -> impl Future<Output = Result<(), DbError>> + Send {
        (**self).record_translation_failure(article_id)
    }
}

/// Tally of a batch upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub saved: usize,
    pub updated: usize,
    pub errors: usize,
}

/// Upserts every input, isolating per-item failures: a rejected or failing
/// item is logged and counted, and the rest of the batch still runs.
pub async fn upsert_many<S: ArticleStore>(store: &S, inputs: &[ArticleInput]) -> UpsertSummary {
    let mut summary = UpsertSummary::default();

    for input in inputs {
        match store.upsert_article(input).await {
            Ok(UpsertOutcome::Created) => summary.saved += 1,
            Ok(UpsertOutcome::Updated) => summary.updated += 1,
            Err(e) => {
                tracing::warn!(
                    source_identifier = %input.source_identifier,
                    error = %e,
                    "upsert: article rejected"
                );
                summary.errors += 1;
            }
        }
    }

    tracing::debug!(
        saved = summary.saved,
        updated = summary.updated,
        errors = summary.errors,
        "upsert: batch complete"
    );
    summary
}
