//! In-process [`ArticleStore`] with the same upsert and translation
//! write-back rules as the Postgres tables. Used for database-less runs
//! and tests.

use std::cmp::Reverse;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use mavs_core::ArticleInput;
use uuid::Uuid;

use crate::articles::{validate_article_input, ArticleRow, ArticleTranslations, UpsertOutcome};
use crate::store::ArticleStore;
use crate::DbError;

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<ArticleRow>,
    next_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryArticleStore {
    state: Mutex<MemoryState>,
}

impl MemoryArticleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all rows, newest first.
    #[must_use]
    pub fn articles(&self) -> Vec<ArticleRow> {
        let mut rows = self.lock().rows.clone();
        rows.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)));
        rows
    }

    #[must_use]
    pub fn get_by_source_identifier(&self, source_identifier: &str) -> Option<ArticleRow> {
        self.lock()
            .rows
            .iter()
            .find(|r| r.source_identifier == source_identifier)
            .cloned()
    }

    /// Clears all translated fields of one article.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no article has the given `id`.
    pub fn reset_translations(&self, article_id: i64) -> Result<(), DbError> {
        let mut state = self.lock();
        let row = state
            .rows
            .iter_mut()
            .find(|r| r.id == article_id)
            .ok_or(DbError::NotFound)?;
        row.title_translated = None;
        row.content_translated = None;
        row.summary_translated = None;
        row.translation_attempts = 0;
        row.last_translation_attempt_at = None;
        row.updated_at = Utc::now();
        Ok(())
    }

    fn upsert_sync(&self, input: &ArticleInput) -> Result<UpsertOutcome, DbError> {
        validate_article_input(input)?;
        let now = Utc::now();
        let identifier = input.source_identifier.trim();
        let mut state = self.lock();

        if let Some(row) = state
            .rows
            .iter_mut()
            .find(|r| r.source_identifier == identifier)
        {
            row.title = input.title.trim().to_string();
            if let Some(content) = &input.content {
                row.content = Some(content.clone());
            }
            if let Some(image_url) = &input.image_url {
                row.image_url = Some(image_url.clone());
            }
            row.updated_at = now;
            return Ok(UpsertOutcome::Updated);
        }

        state.next_id += 1;
        let id = state.next_id;
        state.rows.push(ArticleRow {
            id,
            public_id: Uuid::new_v4(),
            source_kind: input.source_kind.as_str().to_string(),
            source_identifier: identifier.to_string(),
            title: input.title.trim().to_string(),
            content: input.content.clone(),
            summary: input.summary.clone(),
            author: input.author.clone(),
            image_url: input.image_url.clone(),
            published_at: input.published_at,
            title_translated: None,
            content_translated: None,
            summary_translated: None,
            view_count: 0,
            translation_attempts: 0,
            last_translation_attempt_at: None,
            ingested_at: now,
            updated_at: now,
        });
        Ok(UpsertOutcome::Created)
    }

    fn pending_sync(&self, limit: i64) -> Vec<ArticleRow> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let mut pending: Vec<_> = self
            .articles()
            .into_iter()
            .filter(ArticleRow::needs_translation)
            .collect();
        // Missing title first, then fewest failed attempts; `articles()`
        // already sorted newest first and the sort is stable.
        pending.sort_by_key(|r| (r.title_translated.is_some(), r.translation_attempts));
        pending.truncate(limit);
        pending
    }

    fn record_failure_sync(&self, article_id: i64) -> Result<(), DbError> {
        let mut state = self.lock();
        let row = state
            .rows
            .iter_mut()
            .find(|r| r.id == article_id)
            .ok_or(DbError::NotFound)?;
        row.translation_attempts = row.translation_attempts.saturating_add(1);
        row.last_translation_attempt_at = Some(Utc::now());
        Ok(())
    }

    fn save_sync(&self, article_id: i64, translations: &ArticleTranslations) -> Result<(), DbError> {
        let mut state = self.lock();
        let row = state
            .rows
            .iter_mut()
            .find(|r| r.id == article_id)
            .ok_or(DbError::NotFound)?;

        if row.title_translated.is_none() {
            row.title_translated.clone_from(&translations.title);
        }
        if row.content_translated.is_none() {
            row.content_translated.clone_from(&translations.content);
        }
        if row.summary_translated.is_none() {
            row.summary_translated.clone_from(&translations.summary);
        }
        row.updated_at = Utc::now();
        Ok(())
    }
}

impl ArticleStore for MemoryArticleStore {
    async fn upsert_article(&self, input: &ArticleInput) -> Result<UpsertOutcome, DbError> {
        self.upsert_sync(input)
    }

    async fn list_pending_translation(&self, limit: i64) -> Result<Vec<ArticleRow>, DbError> {
        Ok(self.pending_sync(limit))
    }

    async fn count_pending_translation(&self) -> Result<i64, DbError> {
        let count = self.lock().rows.iter().filter(|r| r.needs_translation()).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn save_translations(
        &self,
        article_id: i64,
        translations: &ArticleTranslations,
    ) -> Result<(), DbError> {
        self.save_sync(article_id, translations)
    }

    async fn record_translation_failure(&self, article_id: i64) -> Result<(), DbError> {
        self.record_failure_sync(article_id)
    }
}
