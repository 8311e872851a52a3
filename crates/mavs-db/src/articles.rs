//! Database operations for the `articles` table.

use chrono::{DateTime, Utc};
use mavs_core::{ArticleInput, TranslationKind};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `articles` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub public_id: Uuid,
    pub source_kind: String,
    pub source_identifier: String,
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub title_translated: Option<String>,
    pub content_translated: Option<String>,
    pub summary_translated: Option<String>,
    pub view_count: i64,
    pub translation_attempts: i32,
    pub last_translation_attempt_at: Option<DateTime<Utc>>,
    pub ingested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derived translation lifecycle of a stored article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationState {
    Untranslated,
    TitleTranslated,
    FullyTranslated,
}

impl ArticleRow {
    /// Fields that still need a translation, in the order they are processed.
    #[must_use]
    pub fn pending_fields(&self) -> Vec<TranslationKind> {
        let mut pending = Vec::new();
        if self.title_translated.is_none() {
            pending.push(TranslationKind::Title);
        }
        if self.content.is_some() && self.content_translated.is_none() {
            pending.push(TranslationKind::Content);
        }
        if self.summary.is_some() && self.summary_translated.is_none() {
            pending.push(TranslationKind::Summary);
        }
        pending
    }

    #[must_use]
    pub fn translation_state(&self) -> TranslationState {
        if self.title_translated.is_none() {
            TranslationState::Untranslated
        } else if self.pending_fields().is_empty() {
            TranslationState::FullyTranslated
        } else {
            TranslationState::TitleTranslated
        }
    }

    #[must_use]
    pub fn needs_translation(&self) -> bool {
        !self.pending_fields().is_empty()
    }

    /// Source text for one translatable field, if the article has it.
    #[must_use]
    pub fn source_text(&self, kind: TranslationKind) -> Option<&str> {
        match kind {
            TranslationKind::Title => Some(self.title.as_str()),
            TranslationKind::Content => self.content.as_deref(),
            TranslationKind::Summary => self.summary.as_deref(),
        }
    }
}

/// Translated values to write back. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleTranslations {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
}

impl ArticleTranslations {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.summary.is_none()
    }

    pub fn set(&mut self, kind: TranslationKind, value: String) {
        match kind {
            TranslationKind::Title => self.title = Some(value),
            TranslationKind::Content => self.content = Some(value),
            TranslationKind::Summary => self.summary = Some(value),
        }
    }
}

/// Whether an upsert inserted a new row or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Rejects inputs the table constraints would refuse anyway, with a readable
/// reason instead of a constraint violation.
///
/// # Errors
///
/// Returns [`DbError::InvalidArticle`] for a blank title or a non-http
/// source identifier.
pub fn validate_article_input(input: &ArticleInput) -> Result<(), DbError> {
    let invalid = |reason: &str| DbError::InvalidArticle {
        source_identifier: input.source_identifier.clone(),
        reason: reason.to_string(),
    };

    if input.title.trim().is_empty() {
        return Err(invalid("title is blank"));
    }
    let id = input.source_identifier.trim();
    if !(id.starts_with("http://") || id.starts_with("https://")) {
        return Err(invalid("source identifier is not an http(s) url"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Insert-or-update keyed by `source_identifier`.
///
/// On conflict only `title`, `content` and `image_url` are refreshed; a null
/// incoming `content` or `image_url` keeps the stored value. Translated
/// fields, `summary`, `author`, `published_at` and `view_count` are never
/// touched by ingestion.
///
/// # Errors
///
/// Returns [`DbError::InvalidArticle`] if validation fails, or
/// [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_article(pool: &PgPool, input: &ArticleInput) -> Result<UpsertOutcome, DbError> {
    validate_article_input(input)?;

    let (_id, inserted): (i64, bool) = sqlx::query_as(
        "INSERT INTO articles \
             (public_id, source_kind, source_identifier, title, content, summary, \
              author, image_url, published_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (source_identifier) DO UPDATE SET \
             title      = EXCLUDED.title, \
             content    = COALESCE(EXCLUDED.content, articles.content), \
             image_url  = COALESCE(EXCLUDED.image_url, articles.image_url), \
             updated_at = NOW() \
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(Uuid::new_v4())
    .bind(input.source_kind.as_str())
    .bind(input.source_identifier.trim())
    .bind(input.title.trim())
    .bind(input.content.as_deref())
    .bind(input.summary.as_deref())
    .bind(input.author.as_deref())
    .bind(input.image_url.as_deref())
    .bind(input.published_at)
    .fetch_one(pool)
    .await?;

    Ok(if inserted {
        UpsertOutcome::Created
    } else {
        UpsertOutcome::Updated
    })
}

/// Writes translated fields for one article. Fields already translated are
/// kept; see [`reset_article_translations`] to force a redo.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no article has the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn save_article_translations(
    pool: &PgPool,
    id: i64,
    translations: &ArticleTranslations,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE articles SET \
             title_translated   = COALESCE(title_translated, $2), \
             content_translated = COALESCE(content_translated, $3), \
             summary_translated = COALESCE(summary_translated, $4), \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(translations.title.as_deref())
    .bind(translations.content.as_deref())
    .bind(translations.summary.as_deref())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Counts one translation pass that left at least one field untranslated.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no article has the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn record_translation_failure(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE articles SET \
             translation_attempts = translation_attempts + 1, \
             last_translation_attempt_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Clears all translated fields so the next pipeline pass picks the article
/// up again.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no article has the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn reset_article_translations(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE articles SET \
             title_translated = NULL, content_translated = NULL, summary_translated = NULL, \
             translation_attempts = 0, last_translation_attempt_at = NULL, \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::NotFound`] if missing, or [`DbError::Sqlx`] on query failure.
pub async fn get_article(pool: &PgPool, id: i64) -> Result<ArticleRow, DbError> {
    sqlx::query_as::<_, ArticleRow>(
        "SELECT id, public_id, source_kind, source_identifier, title, content, summary, \
                author, image_url, published_at, title_translated, content_translated, \
                summary_translated, view_count, translation_attempts, \
                last_translation_attempt_at, ingested_at, updated_at \
         FROM articles \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn get_article_by_source_identifier(
    pool: &PgPool,
    source_identifier: &str,
) -> Result<Option<ArticleRow>, DbError> {
    let row = sqlx::query_as::<_, ArticleRow>(
        "SELECT id, public_id, source_kind, source_identifier, title, content, summary, \
                author, image_url, published_at, title_translated, content_translated, \
                summary_translated, view_count, translation_attempts, \
                last_translation_attempt_at, ingested_at, updated_at \
         FROM articles \
         WHERE source_identifier = $1",
    )
    .bind(source_identifier)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Newest articles first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_latest_articles(pool: &PgPool, limit: i64) -> Result<Vec<ArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, ArticleRow>(
        "SELECT id, public_id, source_kind, source_identifier, title, content, summary, \
                author, image_url, published_at, title_translated, content_translated, \
                summary_translated, view_count, translation_attempts, \
                last_translation_attempt_at, ingested_at, updated_at \
         FROM articles \
         ORDER BY published_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Articles with at least one missing translation.
///
/// Articles still missing a title come first, then fewer failed attempts,
/// then newest first. An article whose translation keeps failing sinks
/// behind the rest instead of occupying the head of every pass.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_pending_translation(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, ArticleRow>(
        "SELECT id, public_id, source_kind, source_identifier, title, content, summary, \
                author, image_url, published_at, title_translated, content_translated, \
                summary_translated, view_count, translation_attempts, \
                last_translation_attempt_at, ingested_at, updated_at \
         FROM articles \
         WHERE title_translated IS NULL \
            OR (content IS NOT NULL AND content_translated IS NULL) \
            OR (summary IS NOT NULL AND summary_translated IS NULL) \
         ORDER BY (title_translated IS NULL) DESC, translation_attempts ASC, \
                  published_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn count_pending_translation(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM articles \
         WHERE title_translated IS NULL \
            OR (content IS NOT NULL AND content_translated IS NULL) \
            OR (summary IS NOT NULL AND summary_translated IS NULL)",
    )
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn count_articles(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mavs_core::SourceKind;

    fn row() -> ArticleRow {
        let ts = Utc.with_ymd_and_hms(2024, 11, 2, 18, 0, 0).unwrap();
        ArticleRow {
            id: 1,
            public_id: Uuid::nil(),
            source_kind: "espn".to_string(),
            source_identifier: "https://espn.com/a/1".to_string(),
            title: "Doncic scores 40".to_string(),
            content: Some("Body".to_string()),
            summary: None,
            author: None,
            image_url: None,
            published_at: ts,
            title_translated: None,
            content_translated: None,
            summary_translated: None,
            view_count: 0,
            translation_attempts: 0,
            last_translation_attempt_at: None,
            ingested_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn pending_fields_skip_absent_sources() {
        let article = row();
        assert_eq!(
            article.pending_fields(),
            vec![TranslationKind::Title, TranslationKind::Content]
        );
        assert_eq!(article.translation_state(), TranslationState::Untranslated);
    }

    #[test]
    fn title_only_translation_is_partial() {
        let mut article = row();
        article.title_translated = Some("돈치치 40득점".to_string());
        assert_eq!(article.translation_state(), TranslationState::TitleTranslated);
        assert!(article.needs_translation());

        article.content_translated = Some("본문".to_string());
        assert_eq!(article.translation_state(), TranslationState::FullyTranslated);
        assert!(!article.needs_translation());
    }

    #[test]
    fn validation_rejects_blank_title() {
        let input = ArticleInput::new(
            SourceKind::Espn,
            "https://espn.com/a/1",
            "   ",
            Utc::now(),
        );
        let err = validate_article_input(&input).unwrap_err();
        assert!(matches!(err, DbError::InvalidArticle { ref reason, .. } if reason.contains("blank")));
    }

    #[test]
    fn validation_rejects_non_http_identifier() {
        let input = ArticleInput::new(SourceKind::Espn, "urn:espn:1", "Title", Utc::now());
        assert!(validate_article_input(&input).is_err());
    }

    #[test]
    fn translations_set_by_kind() {
        let mut t = ArticleTranslations::default();
        assert!(t.is_empty());
        t.set(TranslationKind::Summary, "요약".to_string());
        assert_eq!(t.summary.as_deref(), Some("요약"));
        assert!(!t.is_empty());
    }
}
