use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use mavs_db::{ArticleRow, TranslationState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ArticlesQuery {
    pub limit: Option<i64>,
    /// Only articles the translation pass still has work for.
    #[serde(default)]
    pub pending: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ArticleItem {
    id: i64,
    article_id: Uuid,
    source_kind: String,
    url: String,
    title: String,
    title_translated: Option<String>,
    summary: Option<String>,
    summary_translated: Option<String>,
    content_translated: Option<String>,
    author: Option<String>,
    image_url: Option<String>,
    published_at: DateTime<Utc>,
    translation_state: TranslationState,
    view_count: i64,
}

impl From<ArticleRow> for ArticleItem {
    fn from(row: ArticleRow) -> Self {
        let translation_state = row.translation_state();
        Self {
            id: row.id,
            article_id: row.public_id,
            source_kind: row.source_kind,
            url: row.source_identifier,
            title: row.title,
            title_translated: row.title_translated,
            summary: row.summary,
            summary_translated: row.summary_translated,
            content_translated: row.content_translated,
            author: row.author,
            image_url: row.image_url,
            published_at: row.published_at,
            translation_state,
            view_count: row.view_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ArticlesPage {
    items: Vec<ArticleItem>,
    total: i64,
    pending_total: i64,
}

pub(super) async fn list_articles(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ArticlesQuery>,
) -> Result<Json<ApiResponse<ArticlesPage>>, ApiError> {
    let limit = normalize_limit(query.limit);
    let rows = if query.pending {
        mavs_db::list_pending_translation(&state.pool, limit).await
    } else {
        mavs_db::list_latest_articles(&state.pool, limit).await
    }
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let total = mavs_db::count_articles(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let pending_total = mavs_db::count_pending_translation(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        req_id.0,
        ArticlesPage {
            items: rows.into_iter().map(ArticleItem::from).collect(),
            total,
            pending_total,
        },
    ))
}

#[derive(Debug, Serialize)]
pub(super) struct RetranslateResult {
    id: i64,
    translation_state: TranslationState,
}

/// Clears the stored translations of one article so the next pass
/// translates it again.
pub(super) async fn retranslate_article(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RetranslateResult>>, ApiError> {
    mavs_db::reset_article_translations(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    tracing::info!(article_id = id, "article queued for retranslation");

    Ok(ApiResponse::new(
        req_id.0,
        RetranslateResult {
            id,
            translation_state: TranslationState::Untranslated,
        },
    ))
}
