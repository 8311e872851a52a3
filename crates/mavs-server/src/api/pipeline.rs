use std::time::Duration;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use mavs_pipeline::{PipelineError, RecordedRun, RunOptions};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, translation_unavailable, ApiError, ApiResponse, AppState,
};

/// Upper bound for a triggered translation pass.
const MAX_TRIGGER_LIMIT: usize = 50;
/// Upper bound for the pause between translation calls.
const MAX_TRIGGER_DELAY_MS: u64 = 60_000;

#[derive(Debug, Default, Deserialize)]
pub(super) struct TriggerQuery {
    pub limit: Option<usize>,
    #[serde(alias = "delayMs")]
    pub delay_ms: Option<u64>,
}

impl TriggerQuery {
    fn apply(&self, defaults: RunOptions) -> RunOptions {
        RunOptions {
            // 0 is a crawl-only pass.
            translate_limit: self
                .limit
                .unwrap_or(defaults.translate_limit)
                .min(MAX_TRIGGER_LIMIT),
            delay: self.delay_ms.map_or(defaults.delay, |ms| {
                Duration::from_millis(ms.min(MAX_TRIGGER_DELAY_MS))
            }),
            ..defaults
        }
    }
}

/// Runs one recorded pipeline pass and returns its summary.
///
/// Per-source and per-article failures only show up as counters; the
/// request fails only when translation is unconfigured, another pass is
/// already running, or the store cannot be reached.
pub(super) async fn trigger_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TriggerQuery>,
) -> Result<Json<ApiResponse<RecordedRun>>, ApiError> {
    if state.pipeline.translator().is_none() {
        return Err(translation_unavailable(req_id.0));
    }
    let Ok(_guard) = state.run_lock.try_lock() else {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "a pipeline run is already in progress",
        ));
    };

    let options = query.apply(state.options);
    match state.pipeline.run_recorded(&options, "api").await {
        Ok(run) => Ok(ApiResponse::new(req_id.0, run)),
        Err(PipelineError::MissingApiKey) => Err(translation_unavailable(req_id.0)),
        Err(PipelineError::Store(e)) => Err(map_db_error(req_id.0, &e)),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PipelineRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct PipelineRunItem {
    run_id: Uuid,
    trigger_source: String,
    status: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    summary: serde_json::Value,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<mavs_db::PipelineRunRow> for PipelineRunItem {
    fn from(row: mavs_db::PipelineRunRow) -> Self {
        Self {
            run_id: row.public_id,
            trigger_source: row.trigger_source,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            summary: row.summary,
            error_message: row.error_message,
            created_at: row.created_at,
        }
    }
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PipelineRunsQuery>,
) -> Result<Json<ApiResponse<Vec<PipelineRunItem>>>, ApiError> {
    let rows = mavs_db::list_pipeline_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(PipelineRunItem::from).collect();
    Ok(ApiResponse::new(req_id.0, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{app, options, send, unreachable_pool};
    use crate::middleware::AuthState;
    use axum::body::Body;
    use axum::http::Request;

    #[test]
    fn trigger_query_accepts_camel_case_delay() {
        let query: TriggerQuery =
            serde_json::from_str(r#"{"limit": 2, "delayMs": 1500}"#).expect("parse");
        let applied = query.apply(options());

        assert_eq!(applied.translate_limit, 2);
        assert_eq!(applied.delay, Duration::from_millis(1500));
        assert_eq!(applied.per_source_limit, options().per_source_limit);
    }

    #[test]
    fn trigger_query_defaults_and_clamps() {
        let applied = TriggerQuery::default().apply(options());
        assert_eq!(applied, options());

        let query = TriggerQuery {
            limit: Some(10_000),
            delay_ms: Some(u64::MAX),
        };
        let applied = query.apply(options());
        assert_eq!(applied.translate_limit, MAX_TRIGGER_LIMIT);
        assert_eq!(applied.delay, Duration::from_millis(MAX_TRIGGER_DELAY_MS));
    }

    #[test]
    fn zero_limit_means_crawl_only() {
        let query = TriggerQuery {
            limit: Some(0),
            delay_ms: None,
        };
        let applied = query.apply(options());
        assert_eq!(applied.translate_limit, 0);
        assert_eq!(applied.per_source_limit, options().per_source_limit);
    }

    #[test]
    fn pipeline_run_item_is_serializable() {
        let item = PipelineRunItem {
            run_id: Uuid::new_v4(),
            trigger_source: "cron".to_string(),
            status: "succeeded".to_string(),
            started_at: Some(Utc::now()),
            completed_at: Some(Utc::now()),
            summary: serde_json::json!({"translated": 3}),
            error_message: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["trigger_source"], "cron");
        assert_eq!(json["summary"]["translated"], 3);
    }

    #[tokio::test]
    async fn trigger_without_translator_is_unavailable() {
        let app = app(unreachable_pool(), vec![], None, AuthState::disabled());
        let (status, json) = send(
            app,
            Request::builder()
                .method("POST")
                .uri("/api/v1/pipeline/run?limit=2&delayMs=0")
                .body(Body::empty())
                .expect("request"),
        )
        .await;

        assert_eq!(status, 503);
        assert_eq!(json["error"]["code"], "service_unavailable");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn trigger_records_a_succeeded_run(pool: sqlx::PgPool) {
        let server = wiremock::MockServer::start().await;
        let app = app(
            pool.clone(),
            vec![],
            Some(crate::api::test_support::translator(&server.uri())),
            AuthState::disabled(),
        );

        let (status, json) = send(
            app,
            Request::builder()
                .method("POST")
                .uri("/api/v1/pipeline/run?limit=1&delay_ms=0")
                .body(Body::empty())
                .expect("request"),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(json["data"]["crawled"], 0);
        assert_eq!(json["data"]["remaining"], 0);

        let runs = mavs_db::list_pipeline_runs(&pool, 10).await.expect("runs");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].trigger_source, "api");
        assert_eq!(runs[0].status, "succeeded");
        assert_eq!(runs[0].summary["translated"], 0);
    }
}
