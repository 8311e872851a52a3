//! Pipeline passes recorded in the `pipeline_runs` table.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{Pipeline, PipelineError, RunOptions, RunSummary};

/// A finished pass and the `pipeline_runs` row that tracks it.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedRun {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub summary: RunSummary,
}

impl Pipeline<PgPool> {
    /// Runs one full pass inside a `queued → running → succeeded|failed`
    /// lifecycle. `trigger` is stored as the run's trigger source
    /// (`cron`, `api`, `cli`).
    ///
    /// # Errors
    ///
    /// Returns the pass's own [`PipelineError`] after marking the run
    /// failed, or [`PipelineError::Store`] if the run row cannot be
    /// created or moved through its lifecycle.
    pub async fn run_recorded(
        &self,
        options: &RunOptions,
        trigger: &str,
    ) -> Result<RecordedRun, PipelineError> {
        let pool = self.store();
        let run = mavs_db::create_pipeline_run(pool, trigger).await?;
        mavs_db::start_pipeline_run(pool, run.id).await?;

        match self.run(options).await {
            Ok(summary) => {
                let value = serde_json::to_value(&summary).unwrap_or_default();
                mavs_db::complete_pipeline_run(pool, run.id, &value).await?;
                tracing::info!(
                    run_id = run.id,
                    trigger,
                    translated = summary.translated,
                    remaining = summary.remaining,
                    "pipeline: run recorded"
                );
                Ok(RecordedRun {
                    run_id: run.public_id,
                    summary,
                })
            }
            Err(e) => {
                fail_run_best_effort(pool, run.id, &e.to_string()).await;
                Err(e)
            }
        }
    }
}

async fn fail_run_best_effort(pool: &PgPool, run_id: i64, message: &str) {
    if let Err(mark_err) = mavs_db::fail_pipeline_run(pool, run_id, message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark pipeline run as failed"
        );
    }
}
