//! Background job scheduler.
//!
//! Registers the recurring pipeline pass on `PIPELINE_CRON`. The job shares
//! the API's run lock, so a scheduled pass never overlaps a triggered one.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::AppState;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    state: AppState,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_pipeline_job(&scheduler, state, cron).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_pipeline_job(
    scheduler: &JobScheduler,
    state: AppState,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let state = state.clone();

        Box::pin(async move {
            run_scheduled_pass(&state).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: pipeline job registered");
    Ok(())
}

async fn run_scheduled_pass(state: &AppState) {
    if state.pipeline.translator().is_none() {
        tracing::error!("scheduler: TRANSLATION_API_KEY is not set; skipping pipeline run");
        return;
    }
    let Ok(_guard) = state.run_lock.try_lock() else {
        tracing::warn!("scheduler: previous pipeline run still in progress; skipping");
        return;
    };

    tracing::info!("scheduler: starting pipeline run");
    match state.pipeline.run_recorded(&state.options, "cron").await {
        Ok(run) => tracing::info!(
            run_id = %run.run_id,
            crawled = run.summary.crawled,
            saved = run.summary.saved,
            updated = run.summary.updated,
            translated = run.summary.translated,
            failed = run.summary.failed,
            remaining = run.summary.remaining,
            "scheduler: pipeline run complete"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: pipeline run failed"),
    }
}
