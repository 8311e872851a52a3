//! Read-only commands: `status` and `sources`.

use mavs_core::{AppConfig, SourceFormat};
use sqlx::PgPool;

pub(crate) async fn run_status(pool: &PgPool, runs: i64) -> anyhow::Result<()> {
    let total = mavs_db::count_articles(pool).await?;
    let pending = mavs_db::count_pending_translation(pool).await?;
    println!("articles: {total} stored, {pending} pending translation");

    let recent = mavs_db::list_pipeline_runs(pool, runs.max(1)).await?;
    if recent.is_empty() {
        println!("no pipeline runs recorded");
        return Ok(());
    }
    println!("recent pipeline runs:");
    for run in recent {
        let translated = run.summary.get("translated").and_then(serde_json::Value::as_u64);
        println!(
            "  {} {:<5} {:<9} translated={} {}",
            run.created_at.format("%Y-%m-%d %H:%M"),
            run.trigger_source,
            run.status,
            translated.map_or_else(|| "-".to_string(), |n| n.to_string()),
            run.error_message.unwrap_or_default()
        );
    }
    Ok(())
}

pub(crate) fn format_label(format: &SourceFormat) -> &'static str {
    match format {
        SourceFormat::JsonApi => "json_api",
        SourceFormat::Feed => "feed",
        SourceFormat::Html(_) => "html",
    }
}

pub(crate) fn run_sources(config: &AppConfig) -> anyhow::Result<()> {
    let catalogue = mavs_core::load_sources(&config.sources_path)?;
    println!("sources ({}):", config.sources_path.display());
    for source in &catalogue.sources {
        println!(
            "  {:<20} {:<12} {:<8} {:<8} {}",
            source.name,
            source.kind.as_str(),
            format_label(&source.format),
            if source.enabled { "enabled" } else { "disabled" },
            source.url
        );
    }
    Ok(())
}
