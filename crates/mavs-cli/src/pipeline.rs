//! Pipeline command handlers: `crawl`, `translate` and `run`.
//!
//! Per-source and per-article failures are reported in the printed summary
//! rather than failing the command; only configuration and store errors
//! propagate.

use std::sync::Arc;
use std::time::Duration;

use mavs_core::AppConfig;
use mavs_db::MemoryArticleStore;
use mavs_pipeline::{CrawlSummary, Pipeline, RunOptions, TranslationSummary};
use mavs_sources::SourceClient;
use mavs_translate::{TranslationCache, Translator};
use sqlx::PgPool;

/// Applies command-line overrides on top of the configured defaults.
pub(crate) fn run_options(
    config: &AppConfig,
    limit: Option<usize>,
    delay_ms: Option<u64>,
) -> RunOptions {
    let defaults = RunOptions::from_app_config(config);
    RunOptions {
        translate_limit: limit.unwrap_or(defaults.translate_limit),
        delay: delay_ms.map_or(defaults.delay, Duration::from_millis),
        ..defaults
    }
}

fn build_pipeline<S: mavs_db::ArticleStore>(
    store: S,
    config: &AppConfig,
    with_translator: bool,
) -> anyhow::Result<Pipeline<S>> {
    let sources = mavs_core::load_sources(&config.sources_path)?.enabled();
    if sources.is_empty() {
        tracing::warn!(path = %config.sources_path.display(), "no enabled sources configured");
    }
    let client = SourceClient::from_app_config(config)?;
    let translator = if with_translator {
        let cache = Arc::new(TranslationCache::open(
            config.translation.cache_path.clone(),
        ));
        Some(Arc::new(Translator::new(&config.translation, cache)?))
    } else {
        None
    };
    Ok(Pipeline::new(store, client, sources, translator))
}

fn print_crawl(summary: &CrawlSummary) {
    for report in &summary.sources {
        match &report.error {
            None => println!("  {:<20} ok      {:>3} articles", report.name, report.count),
            Some(error) => println!("  {:<20} FAILED  {error}", report.name),
        }
    }
    println!(
        "crawled {} ({} unique): saved {}, updated {}, errors {}",
        summary.crawled,
        summary.unique,
        summary.upsert.saved,
        summary.upsert.updated,
        summary.upsert.errors
    );
}

fn print_translation(summary: &TranslationSummary) {
    println!(
        "translated {}, failed {}, remaining {}{}",
        summary.translated,
        summary.failed,
        summary.remaining,
        if summary.stopped_early {
            " (time budget exhausted)"
        } else {
            ""
        }
    );
}

/// Crawls into a throwaway in-memory store and prints what would be saved.
pub(crate) async fn run_crawl_dry(config: &AppConfig, limit: Option<usize>) -> anyhow::Result<()> {
    let pipeline = build_pipeline(MemoryArticleStore::new(), config, false)?;
    let summary = pipeline
        .crawl(limit.unwrap_or(config.pipeline_per_source_limit))
        .await;

    println!("dry-run: nothing was written to the database");
    print_crawl(&summary);
    for article in pipeline.store().articles() {
        println!(
            "  {} [{}] {}",
            article.published_at.format("%Y-%m-%d %H:%M"),
            article.source_kind,
            article.title
        );
    }
    Ok(())
}

pub(crate) async fn run_crawl(
    pool: &PgPool,
    config: &AppConfig,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(pool.clone(), config, false)?;
    let summary = pipeline
        .crawl(limit.unwrap_or(config.pipeline_per_source_limit))
        .await;
    print_crawl(&summary);
    Ok(())
}

/// # Errors
///
/// Returns an error if `TRANSLATION_API_KEY` is unset or the store cannot
/// be queried.
pub(crate) async fn run_translate(
    pool: &PgPool,
    config: &AppConfig,
    limit: Option<usize>,
    delay_ms: Option<u64>,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(pool.clone(), config, true)?;
    let summary = pipeline
        .translate_pending(&run_options(config, limit, delay_ms))
        .await?;
    print_translation(&summary);
    Ok(())
}

/// # Errors
///
/// Returns an error if `TRANSLATION_API_KEY` is unset, the run cannot be
/// recorded, or the store cannot be queried.
pub(crate) async fn run_full(
    pool: &PgPool,
    config: &AppConfig,
    limit: Option<usize>,
    delay_ms: Option<u64>,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(pool.clone(), config, true)?;
    let run = pipeline
        .run_recorded(&run_options(config, limit, delay_ms), "cli")
        .await?;

    println!("pipeline run {}", run.run_id);
    println!("{}", serde_json::to_string_pretty(&run.summary)?);
    Ok(())
}
