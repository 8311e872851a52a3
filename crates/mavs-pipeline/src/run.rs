use std::sync::Arc;

use mavs_core::SourceConfig;
use mavs_db::{upsert_many, ArticleStore};
use mavs_sources::{aggregate, dedupe_by_identifier, SourceClient};
use mavs_translate::Translator;
use tokio::time::Instant;

use crate::translate::translate_article;
use crate::{CrawlSummary, PipelineError, RunOptions, RunSummary, TranslationSummary};

/// Wiring for one pipeline pass.
pub struct Pipeline<S> {
    store: S,
    client: SourceClient,
    sources: Vec<SourceConfig>,
    translator: Option<Arc<Translator>>,
}

impl<S: ArticleStore> Pipeline<S> {
    /// `translator` is `None` when no API key is configured; crawling still
    /// works, translation passes fail with [`PipelineError::MissingApiKey`].
    pub fn new(
        store: S,
        client: SourceClient,
        sources: Vec<SourceConfig>,
        translator: Option<Arc<Translator>>,
    ) -> Self {
        Self {
            store,
            client,
            sources,
            translator,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn client(&self) -> &SourceClient {
        &self.client
    }

    #[must_use]
    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    #[must_use]
    pub fn translator(&self) -> Option<&Arc<Translator>> {
        self.translator.as_ref()
    }

    fn require_translator(&self) -> Result<&Translator, PipelineError> {
        self.translator
            .as_deref()
            .ok_or(PipelineError::MissingApiKey)
    }

    /// Aggregates all sources, collapses repeated source identifiers and
    /// upserts the rest.
    pub async fn crawl(&self, per_source_limit: usize) -> CrawlSummary {
        let aggregated = aggregate(&self.client, &self.sources, per_source_limit).await;
        let crawled = aggregated.articles.len();
        let unique = dedupe_by_identifier(aggregated.articles);
        let upsert = upsert_many(&self.store, &unique).await;

        tracing::info!(
            crawled,
            unique = unique.len(),
            saved = upsert.saved,
            updated = upsert.updated,
            errors = upsert.errors,
            "pipeline: crawl complete"
        );

        CrawlSummary {
            crawled,
            unique: unique.len(),
            upsert,
            sources: aggregated.reports,
        }
    }

    /// Translates up to `options.translate_limit` pending articles in store
    /// order, one at a time with `options.delay` between articles.
    ///
    /// When `options.budget` runs out no further article is started, an
    /// article still in flight is abandoned, and the partial summary is
    /// returned. Every article left with an untranslated field has a failed
    /// attempt recorded so it yields to the others next pass.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingApiKey`] before any work when no
    /// translator is configured, or [`PipelineError::Store`] if pending
    /// articles cannot be listed or counted.
    pub async fn translate_pending(
        &self,
        options: &RunOptions,
    ) -> Result<TranslationSummary, PipelineError> {
        let translator = self.require_translator()?;
        let deadline = options.budget.map(|budget| Instant::now() + budget);

        let limit = i64::try_from(options.translate_limit).unwrap_or(i64::MAX);
        let pending = self.store.list_pending_translation(limit).await?;

        let mut summary = TranslationSummary::default();
        for (index, article) in pending.iter().enumerate() {
            if index > 0 && !options.delay.is_zero() {
                tokio::time::sleep(options.delay).await;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::info!(
                    processed = index,
                    selected = pending.len(),
                    "pipeline: time budget exhausted; stopping translation pass"
                );
                summary.stopped_early = true;
                break;
            }

            let translation = translate_article(translator, article);
            let outcome = match deadline {
                Some(d) => match tokio::time::timeout_at(d, translation).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::info!(
                            article_id = article.id,
                            processed = index,
                            selected = pending.len(),
                            "pipeline: time budget exhausted mid-article; stopping translation pass"
                        );
                        self.record_failure(article.id).await;
                        summary.failed += 1;
                        summary.stopped_early = true;
                        break;
                    }
                },
                None => translation.await,
            };
            if !outcome.failed_fields.is_empty() {
                self.record_failure(article.id).await;
            }
            if !outcome.made_progress() {
                summary.failed += 1;
                continue;
            }
            match self
                .store
                .save_translations(article.id, &outcome.translations)
                .await
            {
                Ok(()) => summary.translated += 1,
                Err(e) => {
                    tracing::warn!(article_id = article.id, error = %e, "saving translations failed");
                    summary.failed += 1;
                }
            }
        }

        summary.remaining = self.store.count_pending_translation().await?;
        tracing::info!(
            translated = summary.translated,
            failed = summary.failed,
            remaining = summary.remaining,
            stopped_early = summary.stopped_early,
            "pipeline: translation pass complete"
        );
        Ok(summary)
    }

    async fn record_failure(&self, article_id: i64) {
        if let Err(e) = self.store.record_translation_failure(article_id).await {
            tracing::warn!(article_id, error = %e, "recording translation failure failed");
        }
    }

    /// Full pass: crawl, upsert, then the budgeted translation pass.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingApiKey`] before crawling when no
    /// translator is configured, or [`PipelineError::Store`] if the
    /// translation phase cannot query the store.
    pub async fn run(&self, options: &RunOptions) -> Result<RunSummary, PipelineError> {
        self.require_translator()?;

        tracing::info!(
            sources = self.sources.len(),
            per_source_limit = options.per_source_limit,
            translate_limit = options.translate_limit,
            delay_ms = u64::try_from(options.delay.as_millis()).unwrap_or(u64::MAX),
            "pipeline: starting run"
        );
        let crawl = self.crawl(options.per_source_limit).await;
        let translation = self.translate_pending(options).await?;
        Ok(RunSummary::from_parts(crawl, translation))
    }
}
