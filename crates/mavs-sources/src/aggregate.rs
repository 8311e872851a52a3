//! Concurrent fan-out over all configured sources.

use mavs_core::{ArticleInput, SourceConfig, SourceKind};
use serde::Serialize;

use crate::client::SourceClient;
use crate::payload::fetch_source;

/// Outcome of one source in an aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub kind: SourceKind,
    pub ok: bool,
    pub count: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateResult {
    /// Union of all successful sources, in source order.
    pub articles: Vec<ArticleInput>,
    pub reports: Vec<SourceReport>,
}

impl AggregateResult {
    #[must_use]
    pub fn failed_sources(&self) -> usize {
        self.reports.iter().filter(|r| !r.ok).count()
    }
}

/// Runs every source concurrently and waits for all of them to settle.
///
/// A failing source contributes zero articles and a failed report; it never
/// cancels or fails the others.
pub async fn aggregate(
    client: &SourceClient,
    sources: &[SourceConfig],
    limit_per_source: usize,
) -> AggregateResult {
    let fetches = sources.iter().map(|source| async move {
        let result = fetch_source(client, source, limit_per_source).await;
        (source, result)
    });
    let settled = futures::future::join_all(fetches).await;

    let mut aggregate = AggregateResult::default();
    for (source, result) in settled {
        match result {
            Ok(articles) => {
                tracing::debug!(
                    source = %source.name,
                    count = articles.len(),
                    "collected source articles"
                );
                aggregate.reports.push(SourceReport {
                    name: source.name.clone(),
                    kind: source.kind,
                    ok: true,
                    count: articles.len(),
                    error: None,
                });
                aggregate.articles.extend(articles);
            }
            Err(e) => {
                tracing::warn!(
                    source = %source.name,
                    error = %e,
                    "source fetch failed"
                );
                aggregate.reports.push(SourceReport {
                    name: source.name.clone(),
                    kind: source.kind,
                    ok: false,
                    count: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    tracing::info!(
        sources = aggregate.reports.len(),
        failed = aggregate.failed_sources(),
        articles = aggregate.articles.len(),
        "aggregation complete"
    );
    aggregate
}
