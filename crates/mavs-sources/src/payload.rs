//! Raw source payloads and the single parsing capability they share.
//!
//! A source's configured [`SourceFormat`] decides which payload variant is
//! fetched; each variant has its own [`ParseToArticle`] implementation in
//! `crate::adapters`.

use chrono::{DateTime, Utc};
use mavs_core::{ArticleInput, HtmlSelectors, SourceConfig, SourceFormat, SourceKind};

use crate::adapters::html::extract_links;
use crate::client::SourceClient;
use crate::error::SourceError;

/// Per-call parsing parameters.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext {
    pub kind: SourceKind,
    /// Maximum number of articles to return.
    pub limit: usize,
    /// Timestamp used when an item has no parseable publish time.
    pub fetched_at: DateTime<Utc>,
}

/// Turns a raw payload into canonical article inputs.
///
/// Implementations skip malformed items and only fail when the payload as a
/// whole cannot be interpreted.
pub trait ParseToArticle {
    /// # Errors
    ///
    /// Returns [`SourceError`] when the top-level payload is unusable.
    fn parse_to_articles(&self, ctx: &ParseContext) -> Result<Vec<ArticleInput>, SourceError>;
}

#[derive(Debug, Clone)]
pub struct JsonApiPayload {
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct FeedPayload {
    pub body: String,
}

/// One fetched article page of an HTML source.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    pub url: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct HtmlPayload {
    pub pages: Vec<HtmlPage>,
    pub selectors: HtmlSelectors,
}

#[derive(Debug, Clone)]
pub enum RawPayload {
    JsonApi(JsonApiPayload),
    Feed(FeedPayload),
    Html(HtmlPayload),
}

impl ParseToArticle for RawPayload {
    fn parse_to_articles(&self, ctx: &ParseContext) -> Result<Vec<ArticleInput>, SourceError> {
        match self {
            RawPayload::JsonApi(payload) => payload.parse_to_articles(ctx),
            RawPayload::Feed(payload) => payload.parse_to_articles(ctx),
            RawPayload::Html(payload) => payload.parse_to_articles(ctx),
        }
    }
}

/// Fetches the raw payload for one source.
///
/// HTML sources fetch the listing page, then each linked article page up to
/// `limit`. A failed article page is skipped; a failed listing page fails
/// the source.
///
/// # Errors
///
/// Returns [`SourceError`] if the primary document cannot be fetched or the
/// link selector is invalid.
pub async fn fetch_payload(
    client: &SourceClient,
    source: &SourceConfig,
    limit: usize,
) -> Result<RawPayload, SourceError> {
    match &source.format {
        SourceFormat::JsonApi => Ok(RawPayload::JsonApi(JsonApiPayload {
            body: client.fetch_text(&source.url).await?,
        })),
        SourceFormat::Feed => Ok(RawPayload::Feed(FeedPayload {
            body: client.fetch_text(&source.url).await?,
        })),
        SourceFormat::Html(selectors) => {
            let listing = client.fetch_text(&source.url).await?;
            let links = extract_links(&listing, &source.url, &selectors.link_selector, limit)?;

            let fetches = links.into_iter().map(|url| async move {
                let result = client.fetch_text(&url).await;
                (url, result)
            });
            let mut pages = Vec::new();
            for (url, result) in futures::future::join_all(fetches).await {
                match result {
                    Ok(body) => pages.push(HtmlPage { url, body }),
                    Err(e) => {
                        tracing::debug!(
                            source = %source.name,
                            url = %url,
                            error = %e,
                            "html: skipping article page"
                        );
                    }
                }
            }

            Ok(RawPayload::Html(HtmlPayload {
                pages,
                selectors: selectors.clone(),
            }))
        }
    }
}

/// Fetches and parses one source: the adapter contract `fetch(limit)`.
///
/// # Errors
///
/// Returns [`SourceError`] for a source-level fetch or parse failure.
pub async fn fetch_source(
    client: &SourceClient,
    source: &SourceConfig,
    limit: usize,
) -> Result<Vec<ArticleInput>, SourceError> {
    let payload = fetch_payload(client, source, limit).await?;
    let ctx = ParseContext {
        kind: source.kind,
        limit,
        fetched_at: Utc::now(),
    };
    payload.parse_to_articles(&ctx)
}
