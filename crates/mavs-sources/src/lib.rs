//! Source adapters, aggregation and deduplication for the news pipeline.
//!
//! Each configured source is fetched as a [`RawPayload`] matching its
//! [`SourceFormat`](mavs_core::SourceFormat) and parsed through
//! [`ParseToArticle`] into [`ArticleInput`](mavs_core::ArticleInput)s.
//! [`aggregate`] fans out over all sources concurrently and isolates
//! per-source failures.

mod adapters;
pub mod aggregate;
pub mod client;
pub mod dedup;
pub mod error;
pub mod payload;
pub mod text;

pub use aggregate::{aggregate, AggregateResult, SourceReport};
pub use client::SourceClient;
pub use dedup::{collect_latest, dedupe_by_identifier, dedupe_by_title, normalize_title, rank_latest};
pub use error::SourceError;
pub use payload::{
    fetch_payload, fetch_source, FeedPayload, HtmlPage, HtmlPayload, JsonApiPayload, ParseContext,
    ParseToArticle, RawPayload,
};
pub use text::{clean_text, strip_html};
