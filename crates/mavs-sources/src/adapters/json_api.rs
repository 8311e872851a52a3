//! Team news JSON API (ESPN shape).

use mavs_core::{parse_published_at, ArticleInput};
use serde::Deserialize;

use crate::error::SourceError;
use crate::payload::{JsonApiPayload, ParseContext, ParseToArticle};
use crate::text::{clean_text, is_http_url, non_empty, strip_html};

/// Top-level response. Items stay untyped so one bad item cannot fail the
/// whole payload.
#[derive(Debug, Deserialize)]
struct NewsResponse {
    articles: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    headline: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    story: Option<String>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    byline: Option<String>,
    links: NewsLinks,
    #[serde(default)]
    images: Vec<NewsImage>,
}

#[derive(Debug, Deserialize)]
struct NewsLinks {
    web: NewsLink,
}

#[derive(Debug, Deserialize)]
struct NewsLink {
    href: String,
}

#[derive(Debug, Deserialize)]
struct NewsImage {
    #[serde(default)]
    url: Option<String>,
}

impl ParseToArticle for JsonApiPayload {
    fn parse_to_articles(&self, ctx: &ParseContext) -> Result<Vec<ArticleInput>, SourceError> {
        let response: NewsResponse =
            serde_json::from_str(&self.body).map_err(|source| SourceError::Deserialize {
                context: format!("{} news response", ctx.kind),
                source,
            })?;

        let mut articles = Vec::new();
        for (index, raw) in response.articles.into_iter().enumerate() {
            if articles.len() >= ctx.limit {
                break;
            }
            let item: NewsItem = match serde_json::from_value(raw) {
                Ok(item) => item,
                Err(e) => {
                    tracing::debug!(source = %ctx.kind, index, error = %e, "json_api: skipping malformed item");
                    continue;
                }
            };
            match to_article(item, ctx) {
                Some(article) => articles.push(article),
                None => {
                    tracing::debug!(source = %ctx.kind, index, "json_api: skipping item without title or link");
                }
            }
        }

        Ok(articles)
    }
}

fn to_article(item: NewsItem, ctx: &ParseContext) -> Option<ArticleInput> {
    let title = clean_text(&item.headline);
    let link = item.links.web.href.trim().to_string();
    if title.is_empty() || !is_http_url(&link) {
        return None;
    }

    let published_at = parse_published_at(item.published.as_deref(), ctx.fetched_at);
    let mut article = ArticleInput::new(ctx.kind, link, title, published_at);
    article.summary = item
        .description
        .map(|d| clean_text(&d))
        .and_then(non_empty);
    article.content = item.story.map(|s| strip_html(&s)).and_then(non_empty);
    article.author = item.byline.map(|b| clean_text(&b)).and_then(non_empty);
    article.image_url = item
        .images
        .into_iter()
        .filter_map(|i| i.url)
        .find(|u| is_http_url(u));
    Some(article)
}
