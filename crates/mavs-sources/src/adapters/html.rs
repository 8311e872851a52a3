//! Scraped HTML: a listing page whose links lead to article pages.

use std::collections::HashSet;

use mavs_core::{parse_published_at, ArticleInput};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::error::SourceError;
use crate::payload::{HtmlPage, HtmlPayload, ParseContext, ParseToArticle};
use crate::text::{clean_text, is_http_url, non_empty};

fn parse_selector(raw: &str) -> Result<Selector, SourceError> {
    Selector::parse(raw).map_err(|e| SourceError::Selector {
        selector: raw.to_string(),
        reason: e.to_string(),
    })
}

fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// First non-empty `attr` of an element matching one of `selectors`.
fn first_attr(doc: &Html, selectors: &[&str], attr: &str) -> Option<String> {
    selectors.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        doc.select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(clean_text)
            .find(|v| !v.is_empty())
    })
}

/// First non-empty text of an element matching one of `selectors`.
fn first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        doc.select(&selector).map(element_text).find(|t| !t.is_empty())
    })
}

/// Collects up to `limit` distinct absolute article links from a listing page.
///
/// # Errors
///
/// Returns [`SourceError::Selector`] if `link_selector` is not valid CSS.
pub(crate) fn extract_links(
    listing_html: &str,
    base_url: &str,
    link_selector: &str,
    limit: usize,
) -> Result<Vec<String>, SourceError> {
    let selector = parse_selector(link_selector)?;
    let base = Url::parse(base_url).ok();
    let doc = Html::parse_document(listing_html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for el in doc.select(&selector) {
        if links.len() >= limit {
            break;
        }
        let Some(href) = el.value().attr("href").map(str::trim) else {
            continue;
        };
        let resolved = match &base {
            Some(base) => base.join(href).ok(),
            None => Url::parse(href).ok(),
        };
        let Some(mut url) = resolved else {
            continue;
        };
        url.set_fragment(None);
        let url = url.to_string();
        if is_http_url(&url) && seen.insert(url.clone()) {
            links.push(url);
        }
    }
    Ok(links)
}

/// Body text from the first content selector that yields at least
/// `min_len` characters.
fn extract_content(doc: &Html, selectors: &[Selector], min_len: usize) -> Option<String> {
    selectors.iter().find_map(|selector| {
        let text = clean_text(
            &doc.select(selector)
                .map(element_text)
                .collect::<Vec<_>>()
                .join(" "),
        );
        (!text.is_empty() && text.chars().count() >= min_len).then_some(text)
    })
}

fn parse_page(
    page: &HtmlPage,
    content_selectors: &[Selector],
    min_content_len: usize,
    ctx: &ParseContext,
) -> Option<ArticleInput> {
    let doc = Html::parse_document(&page.body);

    let title = first_attr(&doc, &["meta[property='og:title']"], "content")
        .or_else(|| first_text(&doc, &["h1", "title"]))?;

    let published = first_attr(&doc, &["meta[property='article:published_time']"], "content")
        .or_else(|| first_attr(&doc, &["time[datetime]"], "datetime"));

    let mut article = ArticleInput::new(
        ctx.kind,
        page.url.clone(),
        title,
        parse_published_at(published.as_deref(), ctx.fetched_at),
    );
    article.content = extract_content(&doc, content_selectors, min_content_len);
    article.summary = first_attr(
        &doc,
        &["meta[name='description']", "meta[property='og:description']"],
        "content",
    )
    .and_then(non_empty);
    article.author = first_attr(&doc, &["meta[name='author']"], "content");
    article.image_url =
        first_attr(&doc, &["meta[property='og:image']"], "content").filter(|u| is_http_url(u));
    Some(article)
}

impl ParseToArticle for HtmlPayload {
    fn parse_to_articles(&self, ctx: &ParseContext) -> Result<Vec<ArticleInput>, SourceError> {
        let content_selectors = self
            .selectors
            .content_selectors
            .iter()
            .map(|raw| parse_selector(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let mut articles = Vec::new();
        for page in &self.pages {
            if articles.len() >= ctx.limit {
                break;
            }
            match parse_page(page, &content_selectors, self.selectors.min_content_len, ctx) {
                Some(article) => articles.push(article),
                None => {
                    tracing::debug!(source = %ctx.kind, url = %page.url, "html: skipping page without title");
                }
            }
        }
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mavs_core::{HtmlSelectors, SourceKind};

    fn ctx() -> ParseContext {
        ParseContext {
            kind: SourceKind::MavsCom,
            limit: 10,
            fetched_at: Utc.with_ymd_and_hms(2024, 11, 3, 0, 0, 0).unwrap(),
        }
    }

    const LISTING: &str = r##"<html><body>
      <a href="/mavericks/news/game-recap-1">Recap</a>
      <a href="/mavericks/news/game-recap-1#comments">Recap comments</a>
      <a href="https://www.nba.com/mavericks/news/injury-report">Injuries</a>
      <a href="/mavericks/tickets">Tickets</a>
      <a>no href</a>
    </body></html>"##;

    fn article_page(body: &str) -> String {
        format!(
            r#"<html><head>
              <meta property="og:title" content="Mavs top Suns 114-108">
              <meta property="og:image" content="https://cdn.nba.com/recap.jpg">
              <meta name="description" content="Recap of the win.">
              <meta property="article:published_time" content="2024-11-02T23:00:00Z">
            </head><body><h1>Ignored heading</h1>{body}</body></html>"#
        )
    }

    fn selectors(min_content_len: usize) -> HtmlSelectors {
        HtmlSelectors {
            link_selector: "a[href*='/mavericks/news/']".to_string(),
            content_selectors: vec!["div.ArticleContent".to_string(), "article".to_string()],
            min_content_len,
        }
    }

    #[test]
    fn extract_links_resolves_dedupes_and_filters() {
        let links = extract_links(
            LISTING,
            "https://www.nba.com/mavericks/news",
            "a[href*='/mavericks/news/']",
            10,
        )
        .expect("links");
        assert_eq!(
            links,
            vec![
                "https://www.nba.com/mavericks/news/game-recap-1".to_string(),
                "https://www.nba.com/mavericks/news/injury-report".to_string(),
            ]
        );
    }

    #[test]
    fn extract_links_rejects_invalid_selector() {
        let err = extract_links(LISTING, "https://www.nba.com", "a[[", 10).unwrap_err();
        assert!(matches!(err, SourceError::Selector { .. }));
    }

    #[test]
    fn content_selectors_fall_through_until_long_enough() {
        let page = HtmlPage {
            url: "https://www.nba.com/mavericks/news/game-recap-1".to_string(),
            body: article_page(
                "<div class=\"ArticleContent\">Short.</div>\
                 <article><p>Dallas closed the game on a 12-2 run.</p><p>Doncic finished with 35.</p></article>",
            ),
        };
        let payload = HtmlPayload {
            pages: vec![page],
            selectors: selectors(30),
        };

        let articles = payload.parse_to_articles(&ctx()).expect("parse");
        assert_eq!(articles.len(), 1);
        let article = &articles[0];
        assert_eq!(article.title, "Mavs top Suns 114-108");
        assert_eq!(
            article.content.as_deref(),
            Some("Dallas closed the game on a 12-2 run. Doncic finished with 35.")
        );
        assert_eq!(article.summary.as_deref(), Some("Recap of the win."));
        assert_eq!(article.image_url.as_deref(), Some("https://cdn.nba.com/recap.jpg"));
        assert_eq!(
            article.published_at,
            Utc.with_ymd_and_hms(2024, 11, 2, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn content_is_omitted_when_no_selector_is_long_enough() {
        let payload = HtmlPayload {
            pages: vec![HtmlPage {
                url: "https://www.nba.com/mavericks/news/x".to_string(),
                body: article_page("<article>Too short</article>"),
            }],
            selectors: selectors(500),
        };
        let articles = payload.parse_to_articles(&ctx()).expect("parse");
        assert_eq!(articles.len(), 1);
        assert!(articles[0].content.is_none());
    }

    #[test]
    fn page_without_any_title_is_skipped() {
        let payload = HtmlPayload {
            pages: vec![HtmlPage {
                url: "https://www.nba.com/mavericks/news/x".to_string(),
                body: "<html><body><p>nothing</p></body></html>".to_string(),
            }],
            selectors: selectors(10),
        };
        let articles = payload.parse_to_articles(&ctx()).expect("parse");
        assert!(articles.is_empty());
    }
}
