//! RSS 2.0 and Atom feeds, walked with a single `quick-xml` event loop.

use mavs_core::{parse_published_at, ArticleInput};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::SourceError;
use crate::payload::{FeedPayload, ParseContext, ParseToArticle};
use crate::text::{is_http_url, non_empty, strip_html};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Summary,
    Content,
    Author,
    Published,
    Updated,
}

#[derive(Debug, Default)]
struct Entry {
    title: String,
    link: String,
    summary: String,
    content: String,
    author: String,
    published: String,
    updated: String,
    image: Option<String>,
}

impl Entry {
    fn buffer(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
            Field::Author => &mut self.author,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
        }
    }

    fn into_article(self, ctx: &ParseContext) -> Option<ArticleInput> {
        let title = strip_html(&self.title);
        let link = self.link.trim().to_string();
        if title.is_empty() || !is_http_url(&link) {
            return None;
        }

        let published = non_empty(self.published.trim().to_string())
            .or_else(|| non_empty(self.updated.trim().to_string()));
        let published_at = parse_published_at(published.as_deref(), ctx.fetched_at);

        let mut article = ArticleInput::new(ctx.kind, link, title, published_at);
        article.summary = non_empty(strip_html(&self.summary));
        article.content = non_empty(strip_html(&self.content));
        article.author = non_empty(strip_html(&self.author));
        article.image_url = self.image;
        Some(article)
    }
}

fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.trim().to_string())
}

/// Handles attributes carried by start and empty elements inside an entry.
///
/// Returns the text field the element opens, if any.
fn open_element(name: &str, e: &BytesStart<'_>, entry: &mut Entry, in_author: bool) -> Option<Field> {
    match name {
        "title" => Some(Field::Title),
        "link" => {
            // Atom: <link rel="alternate" href="..."/>; RSS: <link>text</link>.
            if let Some(href) = attr(e, "href") {
                let rel = attr(e, "rel").unwrap_or_else(|| "alternate".to_string());
                if rel == "alternate" && entry.link.is_empty() {
                    entry.link = href;
                }
                None
            } else {
                Some(Field::Link)
            }
        }
        "description" | "summary" => Some(Field::Summary),
        "content:encoded" | "content" => Some(Field::Content),
        "dc:creator" | "author" if !in_author => Some(Field::Author),
        "name" if in_author => Some(Field::Author),
        "pubDate" | "published" | "dc:date" => Some(Field::Published),
        "updated" => Some(Field::Updated),
        "media:content" | "media:thumbnail" | "enclosure" => {
            let is_image = attr(e, "type").is_none_or(|t| t.starts_with("image/"))
                && attr(e, "medium").is_none_or(|m| m == "image");
            if entry.image.is_none() && is_image {
                entry.image = attr(e, "url").filter(|u| is_http_url(u));
            }
            None
        }
        _ => None,
    }
}

fn is_markup_body(field: Option<Field>) -> bool {
    matches!(field, Some(Field::Summary | Field::Content))
}

impl ParseToArticle for FeedPayload {
    fn parse_to_articles(&self, ctx: &ParseContext) -> Result<Vec<ArticleInput>, SourceError> {
        if ctx.limit == 0 {
            return Ok(Vec::new());
        }

        let mut reader = Reader::from_str(&self.body);
        reader.config_mut().trim_text(true);

        let mut articles = Vec::new();
        let mut saw_root = false;
        let mut entry: Option<Entry> = None;
        let mut field: Option<Field> = None;
        // Elements open inside an xhtml summary or content body.
        let mut markup_depth = 0usize;
        let mut in_author = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    match name.as_str() {
                        "rss" | "feed" | "rdf:RDF" => saw_root = true,
                        "item" | "entry" => {
                            entry = Some(Entry::default());
                            field = None;
                            markup_depth = 0;
                            in_author = false;
                        }
                        _ if is_markup_body(field) => markup_depth += 1,
                        _ => {
                            if let Some(current) = entry.as_mut() {
                                field = open_element(&name, &e, current, in_author);
                                if name == "author" {
                                    in_author = true;
                                }
                            }
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    if is_markup_body(field) {
                        continue;
                    }
                    if let Some(current) = entry.as_mut() {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        open_element(&name, &e, current, in_author);
                    }
                }
                Ok(Event::Text(e)) => {
                    if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                        let text = e.unescape().unwrap_or_default();
                        let buffer = current.buffer(f);
                        if markup_depth > 0 && !buffer.is_empty() {
                            buffer.push(' ');
                        }
                        buffer.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                        current.buffer(f).push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Ok(Event::End(e)) => {
                    if markup_depth > 0 {
                        markup_depth -= 1;
                        continue;
                    }
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    match name.as_str() {
                        "item" | "entry" => {
                            if let Some(done) = entry.take() {
                                match done.into_article(ctx) {
                                    Some(article) => articles.push(article),
                                    None => {
                                        tracing::debug!(source = %ctx.kind, "feed: skipping entry without title or link");
                                    }
                                }
                            }
                            if articles.len() >= ctx.limit {
                                break;
                            }
                        }
                        "author" => {
                            in_author = false;
                            field = None;
                        }
                        _ => field = None,
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(SourceError::Xml(e)),
                _ => {}
            }
        }

        if !saw_root {
            return Err(SourceError::Payload {
                context: format!("{} feed", ctx.kind),
                reason: "document is neither RSS nor Atom".to_string(),
            });
        }

        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mavs_core::SourceKind;

    fn ctx(kind: SourceKind, limit: usize) -> ParseContext {
        ParseContext {
            kind,
            limit,
            fetched_at: Utc.with_ymd_and_hms(2024, 11, 3, 0, 0, 0).unwrap(),
        }
    }

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Dallas Mavericks - Google News</title>
    <item>
      <title>Mavs win big over Suns</title>
      <link>https://news.example.com/mavs-win-big</link>
      <pubDate>Sat, 02 Nov 2024 13:30:00 -0500</pubDate>
      <description><![CDATA[<a href="https://x">Mavs</a>&nbsp;roll past Phoenix]]></description>
      <dc:creator>Staff</dc:creator>
      <media:content url="https://img.example.com/1.jpg" medium="image"/>
    </item>
    <item>
      <title></title>
      <link>https://news.example.com/untitled</link>
    </item>
    <item>
      <title>Kidd on rotation &amp; minutes</title>
      <link>https://news.example.com/kidd</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Mavs Moneyball</title>
  <entry>
    <title>Film study: the new starting five</title>
    <link rel="alternate" type="text/html" href="https://www.mavsmoneyball.com/2024/11/2/film-study"/>
    <author><name>Josh Bowe</name></author>
    <updated>2024-11-02T20:00:00-05:00</updated>
    <published>2024-11-02T18:00:00-05:00</published>
    <content type="html">&lt;p&gt;A long look at lineups.&lt;/p&gt;</content>
  </entry>
  <entry>
    <title>Broken entry</title>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items_and_skips_untitled() {
        let payload = FeedPayload {
            body: RSS.to_string(),
        };
        let articles = payload
            .parse_to_articles(&ctx(SourceKind::GoogleNews, 10))
            .expect("parse");

        assert_eq!(articles.len(), 2);
        let first = &articles[0];
        assert_eq!(first.title, "Mavs win big over Suns");
        assert_eq!(first.source_identifier, "https://news.example.com/mavs-win-big");
        assert_eq!(first.summary.as_deref(), Some("Mavs roll past Phoenix"));
        assert_eq!(first.author.as_deref(), Some("Staff"));
        assert_eq!(first.image_url.as_deref(), Some("https://img.example.com/1.jpg"));
        assert_eq!(
            first.published_at,
            Utc.with_ymd_and_hms(2024, 11, 2, 18, 30, 0).unwrap()
        );
        assert_eq!(articles[1].title, "Kidd on rotation & minutes");
    }

    #[test]
    fn parses_atom_entries() {
        let payload = FeedPayload {
            body: ATOM.to_string(),
        };
        let articles = payload
            .parse_to_articles(&ctx(SourceKind::SbNation, 10))
            .expect("parse");

        assert_eq!(articles.len(), 1);
        let entry = &articles[0];
        assert_eq!(
            entry.source_identifier,
            "https://www.mavsmoneyball.com/2024/11/2/film-study"
        );
        assert_eq!(entry.author.as_deref(), Some("Josh Bowe"));
        assert_eq!(entry.content.as_deref(), Some("A long look at lineups."));
        assert_eq!(
            entry.published_at,
            Utc.with_ymd_and_hms(2024, 11, 2, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn atom_xhtml_bodies_keep_nested_text() {
        let body = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>Lineup notes</title>
    <link href="https://www.mavsmoneyball.com/2024/11/3/lineup-notes"/>
    <updated>2024-11-03T12:00:00Z</updated>
    <summary type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml">Short <em>take</em></div></summary>
    <content type="xhtml">
      <div xmlns="http://www.w3.org/1999/xhtml">
        <p>First paragraph.</p>
        <p>Second <b>bold</b> word.<br/></p>
        <img src="https://img.example.com/inline.jpg"/>
      </div>
    </content>
    <author><name>Staff</name></author>
  </entry>
</feed>"#;
        let payload = FeedPayload {
            body: body.to_string(),
        };
        let articles = payload
            .parse_to_articles(&ctx(SourceKind::SbNation, 10))
            .expect("parse");

        assert_eq!(articles.len(), 1);
        let entry = &articles[0];
        assert_eq!(entry.summary.as_deref(), Some("Short take"));
        assert_eq!(
            entry.content.as_deref(),
            Some("First paragraph. Second bold word.")
        );
        assert_eq!(entry.author.as_deref(), Some("Staff"));
        assert_eq!(
            entry.source_identifier,
            "https://www.mavsmoneyball.com/2024/11/3/lineup-notes"
        );
    }

    #[test]
    fn stops_at_limit() {
        let payload = FeedPayload {
            body: RSS.to_string(),
        };
        let articles = payload
            .parse_to_articles(&ctx(SourceKind::GoogleNews, 1))
            .expect("parse");
        assert_eq!(articles.len(), 1);
    }

    #[test]
    fn non_feed_document_is_a_source_error() {
        let payload = FeedPayload {
            body: "<html><body>blocked</body></html>".to_string(),
        };
        let err = payload
            .parse_to_articles(&ctx(SourceKind::GoogleNews, 10))
            .unwrap_err();
        assert!(matches!(err, SourceError::Payload { .. }));
    }
}
