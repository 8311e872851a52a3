use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The external sources the pipeline knows how to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// ESPN team news JSON API.
    Espn,
    /// Google News RSS search feed.
    GoogleNews,
    /// SB Nation team blog Atom feed.
    SbNation,
    /// Official team site, scraped HTML.
    MavsCom,
}

impl SourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Espn => "espn",
            SourceKind::GoogleNews => "google_news",
            SourceKind::SbNation => "sb_nation",
            SourceKind::MavsCom => "mavs_com",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "espn" => Ok(SourceKind::Espn),
            "google_news" => Ok(SourceKind::GoogleNews),
            "sb_nation" => Ok(SourceKind::SbNation),
            "mavs_com" => Ok(SourceKind::MavsCom),
            other => Err(format!("unknown source kind '{other}'")),
        }
    }
}

/// Which field of an article a translation request is for.
///
/// The kind selects the prompt and the output budget: content gets a much
/// larger budget than titles and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationKind {
    Title,
    Content,
    Summary,
}

impl TranslationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TranslationKind::Title => "title",
            TranslationKind::Content => "content",
            TranslationKind::Summary => "summary",
        }
    }
}

impl std::fmt::Display for TranslationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TranslationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(TranslationKind::Title),
            "content" => Ok(TranslationKind::Content),
            "summary" => Ok(TranslationKind::Summary),
            other => Err(format!("unknown translation kind '{other}'")),
        }
    }
}

/// A canonical article as produced by a source adapter, before persistence.
///
/// `source_identifier` is the external canonical URL and the dedup key at
/// persistence time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleInput {
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub source_kind: SourceKind,
    pub source_identifier: String,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl ArticleInput {
    /// Minimal input with only the required fields set.
    #[must_use]
    pub fn new(
        source_kind: SourceKind,
        source_identifier: impl Into<String>,
        title: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            content: None,
            summary: None,
            source_kind,
            source_identifier: source_identifier.into(),
            author: None,
            image_url: None,
            published_at,
        }
    }
}

/// Best-effort timestamp parsing for the formats sources actually emit.
///
/// Tries RFC 3339 (JSON APIs, Atom), RFC 2822 (RSS), a handful of naive
/// layouts interpreted as UTC, and a bare date. Anything else yields
/// `fallback`, normally the ingestion time.
#[must_use]
pub fn parse_published_at(raw: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return fallback;
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return dt.with_timezone(&Utc);
    }

    const NAIVE_LAYOUTS: [&str; 3] = ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return naive.and_utc();
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return midnight.and_utc();
    }

    fallback
}
