use axum::{
    extract::{Query, State},
    Extension, Json,
};
use mavs_core::ArticleInput;
use mavs_sources::{aggregate, collect_latest, SourceReport};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiResponse, AppState};

const DEFAULT_NEWS_LIMIT: usize = 20;
const MAX_NEWS_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub(super) struct LatestNewsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct LatestNews {
    articles: Vec<ArticleInput>,
    sources: Vec<SourceReport>,
}

/// Live feed straight from the sources: title dedup, newest first.
///
/// Nothing is persisted. Failing sources show up in `sources` with
/// `ok: false`; the response itself always succeeds.
pub(super) async fn latest_news(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LatestNewsQuery>,
) -> Json<ApiResponse<LatestNews>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_NEWS_LIMIT)
        .clamp(1, MAX_NEWS_LIMIT);

    let result = aggregate(
        state.pipeline.client(),
        state.pipeline.sources(),
        state.options.per_source_limit,
    )
    .await;

    ApiResponse::new(
        req_id.0,
        LatestNews {
            articles: collect_latest(result.articles, limit),
            sources: result.reports,
        },
    )
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app, send, unreachable_pool};
    use crate::middleware::AuthState;
    use axum::body::Body;
    use axum::http::Request;
    use mavs_core::{SourceConfig, SourceFormat, SourceKind};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<rss version="2.0"><channel>
        <item><title>Mavs beat Suns</title><link>https://a.example.com/1</link>
              <pubDate>Sat, 02 Nov 2024 03:00:00 GMT</pubDate></item>
        <item><title>Kyrie scores 30</title><link>https://a.example.com/2</link>
              <pubDate>Sat, 02 Nov 2024 05:00:00 GMT</pubDate></item>
      </channel></rss>"#;

    const JSON_API: &str = r#"{"articles": [
        {"headline": "Mavs Beat Suns!", "published": "2024-11-02T04:00:00Z",
         "links": {"web": {"href": "https://b.example.com/9"}}}
      ]}"#;

    fn source(name: &str, kind: SourceKind, url: String, format: SourceFormat) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            kind,
            url,
            format,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn latest_news_dedupes_titles_and_reports_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_string(JSON_API))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let sources = vec![
            source(
                "google-news",
                SourceKind::GoogleNews,
                format!("{}/feed", server.uri()),
                SourceFormat::Feed,
            ),
            source(
                "espn",
                SourceKind::Espn,
                format!("{}/api", server.uri()),
                SourceFormat::JsonApi,
            ),
            source(
                "mavs-moneyball",
                SourceKind::SbNation,
                format!("{}/down", server.uri()),
                SourceFormat::Feed,
            ),
        ];
        let app = app(unreachable_pool(), sources, None, AuthState::disabled());

        let (status, json) = send(
            app,
            Request::builder()
                .uri("/api/v1/news/latest?limit=10")
                .body(Body::empty())
                .expect("request"),
        )
        .await;

        assert_eq!(status, 200);
        let titles: Vec<&str> = json["data"]["articles"]
            .as_array()
            .expect("articles")
            .iter()
            .filter_map(|a| a["title"].as_str())
            .collect();
        assert_eq!(titles, vec!["Kyrie scores 30", "Mavs beat Suns"]);

        let reports = json["data"]["sources"].as_array().expect("sources");
        assert_eq!(reports.len(), 3);
        let down = reports
            .iter()
            .find(|r| r["name"] == "mavs-moneyball")
            .expect("report");
        assert_eq!(down["ok"], false);
        assert_eq!(down["count"], 0);
    }
}
