//! End-to-end pipeline tests: wiremock sources and translation service,
//! in-memory article store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use mavs_core::{ArticleInput, SourceConfig, SourceFormat, SourceKind, TranslationSettings};
use mavs_db::{ArticleStore, MemoryArticleStore, UpsertOutcome};
use mavs_pipeline::{Pipeline, PipelineError, RunOptions};
use mavs_sources::SourceClient;
use mavs_translate::{TranslationCache, Translator};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/test-model:generateContent";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn settings(base_url: &str, max_attempts: u32) -> TranslationSettings {
    TranslationSettings {
        api_key: Some("test-key".to_string()),
        base_url: base_url.to_string(),
        model: "test-model".to_string(),
        target_language: "Korean".to_string(),
        max_attempts,
        backoff_base_ms: 0,
        cache_path: PathBuf::from("unused.json"),
        request_timeout_secs: 5,
    }
}

fn translator(server: &MockServer, max_attempts: u32) -> Arc<Translator> {
    Arc::new(
        Translator::new(
            &settings(&server.uri(), max_attempts),
            Arc::new(TranslationCache::in_memory()),
        )
        .expect("translator"),
    )
}

fn source_client() -> SourceClient {
    SourceClient::new(5, "mavs-test").expect("client")
}

fn source(name: &str, kind: SourceKind, url: String, format: SourceFormat) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        kind,
        url,
        format,
        enabled: true,
    }
}

fn options(translate_limit: usize) -> RunOptions {
    RunOptions {
        per_source_limit: 10,
        translate_limit,
        delay: Duration::ZERO,
        budget: None,
    }
}

fn reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "candidates": [ { "content": { "parts": [ { "text": text } ] } } ]
    }))
}

async fn seed_untranslated(store: &MemoryArticleStore, count: u32) {
    for i in 0..count {
        let published = Utc.with_ymd_and_hms(2024, 11, 1, i, 0, 0).unwrap();
        let input = ArticleInput::new(
            SourceKind::Espn,
            format!("https://espn.com/story/{i}"),
            format!("Story {i}"),
            published,
        );
        store.upsert_article(&input).await.expect("seed");
    }
}

async fn mount_sources(server: &MockServer) -> Vec<SourceConfig> {
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "articles": [ {
                "headline": "Mavs win big",
                "published": "2024-11-02T18:00:00Z",
                "links": { "web": { "href": "http://a/1" } }
            } ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<rss version="2.0"><channel>
                 <item><title>Mavs Win Big!</title><link>http://a/1</link></item>
               </channel></rss>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(502))
        .mount(server)
        .await;

    vec![
        source("espn", SourceKind::Espn, format!("{}/a", server.uri()), SourceFormat::JsonApi),
        source(
            "google-news",
            SourceKind::GoogleNews,
            format!("{}/b", server.uri()),
            SourceFormat::Feed,
        ),
        source(
            "mavs-moneyball",
            SourceKind::SbNation,
            format!("{}/c", server.uri()),
            SourceFormat::Feed,
        ),
    ]
}

// ---------------------------------------------------------------------------
// Crawl + upsert
// ---------------------------------------------------------------------------

#[tokio::test]
async fn same_identifier_from_two_sources_updates_one_article() {
    let server = MockServer::start().await;
    let sources = mount_sources(&server).await;

    let store = Arc::new(MemoryArticleStore::new());
    let earlier = ArticleInput::new(
        SourceKind::Espn,
        "http://a/1",
        "Mavs win big",
        Utc.with_ymd_and_hms(2024, 11, 2, 18, 0, 0).unwrap(),
    );
    assert_eq!(
        store.upsert_article(&earlier).await.unwrap(),
        UpsertOutcome::Created
    );

    let pipeline = Pipeline::new(Arc::clone(&store), source_client(), sources, None);
    let crawl = pipeline.crawl(10).await;

    assert_eq!(crawl.crawled, 2);
    assert_eq!(crawl.unique, 1);
    assert_eq!(crawl.upsert.saved, 0);
    assert_eq!(crawl.upsert.updated, 1);
    assert_eq!(store.len(), 1);
    assert!(store.get_by_source_identifier("http://a/1").is_some());
}

#[tokio::test]
async fn failing_source_is_reported_and_others_still_persist() {
    let server = MockServer::start().await;
    let sources = mount_sources(&server).await;

    let store = Arc::new(MemoryArticleStore::new());
    let pipeline = Pipeline::new(Arc::clone(&store), source_client(), sources, None);
    let crawl = pipeline.crawl(10).await;

    assert_eq!(crawl.sources.len(), 3);
    let failed = crawl
        .sources
        .iter()
        .find(|r| r.name == "mavs-moneyball")
        .expect("report");
    assert!(!failed.ok);
    assert_eq!(failed.count, 0);
    assert_eq!(crawl.upsert.saved, 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn recrawl_preserves_existing_translations() {
    let server = MockServer::start().await;
    let sources = mount_sources(&server).await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(reply("매버릭스 대승"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryArticleStore::new());
    let pipeline = Pipeline::new(
        Arc::clone(&store),
        source_client(),
        sources,
        Some(translator(&server, 1)),
    );

    let first = pipeline.run(&options(5)).await.expect("first run");
    assert_eq!(first.saved, 1);
    assert_eq!(first.translated, 1);

    let second = pipeline.run(&options(5)).await.expect("second run");
    assert_eq!(second.saved, 0);
    assert_eq!(second.updated, 1);
    assert_eq!(second.translated, 0);

    let row = store.get_by_source_identifier("http://a/1").unwrap();
    assert_eq!(row.title_translated.as_deref(), Some("매버릭스 대승"));
}

// ---------------------------------------------------------------------------
// Translation pass
// ---------------------------------------------------------------------------

#[tokio::test]
async fn translating_three_of_five_leaves_two_remaining() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(reply("번역된 제목"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryArticleStore::new());
    seed_untranslated(&store, 5).await;

    let pipeline = Pipeline::new(
        Arc::clone(&store),
        source_client(),
        vec![],
        Some(translator(&server, 3)),
    );
    let summary = pipeline
        .translate_pending(&options(3))
        .await
        .expect("translation pass");

    assert_eq!(summary.translated, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.remaining, 2);
    assert!(!summary.stopped_early);

    // Newest articles are translated first.
    let untranslated: Vec<_> = store
        .articles()
        .into_iter()
        .filter(|a| a.title_translated.is_none())
        .map(|a| a.title)
        .collect();
    assert_eq!(untranslated, vec!["Story 1", "Story 0"]);
}

#[tokio::test]
async fn exhausted_rate_limit_leaves_article_untranslated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryArticleStore::new());
    seed_untranslated(&store, 1).await;

    let pipeline = Pipeline::new(
        Arc::clone(&store),
        source_client(),
        vec![],
        Some(translator(&server, 2)),
    );
    let summary = pipeline.translate_pending(&options(5)).await.expect("pass");

    assert_eq!(summary.translated, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.remaining, 1);
    assert!(store.articles()[0].title_translated.is_none());
}

#[tokio::test]
async fn content_failure_keeps_title_translation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_string_contains("headline"))
        .respond_with(reply("제목"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_string_contains("article"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryArticleStore::new());
    let mut input = ArticleInput::new(
        SourceKind::SbNation,
        "https://www.mavsmoneyball.com/1",
        "Film study",
        Utc.with_ymd_and_hms(2024, 11, 2, 0, 0, 0).unwrap(),
    );
    input.content = Some("A long look at lineups.".to_string());
    store.upsert_article(&input).await.unwrap();

    let pipeline = Pipeline::new(
        Arc::clone(&store),
        source_client(),
        vec![],
        Some(translator(&server, 1)),
    );
    let summary = pipeline.translate_pending(&options(5)).await.expect("pass");

    assert_eq!(summary.translated, 1);
    assert_eq!(summary.remaining, 1);
    let row = store.articles().remove(0);
    assert_eq!(row.title_translated.as_deref(), Some("제목"));
    assert!(row.content_translated.is_none());
}

#[tokio::test]
async fn exhausted_budget_stops_before_next_article() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(reply("번역"))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryArticleStore::new());
    seed_untranslated(&store, 3).await;

    let pipeline = Pipeline::new(
        Arc::clone(&store),
        source_client(),
        vec![],
        Some(translator(&server, 1)),
    );
    let opts = RunOptions {
        budget: Some(Duration::ZERO),
        ..options(3)
    };
    let summary = pipeline.translate_pending(&opts).await.expect("pass");

    assert!(summary.stopped_early);
    assert_eq!(summary.translated, 0);
    assert_eq!(summary.remaining, 3);
}

#[tokio::test]
async fn slow_translation_is_cut_off_by_the_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(reply("번역").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryArticleStore::new());
    seed_untranslated(&store, 2).await;

    let pipeline = Pipeline::new(
        Arc::clone(&store),
        source_client(),
        vec![],
        Some(translator(&server, 1)),
    );
    let opts = RunOptions {
        budget: Some(Duration::from_millis(200)),
        ..options(2)
    };
    let started = std::time::Instant::now();
    let summary = pipeline.translate_pending(&opts).await.expect("pass");

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(summary.stopped_early);
    assert_eq!(summary.translated, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.remaining, 2);
}

#[tokio::test]
async fn failing_article_does_not_block_older_ones() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_string_contains("Broken"))
        .respond_with(ResponseTemplate::new(400))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(reply("번역"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryArticleStore::new());
    seed_untranslated(&store, 2).await;
    let broken = ArticleInput::new(
        SourceKind::Espn,
        "https://espn.com/story/broken",
        "Broken story",
        Utc.with_ymd_and_hms(2024, 11, 2, 0, 0, 0).unwrap(),
    );
    store.upsert_article(&broken).await.unwrap();

    let pipeline = Pipeline::new(
        Arc::clone(&store),
        source_client(),
        vec![],
        Some(translator(&server, 1)),
    );

    let first = pipeline.translate_pending(&options(1)).await.expect("first pass");
    assert_eq!(first.failed, 1);
    assert_eq!(first.translated, 0);

    for _ in 0..2 {
        let pass = pipeline.translate_pending(&options(1)).await.expect("pass");
        assert_eq!(pass.translated, 1);
    }

    let still_pending: Vec<_> = store
        .articles()
        .into_iter()
        .filter(|a| a.title_translated.is_none())
        .collect();
    assert_eq!(still_pending.len(), 1);
    assert_eq!(still_pending[0].title, "Broken story");
    assert_eq!(still_pending[0].translation_attempts, 1);
}

#[tokio::test]
async fn content_failure_does_not_starve_untranslated_titles() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_string_contains("headline"))
        .respond_with(reply("제목"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_string_contains("article"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryArticleStore::new());
    seed_untranslated(&store, 1).await;
    let mut oversized = ArticleInput::new(
        SourceKind::SbNation,
        "https://www.mavsmoneyball.com/1",
        "Film study",
        Utc.with_ymd_and_hms(2024, 11, 2, 0, 0, 0).unwrap(),
    );
    oversized.content = Some("A very long look at lineups.".to_string());
    store.upsert_article(&oversized).await.unwrap();

    let pipeline = Pipeline::new(
        Arc::clone(&store),
        source_client(),
        vec![],
        Some(translator(&server, 1)),
    );
    for _ in 0..3 {
        pipeline.translate_pending(&options(1)).await.expect("pass");
    }

    let older = store
        .get_by_source_identifier("https://espn.com/story/0")
        .expect("older article");
    assert_eq!(older.title_translated.as_deref(), Some("제목"));
    let newest = store
        .get_by_source_identifier("https://www.mavsmoneyball.com/1")
        .expect("newest article");
    assert!(newest.content_translated.is_none());
    assert!(newest.translation_attempts >= 1);
}

#[tokio::test]
async fn missing_translator_fails_before_any_work() {
    let server = MockServer::start().await;
    let sources = mount_sources(&server).await;

    let store = Arc::new(MemoryArticleStore::new());
    let pipeline = Pipeline::new(Arc::clone(&store), source_client(), sources, None);
    let err = pipeline.run(&options(3)).await.unwrap_err();

    assert!(matches!(err, PipelineError::MissingApiKey));
    assert!(store.is_empty());
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}
