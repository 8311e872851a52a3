mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use mavs_pipeline::{Pipeline, RunOptions};
use mavs_sources::SourceClient;
use mavs_translate::{TranslateError, TranslationCache, Translator};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = mavs_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = mavs_db::PoolConfig::from_app_config(&config);
    let pool = mavs_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = mavs_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let sources = mavs_core::load_sources(&config.sources_path)?.enabled();
    tracing::info!(count = sources.len(), "sources loaded");

    let client = SourceClient::from_app_config(&config)?;
    let translator = build_translator(&config)?;
    let pipeline = Pipeline::new(pool.clone(), client, sources, translator);
    let state = AppState::new(pool, pipeline, RunOptions::from_app_config(&config));

    let _scheduler = scheduler::build_scheduler(state.clone(), &config.pipeline_cron).await?;

    let auth = AuthState::from_env(matches!(config.env, mavs_core::Environment::Development))?;
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// `None` when no API key is configured: the server still serves reads and
/// the live feed, and translation routes answer 503.
fn build_translator(config: &mavs_core::AppConfig) -> anyhow::Result<Option<Arc<Translator>>> {
    let cache = Arc::new(TranslationCache::open(config.translation.cache_path.clone()));
    match Translator::new(&config.translation, cache) {
        Ok(translator) => Ok(Some(Arc::new(translator))),
        Err(TranslateError::MissingApiKey) => {
            tracing::warn!("TRANSLATION_API_KEY not set; translation disabled");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
