use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings for the external generative-text translation service.
#[derive(Clone)]
pub struct TranslationSettings {
    /// `None` means translation work cannot run; callers treat that as a
    /// configuration error before any per-item work starts.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub target_language: String,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub cache_path: PathBuf,
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for TranslationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("target_language", &self.target_language)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("cache_path", &self.cache_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub sources_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub translation: TranslationSettings,
    pub pipeline_cron: String,
    pub pipeline_per_source_limit: usize,
    pub pipeline_translate_limit: usize,
    pub pipeline_delay_ms: u64,
    pub pipeline_budget_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("translation", &self.translation)
            .field("pipeline_cron", &self.pipeline_cron)
            .field("pipeline_per_source_limit", &self.pipeline_per_source_limit)
            .field("pipeline_translate_limit", &self.pipeline_translate_limit)
            .field("pipeline_delay_ms", &self.pipeline_delay_ms)
            .field("pipeline_budget_secs", &self.pipeline_budget_secs)
            .finish()
    }
}
