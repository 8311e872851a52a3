use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation API key is not configured (set TRANSLATION_API_KEY)")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429 from the translation service.
    #[error("rate limited by translation service (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-2xx status.
    #[error("translation service returned HTTP {status}: {message}")]
    Service { status: u16, message: String },

    #[error("unexpected translation response: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("translation service returned no text")]
    EmptyResponse,

    #[error("still rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("translation failed after {attempts} attempts: {last_error}")]
    ServiceErrorExhausted { attempts: u32, last_error: String },

    #[error("translation cache I/O error at {path}: {source}")]
    CacheIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("translation cache snapshot is corrupt: {0}")]
    CacheFormat(#[source] serde_json::Error),
}

impl TranslateError {
    /// Terminal for this call only; the item stays eligible for a later pass.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            TranslateError::RateLimitExhausted { .. } | TranslateError::ServiceErrorExhausted { .. }
        )
    }
}
