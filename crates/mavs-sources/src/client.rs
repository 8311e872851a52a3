use std::time::Duration;

use reqwest::Client;

use crate::error::SourceError;

/// Shared outbound HTTP client for all source adapters.
#[derive(Debug, Clone)]
pub struct SourceClient {
    client: Client,
}

impl SourceClient {
    /// Creates a client with the configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// # Errors
    ///
    /// See [`SourceClient::new`].
    pub fn from_app_config(config: &mavs_core::AppConfig) -> Result<Self, SourceError> {
        Self::new(config.http_timeout_secs, &config.http_user_agent)
    }

    /// GETs `url` and returns the body as text.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Http`] on network or TLS failure.
    /// - [`SourceError::UnexpectedStatus`] for any non-2xx status.
    pub async fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}
