use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use mavs_core::{TranslationKind, TranslationSettings};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::cache::TranslationCache;
use crate::error::TranslateError;
use crate::prompt::{
    align_batch_response, batch_max_output_tokens, build_batch_prompt, build_prompt,
    max_output_tokens,
};
use crate::retry::{run_with_retry, RetryPolicy};

const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Client for the generative-text translation service.
///
/// Every call consults the shared [`TranslationCache`] first and writes
/// successful results back to it. Requests are retried per [`RetryPolicy`].
pub struct Translator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    target_language: String,
    policy: RetryPolicy,
    cache: Arc<TranslationCache>,
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("target_language", &self.target_language)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Translator {
    /// # Errors
    ///
    /// Returns [`TranslateError::MissingApiKey`] when no key is configured, or
    /// [`TranslateError::Http`] if the HTTP client cannot be built.
    pub fn new(
        settings: &TranslationSettings,
        cache: Arc<TranslationCache>,
    ) -> Result<Self, TranslateError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(TranslateError::MissingApiKey)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            target_language: settings.target_language.clone(),
            policy: RetryPolicy::from_settings(settings),
            cache,
        })
    }

    #[must_use]
    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    #[must_use]
    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Translates one field of an article.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::RateLimitExhausted`] or
    /// [`TranslateError::ServiceErrorExhausted`] once the retry policy gives up.
    pub async fn translate(&self, text: &str, kind: TranslationKind) -> Result<String, TranslateError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        if let Some(hit) = self.cache.get(text) {
            tracing::debug!(kind = %kind, "translation cache hit");
            return Ok(hit);
        }

        let prompt = build_prompt(kind, &self.target_language, text);
        let translated = run_with_retry(self.policy, |_attempt| {
            self.generate(&prompt, max_output_tokens(kind))
        })
        .await
        .into_result()?;

        self.cache.set(text, translated.clone());
        self.cache.flush_or_warn();
        Ok(translated)
    }

    /// Translates many short texts with one request.
    ///
    /// The result has the same length and order as `texts`. Any slot that is
    /// blank, cannot be aligned, or belongs to a failed request holds the
    /// original text.
    pub async fn translate_batch(&self, texts: &[String]) -> Vec<String> {
        let mut results: Vec<Option<String>> = texts
            .iter()
            .map(|t| {
                if t.trim().is_empty() {
                    Some(t.clone())
                } else {
                    self.cache.get(t)
                }
            })
            .collect();

        let mut seen = HashSet::new();
        let misses: Vec<&str> = texts
            .iter()
            .zip(&results)
            .filter(|(_, cached)| cached.is_none())
            .map(|(t, _)| t.as_str())
            .filter(|t| seen.insert(*t))
            .collect();

        if !misses.is_empty() {
            let prompt = build_batch_prompt(&self.target_language, &misses);
            let budget = batch_max_output_tokens(misses.len());
            let outcome = run_with_retry(self.policy, |_attempt| self.generate(&prompt, budget))
                .await
                .into_result();

            match outcome {
                Ok(response) => {
                    let slots = align_batch_response(&response, misses.len());
                    let aligned = slots.iter().filter(|s| s.is_some()).count();
                    if aligned < misses.len() {
                        tracing::warn!(
                            expected = misses.len(),
                            aligned,
                            "batch translation misaligned; using originals for missing slots"
                        );
                    }
                    for (source, translated) in misses.iter().zip(slots) {
                        if let Some(translated) = translated {
                            self.cache.set(*source, translated);
                        }
                    }
                    self.cache.flush_or_warn();
                }
                Err(e) => {
                    tracing::warn!(items = misses.len(), error = %e, "batch translation failed; returning originals");
                }
            }

            for (slot, text) in results.iter_mut().zip(texts) {
                if slot.is_none() {
                    *slot = self.cache.get(text);
                }
            }
        }

        results
            .into_iter()
            .zip(texts)
            .map(|(translated, original)| translated.unwrap_or_else(|| original.clone()))
            .collect()
    }

    /// One attempt against `models/{model}:generateContent`.
    async fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String, TranslateError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            return Err(TranslateError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslateError::Service {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let raw = response.text().await?;
        let parsed: GenerateResponse =
            serde_json::from_str(&raw).map_err(TranslateError::Deserialize)?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(TranslateError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
