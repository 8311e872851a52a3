//! Machine translation for stored articles: a durable exact-text cache,
//! a bounded retry state machine, and a client for the generative-text
//! service with single and batch calls.

pub mod cache;
pub mod client;
pub mod error;
pub mod prompt;
pub mod retry;

pub use cache::TranslationCache;
pub use client::Translator;
pub use error::TranslateError;
pub use retry::{run_with_retry, RetryOutcome, RetryPolicy, MAX_RETRY_AFTER};
