//! Translation provider clients and the ordered fallback chain
//!
//! Each provider signs its own requests and owns its own rate limiter. The
//! chain tries them in priority order for one word and returns the first
//! success; a failure of every provider fails only that word.

pub mod lexicon_client;
pub mod tencent_client;
pub mod youdao_client;

pub use lexicon_client::LexiconClient;
pub use tencent_client::TencentClient;
pub use youdao_client::YoudaoClient;

use crate::models::ProviderTranslation;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("glossa-enrich/", env!("CARGO_PKG_VERSION"));

/// Provider call errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Map a non-2xx response onto the error taxonomy
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ProviderError::Auth(body),
            _ => ProviderError::Status { status, body },
        }
    }

    /// Timeouts, network failures, 5xx and 429 are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_) | ProviderError::Timeout(_) => true,
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Malformed(_) | ProviderError::Auth(_) | ProviderError::Config(_) => {
                false
            }
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// One external translation service
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Short name used in logs and on results
    fn name(&self) -> &str;

    async fn translate(&self, word: &str) -> Result<ProviderTranslation, ProviderError>;
}

/// One provider's failure inside a chain pass
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ProviderError,
}

/// Every provider in the chain failed for a word
#[derive(Debug)]
pub struct ChainError {
    pub word: String,
    pub failures: Vec<ProviderFailure>,
}

impl ChainError {
    /// Worth retrying the chain if any provider failed transiently
    pub fn is_retryable(&self) -> bool {
        self.failures.iter().any(|f| f.error.is_retryable())
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "no translation providers configured for '{}'", self.word);
        }
        write!(f, "all providers failed for '{}'", self.word)?;
        for failure in &self.failures {
            write!(f, "; {}: {}", failure.provider, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ChainError {}

/// Ordered provider list: first success wins
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn TranslationProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn TranslationProvider>>) -> Self {
        Self { providers }
    }

    pub fn push(&mut self, provider: Arc<dyn TranslationProvider>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Translate one word, falling through to the next provider on any error.
    ///
    /// Every provider call is bounded by `timeout`; a timeout counts as a
    /// retryable failure of that provider.
    pub async fn translate(
        &self,
        word: &str,
        timeout: Duration,
    ) -> Result<ProviderTranslation, ChainError> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            let result = match tokio::time::timeout(timeout, provider.translate(word)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(timeout)),
            };

            match result {
                Ok(translation) => {
                    debug!(provider = provider.name(), word = %word, "Provider translated word");
                    return Ok(translation);
                }
                Err(error) => {
                    warn!(
                        provider = provider.name(),
                        word = %word,
                        error = %error,
                        retryable = error.is_retryable(),
                        "Provider failed, trying next in chain"
                    );
                    failures.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        error,
                    });
                }
            }
        }

        Err(ChainError {
            word: word.to_string(),
            failures,
        })
    }
}

/// Direct token-bucket limiter allowing `qps` requests per second (minimum 1)
pub(crate) fn rate_limiter(qps: u32) -> DefaultDirectRateLimiter {
    let qps = NonZeroU32::new(qps).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(qps))
}

/// Shared HTTP client settings for provider calls
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Reject blank credentials at construction time
pub(crate) fn require(field: &str, value: &str) -> Result<(), ProviderError> {
    if glossa_common::config::is_valid_key(value) {
        Ok(())
    } else {
        Err(ProviderError::Config(format!("{} is missing or blank", field)))
    }
}
