//! Dictionary lookup client authenticated by an API key header

use super::{http_client, rate_limiter, require, ProviderError, TranslationProvider};
use crate::models::ProviderTranslation;
use async_trait::async_trait;
use glossa_common::config::LexiconConfig;
use governor::DefaultDirectRateLimiter;
use serde::Deserialize;
use std::time::Duration;

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LexiconEntry {
    translation: Option<String>,
    phonetic: Option<String>,
    part_of_speech: Option<String>,
}

/// Provider C
pub struct LexiconClient {
    http: reqwest::Client,
    limiter: DefaultDirectRateLimiter,
    endpoint: String,
    api_key: String,
}

impl LexiconClient {
    pub fn new(config: &LexiconConfig, timeout: Duration) -> Result<Self, ProviderError> {
        require("providers.lexicon.api_key", &config.api_key)?;

        Ok(Self {
            http: http_client(timeout)?,
            limiter: rate_limiter(config.qps),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl TranslationProvider for LexiconClient {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn translate(&self, word: &str) -> Result<ProviderTranslation, ProviderError> {
        self.limiter.until_ready().await;

        tracing::debug!(word = %word, "Querying lexicon");

        let response = self
            .http
            .get(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("word", word), ("target", "zh")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let entry: LexiconEntry = response.json().await?;
        let translation = entry
            .translation
            .ok_or_else(|| ProviderError::Malformed("translation field missing".to_string()))?;

        let mut result = ProviderTranslation::new(word, translation.trim(), self.name());
        result.phonetic = entry.phonetic.filter(|p| !p.is_empty());
        result.part_of_speech = entry.part_of_speech.filter(|p| !p.is_empty());
        Ok(result)
    }
}
