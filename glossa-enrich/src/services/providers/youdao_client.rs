//! Youdao translation client (salted SHA-256 v3 signature)

use super::{http_client, rate_limiter, require, ProviderError, TranslationProvider};
use crate::models::ProviderTranslation;
use async_trait::async_trait;
use glossa_common::config::YoudaoConfig;
use governor::DefaultDirectRateLimiter;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct YoudaoResponse {
    #[serde(rename = "errorCode")]
    error_code: String,
    #[serde(default)]
    translation: Vec<String>,
    basic: Option<YoudaoBasic>,
}

#[derive(Debug, Deserialize)]
struct YoudaoBasic {
    phonetic: Option<String>,
    #[serde(rename = "us-phonetic")]
    us_phonetic: Option<String>,
    #[serde(default)]
    explains: Vec<String>,
}

/// Provider B
pub struct YoudaoClient {
    http: reqwest::Client,
    limiter: DefaultDirectRateLimiter,
    endpoint: String,
    app_key: String,
    app_secret: String,
}

impl YoudaoClient {
    pub fn new(config: &YoudaoConfig, timeout: Duration) -> Result<Self, ProviderError> {
        require("providers.youdao.app_key", &config.app_key)?;
        require("providers.youdao.app_secret", &config.app_secret)?;

        Ok(Self {
            http: http_client(timeout)?,
            limiter: rate_limiter(config.qps),
            endpoint: config.endpoint.clone(),
            app_key: config.app_key.clone(),
            app_secret: config.app_secret.clone(),
        })
    }

    fn map_error_code(code: &str) -> ProviderError {
        let body = format!("errorCode {}", code);
        match code {
            // invalid app key, bad signature, account overdue
            "108" | "202" | "401" => ProviderError::Auth(body),
            // access frequency limited
            "411" | "412" => ProviderError::Status { status: 429, body },
            _ => ProviderError::Status { status: 400, body },
        }
    }
}

#[async_trait]
impl TranslationProvider for YoudaoClient {
    fn name(&self) -> &str {
        "youdao"
    }

    async fn translate(&self, word: &str) -> Result<ProviderTranslation, ProviderError> {
        self.limiter.until_ready().await;

        let salt = format!("{:016x}", rand::random::<u64>());
        let curtime = chrono::Utc::now().timestamp().to_string();
        let sign = sign(&self.app_key, word, &salt, &curtime, &self.app_secret);

        tracing::debug!(word = %word, "Querying Youdao");

        let response = self
            .http
            .post(&self.endpoint)
            .form(&[
                ("q", word),
                ("from", "en"),
                ("to", "zh-CHS"),
                ("appKey", self.app_key.as_str()),
                ("salt", salt.as_str()),
                ("sign", sign.as_str()),
                ("signType", "v3"),
                ("curtime", curtime.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let body: YoudaoResponse = response.json().await?;
        if body.error_code != "0" {
            return Err(Self::map_error_code(&body.error_code));
        }

        // A success without a translation array still counts as an (empty) answer
        let translation =
            body.translation.first().map(|t| t.trim().to_string()).unwrap_or_default();
        let mut result = ProviderTranslation::new(word, translation, self.name());

        if let Some(basic) = body.basic {
            result.phonetic = basic.us_phonetic.or(basic.phonetic).filter(|p| !p.is_empty());
            result.part_of_speech = basic.explains.first().and_then(|e| part_of_speech(e));
        }

        Ok(result)
    }
}

/// v3 signature: sha256(appKey + input + salt + curtime + appSecret)
pub(crate) fn sign(
    app_key: &str,
    query: &str,
    salt: &str,
    curtime: &str,
    app_secret: &str,
) -> String {
    let input = format!("{}{}{}{}{}", app_key, truncate(query), salt, curtime, app_secret);
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)
}

/// Queries over 20 chars are signed as first 10 + length + last 10
fn truncate(query: &str) -> String {
    let chars: Vec<char> = query.chars().collect();
    if chars.len() <= 20 {
        return query.to_string();
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 10..].iter().collect();
    format!("{}{}{}", head, chars.len(), tail)
}

/// "n. 猫；猫科动物" → "n."
fn part_of_speech(explain: &str) -> Option<String> {
    let (tag, _) = explain.split_once(' ')?;
    let is_tag = tag.ends_with('.')
        && tag.len() <= 6
        && tag.trim_end_matches('.').chars().all(|c| c.is_ascii_alphabetic());
    is_tag.then(|| tag.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_and_long() {
        assert_eq!(truncate("cat"), "cat");
        assert_eq!(truncate("abcdefghijklmnopqrst"), "abcdefghijklmnopqrst");
        assert_eq!(truncate("abcdefghijklmnopqrstuvwxyz"), "abcdefghij26qrstuvwxyz");
    }

    #[test]
    fn test_sign_is_lowercase_sha256_hex() {
        let s = sign("key", "cat", "salt", "1700000000", "secret");
        assert_eq!(s.len(), 64);
        assert_eq!(s, s.to_lowercase());
        assert_eq!(s, sign("key", "cat", "salt", "1700000000", "secret"));
        assert_ne!(s, sign("key", "cat", "pepper", "1700000000", "secret"));
    }

    #[test]
    fn test_part_of_speech_extraction() {
        assert_eq!(part_of_speech("n. 猫；猫科动物").as_deref(), Some("n."));
        assert_eq!(part_of_speech("adj. 复杂的").as_deref(), Some("adj."));
        assert_eq!(part_of_speech("猫"), None);
        assert_eq!(part_of_speech("【名】 猫"), None);
    }

    #[test]
    fn test_error_code_mapping() {
        assert!(matches!(YoudaoClient::map_error_code("202"), ProviderError::Auth(_)));
        assert!(YoudaoClient::map_error_code("411").is_retryable());
        assert!(!YoudaoClient::map_error_code("113").is_retryable());
    }

    #[test]
    fn test_new_rejects_blank_secret() {
        let config = YoudaoConfig {
            app_key: "key".to_string(),
            ..YoudaoConfig::default()
        };
        assert!(YoudaoClient::new(&config, Duration::from_secs(1)).is_err());
    }
}
