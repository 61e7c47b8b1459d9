//! Tencent Machine Translation client (TC3-HMAC-SHA256 signed)

use super::{http_client, rate_limiter, require, ProviderError, TranslationProvider};
use crate::models::ProviderTranslation;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use glossa_common::config::TencentConfig;
use governor::DefaultDirectRateLimiter;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "tmt";
const ACTION: &str = "TextTranslate";
const API_VERSION: &str = "2018-03-21";
const ALGORITHM: &str = "TC3-HMAC-SHA256";
const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const SIGNED_HEADERS: &str = "content-type;host;x-tc-action";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TextTranslateRequest<'a> {
    source_text: &'a str,
    source: &'a str,
    target: &'a str,
    project_id: i64,
}

#[derive(Debug, Deserialize)]
struct TencentEnvelope {
    #[serde(rename = "Response")]
    response: TencentResponse,
}

#[derive(Debug, Deserialize)]
struct TencentResponse {
    #[serde(rename = "TargetText")]
    target_text: Option<String>,
    #[serde(rename = "Error")]
    error: Option<TencentApiError>,
}

#[derive(Debug, Deserialize)]
struct TencentApiError {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: String,
}

/// Provider A
pub struct TencentClient {
    http: reqwest::Client,
    limiter: DefaultDirectRateLimiter,
    endpoint: String,
    host: String,
    region: String,
    secret_id: String,
    secret_key: String,
}

impl TencentClient {
    pub fn new(config: &TencentConfig, timeout: Duration) -> Result<Self, ProviderError> {
        require("providers.tencent.secret_id", &config.secret_id)?;
        require("providers.tencent.secret_key", &config.secret_key)?;

        let url = reqwest::Url::parse(&config.endpoint).map_err(|e| {
            ProviderError::Config(format!("Invalid Tencent endpoint '{}': {}", config.endpoint, e))
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| {
                ProviderError::Config(format!("Tencent endpoint '{}' has no host", config.endpoint))
            })?
            .to_string();

        Ok(Self {
            http: http_client(timeout)?,
            limiter: rate_limiter(config.qps),
            endpoint: config.endpoint.clone(),
            host,
            region: config.region.clone(),
            secret_id: config.secret_id.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn map_api_error(error: TencentApiError) -> ProviderError {
        let body = format!("{}: {}", error.code, error.message);
        if error.code.starts_with("AuthFailure")
            || error.code.starts_with("UnauthorizedOperation")
        {
            ProviderError::Auth(body)
        } else if error.code.starts_with("RequestLimitExceeded") {
            ProviderError::Status { status: 429, body }
        } else if error.code.starts_with("InternalError")
            || error.code.starts_with("ResourceUnavailable")
        {
            ProviderError::Status { status: 503, body }
        } else {
            ProviderError::Status { status: 400, body }
        }
    }
}

#[async_trait]
impl TranslationProvider for TencentClient {
    fn name(&self) -> &str {
        "tencent"
    }

    async fn translate(&self, word: &str) -> Result<ProviderTranslation, ProviderError> {
        self.limiter.until_ready().await;

        let payload = serde_json::to_string(&TextTranslateRequest {
            source_text: word,
            source: "en",
            target: "zh",
            project_id: 0,
        })
        .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let timestamp = Utc::now().timestamp();
        let authorization =
            sign_request(&self.secret_id, &self.secret_key, &self.host, &payload, timestamp)?;

        tracing::debug!(word = %word, host = %self.host, "Querying Tencent TMT");

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", authorization)
            .header("Content-Type", CONTENT_TYPE)
            .header("Host", &self.host)
            .header("X-TC-Action", ACTION)
            .header("X-TC-Version", API_VERSION)
            .header("X-TC-Timestamp", timestamp.to_string())
            .header("X-TC-Region", &self.region)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let envelope: TencentEnvelope = response.json().await?;
        if let Some(error) = envelope.response.error {
            return Err(Self::map_api_error(error));
        }

        let text = envelope
            .response
            .target_text
            .ok_or_else(|| ProviderError::Malformed("Response.TargetText missing".to_string()))?;

        Ok(ProviderTranslation::new(word, text.trim(), self.name()))
    }
}

/// Build the TC3-HMAC-SHA256 `Authorization` header for a TextTranslate POST
pub(crate) fn sign_request(
    secret_id: &str,
    secret_key: &str,
    host: &str,
    payload: &str,
    timestamp: i64,
) -> Result<String, ProviderError> {
    let date = Utc
        .timestamp_opt(timestamp, 0)
        .single()
        .ok_or_else(|| ProviderError::Config(format!("Invalid signing timestamp {}", timestamp)))?
        .format("%Y-%m-%d")
        .to_string();

    let canonical_request = format!(
        "POST\n/\n\ncontent-type:{}\nhost:{}\nx-tc-action:{}\n\n{}\n{}",
        CONTENT_TYPE,
        host,
        ACTION.to_lowercase(),
        SIGNED_HEADERS,
        hex::encode(Sha256::digest(payload.as_bytes()))
    );

    let credential_scope = format!("{}/{}/tc3_request", date, SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        timestamp,
        credential_scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let secret_date = hmac_sha256(format!("TC3{}", secret_key).as_bytes(), date.as_bytes())?;
    let secret_service = hmac_sha256(&secret_date, SERVICE.as_bytes())?;
    let secret_signing = hmac_sha256(&secret_service, b"tc3_request")?;
    let signature = hex::encode(hmac_sha256(&secret_signing, string_to_sign.as_bytes())?);

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, secret_id, credential_scope, SIGNED_HEADERS, signature
    ))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| ProviderError::Config(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TencentConfig {
        TencentConfig {
            secret_id: "AKIDtest".to_string(),
            secret_key: "secret".to_string(),
            ..TencentConfig::default()
        }
    }

    #[test]
    fn test_signature_shape() {
        // 2024-03-01T00:00:00Z
        let auth =
            sign_request("AKIDtest", "secret", "tmt.tencentcloudapi.com", "{}", 1_709_251_200)
                .unwrap();

        assert!(
            auth.starts_with("TC3-HMAC-SHA256 Credential=AKIDtest/2024-03-01/tmt/tc3_request, ")
        );
        assert!(auth.contains("SignedHeaders=content-type;host;x-tc-action, "));
        let signature = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_depends_on_payload_and_key() {
        let base = sign_request("id", "key", "host", "{\"a\":1}", 1_700_000_000).unwrap();
        assert_eq!(base, sign_request("id", "key", "host", "{\"a\":1}", 1_700_000_000).unwrap());
        assert_ne!(base, sign_request("id", "key", "host", "{\"a\":2}", 1_700_000_000).unwrap());
        assert_ne!(base, sign_request("id", "other", "host", "{\"a\":1}", 1_700_000_000).unwrap());
    }

    #[test]
    fn test_new_rejects_blank_credentials() {
        let mut blank = config();
        blank.secret_key = " ".to_string();
        assert!(matches!(
            TencentClient::new(&blank, Duration::from_secs(1)),
            Err(ProviderError::Config(_))
        ));
    }

    #[test]
    fn test_new_extracts_host() {
        let client = TencentClient::new(&config(), Duration::from_secs(1)).unwrap();
        assert_eq!(client.host, "tmt.tencentcloudapi.com");
    }

    #[test]
    fn test_api_error_mapping() {
        let err = |code: &str| {
            TencentClient::map_api_error(TencentApiError {
                code: code.to_string(),
                message: "m".to_string(),
            })
        };
        assert!(matches!(err("AuthFailure.SignatureFailure"), ProviderError::Auth(_)));
        assert!(err("RequestLimitExceeded").is_retryable());
        assert!(err("InternalError").is_retryable());
        assert!(!err("InvalidParameter").is_retryable());
    }
}
