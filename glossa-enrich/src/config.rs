//! Service configuration and wiring for glossa-enrich
//!
//! Resolution priority for every credential: ENV → TOML. CLI arguments
//! override the listen port and root folder.

use crate::db::SqliteWordStore;
use crate::models::BatchOptions;
use crate::services::providers::{LexiconClient, ProviderError, TencentClient, YoudaoClient};
use crate::services::{
    BatchOrchestrator, DifficultyClassifier, EnrichmentCoordinator, MemoryCache, ProviderChain,
    WordCache,
};
use glossa_common::config::{
    is_valid_key, load_toml_config, resolve_config_path, ProvidersConfig, TomlConfig,
};
use glossa_common::{Error, Result};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Command-line overrides applied on top of the file and environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub port: Option<u16>,
    pub root_folder: Option<PathBuf>,
}

/// Load, overlay and validate the service configuration.
///
/// # Errors
/// `Error::Config` when the file is unparsable or a credential is missing.
pub fn resolve_service_config(cli: &CliOverrides) -> Result<TomlConfig> {
    let path = resolve_config_path(cli.config.as_deref());
    let mut config = load_toml_config(path.as_deref())?;

    log_credential_sources(&config);
    config.apply_env_overrides();

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(root) = &cli.root_folder {
        config.root_folder = Some(root.clone());
    }

    config.validate()?;

    info!(
        providers = config.providers.configured_count(),
        database = %config.database_path().display(),
        "Configuration resolved"
    );
    Ok(config)
}

/// Report where each credential comes from; warn when ENV shadows TOML
fn log_credential_sources(config: &TomlConfig) {
    let tencent = config.providers.tencent.as_ref();
    let youdao = config.providers.youdao.as_ref();
    let lexicon = config.providers.lexicon.as_ref();
    let classifier = config.classifier.as_ref();

    let entries: [(&str, &str, Option<&str>); 6] = [
        (
            "tencent secret_id",
            "GLOSSA_TENCENT_SECRET_ID",
            tencent.map(|t| t.secret_id.as_str()),
        ),
        (
            "tencent secret_key",
            "GLOSSA_TENCENT_SECRET_KEY",
            tencent.map(|t| t.secret_key.as_str()),
        ),
        (
            "youdao app_key",
            "GLOSSA_YOUDAO_APP_KEY",
            youdao.map(|y| y.app_key.as_str()),
        ),
        (
            "youdao app_secret",
            "GLOSSA_YOUDAO_APP_SECRET",
            youdao.map(|y| y.app_secret.as_str()),
        ),
        (
            "lexicon api_key",
            "GLOSSA_LEXICON_API_KEY",
            lexicon.map(|l| l.api_key.as_str()),
        ),
        (
            "classifier api_key",
            "GLOSSA_CLASSIFIER_API_KEY",
            classifier.map(|c| c.api_key.as_str()),
        ),
    ];

    for (name, env_var, toml_value) in entries {
        let in_env = std::env::var(env_var).map(|v| is_valid_key(&v)).unwrap_or(false);
        let in_toml = toml_value.map(is_valid_key).unwrap_or(false);

        match (in_env, in_toml) {
            (true, true) => warn!(
                "{} found in environment and TOML. Using environment (highest priority).",
                name
            ),
            (true, false) => info!("{} loaded from environment variable {}", name, env_var),
            (false, true) => info!("{} loaded from TOML config", name),
            (false, false) => {}
        }
    }
}

/// Provider chain in fixed priority order: Tencent, Youdao, lexicon
pub fn build_provider_chain(config: &ProvidersConfig, timeout: Duration) -> Result<ProviderChain> {
    let mut chain = ProviderChain::default();
    let config_error = |e: ProviderError| Error::Config(e.to_string());

    if let Some(tencent) = &config.tencent {
        chain.push(Arc::new(TencentClient::new(tencent, timeout).map_err(config_error)?));
    }
    if let Some(youdao) = &config.youdao {
        chain.push(Arc::new(YoudaoClient::new(youdao, timeout).map_err(config_error)?));
    }
    if let Some(lexicon) = &config.lexicon {
        chain.push(Arc::new(LexiconClient::new(lexicon, timeout).map_err(config_error)?));
    }

    if chain.is_empty() {
        return Err(Error::Config("No translation provider configured".to_string()));
    }

    info!(providers = ?chain.names(), "Provider chain ready");
    Ok(chain)
}

/// LLM difficulty classifier from the `[classifier]` section
pub fn build_classifier(config: &TomlConfig) -> Result<DifficultyClassifier> {
    let section = config
        .classifier
        .as_ref()
        .ok_or_else(|| Error::Config("Difficulty classifier not configured".to_string()))?;

    DifficultyClassifier::from_config(section).map_err(|e| Error::Config(e.to_string()))
}

/// Wire the full enrichment pipeline over an open database pool
pub fn build_coordinator(config: &TomlConfig, pool: SqlitePool) -> Result<EnrichmentCoordinator> {
    let options = BatchOptions::from(config.batch.clone());
    let providers = build_provider_chain(&config.providers, options.timeout())?;
    let classifier = build_classifier(config)?;

    let cache = WordCache::new(
        Arc::new(MemoryCache::new(config.cache.capacity)),
        Duration::from_secs(config.cache.prequery_ttl_secs),
        Duration::from_secs(config.cache.translation_ttl_secs),
    );

    EnrichmentCoordinator::builder()
        .store(Arc::new(SqliteWordStore::new(pool)))
        .cache(cache)
        .orchestrator(BatchOrchestrator::new(providers, classifier, options))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_common::config::{ClassifierConfig, LexiconConfig, YoudaoConfig};

    fn configured() -> TomlConfig {
        let mut config = TomlConfig::default();
        config.providers.youdao = Some(YoudaoConfig {
            app_key: "key".to_string(),
            app_secret: "secret".to_string(),
            ..YoudaoConfig::default()
        });
        config.providers.lexicon = Some(LexiconConfig {
            api_key: "lex".to_string(),
            ..LexiconConfig::default()
        });
        config.classifier = Some(ClassifierConfig {
            api_key: "llm".to_string(),
            ..ClassifierConfig::default()
        });
        config
    }

    #[test]
    fn test_chain_follows_priority_order() {
        let chain = build_provider_chain(&configured().providers, Duration::from_secs(1)).unwrap();
        assert_eq!(chain.names(), vec!["youdao".to_string(), "lexicon".to_string()]);
    }

    #[test]
    fn test_empty_providers_is_config_error() {
        let result = build_provider_chain(&ProvidersConfig::default(), Duration::from_secs(1));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_blank_credential_is_config_error() {
        let mut config = configured();
        config.providers.lexicon.as_mut().unwrap().api_key = String::new();
        let result = build_provider_chain(&config.providers, Duration::from_secs(1));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_classifier_is_config_error() {
        let mut config = configured();
        config.classifier = None;
        assert!(matches!(build_classifier(&config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_build_coordinator_wires_pipeline() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        assert!(build_coordinator(&configured(), pool).is_ok());
    }
}
