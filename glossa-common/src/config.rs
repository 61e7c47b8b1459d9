//! Configuration loading and root folder resolution
//!
//! Configuration file resolution order:
//! 1. Command-line argument (highest priority)
//! 2. `GLOSSA_CONFIG` environment variable
//! 3. `~/.config/glossa/glossa.toml`
//! 4. Compiled defaults (fallback)
//!
//! A missing file is not fatal: the service starts with defaults and a warning.
//! Credentials can always be supplied through environment variables, which take
//! priority over values read from TOML.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "GLOSSA_CONFIG";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the word database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Batch orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Words per chunk
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Retries per word after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Linear retry delay unit (delay = retry_delay_ms * attempt)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Per-provider call timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum in-flight provider calls
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Pause between chunks
    #[serde(default = "default_inter_chunk_delay_ms")]
    pub inter_chunk_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
            concurrency: default_concurrency(),
            inter_chunk_delay_ms: default_inter_chunk_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries held in memory
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// TTL for database-hit backfill entries
    #[serde(default = "default_prequery_ttl")]
    pub prequery_ttl_secs: u64,
    /// TTL for fully enriched entries
    #[serde(default = "default_translation_ttl")]
    pub translation_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            prequery_ttl_secs: default_prequery_ttl(),
            translation_ttl_secs: default_translation_ttl(),
        }
    }
}

/// Translation provider credentials, tried in the order tencent → youdao → lexicon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub tencent: Option<TencentConfig>,
    #[serde(default)]
    pub youdao: Option<YoudaoConfig>,
    #[serde(default)]
    pub lexicon: Option<LexiconConfig>,
}

impl ProvidersConfig {
    pub fn configured_count(&self) -> usize {
        [self.tencent.is_some(), self.youdao.is_some(), self.lexicon.is_some()]
            .iter()
            .filter(|present| **present)
            .count()
    }
}

/// Tencent Machine Translation (TC3-HMAC-SHA256 signed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TencentConfig {
    #[serde(default)]
    pub secret_id: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_tencent_region")]
    pub region: String,
    #[serde(default = "default_tencent_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_provider_qps")]
    pub qps: u32,
}

impl Default for TencentConfig {
    fn default() -> Self {
        Self {
            secret_id: String::new(),
            secret_key: String::new(),
            region: default_tencent_region(),
            endpoint: default_tencent_endpoint(),
            qps: default_provider_qps(),
        }
    }
}

/// Youdao translation API (salted SHA-256 signature)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoudaoConfig {
    #[serde(default)]
    pub app_key: String,
    #[serde(default)]
    pub app_secret: String,
    #[serde(default = "default_youdao_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_provider_qps")]
    pub qps: u32,
}

impl Default for YoudaoConfig {
    fn default() -> Self {
        Self {
            app_key: String::new(),
            app_secret: String::new(),
            endpoint: default_youdao_endpoint(),
            qps: default_provider_qps(),
        }
    }
}

/// Dictionary lookup endpoint authenticated with an API key header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_lexicon_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_provider_qps")]
    pub qps: u32,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_lexicon_endpoint(),
            qps: default_provider_qps(),
        }
    }
}

/// LLM chat-completion endpoint used for difficulty classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_classifier_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_classifier_model")]
    pub model: String,
    #[serde(default = "default_classifier_retries")]
    pub max_retries: u32,
    #[serde(default = "default_classifier_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_classifier_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_classifier_endpoint(),
            model: default_classifier_model(),
            max_retries: default_classifier_retries(),
            base_backoff_ms: default_classifier_base_backoff_ms(),
            max_backoff_ms: default_classifier_max_backoff_ms(),
            timeout_ms: default_classifier_timeout_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_batch_size() -> usize {
    20
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_concurrency() -> usize {
    4
}

fn default_inter_chunk_delay_ms() -> u64 {
    300
}

fn default_cache_capacity() -> usize {
    10_000
}

fn default_prequery_ttl() -> u64 {
    3600
}

fn default_translation_ttl() -> u64 {
    2_592_000
}

fn default_provider_qps() -> u32 {
    5
}

fn default_tencent_region() -> String {
    "ap-guangzhou".to_string()
}

fn default_tencent_endpoint() -> String {
    "https://tmt.tencentcloudapi.com".to_string()
}

fn default_youdao_endpoint() -> String {
    "https://openapi.youdao.com/api".to_string()
}

fn default_lexicon_endpoint() -> String {
    "https://api.lexicon.example/v1/lookup".to_string()
}

fn default_classifier_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_classifier_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_classifier_retries() -> u32 {
    2
}

fn default_classifier_base_backoff_ms() -> u64 {
    500
}

fn default_classifier_max_backoff_ms() -> u64 {
    4000
}

fn default_classifier_timeout_ms() -> u64 {
    20_000
}

impl TomlConfig {
    /// Path of the SQLite word database
    pub fn database_path(&self) -> PathBuf {
        self.root_folder
            .clone()
            .unwrap_or_else(default_root_folder)
            .join(crate::db::DATABASE_FILE_NAME)
    }

    /// Overlay credentials from environment variables.
    ///
    /// Setting any variable of a provider creates that provider's section, so a
    /// deployment can be configured from the environment alone.
    pub fn apply_env_overrides(&mut self) {
        let tencent_id = env_value("GLOSSA_TENCENT_SECRET_ID");
        let tencent_key = env_value("GLOSSA_TENCENT_SECRET_KEY");
        if tencent_id.is_some() || tencent_key.is_some() {
            let section = self.providers.tencent.get_or_insert_with(TencentConfig::default);
            if let Some(id) = tencent_id {
                section.secret_id = id;
            }
            if let Some(key) = tencent_key {
                section.secret_key = key;
            }
        }

        let youdao_key = env_value("GLOSSA_YOUDAO_APP_KEY");
        let youdao_secret = env_value("GLOSSA_YOUDAO_APP_SECRET");
        if youdao_key.is_some() || youdao_secret.is_some() {
            let section = self.providers.youdao.get_or_insert_with(YoudaoConfig::default);
            if let Some(key) = youdao_key {
                section.app_key = key;
            }
            if let Some(secret) = youdao_secret {
                section.app_secret = secret;
            }
        }

        if let Some(key) = env_value("GLOSSA_LEXICON_API_KEY") {
            self.providers.lexicon.get_or_insert_with(LexiconConfig::default).api_key = key;
        }

        if let Some(key) = env_value("GLOSSA_CLASSIFIER_API_KEY") {
            self.classifier.get_or_insert_with(ClassifierConfig::default).api_key = key;
        }
    }

    /// Check that every configured external service has usable credentials.
    ///
    /// Missing credentials are a startup error, never a per-call failure.
    pub fn validate(&self) -> Result<()> {
        if let Some(tencent) = &self.providers.tencent {
            require("providers.tencent.secret_id", &tencent.secret_id)?;
            require("providers.tencent.secret_key", &tencent.secret_key)?;
        }
        if let Some(youdao) = &self.providers.youdao {
            require("providers.youdao.app_key", &youdao.app_key)?;
            require("providers.youdao.app_secret", &youdao.app_secret)?;
        }
        if let Some(lexicon) = &self.providers.lexicon {
            require("providers.lexicon.api_key", &lexicon.api_key)?;
        }
        if self.providers.configured_count() == 0 {
            return Err(Error::Config(
                "No translation provider configured. Add a [providers.tencent], \
                 [providers.youdao] or [providers.lexicon] section, or set \
                 GLOSSA_TENCENT_SECRET_ID/GLOSSA_TENCENT_SECRET_KEY, \
                 GLOSSA_YOUDAO_APP_KEY/GLOSSA_YOUDAO_APP_SECRET or GLOSSA_LEXICON_API_KEY"
                    .to_string(),
            ));
        }
        match &self.classifier {
            Some(classifier) => require("classifier.api_key", &classifier.api_key)?,
            None => {
                return Err(Error::Config(
                    "Difficulty classifier not configured. Add a [classifier] section \
                     or set GLOSSA_CLASSIFIER_API_KEY"
                        .to_string(),
                ))
            }
        }
        if self.batch.batch_size == 0 || self.batch.concurrency == 0 {
            return Err(Error::Config(
                "batch.batch_size and batch.concurrency must be greater than zero".to_string(),
            ));
        }
        if self.cache.capacity == 0 {
            return Err(Error::Config("cache.capacity must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Validate a credential (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn require(field: &str, value: &str) -> Result<()> {
    if is_valid_key(value) {
        Ok(())
    } else {
        Err(Error::Config(format!("{} is missing or blank", field)))
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| is_valid_key(v))
}

/// Locate the config file following the documented priority order
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: user config directory
    dirs::config_dir()
        .map(|d| d.join("glossa").join("glossa.toml"))
        .filter(|p| p.exists())
}

/// Load TOML configuration, falling back to defaults when the file is absent
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        warn!("No configuration file found, using compiled defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Configuration file {} not found, using compiled defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("glossa"))
        .unwrap_or_else(|| PathBuf::from("./glossa_data"))
}
