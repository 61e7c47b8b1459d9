//! Scripted collaborators for pipeline tests

use async_trait::async_trait;
use glossa_common::{Error, WordRecord};
use glossa_enrich::db::{SqliteWordStore, WordStore};
use glossa_enrich::models::{BatchOptions, ProviderTranslation};
use glossa_enrich::services::{
    BatchOrchestrator, CacheError, CacheStore, ClassifierError, DifficultyClassifier,
    EnrichmentCoordinator, LlmBackend, MemoryCache, ProviderChain, ProviderError,
    TranslationProvider, WordCache,
};
use glossa_enrich::utils::RetryPolicy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Translation provider with per-word scripted failures
#[derive(Default)]
pub struct ScriptedProvider {
    translations: HashMap<String, String>,
    /// word → (status, failures left)
    failures: Mutex<HashMap<String, (u16, u32)>>,
    always_fail: Option<u16>,
    calls: Mutex<HashMap<String, u32>>,
    total_calls: AtomicU32,
    delay: Option<Duration>,
    in_flight: AtomicU32,
    peak_in_flight: AtomicU32,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_translation(mut self, word: &str, translation: &str) -> Self {
        self.translations.insert(word.to_string(), translation.to_string());
        self
    }

    /// Fail `word` with HTTP `status` for its first `times` calls
    pub fn failing(self, word: &str, status: u16, times: u32) -> Self {
        self.failures.lock().unwrap().insert(word.to_string(), (status, times));
        self
    }

    /// Fail every call with HTTP `status`
    pub fn always_failing(status: u16) -> Self {
        Self {
            always_fail: Some(status),
            ..Self::default()
        }
    }

    /// Hold every call for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// Most calls ever running at the same time
    pub fn peak_in_flight(&self) -> u32 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, word: &str) -> u32 {
        self.calls.lock().unwrap().get(word).copied().unwrap_or(0)
    }
}

#[async_trait]
impl TranslationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn translate(&self, word: &str) -> Result<ProviderTranslation, ProviderError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(word.to_string()).or_insert(0) += 1;

        if let Some(delay) = self.delay {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        if let Some(status) = self.always_fail {
            return Err(ProviderError::from_status(status, "scripted failure".to_string()));
        }

        if let Some((status, left)) = self.failures.lock().unwrap().get_mut(word) {
            if *left > 0 {
                *left -= 1;
                return Err(ProviderError::from_status(*status, "scripted failure".to_string()));
            }
        }

        let translation = self
            .translations
            .get(word)
            .cloned()
            .unwrap_or_else(|| format!("译{}", word));
        Ok(ProviderTranslation::new(word, translation, "scripted"))
    }
}

/// LLM backend replying with a fixed text, or failing with a fixed status
pub struct ScriptedLlm {
    reply: Result<String, u16>,
    calls: AtomicU32,
}

impl ScriptedLlm {
    /// JSON array judging each listed word
    pub fn levels(levels: &[(&str, i64)]) -> Self {
        let items: Vec<serde_json::Value> = levels
            .iter()
            .map(|(word, level)| {
                serde_json::json!({"word": word, "difficulty_level": level, "confidence": 0.9})
            })
            .collect();
        Self::raw(&serde_json::Value::Array(items).to_string())
    }

    pub fn raw(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => {
                Err(ClassifierError::from_status(*status, "scripted failure".to_string()))
            }
        }
    }
}

/// Cache that fails every operation
pub struct FailingCache;

#[async_trait]
impl CacheStore for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn mget(&self, _keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn del_pattern(&self, _prefix: &str) -> Result<usize, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

/// Word store whose reads and writes all fail
pub struct FailingStore;

#[async_trait]
impl WordStore for FailingStore {
    async fn find_by_word(&self, _word: &str) -> glossa_common::Result<Option<WordRecord>> {
        Err(Error::Internal("database unavailable".to_string()))
    }

    async fn batch_find_by_words(
        &self,
        _words: &[String],
    ) -> glossa_common::Result<HashMap<String, Option<WordRecord>>> {
        Err(Error::Internal("database unavailable".to_string()))
    }

    async fn upsert_batch(
        &self,
        _records: &[WordRecord],
    ) -> glossa_common::Result<Vec<WordRecord>> {
        Err(Error::Internal("database unavailable".to_string()))
    }

    async fn count(&self) -> glossa_common::Result<i64> {
        Err(Error::Internal("database unavailable".to_string()))
    }
}

/// Orchestrator over a single scripted provider and LLM
pub fn orchestrator(
    provider: Arc<ScriptedProvider>,
    llm: Arc<ScriptedLlm>,
    options: BatchOptions,
) -> BatchOrchestrator {
    let classifier = DifficultyClassifier::new(
        llm,
        RetryPolicy::exponential(2, Duration::from_millis(1), Duration::from_millis(5)),
        Duration::from_secs(1),
    );
    let providers: Vec<Arc<dyn TranslationProvider>> = vec![provider];
    BatchOrchestrator::new(ProviderChain::new(providers), classifier, options)
}

/// Coordinator wired to scripted collaborators and a temp database
pub struct Harness {
    pub coordinator: EnrichmentCoordinator,
    pub store: Arc<SqliteWordStore>,
    pub cache: WordCache,
    pub provider: Arc<ScriptedProvider>,
    pub llm: Arc<ScriptedLlm>,
    _dir: TempDir,
}

pub async fn harness(provider: ScriptedProvider, llm: ScriptedLlm) -> Harness {
    harness_with_cache(provider, llm, Arc::new(MemoryCache::new(1000))).await
}

pub async fn harness_with_cache(
    provider: ScriptedProvider,
    llm: ScriptedLlm,
    cache_store: Arc<dyn CacheStore>,
) -> Harness {
    harness_with(provider, llm, cache_store, super::test_options()).await
}

pub async fn harness_with(
    provider: ScriptedProvider,
    llm: ScriptedLlm,
    cache_store: Arc<dyn CacheStore>,
    options: BatchOptions,
) -> Harness {
    let (dir, pool) = super::create_test_db().await.expect("Failed to create test database");
    let store = Arc::new(SqliteWordStore::new(pool));
    let provider = Arc::new(provider);
    let llm = Arc::new(llm);

    let orchestrator = orchestrator(provider.clone(), llm.clone(), options);
    let cache = WordCache::new(cache_store, Duration::from_secs(60), Duration::from_secs(600));

    let coordinator = EnrichmentCoordinator::builder()
        .store(store.clone())
        .cache(cache.clone())
        .orchestrator(orchestrator)
        .build()
        .expect("Failed to build coordinator");

    Harness {
        coordinator,
        store,
        cache,
        provider,
        llm,
        _dir: dir,
    }
}
