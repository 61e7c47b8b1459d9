//! Enrichment coordinator
//!
//! Entry point of the pipeline: normalize → cache → persistent store →
//! batch orchestrator (provider chain + classifier) → persistence. Word-level
//! failures end up in the result; only invalid input or a coordinator built
//! without its collaborators is an error.

use crate::db::WordStore;
use crate::models::{
    BatchOptions, BatchResult, EnrichOptions, EnrichmentReport, EnrichmentStats, WordOutcome,
    MAX_WORDS_PER_CALL,
};
use crate::services::batch_orchestrator::BatchOrchestrator;
use crate::services::cache_store::WordCache;
use crate::services::normalizer::normalize;
use glossa_common::{Error, Result, WordRecord, WordSource};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Tiered word enrichment over injected collaborators
#[derive(Clone)]
pub struct EnrichmentCoordinator {
    store: Arc<dyn WordStore>,
    cache: Option<WordCache>,
    orchestrator: BatchOrchestrator,
}

/// Builder for [`EnrichmentCoordinator`]; the store and orchestrator are required
#[derive(Default)]
pub struct CoordinatorBuilder {
    store: Option<Arc<dyn WordStore>>,
    cache: Option<WordCache>,
    orchestrator: Option<BatchOrchestrator>,
}

impl CoordinatorBuilder {
    pub fn store(mut self, store: Arc<dyn WordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn cache(mut self, cache: WordCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn orchestrator(mut self, orchestrator: BatchOrchestrator) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    pub fn build(self) -> Result<EnrichmentCoordinator> {
        let store = self.store.ok_or_else(|| {
            Error::Config("enrichment coordinator requires a word store".to_string())
        })?;
        let orchestrator = self.orchestrator.ok_or_else(|| {
            Error::Config("enrichment coordinator requires a batch orchestrator".to_string())
        })?;

        if self.cache.is_none() {
            warn!("No cache configured; every lookup goes to the word store");
        }

        Ok(EnrichmentCoordinator {
            store,
            cache: self.cache,
            orchestrator,
        })
    }
}

impl EnrichmentCoordinator {
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    pub fn store(&self) -> &Arc<dyn WordStore> {
        &self.store
    }

    /// Enrich up to `MAX_WORDS_PER_CALL` raw words.
    ///
    /// The returned batch holds exactly one outcome per normalized word, in
    /// first-seen input order.
    ///
    /// # Errors
    /// `Error::InvalidInput` for an empty or oversized list, or when no entry
    /// survives normalization.
    pub async fn enrich(
        &self,
        words: &[String],
        options: &EnrichOptions,
    ) -> Result<EnrichmentReport> {
        let start_time = Instant::now();

        if words.is_empty() {
            return Err(Error::InvalidInput("words must not be empty".to_string()));
        }
        if words.len() > MAX_WORDS_PER_CALL {
            return Err(Error::InvalidInput(format!(
                "at most {} words per call, got {}",
                MAX_WORDS_PER_CALL,
                words.len()
            )));
        }

        let normalized = normalize(words);
        if normalized.is_empty() {
            return Err(Error::InvalidInput("no valid words after normalization".to_string()));
        }

        let mut known: HashMap<String, WordRecord> = HashMap::with_capacity(normalized.len());

        // Tier 1: cache
        let cache_hits = match (&self.cache, options.skip_cache) {
            (Some(cache), false) => {
                let hits = cache.lookup(&normalized).await;
                let count = hits.len();
                known.extend(hits);
                count
            }
            _ => 0,
        };

        // Tier 2: persistent store
        let misses: Vec<String> =
            normalized.iter().filter(|w| !known.contains_key(*w)).cloned().collect();
        let db_records = self.lookup_store(&misses).await;
        let database_hits = db_records.len();
        if let Some(cache) = &self.cache {
            cache.store_prequery(&db_records).await;
        }
        known.extend(db_records.into_iter().map(|r| (r.word.clone(), r)));

        // Tier 3: providers + classifier
        let unknown: Vec<String> =
            normalized.iter().filter(|w| !known.contains_key(*w)).cloned().collect();
        let batch = if unknown.is_empty() {
            BatchResult::empty()
        } else {
            let batch_options: BatchOptions = options
                .batch
                .clone()
                .unwrap_or_else(|| self.orchestrator.options().clone());
            self.orchestrator.run_with(&unknown, &batch_options).await
        };

        let enriched: Vec<WordRecord> = batch.records().cloned().collect();
        self.persist(&enriched).await;

        let mut batch_outcomes: HashMap<String, WordOutcome> =
            batch.results.into_iter().map(|o| (o.word.clone(), o)).collect();

        let outcomes: Vec<WordOutcome> = normalized
            .iter()
            .map(|word| match known.remove(word) {
                Some(record) => WordOutcome::succeeded(record, 0),
                None => batch_outcomes.remove(word).unwrap_or_else(|| {
                    WordOutcome::failed(word.as_str(), "no outcome produced", 0)
                }),
            })
            .collect();

        let result = BatchResult::from_outcomes(outcomes, start_time.elapsed().as_millis() as u64);
        let stats = EnrichmentStats::new(
            result.total,
            cache_hits,
            database_hits,
            batch.success_count,
            result.failure_count,
        );

        info!(
            total = stats.total_words,
            cache_hits,
            db_hits = database_hits,
            enriched = stats.enriched,
            failed = stats.failed,
            elapsed_ms = result.processing_time_ms,
            "Enrichment complete"
        );

        Ok(EnrichmentReport { batch: result, stats })
    }

    /// Drop every cached word entry; returns the number of keys removed
    pub async fn invalidate_cache(&self) -> usize {
        match &self.cache {
            Some(cache) => {
                let removed = cache.invalidate_all().await;
                info!(removed, "Word cache invalidated");
                removed
            }
            None => 0,
        }
    }

    /// Store hits for `words`, relabeled as database-sourced. Store errors count as misses.
    async fn lookup_store(&self, words: &[String]) -> Vec<WordRecord> {
        if words.is_empty() {
            return Vec::new();
        }

        match self.store.batch_find_by_words(words).await {
            Ok(found) => words
                .iter()
                .filter_map(|w| found.get(w).cloned().flatten())
                .map(|r| r.served_from(WordSource::Database))
                .collect(),
            Err(e) => {
                warn!(
                    words = words.len(),
                    error = %e,
                    "Word store lookup failed, treating as misses"
                );
                Vec::new()
            }
        }
    }

    /// Best-effort write-back to the store and the cache
    async fn persist(&self, records: &[WordRecord]) {
        if records.is_empty() {
            return;
        }

        match self.store.upsert_batch(records).await {
            Ok(saved) => debug!(saved = saved.len(), "Persisted enriched words"),
            Err(e) => warn!(
                words = records.len(),
                error = %e,
                "Persisting enriched words failed; results are returned unsaved"
            ),
        }

        if let Some(cache) = &self.cache {
            cache.store_enriched(records).await;
        }
    }
}
