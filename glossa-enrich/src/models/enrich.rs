//! Enrichment request/response types

use super::batch::{BatchOptions, BatchResult, WordOutcome};
use glossa_common::WordRecord;
use serde::{Deserialize, Serialize};

/// Largest word list accepted by one enrichment call
pub const MAX_WORDS_PER_CALL: usize = 100;

/// Caller options for one enrichment call
#[derive(Debug, Clone, Default)]
pub struct EnrichOptions {
    /// Bypass cache reads (results are still written back)
    pub skip_cache: bool,
    /// Keep phonetic and part-of-speech on returned records
    pub include_details: bool,
    /// Per-call override of the service's batch settings
    pub batch: Option<BatchOptions>,
}

/// POST /api/words/enrich body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichRequest {
    pub words: Vec<String>,
    #[serde(default)]
    pub include_details: bool,
    #[serde(default)]
    pub skip_cache: bool,
}

impl EnrichRequest {
    pub fn options(&self) -> EnrichOptions {
        EnrichOptions {
            skip_cache: self.skip_cache,
            include_details: self.include_details,
            batch: None,
        }
    }
}

/// Hit-rate statistics for one enrichment call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentStats {
    pub total_words: usize,
    pub cache_hits: usize,
    pub database_hits: usize,
    pub enriched: usize,
    pub failed: usize,
    /// cache_hits / total_words, 0.0 for an empty call
    pub cache_hit_rate: f64,
}

impl EnrichmentStats {
    pub fn new(
        total_words: usize,
        cache_hits: usize,
        database_hits: usize,
        enriched: usize,
        failed: usize,
    ) -> Self {
        let cache_hit_rate = if total_words == 0 {
            0.0
        } else {
            cache_hits as f64 / total_words as f64
        };
        Self {
            total_words,
            cache_hits,
            database_hits,
            enriched,
            failed,
            cache_hit_rate,
        }
    }
}

/// Full result of `EnrichmentCoordinator::enrich`
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentReport {
    pub batch: BatchResult,
    pub stats: EnrichmentStats,
}

impl EnrichmentReport {
    /// Shape the report into the public response
    pub fn into_response(self, include_details: bool) -> EnrichResponse {
        let known = self
            .batch
            .records()
            .cloned()
            .map(|record| if include_details { record } else { record.without_details() })
            .collect();

        EnrichResponse {
            known,
            unknown: self.batch.failed_words.clone(),
            cache_hit_rate: self.stats.cache_hit_rate,
            total_words: self.stats.total_words,
            processing_time_ms: self.batch.processing_time_ms,
            failed_words: self.batch.failed_words.clone(),
            stats: self.stats,
            results: include_details.then_some(self.batch.results),
        }
    }
}

/// POST /api/words/enrich response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichResponse {
    pub known: Vec<WordRecord>,
    pub unknown: Vec<String>,
    pub cache_hit_rate: f64,
    pub total_words: usize,
    pub processing_time_ms: u64,
    pub failed_words: Vec<String>,
    pub stats: EnrichmentStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<WordOutcome>>,
}
