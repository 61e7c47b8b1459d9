//! Batch request options and result types

use glossa_common::config::BatchConfig;
use glossa_common::WordRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for one batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
    pub concurrency: usize,
    pub inter_chunk_delay_ms: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchConfig::default().into()
    }
}

impl From<BatchConfig> for BatchOptions {
    fn from(config: BatchConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
            timeout_ms: config.timeout_ms,
            concurrency: config.concurrency.max(1),
            inter_chunk_delay_ms: config.inter_chunk_delay_ms,
        }
    }
}

impl BatchOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn inter_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.inter_chunk_delay_ms)
    }
}

/// Batch job state machine
///
/// PENDING → CHUNKING → DISPATCHING → AGGREGATING → DONE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchPhase {
    Pending,
    Chunking,
    Dispatching,
    Aggregating,
    Done,
}

/// Outcome for one input word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordOutcome {
    pub word: String,
    pub record: Option<WordRecord>,
    pub success: bool,
    pub error: Option<String>,
    /// Provider retries spent on this word
    pub retry_count: u32,
}

impl WordOutcome {
    pub fn succeeded(record: WordRecord, retry_count: u32) -> Self {
        Self {
            word: record.word.clone(),
            record: Some(record),
            success: true,
            error: None,
            retry_count,
        }
    }

    pub fn failed(word: impl Into<String>, error: impl Into<String>, retry_count: u32) -> Self {
        Self {
            word: word.into(),
            record: None,
            success: false,
            error: Some(error.into()),
            retry_count,
        }
    }
}

/// Aggregated result of a batch; one outcome per input word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<WordOutcome>,
    pub failed_words: Vec<String>,
    pub processing_time_ms: u64,
    pub phase: BatchPhase,
}

impl BatchResult {
    /// Build the aggregate from per-word outcomes; counts are derived, never passed in
    pub fn from_outcomes(results: Vec<WordOutcome>, processing_time_ms: u64) -> Self {
        let success_count = results.iter().filter(|o| o.success).count();
        let failed_words: Vec<String> = results
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.word.clone())
            .collect();
        Self {
            total: results.len(),
            success_count,
            failure_count: failed_words.len(),
            results,
            failed_words,
            processing_time_ms,
            phase: BatchPhase::Done,
        }
    }

    pub fn empty() -> Self {
        Self::from_outcomes(Vec::new(), 0)
    }

    /// Outcome for a word, matched by identity
    pub fn outcome(&self, word: &str) -> Option<&WordOutcome> {
        self.results.iter().find(|o| o.word == word)
    }

    /// Successfully produced records
    pub fn records(&self) -> impl Iterator<Item = &WordRecord> {
        self.results.iter().filter_map(|o| o.record.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_common::WordSource;

    #[test]
    fn test_counts_derived_from_outcomes() {
        let result = BatchResult::from_outcomes(
            vec![
                WordOutcome::succeeded(WordRecord::new("cat", "猫", 1, WordSource::Provider), 0),
                WordOutcome::failed("zyzzyva", "provider chain exhausted", 2),
            ],
            12,
        );

        assert_eq!(result.total, 2);
        assert_eq!(result.success_count, 1);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.failed_words, vec!["zyzzyva".to_string()]);
        assert_eq!(result.outcome("zyzzyva").unwrap().retry_count, 2);
        assert_eq!(result.phase, BatchPhase::Done);
    }

    #[test]
    fn test_options_from_config_never_zero() {
        let options: BatchOptions = BatchConfig {
            batch_size: 0,
            concurrency: 0,
            ..Default::default()
        }
        .into();
        assert_eq!(options.batch_size, 1);
        assert_eq!(options.concurrency, 1);
    }
}
