//! Batch orchestrator
//!
//! Runs unknown words through the provider chain and the difficulty
//! classifier. Words are split into chunks; each chunk runs as its own task,
//! with the classifier's single batch call running alongside the bounded
//! per-word translation calls. Every input word comes back as exactly one
//! `WordOutcome`, whatever failed along the way.
//!
//! **Phases:** PENDING → CHUNKING → DISPATCHING → AGGREGATING → DONE

use crate::models::{
    BatchOptions, BatchPhase, BatchResult, ClassifierJudgment, ProviderTranslation, WordContext,
    WordOutcome,
};
use crate::services::classifier::DifficultyClassifier;
use crate::services::providers::{ChainError, ProviderChain};
use crate::utils::{retry_with_backoff, RetryOutcome, RetryPolicy};
use futures::future::join_all;
use glossa_common::{WordRecord, WordSource};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Provider chain + classifier, run per chunk with retry and bounded concurrency
///
/// Clones share one provider-call limiter, so `options.concurrency` bounds the
/// calls in flight across every concurrent run, not per run.
#[derive(Clone)]
pub struct BatchOrchestrator {
    providers: ProviderChain,
    classifier: DifficultyClassifier,
    options: BatchOptions,
    in_flight: Arc<Semaphore>,
}

impl BatchOrchestrator {
    pub fn new(
        providers: ProviderChain,
        classifier: DifficultyClassifier,
        options: BatchOptions,
    ) -> Self {
        let in_flight = Arc::new(Semaphore::new(options.concurrency.max(1)));
        Self {
            providers,
            classifier,
            options,
            in_flight,
        }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Run a batch with the orchestrator's own options
    pub async fn run(&self, words: &[String]) -> BatchResult {
        let options = self.options.clone();
        self.run_with(words, &options).await
    }

    /// Run a batch. Never fails: broken words and chunks become failed outcomes.
    ///
    /// `words` are expected to be normalized and deduplicated already. The
    /// `concurrency` of `options` is ignored; the limit set at construction
    /// applies.
    pub async fn run_with(&self, words: &[String], options: &BatchOptions) -> BatchResult {
        let start_time = Instant::now();
        if words.is_empty() {
            return BatchResult::empty();
        }

        let mut phase = advance(BatchPhase::Pending, BatchPhase::Chunking);
        let batch_size = options.batch_size.max(1);
        let chunks: Vec<Vec<String>> = words.chunks(batch_size).map(|c| c.to_vec()).collect();
        let chunk_count = chunks.len();

        info!(total = words.len(), chunks = chunk_count, batch_size, "Starting batch enrichment");

        phase = advance(phase, BatchPhase::Dispatching);
        let mut outcomes = Vec::with_capacity(words.len());

        for (index, chunk) in chunks.into_iter().enumerate() {
            if index > 0 && !options.inter_chunk_delay().is_zero() {
                tokio::time::sleep(options.inter_chunk_delay()).await;
            }

            let this = self.clone();
            let task_options = options.clone();
            let task_words = chunk.clone();
            let handle =
                tokio::spawn(async move { this.process_chunk(&task_words, &task_options).await });

            match handle.await {
                Ok(chunk_outcomes) => outcomes.extend(chunk_outcomes),
                Err(e) => {
                    warn!(
                        chunk = index,
                        words = chunk.len(),
                        error = %e,
                        "Chunk task failed, marking its words failed"
                    );
                    let reason = format!("chunk task failed: {}", e);
                    outcomes.extend(
                        chunk
                            .into_iter()
                            .map(|word| WordOutcome::failed(word, reason.clone(), 0)),
                    );
                }
            }
        }

        phase = advance(phase, BatchPhase::Aggregating);
        let mut result =
            BatchResult::from_outcomes(outcomes, start_time.elapsed().as_millis() as u64);
        result.phase = advance(phase, BatchPhase::Done);

        info!(
            total = result.total,
            succeeded = result.success_count,
            failed = result.failure_count,
            elapsed_ms = result.processing_time_ms,
            "Batch enrichment complete"
        );

        result
    }

    /// Translate and classify one chunk; one outcome per word, in chunk order
    async fn process_chunk(&self, words: &[String], options: &BatchOptions) -> Vec<WordOutcome> {
        let contexts: Vec<WordContext> =
            words.iter().map(|w| WordContext::new(w.as_str())).collect();
        let in_flight = &self.in_flight;

        // Non-short-circuiting: every word's chain runs to its own conclusion
        let translations = join_all(words.iter().map(|word| async move {
            let _permit = in_flight.acquire().await.ok();
            self.translate_with_retry(word, options).await
        }));

        let (judgments, translations) =
            tokio::join!(self.classifier.classify_batch(&contexts), translations);

        words
            .iter()
            .zip(translations)
            .zip(judgments)
            .map(|((word, translation), judgment)| merge(word, translation, judgment))
            .collect()
    }

    async fn translate_with_retry(
        &self,
        word: &str,
        options: &BatchOptions,
    ) -> RetryOutcome<ProviderTranslation, ChainError> {
        let policy = RetryPolicy::linear(options.max_retries, options.retry_delay());
        let timeout = options.timeout();
        let providers = &self.providers;

        retry_with_backoff("provider translate", &policy, ChainError::is_retryable, |_| {
            providers.translate(word, timeout)
        })
        .await
    }
}

fn advance(from: BatchPhase, to: BatchPhase) -> BatchPhase {
    debug!(from = ?from, to = ?to, "Batch phase transition");
    to
}

/// Join a word's translation outcome with its difficulty judgment
fn merge(
    word: &str,
    translation: RetryOutcome<ProviderTranslation, ChainError>,
    judgment: ClassifierJudgment,
) -> WordOutcome {
    let retries = translation.retries;

    match translation.result {
        Ok(provided) => {
            let source = if judgment.from_fallback {
                WordSource::Fallback
            } else {
                WordSource::Provider
            };
            let level = judgment.difficulty_level as i64;
            let record = WordRecord::new(word, provided.translation, level, source)
                .with_phonetic(provided.phonetic.or(judgment.phonetic))
                .with_part_of_speech(provided.part_of_speech.or(judgment.part_of_speech));
            WordOutcome::succeeded(record, retries)
        }
        // The classifier's own translation rescues a word the providers could not
        Err(e) => match judgment.translation {
            Some(translation) if !judgment.from_fallback => {
                debug!(
                    word = %word,
                    error = %e,
                    "Using classifier translation after provider chain failed"
                );
                let level = judgment.difficulty_level as i64;
                let record = WordRecord::new(word, translation, level, WordSource::Classifier)
                    .with_phonetic(judgment.phonetic)
                    .with_part_of_speech(judgment.part_of_speech);
                WordOutcome::succeeded(record, retries)
            }
            _ => {
                warn!(word = %word, retries, error = %e, "Word failed enrichment");
                WordOutcome::failed(word, e.to_string(), retries)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassifierJudgment, MIDPOINT_DIFFICULTY};
    use crate::services::classifier::{ClassifierError, LlmBackend};
    use crate::services::providers::{ProviderError, ProviderFailure, TranslationProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Translates every word, but panics on `boom`
    struct PanickyProvider;

    #[async_trait]
    impl TranslationProvider for PanickyProvider {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn translate(&self, word: &str) -> Result<ProviderTranslation, ProviderError> {
            if word == "boom" {
                panic!("provider crashed on {}", word);
            }
            Ok(ProviderTranslation::new(word, format!("译{}", word), "panicky"))
        }
    }

    /// Sleeps on every call and records the peak number of concurrent calls
    #[derive(Default)]
    struct SlowProvider {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TranslationProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn translate(&self, word: &str) -> Result<ProviderTranslation, ProviderError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(ProviderTranslation::new(word, "译", "slow"))
        }
    }

    /// Replies with an empty list, so every word gets the rule-based judgment
    struct SilentLlm;

    #[async_trait]
    impl LlmBackend for SilentLlm {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ClassifierError> {
            Ok("[]".to_string())
        }
    }

    fn orchestrator(
        provider: Arc<dyn TranslationProvider>,
        options: BatchOptions,
    ) -> BatchOrchestrator {
        let classifier = DifficultyClassifier::new(
            Arc::new(SilentLlm),
            RetryPolicy::none(),
            Duration::from_secs(1),
        );
        BatchOrchestrator::new(ProviderChain::new(vec![provider]), classifier, options)
    }

    fn options(batch_size: usize, concurrency: usize) -> BatchOptions {
        BatchOptions {
            batch_size,
            max_retries: 0,
            retry_delay_ms: 1,
            timeout_ms: 1000,
            concurrency,
            inter_chunk_delay_ms: 0,
        }
    }

    fn owned(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[tokio::test]
    async fn test_crashed_chunk_fails_only_its_words() {
        let orchestrator = orchestrator(Arc::new(PanickyProvider), options(2, 2));

        let result = orchestrator.run(&owned(&["cat", "boom", "dog", "fox"])).await;

        assert_eq!(result.total, 4);
        assert_eq!(result.phase, BatchPhase::Done);
        for word in ["cat", "boom"] {
            let outcome = result.outcome(word).unwrap();
            assert!(!outcome.success);
            assert!(outcome.error.as_deref().unwrap().contains("chunk task failed"));
        }
        for word in ["dog", "fox"] {
            assert!(result.outcome(word).unwrap().success);
        }
        assert_eq!(result.failed_words, vec!["cat".to_string(), "boom".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrency_limit_is_shared_across_runs() {
        let provider = Arc::new(SlowProvider::default());
        let first = orchestrator(provider.clone(), options(20, 1));
        let second = first.clone();

        let first_words = owned(&["alpha", "beta"]);
        let second_words = owned(&["gamma", "delta"]);
        let (a, b) = tokio::join!(first.run(&first_words), second.run(&second_words));

        assert_eq!(a.success_count + b.success_count, 4);
        assert_eq!(provider.peak.load(Ordering::SeqCst), 1);
    }

    fn judgment(word: &str, level: i64) -> ClassifierJudgment {
        ClassifierJudgment::from_model(word, level, 0.9, "test")
    }

    fn chain_error(word: &str) -> ChainError {
        ChainError {
            word: word.to_string(),
            failures: vec![ProviderFailure {
                provider: "a".to_string(),
                error: ProviderError::from_status(500, String::new()),
            }],
        }
    }

    #[test]
    fn test_merge_provider_translation() {
        let mut provided = ProviderTranslation::new("cat", "猫", "a");
        provided.phonetic = Some("kæt".to_string());
        let mut judged = judgment("cat", 1);
        judged.part_of_speech = Some("n.".to_string());

        let outcome = merge("cat", RetryOutcome { result: Ok(provided), retries: 1 }, judged);

        let record = outcome.record.unwrap();
        assert_eq!(record.source, WordSource::Provider);
        assert_eq!(record.phonetic.as_deref(), Some("kæt"));
        assert_eq!(record.part_of_speech.as_deref(), Some("n."));
        assert_eq!(outcome.retry_count, 1);
    }

    #[test]
    fn test_merge_marks_fallback_difficulty() {
        let provided = ProviderTranslation::new("cat", "猫", "a");
        let outcome = merge(
            "cat",
            RetryOutcome { result: Ok(provided), retries: 0 },
            crate::services::classifier::rubric::fallback_judgment("cat"),
        );
        assert_eq!(outcome.record.unwrap().source, WordSource::Fallback);
    }

    #[test]
    fn test_merge_rescues_with_classifier_translation() {
        let mut judged = judgment("cat", MIDPOINT_DIFFICULTY as i64);
        judged.translation = Some("猫".to_string());

        let outcome = merge(
            "cat",
            RetryOutcome { result: Err(chain_error("cat")), retries: 2 },
            judged,
        );

        assert!(outcome.success);
        assert_eq!(outcome.record.unwrap().source, WordSource::Classifier);
    }

    #[test]
    fn test_merge_fails_without_any_translation() {
        let outcome = merge(
            "qwxz",
            RetryOutcome { result: Err(chain_error("qwxz")), retries: 2 },
            judgment("qwxz", 3),
        );

        assert!(!outcome.success);
        assert_eq!(outcome.retry_count, 2);
        assert!(outcome.error.unwrap().contains("all providers failed"));
    }
}
