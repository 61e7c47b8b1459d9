//! Difficulty classifier
//!
//! Asks an LLM for 1-10 difficulty judgments (plus translation metadata) and
//! always answers: transport failures, non-retryable rejections and
//! unparsable replies all end in the rule-based fallback.

pub mod chat_backend;
pub mod parser;
pub mod rubric;

pub use chat_backend::ChatCompletionBackend;

use crate::models::{ClassifierJudgment, WordContext};
use crate::utils::{retry_with_backoff, RetryPolicy};
use async_trait::async_trait;
use glossa_common::config::ClassifierConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Classifier call errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Classifier request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Classifier returned an empty response")]
    EmptyResponse,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClassifierError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ClassifierError::Auth(body),
            _ => ClassifierError::Status { status, body },
        }
    }

    /// Timeouts, network failures, 5xx and 429 are retried; everything else falls back at once
    pub fn is_retryable(&self) -> bool {
        match self {
            ClassifierError::Network(_) | ClassifierError::Timeout(_) => true,
            ClassifierError::Status { status, .. } => *status == 429 || *status >= 500,
            ClassifierError::Auth(_)
            | ClassifierError::Malformed(_)
            | ClassifierError::EmptyResponse
            | ClassifierError::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for ClassifierError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClassifierError::Malformed(e.to_string())
        } else {
            ClassifierError::Network(e.to_string())
        }
    }
}

/// Raw text completion from a language model
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ClassifierError>;
}

/// LLM difficulty classifier with retry and rule-based fallback
#[derive(Clone)]
pub struct DifficultyClassifier {
    backend: Arc<dyn LlmBackend>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl DifficultyClassifier {
    pub fn new(backend: Arc<dyn LlmBackend>, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            backend,
            retry,
            timeout,
        }
    }

    /// Chat-completion backend with retry settings from config
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let backend = ChatCompletionBackend::new(config)?;
        let retry = RetryPolicy::exponential(
            config.max_retries,
            Duration::from_millis(config.base_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        );
        Ok(Self::new(Arc::new(backend), retry, Duration::from_millis(config.timeout_ms)))
    }

    /// Classify one word
    pub async fn classify_one(&self, word: &str, translation: Option<&str>) -> ClassifierJudgment {
        let mut context = WordContext::new(word);
        if let Some(translation) = translation {
            context = context.with_translation(translation);
        }

        match self.request(&rubric::single_prompt(&context)).await {
            Some(raw) => parser::parse_single(&raw, word),
            None => rubric::fallback_judgment(word),
        }
    }

    /// Classify many words with a single model call.
    ///
    /// Returns one judgment per input word, in input order.
    pub async fn classify_batch(&self, words: &[WordContext]) -> Vec<ClassifierJudgment> {
        if words.is_empty() {
            return Vec::new();
        }

        let judgments = match self.request(&rubric::batch_prompt(words)).await {
            Some(raw) => parser::parse_batch(&raw, words),
            None => words.iter().map(|w| rubric::fallback_judgment(&w.word)).collect(),
        };

        let fallbacks = judgments.iter().filter(|j| j.from_fallback).count();
        if fallbacks > 0 {
            info!(words = words.len(), fallbacks, "Rule-based difficulty fallback applied");
        } else {
            debug!(words = words.len(), "Classifier judged batch");
        }

        judgments
    }

    /// Model reply text, or `None` once retries are spent or the error is final
    async fn request(&self, user_prompt: &str) -> Option<String> {
        let system_prompt = rubric::system_prompt();
        let system_prompt = system_prompt.as_str();
        let backend = self.backend.as_ref();
        let timeout = self.timeout;

        let outcome = retry_with_backoff(
            "classifier request",
            &self.retry,
            ClassifierError::is_retryable,
            |_| async move {
                let call = backend.complete(system_prompt, user_prompt);
                match tokio::time::timeout(timeout, call).await {
                    Ok(result) => result,
                    Err(_) => Err(ClassifierError::Timeout(timeout)),
                }
            },
        )
        .await;

        match outcome.result {
            Ok(raw) => Some(raw),
            Err(e) => {
                warn!(
                    error = %e,
                    retries = outcome.retries,
                    retryable = e.is_retryable(),
                    "Classifier unavailable, using rule-based fallback"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Reply {
        Text(&'static str),
        Status(u16),
    }

    /// Replays scripted replies, repeating the last one
    struct ScriptedBackend {
        replies: Mutex<Vec<Reply>>,
        calls: AtomicU32,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = {
                let mut replies = self.replies.lock().unwrap();
                if replies.len() > 1 {
                    replies.remove(0)
                } else {
                    replies[0]
                }
            };
            match reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Status(status) => {
                    Err(ClassifierError::from_status(status, "scripted".to_string()))
                }
            }
        }
    }

    fn classifier(backend: Arc<ScriptedBackend>) -> DifficultyClassifier {
        DifficultyClassifier::new(
            backend,
            RetryPolicy::exponential(2, Duration::from_millis(1), Duration::from_millis(5)),
            Duration::from_secs(1),
        )
    }

    fn words(list: &[&str]) -> Vec<WordContext> {
        list.iter().map(|w| WordContext::new(*w)).collect()
    }

    #[test]
    fn test_retryable_split() {
        assert!(ClassifierError::from_status(500, String::new()).is_retryable());
        assert!(ClassifierError::from_status(429, String::new()).is_retryable());
        assert!(!ClassifierError::from_status(400, String::new()).is_retryable());
        assert!(!ClassifierError::from_status(401, String::new()).is_retryable());
        assert!(!ClassifierError::EmptyResponse.is_retryable());
    }

    #[tokio::test]
    async fn test_batch_uses_model_reply() {
        let backend = ScriptedBackend::new(vec![Reply::Text(
            r#"[{"word":"cat","difficulty_level":1},{"word":"sophisticated","difficulty_level":6}]"#,
        )]);
        let judgments = classifier(backend.clone())
            .classify_batch(&words(&["cat", "sophisticated"]))
            .await;

        assert_eq!(judgments[0].difficulty_level, 1);
        assert_eq!(judgments[1].difficulty_level, 6);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_errors_then_succeeds() {
        let backend = ScriptedBackend::new(vec![
            Reply::Status(503),
            Reply::Text(r#"{"difficulty_level": 3}"#),
        ]);
        let judgment = classifier(backend.clone()).classify_one("kitchen", None).await;

        assert_eq!(judgment.difficulty_level, 3);
        assert!(!judgment.from_fallback);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_budget_is_bounded() {
        let backend = ScriptedBackend::new(vec![Reply::Status(500)]);
        let judgment = classifier(backend.clone()).classify_one("elephant", None).await;

        assert!(judgment.from_fallback);
        assert_eq!(judgment.difficulty_level, 4);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_failure_falls_back_without_retry() {
        let backend = ScriptedBackend::new(vec![Reply::Status(401)]);
        let judgments = classifier(backend.clone())
            .classify_batch(&words(&["the", "sophisticated"]))
            .await;

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert!(judgments.iter().all(|j| j.from_fallback));
        assert_eq!(judgments[0].difficulty_level, 1);
        assert_eq!(judgments[1].difficulty_level, 5);
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_call() {
        let backend = ScriptedBackend::new(vec![Reply::Text("[]")]);
        assert!(classifier(backend.clone()).classify_batch(&[]).await.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_from_config_requires_api_key() {
        assert!(DifficultyClassifier::from_config(&ClassifierConfig::default()).is_err());
    }
}
