//! Classifier input and output types

use glossa_common::db::models::clamp_difficulty;
use serde::{Deserialize, Serialize};

/// Difficulty used when the model gives no usable number
pub const MIDPOINT_DIFFICULTY: u8 = 5;

/// A word handed to the classifier, with whatever translation is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordContext {
    pub word: String,
    pub translation: Option<String>,
}

impl WordContext {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            translation: None,
        }
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }
}

/// Difficulty judgment for one word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierJudgment {
    pub word: String,
    /// Always within 1..=10
    pub difficulty_level: u8,
    /// 0.0-1.0
    pub confidence: f32,
    pub reasoning: String,
    /// Translation metadata the model volunteered, if any
    pub translation: Option<String>,
    pub phonetic: Option<String>,
    pub part_of_speech: Option<String>,
    /// True when produced by the rule-based fallback instead of the model
    pub from_fallback: bool,
}

impl ClassifierJudgment {
    /// Build a model judgment, clamping the raw level into range
    pub fn from_model(
        word: impl Into<String>,
        raw_level: i64,
        confidence: f32,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            word: word.into(),
            difficulty_level: clamp_difficulty(raw_level),
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            translation: None,
            phonetic: None,
            part_of_speech: None,
            from_fallback: false,
        }
    }
}
