//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest difficulty level a word can carry
pub const MIN_DIFFICULTY: u8 = 1;
/// Highest difficulty level a word can carry
pub const MAX_DIFFICULTY: u8 = 10;

/// Where the data of a returned word record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordSource {
    /// Served from the cache store
    Cache,
    /// Served from the persistent store
    Database,
    /// Translated by a provider, difficulty judged by the classifier
    Provider,
    /// Translation taken from the classifier's metadata (provider chain exhausted)
    Classifier,
    /// Difficulty produced by the rule-based fallback
    Fallback,
}

impl WordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            WordSource::Cache => "cache",
            WordSource::Database => "database",
            WordSource::Provider => "provider",
            WordSource::Classifier => "classifier",
            WordSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for WordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WordSource {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache" => Ok(WordSource::Cache),
            "database" => Ok(WordSource::Database),
            "provider" => Ok(WordSource::Provider),
            "classifier" => Ok(WordSource::Classifier),
            "fallback" => Ok(WordSource::Fallback),
            other => Err(crate::Error::InvalidInput(format!("unknown word source: {}", other))),
        }
    }
}

/// Clamp an arbitrary integer into the 1-10 difficulty range
pub fn clamp_difficulty(level: i64) -> u8 {
    level.clamp(MIN_DIFFICULTY as i64, MAX_DIFFICULTY as i64) as u8
}

/// Enriched word, keyed by its normalized (lower-case) spelling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordRecord {
    pub word: String,
    pub translation: String,
    pub phonetic: Option<String>,
    pub part_of_speech: Option<String>,
    /// Always within `MIN_DIFFICULTY..=MAX_DIFFICULTY`
    pub difficulty_level: u8,
    pub source: WordSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WordRecord {
    /// Create a new record stamped with the current time.
    ///
    /// The difficulty is clamped into range, so callers never persist an
    /// out-of-range level.
    pub fn new(
        word: impl Into<String>,
        translation: impl Into<String>,
        difficulty_level: i64,
        source: WordSource,
    ) -> Self {
        let now = Utc::now();
        Self {
            word: word.into(),
            translation: translation.into(),
            phonetic: None,
            part_of_speech: None,
            difficulty_level: clamp_difficulty(difficulty_level),
            source,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_phonetic(mut self, phonetic: Option<String>) -> Self {
        self.phonetic = phonetic;
        self
    }

    pub fn with_part_of_speech(mut self, part_of_speech: Option<String>) -> Self {
        self.part_of_speech = part_of_speech;
        self
    }

    /// Relabel the record with the tier that served it
    pub fn served_from(mut self, source: WordSource) -> Self {
        self.source = source;
        self
    }

    /// Drop the optional detail fields (phonetic, part of speech)
    pub fn without_details(mut self) -> Self {
        self.phonetic = None;
        self.part_of_speech = None;
        self
    }
}
