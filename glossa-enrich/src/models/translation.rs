//! Provider call result

use serde::{Deserialize, Serialize};

/// Result of one successful provider lookup.
///
/// Lives only for the duration of a batch; merged into a `WordRecord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderTranslation {
    pub word: String,
    /// May be empty: an empty translation from a provider still counts as success
    pub translation: String,
    pub phonetic: Option<String>,
    pub part_of_speech: Option<String>,
    /// Name of the provider that answered
    pub provider: String,
}

impl ProviderTranslation {
    pub fn new(
        word: impl Into<String>,
        translation: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            word: word.into(),
            translation: translation.into(),
            phonetic: None,
            part_of_speech: None,
            provider: provider.into(),
        }
    }
}
