//! Data models for the enrichment pipeline

pub mod batch;
pub mod enrich;
pub mod judgment;
pub mod translation;

pub use batch::{BatchOptions, BatchPhase, BatchResult, WordOutcome};
pub use enrich::{
    EnrichOptions, EnrichRequest, EnrichResponse, EnrichmentReport, EnrichmentStats,
    MAX_WORDS_PER_CALL,
};
pub use judgment::{ClassifierJudgment, WordContext, MIDPOINT_DIFFICULTY};
pub use translation::ProviderTranslation;
