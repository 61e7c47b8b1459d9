//! Enrichment pipeline services, leaf to root

pub mod batch_orchestrator;
pub mod cache_store;
pub mod classifier;
pub mod enrichment_coordinator;
pub mod normalizer;
pub mod providers;

pub use batch_orchestrator::BatchOrchestrator;
pub use cache_store::{CacheError, CacheStore, MemoryCache, WordCache};
pub use classifier::{ClassifierError, DifficultyClassifier, LlmBackend};
pub use enrichment_coordinator::{CoordinatorBuilder, EnrichmentCoordinator};
pub use providers::{ChainError, ProviderChain, ProviderError, TranslationProvider};
