//! # glossa Common Library
//!
//! Shared code for the glossa word-enrichment service:
//! - Error type used across crates
//! - TOML configuration loading and validation
//! - Database initialization and the persisted `WordRecord` model

pub mod config;
pub mod db;
pub mod error;

pub use db::models::{WordRecord, WordSource, MAX_DIFFICULTY, MIN_DIFFICULTY};
pub use error::{Error, Result};
