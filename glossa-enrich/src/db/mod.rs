//! Database access for glossa-enrich

pub mod words;

pub use words::{SqliteWordStore, WordStore};
