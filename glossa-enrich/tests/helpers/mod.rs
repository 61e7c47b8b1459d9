//! Test Helper Utilities
//!
//! Shared utilities for testing glossa-enrich

#![allow(dead_code)]

pub mod db_utils;
pub mod mocks;

pub use db_utils::{create_test_db, test_options};
pub use mocks::{
    harness, harness_with, harness_with_cache, orchestrator, FailingCache, FailingStore, Harness,
    ScriptedLlm, ScriptedProvider,
};
