//! Database Test Utilities

use anyhow::Result;
use glossa_enrich::models::BatchOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create a temporary word database
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_glossa.db");
    let pool = glossa_common::db::init_database(&db_path).await?;
    Ok((temp_dir, pool))
}

/// Batch options with millisecond delays so retry tests stay fast
pub fn test_options() -> BatchOptions {
    BatchOptions {
        batch_size: 20,
        max_retries: 2,
        retry_delay_ms: 1,
        timeout_ms: 1000,
        concurrency: 4,
        inter_chunk_delay_ms: 0,
    }
}
