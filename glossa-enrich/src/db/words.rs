//! Word database operations
//!
//! The persistent store owns `WordRecord`s. Batch upserts are all-or-nothing
//! inside one transaction; when the transaction itself fails the batch is
//! replayed row by row so one bad row cannot block the rest.

use crate::utils::{retry_with_backoff, RetryPolicy};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use glossa_common::{Error, Result, WordRecord, WordSource};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// SQLite bound-parameter headroom per IN (...) query
const LOOKUP_CHUNK: usize = 500;

const SELECT_COLUMNS: &str =
    "word, translation, phonetic, part_of_speech, difficulty_level, source, created_at, updated_at";

/// Durable word storage keyed by the normalized word
#[async_trait]
pub trait WordStore: Send + Sync {
    async fn find_by_word(&self, word: &str) -> Result<Option<WordRecord>>;

    /// Every requested word appears in the map, with `None` for misses
    async fn batch_find_by_words(
        &self,
        words: &[String],
    ) -> Result<HashMap<String, Option<WordRecord>>>;

    /// Insert-or-update on `word`; returns the rows as persisted
    async fn upsert_batch(&self, records: &[WordRecord]) -> Result<Vec<WordRecord>>;

    /// Number of stored words
    async fn count(&self) -> Result<i64>;
}

/// `WordStore` backed by the shared SQLite pool
#[derive(Clone)]
pub struct SqliteWordStore {
    pool: SqlitePool,
    lock_retry: RetryPolicy,
}

impl SqliteWordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            // Lock contention: 10ms, 20ms, 40ms ... capped at 1s
            lock_retry: RetryPolicy::exponential(
                6,
                Duration::from_millis(10),
                Duration::from_millis(1000),
            ),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn upsert_in_transaction(&self, records: &[WordRecord]) -> Result<Vec<WordRecord>> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(records.len());

        for record in records {
            // An error here drops `tx`, which rolls the whole batch back
            saved.push(upsert_one(&mut *tx, record).await?);
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn upsert_row_by_row(&self, records: &[WordRecord]) -> Result<Vec<WordRecord>> {
        let mut saved = Vec::with_capacity(records.len());
        let mut last_error = None;

        for record in records {
            match upsert_one(&self.pool, record).await {
                Ok(row) => saved.push(row),
                Err(e) => {
                    warn!(word = %record.word, error = %e, "Row upsert failed, skipping word");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if saved.is_empty() => Err(e),
            _ => Ok(saved),
        }
    }
}

#[async_trait]
impl WordStore for SqliteWordStore {
    async fn find_by_word(&self, word: &str) -> Result<Option<WordRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM words WHERE word = ?", SELECT_COLUMNS))
            .bind(word)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_record(&row)).transpose()
    }

    async fn batch_find_by_words(
        &self,
        words: &[String],
    ) -> Result<HashMap<String, Option<WordRecord>>> {
        let mut found: HashMap<String, Option<WordRecord>> =
            words.iter().map(|w| (w.clone(), None)).collect();

        for chunk in words.chunks(LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT {} FROM words WHERE word IN ({})",
                SELECT_COLUMNS, placeholders
            );

            let mut query = sqlx::query(&sql);
            for word in chunk {
                query = query.bind(word);
            }

            for row in query.fetch_all(&self.pool).await? {
                let record = row_to_record(&row)?;
                found.insert(record.word.clone(), Some(record));
            }
        }

        Ok(found)
    }

    async fn upsert_batch(&self, records: &[WordRecord]) -> Result<Vec<WordRecord>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let outcome = retry_with_backoff(
            "word batch upsert",
            &self.lock_retry,
            Error::is_database_locked,
            |_| self.upsert_in_transaction(records),
        )
        .await;

        match outcome.result {
            Ok(saved) => {
                debug!(rows = saved.len(), retries = outcome.retries, "Batch upsert committed");
                Ok(saved)
            }
            Err(e) => {
                warn!(
                    rows = records.len(),
                    error = %e,
                    "Batch upsert transaction failed, falling back to row-by-row upsert"
                );
                self.upsert_row_by_row(records).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM words")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Insert-or-update one record; `created_at` survives conflicts
async fn upsert_one<'e, E>(executor: E, record: &WordRecord) -> Result<WordRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO words (
            word, translation, phonetic, part_of_speech, difficulty_level, source,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(word) DO UPDATE SET
            translation = excluded.translation,
            phonetic = excluded.phonetic,
            part_of_speech = excluded.part_of_speech,
            difficulty_level = excluded.difficulty_level,
            source = excluded.source,
            updated_at = excluded.updated_at
        RETURNING {}
        "#,
        SELECT_COLUMNS
    ))
    .bind(&record.word)
    .bind(&record.translation)
    .bind(&record.phonetic)
    .bind(&record.part_of_speech)
    .bind(record.difficulty_level as i64)
    .bind(record.source.as_str())
    .bind(record.created_at.to_rfc3339())
    .bind(Utc::now().to_rfc3339())
    .fetch_one(executor)
    .await?;

    row_to_record(&row)
}

fn row_to_record(row: &SqliteRow) -> Result<WordRecord> {
    let source: String = row.get("source");
    let difficulty: i64 = row.get("difficulty_level");

    Ok(WordRecord {
        word: row.get("word"),
        translation: row.get("translation"),
        phonetic: row.get("phonetic"),
        part_of_speech: row.get("part_of_speech"),
        difficulty_level: glossa_common::db::models::clamp_difficulty(difficulty),
        source: source.parse::<WordSource>()?,
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

fn parse_timestamp(value: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp '{}': {}", value, e)))
}
