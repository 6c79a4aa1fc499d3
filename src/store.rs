//! Access to the `analysis_summaries` table.
//!
//! Handlers and the recommendation service only see the [`SummaryStore`]
//! trait, so tests can swap Postgres for an in-memory double.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::{AnalysisSummary, NewSummary};

#[cfg(test)]
pub use memory::MemoryStore;

// ---

#[derive(Debug, Error)]
pub enum StoreError {
    // ---
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database call timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait SummaryStore: Send + Sync + 'static {
    // ---
    /// Most recent row with exactly this dedup key.
    async fn find_duplicate(
        &self,
        city: &str,
        temperature_c: f64,
        feels_like_c: f64,
    ) -> Result<Option<AnalysisSummary>, StoreError>;

    /// Insert a row. Returns `None` when a row with the same dedup key
    /// already exists, in which case nothing is written.
    async fn insert(&self, summary: &NewSummary) -> Result<Option<AnalysisSummary>, StoreError>;

    /// All rows, newest first, optionally restricted to one city.
    async fn list(&self, city: Option<&str>) -> Result<Vec<AnalysisSummary>, StoreError>;

    /// Newest row, optionally restricted to one city.
    async fn latest(&self, city: Option<&str>) -> Result<Option<AnalysisSummary>, StoreError>;
}

// ---

const SUMMARY_COLUMNS: &str =
    "id, city, temperature_c, feels_like_c, wine_recommendation, summary, created_at";

/// Postgres-backed [`SummaryStore`]; every query is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct PgSummaryStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgSummaryStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        // ---
        match tokio::time::timeout(self.timeout, query).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl SummaryStore for PgSummaryStore {
    // ---
    async fn find_duplicate(
        &self,
        city: &str,
        temperature_c: f64,
        feels_like_c: f64,
    ) -> Result<Option<AnalysisSummary>, StoreError> {
        // ---
        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS} FROM analysis_summaries
            WHERE city = $1 AND temperature_c = $2 AND feels_like_c = $3
            ORDER BY created_at DESC LIMIT 1
            "#
        );
        self.bounded(
            sqlx::query_as::<_, AnalysisSummary>(&sql)
                .bind(city)
                .bind(temperature_c)
                .bind(feels_like_c)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn insert(&self, summary: &NewSummary) -> Result<Option<AnalysisSummary>, StoreError> {
        // ---
        let sql = format!(
            r#"
            INSERT INTO analysis_summaries (
                city, temperature_c, feels_like_c,
                wine_recommendation, summary, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (city, temperature_c, feels_like_c) DO NOTHING
            RETURNING {SUMMARY_COLUMNS}
            "#
        );
        self.bounded(
            sqlx::query_as::<_, AnalysisSummary>(&sql)
                .bind(&summary.city)
                .bind(summary.temperature_c)
                .bind(summary.feels_like_c)
                .bind(&summary.wine_recommendation)
                .bind(&summary.summary)
                .bind(summary.created_at)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn list(&self, city: Option<&str>) -> Result<Vec<AnalysisSummary>, StoreError> {
        // ---
        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS} FROM analysis_summaries
            WHERE $1::TEXT IS NULL OR city = $1
            ORDER BY created_at DESC
            "#
        );
        self.bounded(
            sqlx::query_as::<_, AnalysisSummary>(&sql)
                .bind(city)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn latest(&self, city: Option<&str>) -> Result<Option<AnalysisSummary>, StoreError> {
        // ---
        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS} FROM analysis_summaries
            WHERE $1::TEXT IS NULL OR city = $1
            ORDER BY created_at DESC LIMIT 1
            "#
        );
        self.bounded(
            sqlx::query_as::<_, AnalysisSummary>(&sql)
                .bind(city)
                .fetch_optional(&self.pool),
        )
        .await
    }
}

// ---
