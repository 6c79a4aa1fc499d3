//! Database schema management for `winecast`.
//!
//! Ensures required tables and indexes exist before serving requests or
//! archiving an ingest run. Applied once on startup from `main.rs`
//! (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `merged_data` archive table and the `analysis_summaries` log.
/// Safe to call on every startup; no-op if objects already exist.
///
/// The unique index on the dedup key fails to build on a table that already
/// holds duplicate rows; remove those before upgrading.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // One row per ingest run; written, never read back
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS merged_data (
            id   SERIAL PRIMARY KEY,
            data JSONB
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Append-only log of generated pairings served by `/results` and `/analysis`
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_summaries (
            id                  SERIAL PRIMARY KEY,
            city                TEXT             NOT NULL,
            temperature_c       DOUBLE PRECISION NOT NULL,
            feels_like_c        DOUBLE PRECISION NOT NULL,
            wine_recommendation TEXT             NOT NULL,
            summary             TEXT             NOT NULL,
            created_at          TIMESTAMPTZ      NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Dedup key; the insert path relies on ON CONFLICT against this index
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS uq_analysis_summaries_key
            ON analysis_summaries (city, temperature_c, feels_like_c);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_analysis_summaries_city_created
            ON analysis_summaries (city, created_at DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
