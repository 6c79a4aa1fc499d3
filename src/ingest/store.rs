use anyhow::Result;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::MergedDataset;

// ---

/// Archive one merged document in `merged_data`. Nothing reads this table back.
pub async fn store_merged(pool: &PgPool, merged: &MergedDataset) -> Result<i32> {
    // ---
    let id: i32 = sqlx::query_scalar("INSERT INTO merged_data (data) VALUES ($1) RETURNING id")
        .bind(Json(merged))
        .fetch_one(pool)
        .await?;

    tracing::info!("Merged document stored in merged_data with id {}", id);
    Ok(id)
}
