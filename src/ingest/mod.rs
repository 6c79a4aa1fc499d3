//! Ingestion pipeline: fetch → clean → merge → archive.
//!
//! Each stage writes its artifact under `DATA_DIR` so the stages can be
//! inspected (or rerun) independently:
//! - `Weather_train.json` – raw provider payloads and per-city error records
//! - `weather_cleaned.json` – compact [`WeatherRecord`](crate::models::WeatherRecord) list
//! - `Wine_train.json` – wine descriptions and per-wine error records
//! - `merged_data.json` – the document the API server loads at startup

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;

use crate::{clean_weather_data, Config, MergedDataset};

mod fetch;
mod merge;
mod store;
mod weather;
mod wine;

use merge::{merge_files, write_json};

pub const RAW_WEATHER_FILE: &str = "Weather_train.json";
pub const CLEANED_WEATHER_FILE: &str = "weather_cleaned.json";
pub const WINE_FILE: &str = "Wine_train.json";
pub const MERGED_FILE: &str = "merged_data.json";

// ---

/// Location of the merged document for a given data directory.
pub fn merged_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join(MERGED_FILE)
}

/// Run every ingestion stage. `pool` is `None` when archiving is skipped.
pub async fn run(config: &Config, pool: Option<&PgPool>) -> Result<MergedDataset> {
    // ---
    tracing::info!("Ingest - starting");
    let data_dir = Path::new(&config.data_dir);
    let client = fetch::build_client(Duration::from_secs(config.fetch_timeout_secs))?;

    // Step 1: Fetch both sources concurrently
    tracing::debug!("Ingest - Step 1");
    let (raw_weather, wines) = tokio::join!(
        weather::fetch_weather(
            &client,
            &config.weather_api_url,
            &config.weather_api_key,
            weather::CITIES
        ),
        wine::fetch_wines(
            &client,
            &config.wine_api_url,
            &config.wine_api_key,
            wine::WINES
        ),
    );

    // Step 2: Persist raw output, clean, persist cleaned output
    tracing::debug!("Ingest - Step 2");
    write_json(&raw_weather, &data_dir.join(RAW_WEATHER_FILE)).await?;
    let cleaned = clean_weather_data(&raw_weather);
    write_json(&cleaned, &data_dir.join(CLEANED_WEATHER_FILE)).await?;
    write_json(&wines, &data_dir.join(WINE_FILE)).await?;

    // Step 3: Merge from the artifacts just written
    tracing::debug!("Ingest - Step 3");
    let merged = merge_files(
        &data_dir.join(CLEANED_WEATHER_FILE),
        &data_dir.join(WINE_FILE),
    )
    .await;
    write_json(&merged, &data_dir.join(MERGED_FILE)).await?;

    // Step 4: Archive the merged document
    tracing::debug!("Ingest - Step 4");
    match pool {
        Some(pool) => {
            store::store_merged(pool, &merged).await?;
        }
        None => tracing::info!("Skipping merged_data archive"),
    }

    tracing::info!("Ingest - complete");
    Ok(merged)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer, data_dir: &Path) -> Config {
        // ---
        Config {
            db_url: "postgres://localhost/unused".to_string(),
            db_pool_max: 1,
            port: 0,
            data_dir: data_dir.to_string_lossy().into_owned(),
            weather_api_key: "wk".to_string(),
            weather_api_url: format!("{}/weather", server.uri()),
            wine_api_key: "sk".to_string(),
            wine_api_url: format!("{}/wine", server.uri()),
            openai_api_key: "ok".to_string(),
            openai_api_url: server.uri(),
            openai_model: "gpt-4".to_string(),
            fetch_timeout_secs: 5,
            llm_timeout_secs: 5,
            db_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_pipeline_writes_every_artifact() {
        // ---
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Paris"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Paris",
                "main": { "temp": 20.0, "feels_like": 19.0 }
            })))
            .with_priority(1)
            .mount(&server)
            .await;
        // Every other city fails
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wine"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "wineDescription": "Lovely."
            })))
            .mount(&server)
            .await;

        let cfg = test_config(&server, dir.path());
        let merged = run(&cfg, None).await.unwrap();

        assert_eq!(merged.known_cities(), vec!["Paris".to_string()]);
        assert_eq!(merged.wine.len(), wine::WINES.len());

        let raw: Vec<serde_json::Value> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(RAW_WEATHER_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(raw.len(), weather::CITIES.len());
        assert!(raw.contains(&json!({ "city": "Sydney", "error": "HTTP 500" })));

        assert!(dir.path().join(CLEANED_WEATHER_FILE).exists());
        assert_eq!(
            MergedDataset::load(&merged_path(&cfg.data_dir)).unwrap(),
            merged
        );
    }
}
