//! JSON artifacts on disk and the weather + wine merge.
//!
//! Reading an input artifact is forgiving: a missing file, invalid JSON, or
//! a document that is not a list all degrade to an empty list. Individual
//! list elements that do not match the expected shape are skipped.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::models::{MergedDataset, WeatherEntry, WineEntry};

// ---

/// Write `data` as UTF-8 JSON indented with four spaces, creating parent
/// directories as needed.
pub async fn write_json<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    // ---
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut ser)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, buf)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!("Data saved to {}", path.display());
    Ok(())
}

/// Load a list artifact, degrading to an empty list on any problem.
pub async fn load_list<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    // ---
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("File not found: {}, using empty list", path.display());
            return Vec::new();
        }
        Err(e) => {
            tracing::error!("Failed to read {}: {}, using empty list", path.display(), e);
            return Vec::new();
        }
    };

    let items = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            tracing::error!("{} does not hold a JSON list, using empty list", path.display());
            return Vec::new();
        }
        Err(e) => {
            tracing::error!("Invalid JSON in {}: {}, using empty list", path.display(), e);
            return Vec::new();
        }
    };

    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if parsed.len() != total {
        tracing::warn!(
            "Skipped {} malformed entries in {}",
            total - parsed.len(),
            path.display()
        );
    }
    tracing::info!("Loaded {} entries from {}", parsed.len(), path.display());
    parsed
}

/// Combine the cleaned weather artifact and the wine artifact.
///
/// This is a structural combination only; the two lists are unrelated until
/// a pairing query reads them.
pub async fn merge_files(weather_path: &Path, wine_path: &Path) -> MergedDataset {
    // ---
    let (weather, wine) = tokio::join!(
        load_list::<WeatherEntry>(weather_path),
        load_list::<WineEntry>(wine_path)
    );

    tracing::info!(
        "Merged {} weather and {} wine entries",
        weather.len(),
        wine.len()
    );
    MergedDataset { weather, wine }
}
