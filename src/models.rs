//! Data models shared by the ingestion pipeline and the pairing API.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---

/// Compact weather record produced by the cleaning step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    // ---
    pub city: String,
    pub temp_c: f64,
    pub feels_like_c: f64,
    pub temp_f: f64,
    pub feels_like_f: f64,
}

/// Per-city fetch failure as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherFailure {
    pub city: String,
    pub error: String,
}

/// One entry of the merged weather list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeatherEntry {
    Record(WeatherRecord),
    Failed(WeatherFailure),
}

/// One entry of the wine list: a description or the reason there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WineEntry {
    Described { wine: String, description: String },
    Failed { wine: String, error: String },
}

impl WineEntry {
    pub fn name(&self) -> &str {
        match self {
            WineEntry::Described { wine, .. } | WineEntry::Failed { wine, .. } => wine,
        }
    }
}

/// Combined weather and wine document, the only data source for pairing queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedDataset {
    // ---
    #[serde(default)]
    pub weather: Vec<WeatherEntry>,
    #[serde(default)]
    pub wine: Vec<WineEntry>,
}

impl MergedDataset {
    // ---
    /// Read the merged document from disk. Unlike the merge step this is
    /// strict: the server refuses to start without a readable dataset.
    pub fn load(path: &Path) -> Result<Self> {
        // ---
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read merged dataset '{}'", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Merged dataset '{}' is not valid", path.display()))
    }

    /// Successfully cleaned weather records, in file order.
    pub fn weather_records(&self) -> impl Iterator<Item = &WeatherRecord> {
        self.weather.iter().filter_map(|entry| match entry {
            WeatherEntry::Record(record) => Some(record),
            WeatherEntry::Failed(_) => None,
        })
    }

    /// City names exactly as returned by the weather provider.
    pub fn known_cities(&self) -> Vec<String> {
        self.weather_records().map(|r| r.city.clone()).collect()
    }

    /// Case-insensitive exact lookup, ignoring surrounding whitespace.
    pub fn find_weather(&self, city: &str) -> Option<&WeatherRecord> {
        let wanted = city.trim().to_lowercase();
        self.weather_records()
            .find(|r| r.city.trim().to_lowercase() == wanted)
    }

    /// Every configured wine name, whether or not its description was fetched.
    pub fn wine_names(&self) -> Vec<&str> {
        self.wine.iter().map(WineEntry::name).collect()
    }
}

/// Persisted row of `analysis_summaries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnalysisSummary {
    // ---
    pub id: i32,
    pub city: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub wine_recommendation: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Values for a summary row that has not been inserted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSummary {
    pub city: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub wine_recommendation: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

// ---

/// Celsius to Fahrenheit, rounded to two decimals.
pub fn c_to_f(celsius: f64) -> f64 {
    // ---
    ((celsius * 9.0 / 5.0 + 32.0) * 100.0).round() / 100.0
}

/// Project a raw provider payload into a [`WeatherRecord`].
///
/// Returns `None` unless the payload carries `main.temp`, `main.feels_like`
/// and `name`; error records from the fetch stage fall out here too.
pub fn clean_weather_entry(raw: &Value) -> Option<WeatherRecord> {
    // ---
    let main = raw.get("main")?;
    let temp_c = main.get("temp")?.as_f64()?;
    let feels_like_c = main.get("feels_like")?.as_f64()?;
    let city = raw.get("name")?.as_str()?.to_string();

    Some(WeatherRecord {
        city,
        temp_c,
        feels_like_c,
        temp_f: c_to_f(temp_c),
        feels_like_f: c_to_f(feels_like_c),
    })
}

/// Clean a whole batch, dropping (and logging) incomplete entries.
pub fn clean_weather_data(raw: &[Value]) -> Vec<WeatherRecord> {
    // ---
    let mut cleaned = Vec::with_capacity(raw.len());
    for entry in raw {
        match clean_weather_entry(entry) {
            Some(record) => cleaned.push(record),
            None => {
                let who = entry
                    .get("name")
                    .or_else(|| entry.get("city"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown city");
                tracing::warn!("Incomplete weather data for {}, dropping entry", who);
            }
        }
    }
    tracing::info!("Cleaned {} of {} weather entries", cleaned.len(), raw.len());
    cleaned
}
