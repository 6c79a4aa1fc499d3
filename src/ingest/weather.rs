//! OpenWeatherMap current-conditions fetcher.

use reqwest::Client;
use serde_json::{json, Value};

use super::fetch::{fetch_all, Fetched};

/// Cities fetched on every ingest run.
pub const CITIES: &[&str] = &[
    "London", "New York", "Tokyo", "Paris", "Berlin", "Mumbai", "Sydney",
];

// ---

/// Fetch current weather for every city.
///
/// Successful payloads are kept verbatim; failures become
/// `{"city": <name>, "error": <reason>}` so the raw artifact still lists
/// every requested city.
pub async fn fetch_weather(
    client: &Client,
    base_url: &str,
    api_key: &str,
    cities: &[&str],
) -> Vec<Value> {
    // ---
    tracing::info!("Fetching weather for {} cities", cities.len());

    let fetched = fetch_all(cities, |city| {
        client
            .get(base_url)
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
    })
    .await;

    fetched.into_iter().map(to_raw_entry).collect()
}

fn to_raw_entry(fetched: Fetched) -> Value {
    // ---
    match fetched.result {
        Ok(payload) => payload,
        Err(e) => json!({ "city": fetched.name, "error": e.to_string() }),
    }
}
