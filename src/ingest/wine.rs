//! Spoonacular wine description fetcher.

use reqwest::Client;

use super::fetch::{fetch_all, Fetched};
use crate::models::WineEntry;

/// Wines described on every ingest run.
pub const WINES: &[&str] = &[
    "merlot",
    "chardonnay",
    "malbec",
    "riesling",
    "cabernet sauvignon",
    "pinot noir",
    "sauvignon blanc",
    "syrah",
    "zinfandel",
    "tempranillo",
    "grenache",
];

const NO_DESCRIPTION: &str = "No description available";

// ---

pub async fn fetch_wines(
    client: &Client,
    base_url: &str,
    api_key: &str,
    wines: &[&str],
) -> Vec<WineEntry> {
    // ---
    tracing::info!("Fetching descriptions for {} wines", wines.len());

    let fetched = fetch_all(wines, |wine| {
        client
            .get(base_url)
            .query(&[("wine", wine), ("apiKey", api_key)])
    })
    .await;

    fetched.into_iter().map(to_entry).collect()
}

fn to_entry(fetched: Fetched) -> WineEntry {
    // ---
    match fetched.result {
        Ok(body) => WineEntry::Described {
            description: body
                .get("wineDescription")
                .and_then(|d| d.as_str())
                .unwrap_or(NO_DESCRIPTION)
                .to_string(),
            wine: fetched.name,
        },
        Err(e) => WineEntry::Failed {
            wine: fetched.name,
            error: e.to_string(),
        },
    }
}
