//! Concurrent per-item HTTP fan-out.
//!
//! Every item gets its own GET; all requests are in flight together on the
//! calling task and collected once every one of them has finished. A failing
//! item never aborts the batch, it turns into a [`FetchFailure`] keyed by
//! the item's name.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use thiserror::Error;

// ---

/// Why a single item could not be fetched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchFailure {
    // ---
    #[error("HTTP {0}")]
    Status(u16),

    #[error("timeout")]
    Timeout,

    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchFailure::Timeout
        } else {
            FetchFailure::Transport(e.to_string())
        }
    }
}

/// Outcome of fetching one item.
#[derive(Debug)]
pub struct Fetched {
    pub name: String,
    pub result: Result<Value, FetchFailure>,
}

/// Build the shared client; `timeout` bounds each request end to end.
pub fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    // ---
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Fetch every item concurrently. `request` turns a name into a ready request.
///
/// Results come back in input order, each keyed by its name.
pub async fn fetch_all<F>(names: &[&str], request: F) -> Vec<Fetched>
where
    F: Fn(&str) -> RequestBuilder,
{
    // ---
    stream::iter(names)
        .map(|name| {
            let builder = request(name);
            async move {
                let result = fetch_one(builder).await;
                match &result {
                    Ok(_) => tracing::info!("Fetched {}", name),
                    Err(FetchFailure::Status(status)) => {
                        tracing::warn!("Fetching {} failed with HTTP {}", name, status)
                    }
                    Err(e) => tracing::error!("Fetching {} failed: {}", name, e),
                }
                Fetched {
                    name: name.to_string(),
                    result,
                }
            }
        })
        .buffered(names.len().max(1))
        .collect()
        .await
}

async fn fetch_one(request: RequestBuilder) -> Result<Value, FetchFailure> {
    // ---
    let response = request.send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchFailure::Status(status.as_u16()));
    }
    Ok(response.json::<Value>().await?)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_mixed_batch_keeps_every_item() {
        // ---
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/item"))
            .and(query_param("q", "ok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": 1 })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item"))
            .and(query_param("q", "missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item"))
            .and(query_param("q", "slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item"))
            .and(query_param("q", "garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_millis(500)).unwrap();
        let url = format!("{}/item", server.uri());
        let fetched = fetch_all(&["ok", "missing", "slow", "garbled"], |name| {
            client.get(&url).query(&[("q", name)])
        })
        .await;

        assert_eq!(fetched.len(), 4);
        let by_name = |name: &str| {
            fetched
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.result.clone())
                .unwrap()
        };

        assert_eq!(by_name("ok").unwrap(), json!({ "value": 1 }));
        assert_eq!(by_name("missing").unwrap_err(), FetchFailure::Status(404));
        assert_eq!(by_name("slow").unwrap_err(), FetchFailure::Timeout);
        assert!(matches!(
            by_name("garbled").unwrap_err(),
            FetchFailure::Transport(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_failure() {
        // ---
        let client = build_client(Duration::from_secs(2)).unwrap();
        let fetched = fetch_all(&["nowhere"], |_| client.get("http://127.0.0.1:9/")).await;

        assert_eq!(fetched[0].name, "nowhere");
        assert!(matches!(
            fetched[0].result,
            Err(FetchFailure::Transport(_)) | Err(FetchFailure::Timeout)
        ));
    }

    #[test]
    fn test_failure_messages() {
        // ---
        assert_eq!(FetchFailure::Status(503).to_string(), "HTTP 503");
        assert_eq!(FetchFailure::Timeout.to_string(), "timeout");
        assert_eq!(
            FetchFailure::Transport("connection refused".into()).to_string(),
            "connection refused"
        );
    }
}
