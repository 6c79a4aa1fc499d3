//! Wine pairing for a city's current weather.
//!
//! A request moves through: city extraction → weather lookup → duplicate
//! check → prompt → model call → persistence. The merged dataset is
//! injected at construction and never changes afterwards.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::llm::{ChatModel, ModelError};
use crate::store::{StoreError, SummaryStore};
use crate::{AnalysisSummary, MergedDataset, NewSummary, WeatherRecord};

/// Stored in `wine_recommendation`; the model's free text is not parsed.
pub const WINE_PLACEHOLDER: &str = "TBD";

// ---

#[derive(Debug, Error)]
pub enum RecommendError {
    // ---
    #[error("Could not determine city from the query.")]
    NoCity,

    #[error("Weather data for '{city}' not found.")]
    UnknownCity {
        city: String,
        available: Vec<String>,
    },

    #[error("Language model error: {0}")]
    Model(#[from] ModelError),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

/// Successful outcome of a pairing request.
#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    /// Freshly generated by the model.
    Created(String),
    /// Already stored for the same city and temperatures; no model call made.
    Duplicate(AnalysisSummary),
}

pub struct RecommendationService {
    dataset: Arc<MergedDataset>,
    store: Arc<dyn SummaryStore>,
    model: Arc<dyn ChatModel>,
}

impl RecommendationService {
    // ---
    pub fn new(
        dataset: Arc<MergedDataset>,
        store: Arc<dyn SummaryStore>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            dataset,
            store,
            model,
        }
    }

    /// First known city whose lowercase name occurs in the query, title-cased.
    pub fn extract_city(&self, query: &str) -> Option<String> {
        // ---
        let query = query.to_lowercase();
        self.dataset
            .known_cities()
            .into_iter()
            .map(|city| city.to_lowercase())
            .find(|city| query.contains(city.as_str()))
            .map(|city| title_case(&city))
    }

    pub fn weather_for(&self, city: &str) -> Result<&WeatherRecord, RecommendError> {
        // ---
        self.dataset
            .find_weather(city)
            .ok_or_else(|| RecommendError::UnknownCity {
                city: city.to_string(),
                available: self.dataset.known_cities(),
            })
    }

    pub async fn recommend(&self, question: &str) -> Result<Recommendation, RecommendError> {
        // ---
        tracing::info!("Received query: {}", question);

        let city = self.extract_city(question).ok_or_else(|| {
            tracing::warn!("City not found in query");
            RecommendError::NoCity
        })?;

        let weather = self.weather_for(&city).inspect_err(|_| {
            tracing::warn!("Weather data for '{}' not found", city);
        })?;

        if let Some(existing) = self
            .store
            .find_duplicate(&city, weather.temp_c, weather.feels_like_c)
            .await?
        {
            tracing::info!(
                "Duplicate entry found for city '{}', skipping model call",
                city
            );
            return Ok(Recommendation::Duplicate(existing));
        }

        let prompt = build_prompt(&city, weather, &self.dataset.wine_names());
        tracing::info!("Requesting wine recommendation for '{}'", city);
        let summary = self.model.complete(&prompt).await.inspect_err(|e| {
            tracing::error!("Model call failed for '{}': {}", city, e);
        })?;

        let row = NewSummary {
            city: city.clone(),
            temperature_c: weather.temp_c,
            feels_like_c: weather.feels_like_c,
            wine_recommendation: WINE_PLACEHOLDER.to_string(),
            summary: summary.clone(),
            created_at: Utc::now(),
        };

        // The model call already succeeded, so a failed write is logged, not surfaced
        match self.store.insert(&row).await {
            Ok(Some(stored)) => {
                tracing::info!("Summary stored for '{}' with id {}", city, stored.id)
            }
            Ok(None) => tracing::info!(
                "Summary for '{}' already stored by a concurrent request",
                city
            ),
            Err(e) => tracing::error!("Failed to store summary for '{}': {}", city, e),
        }

        Ok(Recommendation::Created(summary))
    }
}

/// Deterministic pairing prompt over every configured wine name.
pub fn build_prompt(city: &str, weather: &WeatherRecord, wines: &[&str]) -> String {
    // ---
    format!(
        "The current temperature in {city} is {}\u{b0}C and it feels like {}\u{b0}C.\n\
         From the following wines: {}, choose the most suitable one for this weather.\n\
         In your response, explicitly mention the temperature values and explain why the wine is suitable.",
        weather.temp_c,
        weather.feels_like_c,
        wines.join(", "),
    )
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    // ---
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::llm::MockChatModel;
    use crate::models::{c_to_f, WeatherEntry, WineEntry};
    use crate::store::MemoryStore;

    fn weather(city: &str, temp_c: f64, feels_like_c: f64) -> WeatherEntry {
        WeatherEntry::Record(WeatherRecord {
            city: city.to_string(),
            temp_c,
            feels_like_c,
            temp_f: c_to_f(temp_c),
            feels_like_f: c_to_f(feels_like_c),
        })
    }

    fn dataset() -> Arc<MergedDataset> {
        // ---
        Arc::new(MergedDataset {
            weather: vec![
                weather("London", 11.2, 9.8),
                weather("New York", 4.0, 0.5),
                weather("paris", 18.5, 17.9),
            ],
            wine: vec![
                WineEntry::Described {
                    wine: "merlot".to_string(),
                    description: "Soft.".to_string(),
                },
                WineEntry::Failed {
                    wine: "riesling".to_string(),
                    error: "timeout".to_string(),
                },
            ],
        })
    }

    fn service(store: Arc<MemoryStore>, model: MockChatModel) -> RecommendationService {
        RecommendationService::new(dataset(), store, Arc::new(model))
    }

    #[test]
    fn test_extract_city_title_cases() {
        // ---
        let svc = service(Arc::new(MemoryStore::default()), MockChatModel::new());

        assert_eq!(svc.extract_city("weather in Paris"), Some("Paris".to_string()));
        assert_eq!(
            svc.extract_city("WHAT ABOUT NEW YORK TONIGHT?"),
            Some("New York".to_string())
        );
        assert_eq!(svc.extract_city("weather in Lisbon"), None);
    }

    #[test]
    fn test_extract_city_first_known_city_wins() {
        // ---
        let svc = service(Arc::new(MemoryStore::default()), MockChatModel::new());

        // dataset order decides, not position in the query
        assert_eq!(
            svc.extract_city("paris or london?"),
            Some("London".to_string())
        );
    }

    #[test]
    fn test_unknown_city_lists_available() {
        // ---
        let svc = service(Arc::new(MemoryStore::default()), MockChatModel::new());

        match svc.weather_for("Lisbon") {
            Err(RecommendError::UnknownCity { city, available }) => {
                assert_eq!(city, "Lisbon");
                assert_eq!(available, vec!["London", "New York", "paris"]);
            }
            other => panic!("expected UnknownCity, got {other:?}"),
        }
        assert_eq!(svc.weather_for("PARIS").unwrap().temp_c, 18.5);
    }

    #[test]
    fn test_prompt_lists_every_wine_name() {
        // ---
        let data = dataset();
        let paris = data.find_weather("Paris").unwrap();
        let prompt = build_prompt("Paris", paris, &data.wine_names());

        assert!(prompt.starts_with(
            "The current temperature in Paris is 18.5\u{b0}C and it feels like 17.9\u{b0}C.\n"
        ));
        assert!(prompt.contains("From the following wines: merlot, riesling, choose"));
        assert!(prompt.ends_with("explain why the wine is suitable."));
    }

    #[tokio::test]
    async fn test_no_city_skips_everything() {
        // ---
        let mut model = MockChatModel::new();
        model.expect_complete().never();
        let store = Arc::new(MemoryStore::default());
        let svc = service(store.clone(), model);

        let err = svc.recommend("any wine for Lisbon?").await.unwrap_err();
        assert!(matches!(err, RecommendError::NoCity));
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_repeat_request_calls_model_once() {
        // ---
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|_| Ok("18.5\u{b0}C in Paris calls for a merlot.".to_string()));
        let store = Arc::new(MemoryStore::default());
        let svc = service(store.clone(), model);

        let first = svc.recommend("weather in Paris").await.unwrap();
        assert_eq!(
            first,
            Recommendation::Created("18.5\u{b0}C in Paris calls for a merlot.".to_string())
        );

        let second = svc.recommend("and Paris again?").await.unwrap();
        match second {
            Recommendation::Duplicate(row) => {
                assert_eq!(row.summary, "18.5\u{b0}C in Paris calls for a merlot.");
            }
            other => panic!("expected Duplicate, got {other:?}"),
        }

        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].city, "Paris");
        assert_eq!(rows[0].temperature_c, 18.5);
        assert_eq!(rows[0].feels_like_c, 17.9);
        assert_eq!(rows[0].wine_recommendation, WINE_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_model_failure_is_not_stored() {
        // ---
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|_| Err(ModelError::Timeout));
        let store = Arc::new(MemoryStore::default());
        let svc = service(store.clone(), model);

        let err = svc.recommend("London please").await.unwrap_err();
        assert!(matches!(err, RecommendError::Model(ModelError::Timeout)));
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_still_returns_summary() {
        // ---
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|_| Ok("A chilled riesling.".to_string()));
        let store = Arc::new(MemoryStore::default());
        store.fail_inserts();
        let svc = service(store.clone(), model);

        let outcome = svc.recommend("New York?").await.unwrap();
        assert_eq!(
            outcome,
            Recommendation::Created("A chilled riesling.".to_string())
        );
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_losing_insert_race_keeps_single_row() {
        // ---
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|_| Ok("Our own merlot answer.".to_string()));
        let store = Arc::new(MemoryStore::default());
        store.lose_next_race("The other request's answer.");
        let svc = service(store.clone(), model);

        let outcome = svc.recommend("Paris tonight").await.unwrap();
        assert_eq!(
            outcome,
            Recommendation::Created("Our own merlot answer.".to_string())
        );

        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary, "The other request's answer.");
        assert_eq!(rows[0].city, "Paris");
    }

    #[tokio::test]
    async fn test_duplicate_check_failure_surfaces() {
        // ---
        let mut model = MockChatModel::new();
        model.expect_complete().never();
        let store = Arc::new(MemoryStore::default());
        store.fail_all();
        let svc = service(store, model);

        let err = svc.recommend("London please").await.unwrap_err();
        assert!(matches!(err, RecommendError::Store(_)));
    }

    #[test]
    fn test_title_case() {
        // ---
        assert_eq!(title_case("new york"), "New York");
        assert_eq!(title_case("SAO-PAULO"), "Sao-Paulo");
        assert_eq!(title_case(""), "");
    }
}
