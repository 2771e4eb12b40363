//! End-to-end analysis flows against mock provider servers.

use spotfinder_ai::{OpenAiClient, SpotAnalyzer, WeatherAnalysis, WeatherAnnotator};
use spotfinder_core::secrets::{GOOGLE_MAPS_API_KEY, OPENAI_API_KEY, OPENWEATHER_API_KEY};
use spotfinder_core::StaticCredentials;
use spotfinder_geo::Coordinate;
use spotfinder_store::{AnalysisStore, SqliteStore};
use spotfinder_weather::OpenWeatherMapProvider;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> Arc<StaticCredentials> {
    Arc::new(
        StaticCredentials::new()
            .with(OPENAI_API_KEY, "sk-test")
            .with(OPENWEATHER_API_KEY, "owm-test")
            .with(GOOGLE_MAPS_API_KEY, "maps-test"),
    )
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

#[tokio::test]
async fn test_weather_analysis_for_new_york() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "40.7128"))
        .and(query_param("lon", "-74.006"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "weather": [{"main": "Clear"}],
            "main": {"temp": 18, "humidity": 55},
            "wind": {"speed": 3}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("Good conditions, moderate bite likely."))
        .expect(1)
        .mount(&mock_server)
        .await;

    let creds = credentials();
    let weather = OpenWeatherMapProvider::with_base_url(creds.clone(), &mock_server.uri()).unwrap();
    let generator = OpenAiClient::with_base_url(creds, &mock_server.uri(), "gpt-4o-mini").unwrap();
    let annotator = WeatherAnnotator::new(Arc::new(weather), Arc::new(generator));

    let analysis = annotator
        .analyze(Coordinate::new(40.7128, -74.0060))
        .await
        .unwrap();

    assert_eq!(
        analysis,
        WeatherAnalysis {
            weather: "Clear".to_string(),
            temperature: 18.0,
            fishing_conditions: "Good conditions, moderate bite likely.".to_string(),
        }
    );
    assert_eq!(
        serde_json::to_value(&analysis).unwrap(),
        serde_json::json!({
            "weather": "Clear",
            "temperature": 18.0,
            "fishingConditions": "Good conditions, moderate bite likely."
        })
    );
}

#[tokio::test]
async fn test_spot_analysis_generated_once_and_persisted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion(
            "```json\n[{\"name\": \"Striped Bass\", \"description\": \"Spring run\"}, \
             {\"name\": \"Bluefish\", \"description\": \"Summer\"}, \
             {\"name\": \"Fluke\", \"description\": \"Sandy bottoms\"}]\n```",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("spotfinder.db");
    let generator = Arc::new(
        OpenAiClient::with_base_url(credentials(), &mock_server.uri(), "gpt-4o-mini").unwrap(),
    );

    let first = {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        SpotAnalyzer::new(store, generator.clone())
            .get_analysis("ChIJ-pier-25", "Pier 25, New York")
            .await
            .unwrap()
    };

    // A fresh process reading the same database serves from the store.
    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let second = SpotAnalyzer::new(store.clone(), generator)
        .get_analysis("ChIJ-pier-25", "Pier 25, New York")
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.species()[0].name, "Striped Bass");
    assert!(store.get_analysis("ChIJ-pier-25").unwrap().is_some());
}
