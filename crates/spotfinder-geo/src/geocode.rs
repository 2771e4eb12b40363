//! Reverse geocoding: convert coordinates to human-readable region names.
//!
//! Three providers are available: Nominatim (OpenStreetMap, no key),
//! OpenCage and Google Geocoding (both keyed). [`RegionResolver`] races the
//! configured providers and falls back to the raw coordinate pair.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use spotfinder_core::secrets::{self, CredentialProvider};
use spotfinder_core::{GeocoderKind, GeocodingConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::race::{first_success, Attempt};
use crate::types::{Coordinate, GeocodeError};

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const OPENCAGE_URL: &str = "https://api.opencagedata.com";
const GOOGLE_MAPS_URL: &str = "https://maps.googleapis.com";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "spotfinder/0.1.0";

/// A provider that turns a coordinate into a formatted address.
#[async_trait]
pub trait Geocoder: Send + Sync {
    fn name(&self) -> &'static str;

    async fn reverse(&self, coord: Coordinate) -> Result<String, GeocodeError>;
}

fn build_client() -> Result<Client, GeocodeError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?)
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state_district: Option<String>,
    state: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

impl NominatimAddress {
    /// "Place, State" (or "Place, Country"), most specific place first.
    fn short_name(self) -> Option<String> {
        let state = self.state.clone();
        let country = self.country.clone();

        let place = self
            .city
            .or(self.town)
            .or(self.village)
            .or(self.municipality)
            .or(self.state_district)
            .or(self.county)
            .or(self.state)
            .or(self.country)?;

        let suffix = state
            .filter(|s| !s.is_empty() && *s != place)
            .or_else(|| country.filter(|c| !c.is_empty() && *c != place));

        Some(match suffix {
            Some(s) => format!("{}, {}", place, s),
            None => place,
        })
    }
}

/// OpenStreetMap Nominatim reverse geocoder.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new() -> Result<Self, GeocodeError> {
        Self::with_base_url(NOMINATIM_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, GeocodeError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    #[instrument(skip(self), level = "debug")]
    async fn reverse(&self, coord: Coordinate) -> Result<String, GeocodeError> {
        let response = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", coord.lat.to_string()),
                ("lon", coord.lng.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("zoom", "10".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body: NominatimResponse = response.json().await?;
        body.address
            .and_then(NominatimAddress::short_name)
            .or(body.display_name)
            .ok_or(GeocodeError::NoResults)
    }
}

#[derive(Debug, Deserialize)]
struct OpenCageResponse {
    #[serde(default)]
    results: Vec<OpenCageResult>,
}

#[derive(Debug, Deserialize)]
struct OpenCageResult {
    formatted: String,
}

/// OpenCage Data reverse geocoder (`OPENCAGE_API_KEY`).
pub struct OpenCageGeocoder {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl OpenCageGeocoder {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self, GeocodeError> {
        Self::with_base_url(credentials, OPENCAGE_URL)
    }

    pub fn with_base_url(
        credentials: Arc<dyn CredentialProvider>,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl Geocoder for OpenCageGeocoder {
    fn name(&self) -> &'static str {
        "opencage"
    }

    #[instrument(skip(self), level = "debug")]
    async fn reverse(&self, coord: Coordinate) -> Result<String, GeocodeError> {
        let key = self.credentials.credential(secrets::OPENCAGE_API_KEY)?;

        let response = self
            .client
            .get(format!("{}/geocode/v1/json", self.base_url))
            .query(&[("q", coord.to_string()), ("key", key)])
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body: OpenCageResponse = response.json().await.map_err(reqwest::Error::without_url)?;
        body.results
            .into_iter()
            .next()
            .map(|r| r.formatted)
            .ok_or(GeocodeError::NoResults)
    }
}

#[derive(Debug, Deserialize)]
struct GoogleGeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleGeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GoogleGeocodeResult {
    formatted_address: String,
}

/// Google Geocoding API reverse geocoder (`GOOGLE_MAPS_API_KEY`).
pub struct GoogleGeocoder {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl GoogleGeocoder {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self, GeocodeError> {
        Self::with_base_url(credentials, GOOGLE_MAPS_URL)
    }

    pub fn with_base_url(
        credentials: Arc<dyn CredentialProvider>,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    fn name(&self) -> &'static str {
        "google"
    }

    #[instrument(skip(self), level = "debug")]
    async fn reverse(&self, coord: Coordinate) -> Result<String, GeocodeError> {
        let key = self.credentials.credential(secrets::GOOGLE_MAPS_API_KEY)?;

        let response = self
            .client
            .get(format!("{}/maps/api/geocode/json", self.base_url))
            .query(&[("latlng", coord.to_string()), ("key", key)])
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body: GoogleGeocodeResponse = response.json().await.map_err(reqwest::Error::without_url)?;
        if body.status != "OK" {
            tracing::debug!("Google geocoding status: {}", body.status);
            return Err(GeocodeError::NoResults);
        }

        body.results
            .into_iter()
            .next()
            .map(|r| r.formatted_address)
            .ok_or(GeocodeError::NoResults)
    }
}

/// Build a geocoder for a configured provider kind.
///
/// # Errors
/// Fails only if the HTTP client can't be constructed.
pub fn geocoder_for(
    kind: GeocoderKind,
    credentials: Arc<dyn CredentialProvider>,
) -> Result<Arc<dyn Geocoder>, GeocodeError> {
    Ok(match kind {
        GeocoderKind::Nominatim => Arc::new(NominatimGeocoder::new()?),
        GeocoderKind::OpenCage => Arc::new(OpenCageGeocoder::new(credentials)?),
        GeocoderKind::Google => Arc::new(GoogleGeocoder::new(credentials)?),
    })
}

/// Races geocoders for a region label; never fails.
#[derive(Clone)]
pub struct RegionResolver {
    geocoders: Vec<Arc<dyn Geocoder>>,
    timeout: Duration,
}

impl RegionResolver {
    pub fn new(geocoders: Vec<Arc<dyn Geocoder>>, timeout: Duration) -> Self {
        Self { geocoders, timeout }
    }

    /// Build from the `[geocoding]` config section.
    ///
    /// # Errors
    /// Fails only if an HTTP client can't be constructed.
    pub fn from_config(
        config: &GeocodingConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, GeocodeError> {
        let geocoders = config
            .providers
            .iter()
            .map(|kind| geocoder_for(*kind, credentials.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            geocoders,
            Duration::from_secs(config.race_timeout_secs),
        ))
    }

    /// First successful formatted address, or the raw `lat,lng` pair.
    pub async fn resolve_region(&self, coord: Coordinate) -> String {
        let attempts: Vec<Attempt<'_, (&'static str, String), GeocodeError>> = self
            .geocoders
            .iter()
            .map(|geocoder| {
                let geocoder = geocoder.clone();
                let attempt: Attempt<'_, (&'static str, String), GeocodeError> =
                    Box::pin(async move {
                        let region = geocoder.reverse(coord).await?;
                        Ok::<_, GeocodeError>((geocoder.name(), region))
                    });
                attempt
            })
            .collect();

        match first_success(attempts, self.timeout).await {
            Ok((provider, region)) => {
                tracing::info!("Reverse geocoded via {} to: {}", provider, region);
                region
            }
            Err(e) => {
                tracing::info!("Reverse geocoding failed ({}), using raw coordinates", e);
                coord.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use spotfinder_core::StaticCredentials;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FakeGeocoder {
        name: &'static str,
        delay_ms: u64,
        result: Option<&'static str>,
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn reverse(&self, _coord: Coordinate) -> Result<String, GeocodeError> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            self.result
                .map(str::to_string)
                .ok_or(GeocodeError::NoResults)
        }
    }

    fn fake(name: &'static str, delay_ms: u64, result: Option<&'static str>) -> Arc<dyn Geocoder> {
        Arc::new(FakeGeocoder {
            name,
            delay_ms,
            result,
        })
    }

    #[tokio::test]
    async fn test_resolve_region_first_completed_wins() {
        let resolver = RegionResolver::new(
            vec![fake("b", 50, Some("Region B")), fake("a", 10, Some("Region A"))],
            Duration::from_secs(1),
        );
        let region = resolver.resolve_region(Coordinate::new(40.7128, -74.006)).await;
        assert_eq!(region, "Region A");
    }

    #[tokio::test]
    async fn test_resolve_region_tolerates_one_failure() {
        let resolver = RegionResolver::new(
            vec![fake("a", 5, None), fake("b", 20, Some("Region B"))],
            Duration::from_secs(1),
        );
        let region = resolver.resolve_region(Coordinate::new(1.0, 2.0)).await;
        assert_eq!(region, "Region B");
    }

    #[tokio::test]
    async fn test_resolve_region_falls_back_to_coordinates() {
        let resolver = RegionResolver::new(
            vec![fake("a", 5, None), fake("b", 5, None)],
            Duration::from_secs(1),
        );
        let region = resolver.resolve_region(Coordinate::new(40.7128, -74.006)).await;
        assert!(region.contains("40.7128"));
        assert!(region.contains("-74.006"));
    }

    #[tokio::test]
    async fn test_resolve_region_timeout_falls_back() {
        let resolver = RegionResolver::new(
            vec![fake("slow", 500, Some("Too Late"))],
            Duration::from_millis(20),
        );
        let region = resolver.resolve_region(Coordinate::new(1.0, 2.0)).await;
        assert_eq!(region, "1,2");
    }

    #[tokio::test]
    async fn test_nominatim_prefers_city_with_state() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("lat", "47.6062"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "display_name": "Seattle, King County, Washington, United States",
                "address": {"city": "Seattle", "county": "King County", "state": "Washington", "country": "United States"}
            })))
            .mount(&mock_server)
            .await;

        let geocoder = NominatimGeocoder::with_base_url(&mock_server.uri()).unwrap();
        let name = geocoder.reverse(Coordinate::new(47.6062, -122.3321)).await.unwrap();
        assert_eq!(name, "Seattle, Washington");
    }

    #[tokio::test]
    async fn test_nominatim_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let geocoder = NominatimGeocoder::with_base_url(&mock_server.uri()).unwrap();
        let result = geocoder.reverse(Coordinate::new(0.0, 0.0)).await;
        assert!(matches!(result, Err(GeocodeError::Status(503))));
    }

    #[tokio::test]
    async fn test_opencage_formatted_address() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geocode/v1/json"))
            .and(query_param("key", "oc-key"))
            .and(query_param("q", "40.7128,-74.006"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"formatted": "New York, NY, United States of America"}]
            })))
            .mount(&mock_server)
            .await;

        let creds = Arc::new(StaticCredentials::new().with(secrets::OPENCAGE_API_KEY, "oc-key"));
        let geocoder = OpenCageGeocoder::with_base_url(creds, &mock_server.uri()).unwrap();
        let name = geocoder.reverse(Coordinate::new(40.7128, -74.006)).await.unwrap();
        assert_eq!(name, "New York, NY, United States of America");
    }

    #[tokio::test]
    async fn test_opencage_empty_results() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geocode/v1/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
            .mount(&mock_server)
            .await;

        let creds = Arc::new(StaticCredentials::new().with(secrets::OPENCAGE_API_KEY, "oc-key"));
        let geocoder = OpenCageGeocoder::with_base_url(creds, &mock_server.uri()).unwrap();
        let result = geocoder.reverse(Coordinate::new(0.0, 0.0)).await;
        assert!(matches!(result, Err(GeocodeError::NoResults)));
    }

    #[tokio::test]
    async fn test_opencage_missing_key() {
        let geocoder =
            OpenCageGeocoder::with_base_url(Arc::new(StaticCredentials::new()), "http://127.0.0.1:9")
                .unwrap();
        let result = geocoder.reverse(Coordinate::new(0.0, 0.0)).await;
        assert!(matches!(result, Err(GeocodeError::Credential(name)) if name == "OPENCAGE_API_KEY"));
    }

    #[tokio::test]
    async fn test_google_non_ok_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "REQUEST_DENIED",
                "results": []
            })))
            .mount(&mock_server)
            .await;

        let creds = Arc::new(StaticCredentials::new().with(secrets::GOOGLE_MAPS_API_KEY, "g-key"));
        let geocoder = GoogleGeocoder::with_base_url(creds, &mock_server.uri()).unwrap();
        let result = geocoder.reverse(Coordinate::new(0.0, 0.0)).await;
        assert!(matches!(result, Err(GeocodeError::NoResults)));
    }

    #[tokio::test]
    async fn test_google_formatted_address() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/maps/api/geocode/json"))
            .and(query_param("latlng", "37.8,-122.4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "results": [{"formatted_address": "Pier 39, San Francisco, CA 94133, USA"}]
            })))
            .mount(&mock_server)
            .await;

        let creds = Arc::new(StaticCredentials::new().with(secrets::GOOGLE_MAPS_API_KEY, "g-key"));
        let geocoder = GoogleGeocoder::with_base_url(creds, &mock_server.uri()).unwrap();
        let name = geocoder.reverse(Coordinate::new(37.8, -122.4)).await.unwrap();
        assert_eq!(name, "Pier 39, San Francisco, CA 94133, USA");
    }
}
