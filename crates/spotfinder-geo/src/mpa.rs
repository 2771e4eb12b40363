//! Marine protected areas from the MPAtlas sites API.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

use crate::types::{Bounds, PlacesError};

const MPATLAS_URL: &str = "https://www.mpatlas.org";

/// How strictly fishing is limited inside an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProtectionLevel {
    Restricted,
    Safe,
    Endangered,
    #[default]
    Unknown,
}

impl ProtectionLevel {
    /// Classify MPAtlas free-text protection descriptions.
    pub fn classify(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return Self::Unknown;
        };
        let level = text.to_lowercase();

        if level.contains("no take") || level.contains("highly") {
            Self::Restricted
        } else if level.contains("low") || level.contains("minimal") {
            Self::Endangered
        } else if level.contains("moderate") || level.contains("partial") {
            Self::Safe
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restricted => "restricted",
            Self::Safe => "safe",
            Self::Endangered => "endangered",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "restricted" => Self::Restricted,
            "safe" => Self::Safe,
            "endangered" => Self::Endangered,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarineProtectedArea {
    pub mpatlas_id: i64,
    pub name: String,
    pub designation: Option<String>,
    pub protection_level: ProtectionLevel,
    /// GeoJSON geometry, passed through untouched
    pub boundaries: Option<serde_json::Value>,
    pub area_km2: Option<f64>,
    pub no_take_area_km2: Option<f64>,
    pub implementation_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: FeatureProperties,
    geometry: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    id: i64,
    name: String,
    designation: Option<String>,
    protection_level: Option<String>,
    area_km2: Option<f64>,
    no_take_area_km2: Option<f64>,
    implementation_status: Option<String>,
}

impl From<Feature> for MarineProtectedArea {
    fn from(feature: Feature) -> Self {
        let props = feature.properties;
        Self {
            mpatlas_id: props.id,
            protection_level: ProtectionLevel::classify(props.protection_level.as_deref()),
            name: props.name,
            designation: props.designation,
            boundaries: feature.geometry,
            area_km2: props.area_km2,
            no_take_area_km2: props.no_take_area_km2,
            implementation_status: props.implementation_status,
        }
    }
}

pub struct MpaClient {
    client: Client,
    base_url: String,
}

impl MpaClient {
    pub fn new() -> Result<Self, PlacesError> {
        Self::with_base_url(MPATLAS_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, PlacesError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Protected areas intersecting `bounds`.
    ///
    /// # Errors
    /// `PlacesError::InvalidRequest` for inverted or out-of-range bounds,
    /// `PlacesError::Api` for a non-2xx response.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_in_bounds(
        &self,
        bounds: Bounds,
    ) -> Result<Vec<MarineProtectedArea>, PlacesError> {
        if !bounds.is_valid() {
            return Err(PlacesError::InvalidRequest(format!(
                "invalid bounds {}",
                bounds.to_bbox()
            )));
        }

        let response = self
            .client
            .get(format!("{}/api/v3/sites/", self.base_url))
            .query(&[("format", "json".to_string()), ("bbox", bounds.to_bbox())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PlacesError::Api {
                status: status.as_u16().to_string(),
                message: text,
            });
        }

        let body: FeatureCollection = response.json().await?;
        Ok(body.features.into_iter().map(MarineProtectedArea::from).collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_classify_protection_level() {
        assert_eq!(ProtectionLevel::classify(Some("No Take")), ProtectionLevel::Restricted);
        assert_eq!(ProtectionLevel::classify(Some("Highly protected")), ProtectionLevel::Restricted);
        assert_eq!(ProtectionLevel::classify(Some("Minimal")), ProtectionLevel::Endangered);
        assert_eq!(ProtectionLevel::classify(Some("low protection")), ProtectionLevel::Endangered);
        assert_eq!(ProtectionLevel::classify(Some("Partially")), ProtectionLevel::Safe);
        assert_eq!(ProtectionLevel::classify(Some("Moderately")), ProtectionLevel::Safe);
        assert_eq!(ProtectionLevel::classify(Some("Incompatible")), ProtectionLevel::Unknown);
        assert_eq!(ProtectionLevel::classify(None), ProtectionLevel::Unknown);
    }

    #[test]
    fn test_protection_level_round_trips_as_str() {
        for level in [
            ProtectionLevel::Restricted,
            ProtectionLevel::Safe,
            ProtectionLevel::Endangered,
            ProtectionLevel::Unknown,
        ] {
            assert_eq!(ProtectionLevel::from_str_lossy(level.as_str()), level);
        }
    }

    #[tokio::test]
    async fn test_fetch_in_bounds() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/sites/"))
            .and(query_param("bbox", "-123,37,-122,38"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "features": [{
                    "properties": {
                        "id": 9047,
                        "name": "Point Lobos SMR",
                        "designation": "State Marine Reserve",
                        "protection_level": "No Take",
                        "area_km2": 14.2
                    },
                    "geometry": {"type": "Point", "coordinates": [-121.9, 36.5]}
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = MpaClient::with_base_url(&mock_server.uri()).unwrap();
        let areas = client
            .fetch_in_bounds(Bounds {
                south: 37.0,
                west: -123.0,
                north: 38.0,
                east: -122.0,
            })
            .await
            .unwrap();

        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].mpatlas_id, 9047);
        assert_eq!(areas[0].protection_level, ProtectionLevel::Restricted);
        assert!(areas[0].boundaries.is_some());
    }

    #[tokio::test]
    async fn test_inverted_bounds_rejected() {
        let client = MpaClient::with_base_url("http://127.0.0.1:9").unwrap();
        let result = client
            .fetch_in_bounds(Bounds {
                south: 38.0,
                west: -123.0,
                north: 37.0,
                east: -122.0,
            })
            .await;
        assert!(matches!(result, Err(PlacesError::InvalidRequest(_))));
    }
}
