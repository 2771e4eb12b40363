//! Google Places nearby search.

use reqwest::Client;
use serde::Deserialize;
use spotfinder_core::secrets::{self, CredentialProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::types::{Coordinate, Place, PlacesError};

const GOOGLE_MAPS_URL: &str = "https://maps.googleapis.com";
/// Upper bound the Places API accepts for `radius`.
pub const MAX_RADIUS_METERS: u32 = 50_000;

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<ApiPlace>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPlace {
    place_id: Option<String>,
    name: Option<String>,
    geometry: Option<ApiGeometry>,
    #[serde(default)]
    photos: Vec<ApiPhoto>,
    rating: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiGeometry {
    location: ApiLatLng,
}

#[derive(Debug, Deserialize)]
struct ApiLatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct ApiPhoto {
    photo_reference: String,
}

impl ApiPlace {
    /// Results without an id, name or location can't be shown on a map.
    fn into_place(self) -> Option<Place> {
        let geometry = self.geometry?;
        Some(Place {
            id: self.place_id?,
            name: self.name?,
            coordinate: Coordinate::new(geometry.location.lat, geometry.location.lng),
            photo_reference: self.photos.into_iter().next().map(|p| p.photo_reference),
            rating: self.rating,
        })
    }
}

/// Nearby-search client for candidate fishing spots.
pub struct PlacesClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl PlacesClient {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self, PlacesError> {
        Self::with_base_url(credentials, GOOGLE_MAPS_URL)
    }

    pub fn with_base_url(
        credentials: Arc<dyn CredentialProvider>,
        base_url: &str,
    ) -> Result<Self, PlacesError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Places matching `keyword` within `radius_meters` of `center`.
    ///
    /// # Errors
    /// `PlacesError::InvalidRequest` for a bad center or radius,
    /// `PlacesError::Api` for any status other than `OK`/`ZERO_RESULTS`.
    #[instrument(skip(self), level = "info")]
    pub async fn nearby_search(
        &self,
        center: Coordinate,
        radius_meters: u32,
        keyword: &str,
    ) -> Result<Vec<Place>, PlacesError> {
        if !center.is_valid() {
            return Err(PlacesError::InvalidRequest(format!(
                "invalid center {}",
                center
            )));
        }
        if radius_meters == 0 || radius_meters > MAX_RADIUS_METERS {
            return Err(PlacesError::InvalidRequest(format!(
                "radius must be 1..={} meters",
                MAX_RADIUS_METERS
            )));
        }

        let key = self.credentials.credential(secrets::GOOGLE_MAPS_API_KEY)?;

        let response = self
            .client
            .get(format!("{}/maps/api/place/nearbysearch/json", self.base_url))
            .query(&[
                ("location", center.to_string()),
                ("radius", radius_meters.to_string()),
                ("keyword", keyword.to_string()),
                ("key", key.clone()),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PlacesError::Api {
                status: status.as_u16().to_string(),
                message: secrets::redact(&text, &key),
            });
        }

        let body: NearbySearchResponse = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;
        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(Vec::new()),
            other => {
                return Err(PlacesError::Api {
                    status: other.to_string(),
                    message: secrets::redact(&body.error_message.unwrap_or_default(), &key),
                })
            }
        }

        let places: Vec<Place> = body
            .results
            .into_iter()
            .filter_map(ApiPlace::into_place)
            .collect();

        tracing::info!("Nearby search returned {} places", places.len());
        Ok(places)
    }
}
