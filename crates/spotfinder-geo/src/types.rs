use serde::{Deserialize, Serialize};
use spotfinder_core::{AppError, ReqwestErrorExt};

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude", alias = "lon")]
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components are finite and inside the valid degree ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Check the coordinate before it is sent to any provider.
    ///
    /// # Errors
    /// `AppError::InvalidRequest` when out of range or not finite.
    pub fn validated(self) -> Result<Self, AppError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(AppError::InvalidRequest(format!(
                "coordinate out of range: {}",
                self
            )))
        }
    }
}

/// Formats as the raw `lat,lng` pair used when no region name is available.
impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// A point of interest returned by a nearby search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

/// Axis-aligned viewport in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn is_valid(&self) -> bool {
        let corners_ok = Coordinate::new(self.south, self.west).is_valid()
            && Coordinate::new(self.north, self.east).is_valid();
        corners_ok && self.south <= self.north
    }

    /// `west,south,east,north`, the order bbox query parameters expect.
    pub fn to_bbox(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

/// Location service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location information unavailable")]
    PositionUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location capability not supported")]
    UnsupportedPlatform,
}

impl LocationError {
    /// Map a W3C `GeolocationPositionError.code` reported by a browser client.
    pub fn from_browser_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            3 => Self::Timeout,
            _ => Self::PositionUnavailable,
        }
    }
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::PermissionDenied => AppError::PermissionDenied,
            LocationError::PositionUnavailable => AppError::PositionUnavailable,
            LocationError::Timeout => AppError::Timeout,
            LocationError::UnsupportedPlatform => AppError::UnsupportedPlatform,
        }
    }
}

/// Reverse geocoding errors
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Geocoder returned status {0}")]
    Status(u16),
    #[error("No results for coordinate")]
    NoResults,
    #[error("Credential missing: {0}")]
    Credential(String),
    #[error("Credential lookup failed: {0}")]
    CredentialLookup(String),
}

impl From<AppError> for GeocodeError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::CredentialMissing(name) => GeocodeError::Credential(name),
            other => GeocodeError::CredentialLookup(other.to_string()),
        }
    }
}

/// Nearby search and protected-area lookup errors
#[derive(Debug, thiserror::Error)]
pub enum PlacesError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Places API error {status}: {message}")]
    Api { status: String, message: String },
    #[error("Credential missing: {0}")]
    Credential(String),
    #[error("Credential lookup failed: {0}")]
    CredentialLookup(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<AppError> for PlacesError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::CredentialMissing(name) => PlacesError::Credential(name),
            other => PlacesError::CredentialLookup(other.to_string()),
        }
    }
}

impl From<PlacesError> for AppError {
    fn from(e: PlacesError) -> Self {
        match e {
            PlacesError::Credential(name) => AppError::CredentialMissing(name),
            PlacesError::InvalidRequest(msg) => AppError::InvalidRequest(msg),
            PlacesError::CredentialLookup(msg) => AppError::StoreUnavailable(msg),
            PlacesError::Network(err) => err.into_network_error().into_app_error("places"),
            other => AppError::provider("places", other.to_string()),
        }
    }
}
