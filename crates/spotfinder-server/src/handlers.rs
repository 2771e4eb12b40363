//! Relay handlers: decode the JSON body, call one service, encode the result.

use serde::{Deserialize, Serialize};
use spotfinder_ai::{decode_image, AnalysisError};
use spotfinder_core::AppError;
use spotfinder_geo::location::{GeolocationResolver, ReportedPosition};
use spotfinder_geo::{Bounds, Coordinate, MarineProtectedArea, Place};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// JSON error reply with the status mapped from the error kind.
pub fn error_reply(err: &AppError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::warn!("Request failed: {}", err);
    } else if err.is_location_error() {
        tracing::info!("Client position unavailable: {}", err);
    } else {
        tracing::debug!("Request rejected: {}", err);
    }
    let body = ErrorBody {
        error: match err {
            AppError::InvalidRequest(msg) => msg.clone(),
            other => other.user_message().to_string(),
        },
    };
    reply::with_status(reply::json(&body), status).into_response()
}

fn respond<T: Serialize>(result: Result<T, AppError>) -> Result<Response, Infallible> {
    Ok(match result {
        Ok(value) => reply::json(&value).into_response(),
        Err(err) => error_reply(&err),
    })
}

fn analysis<T>(result: Result<T, AnalysisError>) -> Result<T, AppError> {
    result.map_err(AppError::from)
}

// analyze-fishing-spot

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeSpotRequest {
    pub location: String,
    pub place_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeSpotResponse {
    fish_analysis: spotfinder_ai::SpotAnalysis,
}

pub async fn analyze_spot(req: AnalyzeSpotRequest, state: AppState) -> Result<Response, Infallible> {
    let result = analysis(state.spots.get_analysis(&req.place_id, &req.location).await)
        .map(|fish_analysis| AnalyzeSpotResponse { fish_analysis });
    respond(result)
}

// analyze-weather / get-fishing-regulations

pub async fn analyze_weather(coord: Coordinate, state: AppState) -> Result<Response, Infallible> {
    let result = match coord.validated() {
        Ok(coord) => analysis(state.weather.analyze(coord).await),
        Err(e) => Err(e),
    };
    respond(result)
}

pub async fn get_regulations(coord: Coordinate, state: AppState) -> Result<Response, Infallible> {
    let result = match coord.validated() {
        Ok(coord) => analysis(state.regulations.get_regulations(coord).await),
        Err(e) => Err(e),
    };
    respond(result)
}

// get-location

/// Either the browser's fix or the W3C error code it got instead.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLocationRequest {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub error_code: Option<u16>,
}

#[derive(Debug, Serialize)]
struct GetLocationResponse {
    region: String,
    lat: f64,
    lng: f64,
}

pub async fn get_location(req: GetLocationRequest, state: AppState) -> Result<Response, Infallible> {
    let reported = match (req.error_code, req.lat, req.lng) {
        (Some(code), _, _) => ReportedPosition::Failed(code),
        (None, Some(lat), Some(lng)) => ReportedPosition::Fix(Coordinate::new(lat, lng)),
        _ => {
            return respond::<()>(Err(AppError::InvalidRequest(
                "lat and lng are required".into(),
            )))
        }
    };

    let resolver = GeolocationResolver::new(Arc::new(reported), state.location_timeout);
    let result = match resolver.resolve().await {
        Ok(coord) => {
            let region = state.regions.resolve_region(coord).await;
            Ok(GetLocationResponse {
                region,
                lat: coord.lat,
                lng: coord.lng,
            })
        }
        Err(e) => Err(AppError::from(e)),
    };
    respond(result)
}

// chat-with-fishing-expert

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub region: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
}

pub async fn chat(req: ChatRequest, state: AppState) -> Result<Response, Infallible> {
    let result = analysis(state.chat.chat(&req.message, &req.region).await)
        .map(|reply| ChatResponse { reply });
    respond(result)
}

// nearby-spots

#[derive(Debug, Deserialize)]
pub struct NearbyRequest {
    #[serde(flatten)]
    pub center: Coordinate,
    pub radius: Option<u32>,
    pub keyword: Option<String>,
}

#[derive(Debug, Serialize)]
struct NearbyResponse {
    places: Vec<Place>,
}

pub async fn nearby_spots(req: NearbyRequest, state: AppState) -> Result<Response, Infallible> {
    let radius = req.radius.unwrap_or(state.places_defaults.radius_meters);
    let keyword = req
        .keyword
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| state.places_defaults.keyword.clone());

    let result = state
        .places
        .nearby_search(req.center, radius, &keyword)
        .await
        .map(|places| NearbyResponse { places })
        .map_err(AppError::from);
    respond(result)
}

// identify-fish

#[derive(Debug, Deserialize)]
pub struct IdentifyRequest {
    pub image: String,
}

pub async fn identify_fish(req: IdentifyRequest, state: AppState) -> Result<Response, Infallible> {
    let result = match decode_image(&req.image) {
        Ok(bytes) => analysis(state.fish.identify(bytes).await),
        Err(e) => Err(AppError::from(e)),
    };
    respond(result)
}

// update-fishing-descriptions

#[derive(Debug, Serialize)]
struct BackfillResponse {
    updated: usize,
    failed: usize,
    message: String,
}

pub async fn update_descriptions(state: AppState) -> Result<Response, Infallible> {
    let result = analysis(state.backfill.run().await).map(|report| BackfillResponse {
        updated: report.updated,
        failed: report.failed,
        message: format!("Updated {} fishing spot descriptions", report.updated),
    });
    respond(result)
}

// marine-protected-areas

#[derive(Debug, Serialize)]
struct AreasResponse {
    areas: Vec<MarineProtectedArea>,
}

pub async fn protected_areas(bounds: Bounds, state: AppState) -> Result<Response, Infallible> {
    let result = match state.mpa.fetch_in_bounds(bounds).await {
        Ok(areas) => {
            if let Err(e) = state.areas.upsert_areas(&areas) {
                tracing::warn!("Failed to store protected areas: {}", e);
            }
            Ok(AreasResponse { areas })
        }
        Err(e) => Err(AppError::from(e)),
    };
    respond(result)
}

// health

pub async fn health() -> Result<Response, Infallible> {
    Ok(reply::json(&serde_json::json!({"status": "ok"})).into_response())
}
