//! Warp filter tree for the JSON relay.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::convert::Infallible;
use warp::http::{Method, StatusCode};
use warp::{Filter, Rejection, Reply};

use crate::handlers;
use crate::state::AppState;

/// JSON bodies other than images.
const JSON_BODY_LIMIT: u64 = 64 * 1024;
/// Base64 photos from a phone camera.
const IMAGE_BODY_LIMIT: u64 = 10 * 1024 * 1024;

const ALLOWED_HEADERS: [&str; 4] = ["authorization", "x-client-info", "apikey", "content-type"];

/// Full relay: every endpoint, CORS, and JSON error bodies for rejections.
///
/// Paths are matched before methods so an unknown path is a 404, not a 405.
///
/// `allowed_origin` is either `*` or a bare `scheme://host[:port]` origin.
pub fn routes(
    state: AppState,
    allowed_origin: &str,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handlers::health);

    let analyze_spot = post_json("analyze-fishing-spot", JSON_BODY_LIMIT)
        .and(with_state(state.clone()))
        .and_then(handlers::analyze_spot);

    let analyze_weather = post_json("analyze-weather", JSON_BODY_LIMIT)
        .and(with_state(state.clone()))
        .and_then(handlers::analyze_weather);

    let regulations = post_json("get-fishing-regulations", JSON_BODY_LIMIT)
        .and(with_state(state.clone()))
        .and_then(handlers::get_regulations);

    let location = post_json("get-location", JSON_BODY_LIMIT)
        .and(with_state(state.clone()))
        .and_then(handlers::get_location);

    let chat = post_json("chat-with-fishing-expert", JSON_BODY_LIMIT)
        .and(with_state(state.clone()))
        .and_then(handlers::chat);

    let nearby = post_json("nearby-spots", JSON_BODY_LIMIT)
        .and(with_state(state.clone()))
        .and_then(handlers::nearby_spots);

    let identify = post_json("identify-fish", IMAGE_BODY_LIMIT)
        .and(with_state(state.clone()))
        .and_then(handlers::identify_fish);

    let areas = post_json("marine-protected-areas", JSON_BODY_LIMIT)
        .and(with_state(state.clone()))
        .and_then(handlers::protected_areas);

    let backfill = warp::path("update-fishing-descriptions")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state))
        .and_then(handlers::update_descriptions);

    health
        .or(analyze_spot)
        .or(analyze_weather)
        .or(regulations)
        .or(location)
        .or(chat)
        .or(nearby)
        .or(identify)
        .or(areas)
        .or(backfill)
        .recover(handle_rejection)
        .with(cors(allowed_origin))
        .with(warp::trace::request())
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn post_json<T>(
    name: &'static str,
    limit: u64,
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::path(name)
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(limit))
        .and(warp::body::json())
}

fn cors(allowed_origin: &str) -> warp::cors::Builder {
    let builder = warp::cors()
        .allow_headers(ALLOWED_HEADERS)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);
    if allowed_origin == "*" {
        builder.allow_any_origin()
    } else {
        builder.allow_origin(allowed_origin)
    }
}

#[derive(Serialize)]
struct RejectionBody {
    error: String,
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected application/json".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        tracing::warn!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&RejectionBody { error: message }),
        status,
    ))
}
