// HTTP request handlers
use crate::application::readings_service::ReadingsQuery;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::api_error::ApiError;
use crate::presentation::app_state::AppState;
use crate::presentation::payload::SubmitPayload;
use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use url::form_urlencoded;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Downsampled readings for a time range
///
/// `device` and `sensor` may be repeated or comma-separated, so the raw query
/// string is parsed here instead of through a typed extractor.
pub async fn query_readings(
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);
    let query = parse_readings_query(raw.as_deref());

    let result = match state.readings_service.query(&query).await {
        Ok(result) => result,
        Err(err) => return ApiError::from(err).into_response(),
    };

    match json_response(&result, StatusCode::OK, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Store one reading for a device, fanned out per channel
pub async fn submit_reading(
    Path(device): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitPayload>,
) -> Response {
    match state.ingest_service.submit(&device, payload.into()).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

fn parse_readings_query(raw: Option<&str>) -> ReadingsQuery {
    let mut query = ReadingsQuery::default();
    let Some(raw) = raw else {
        return query;
    };

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        match key.as_ref() {
            "start" => query.start = Some(value.into_owned()),
            "end" => query.end = Some(value.into_owned()),
            "device" | "device[]" => query.devices.push(value.into_owned()),
            "sensor" | "sensor[]" => query.sensors.push(value.into_owned()),
            "mode" => query.mode = Some(value.into_owned()),
            "points" => query.points = Some(value.into_owned()),
            other => tracing::debug!(key = other, "ignoring unknown query parameter"),
        }
    }

    query
}
