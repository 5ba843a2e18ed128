//! Control-surface routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::state::ServerState;
use super::ws;
use crate::coordinator::Coordinator;
use crate::dls::{ContentSource, DlsEngine, MessageContext, MessagePriority, NewMessage};
use crate::error::PadError;
use crate::slideshow::{ImageEntry, SlideshowEngine};
use crate::validator::ContentValidator;

fn error_response(err: PadError) -> Response {
    let status = match &err {
        PadError::InvalidInput(_) | PadError::InvalidProfile(_) => StatusCode::BAD_REQUEST,
        PadError::Duplicate => StatusCode::CONFLICT,
        PadError::SizeExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        PadError::CodecTimeout => StatusCode::REQUEST_TIMEOUT,
        PadError::NoContent => StatusCode::NOT_FOUND,
        PadError::ResourceExhausted => StatusCode::SERVICE_UNAVAILABLE,
        PadError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

/// Image entry without the payload bytes.
#[derive(Serialize)]
struct ImageInfo {
    fingerprint: String,
    filename: String,
    format: String,
    width: u32,
    height: u32,
    payload_bytes: usize,
    sharpness: f64,
    contrast: f64,
    brightness: f64,
    freshness: f64,
    serve_count: u32,
    created_at: DateTime<Utc>,
    last_served: Option<DateTime<Utc>>,
}

impl From<&ImageEntry> for ImageInfo {
    fn from(entry: &ImageEntry) -> Self {
        Self {
            fingerprint: entry.fingerprint.clone(),
            filename: entry.filename.clone(),
            format: entry.format.mime().to_string(),
            width: entry.width,
            height: entry.height,
            payload_bytes: entry.payload.len(),
            sharpness: entry.sharpness,
            contrast: entry.contrast,
            brightness: entry.brightness,
            freshness: entry.freshness,
            serve_count: entry.serve_count,
            created_at: entry.created_at,
            last_served: entry.last_served,
        }
    }
}

fn format_uptime(duration: std::time::Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Serialize)]
struct StatusResponse {
    uptime: String,
    #[serde(flatten)]
    snapshot: crate::coordinator::StatusSnapshot,
}

async fn get_status(State(state): State<ServerState>) -> Response {
    Json(StatusResponse {
        uptime: format_uptime(state.start_time.elapsed()),
        snapshot: state.coordinator.status(),
    })
    .into_response()
}

async fn get_health(State(coordinator): State<Arc<Coordinator>>) -> Response {
    if coordinator.healthy() {
        (StatusCode::OK, "ok").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded").into_response()
    }
}

async fn list_images(State(slideshow): State<Arc<SlideshowEngine>>) -> Response {
    let infos: Vec<ImageInfo> = slideshow.images().iter().map(ImageInfo::from).collect();
    Json(infos).into_response()
}

#[derive(Deserialize)]
struct AddImageBody {
    path: PathBuf,
}

async fn add_image(
    State(state): State<ServerState>,
    Json(body): Json<AddImageBody>,
) -> Response {
    match state.slideshow.add_file(&body.path).await {
        Ok(entry) => {
            state.coordinator.publish(crate::coordinator::PadEvent::ContentNotification {
                kind: "image".to_string(),
                id: entry.fingerprint.clone(),
            });
            (StatusCode::CREATED, Json(ImageInfo::from(&entry))).into_response()
        }
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct ScanBody {
    dir: PathBuf,
}

async fn scan_images(
    State(slideshow): State<Arc<SlideshowEngine>>,
    Json(body): Json<ScanBody>,
) -> Response {
    match slideshow.scan_directory(&body.dir).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => error_response(err),
    }
}

async fn remove_image(
    State(slideshow): State<Arc<SlideshowEngine>>,
    Path(fingerprint): Path<String>,
) -> Response {
    if slideshow.remove(&fingerprint) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn list_messages(State(dls): State<Arc<DlsEngine>>) -> Response {
    Json(dls.messages()).into_response()
}

#[derive(Deserialize)]
struct AddMessageBody {
    text: String,
    priority: Option<MessagePriority>,
    context: Option<MessageContext>,
    source: Option<ContentSource>,
    source_id: Option<String>,
    importance: Option<f64>,
    max_sends: Option<u32>,
    expires_at: Option<DateTime<Utc>>,
}

async fn add_message(
    State(state): State<ServerState>,
    Json(body): Json<AddMessageBody>,
) -> Response {
    let request = NewMessage {
        text: body.text,
        priority: body.priority.unwrap_or(MessagePriority::Normal),
        context: body.context.unwrap_or(MessageContext::Automated),
        source: body.source.unwrap_or(ContentSource::Manual),
        source_id: body.source_id,
        importance: body.importance.unwrap_or(0.5),
        expires_at: body.expires_at,
        max_sends: body.max_sends.unwrap_or(0),
        metadata: Default::default(),
    };
    match state.dls.add(request) {
        Ok(msg) => {
            state.coordinator.publish(crate::coordinator::PadEvent::ContentNotification {
                kind: "message".to_string(),
                id: msg.source_id.clone(),
            });
            (StatusCode::CREATED, Json(msg)).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn remove_message(
    State(dls): State<Arc<DlsEngine>>,
    Path(source_id): Path<String>,
) -> Response {
    if dls.remove(&source_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

#[derive(Deserialize)]
struct SetContextBody {
    context: MessageContext,
}

async fn set_context(
    State(dls): State<Arc<DlsEngine>>,
    Json(body): Json<SetContextBody>,
) -> Response {
    dls.set_context(body.context);
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
struct EmergencyBody {
    message: String,
    duration_seconds: Option<u64>,
}

async fn set_emergency(
    State(coordinator): State<Arc<Coordinator>>,
    Json(body): Json<EmergencyBody>,
) -> Response {
    if body.message.trim().is_empty() {
        return error_response(PadError::InvalidInput("empty emergency message".into()));
    }
    coordinator.set_emergency(&body.message, body.duration_seconds);
    StatusCode::NO_CONTENT.into_response()
}

async fn clear_emergency(State(coordinator): State<Arc<Coordinator>>) -> Response {
    coordinator.clear_emergency();
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
struct TextBody {
    text: String,
}

async fn validate_thai(
    State(validator): State<Arc<ContentValidator>>,
    Json(body): Json<TextBody>,
) -> Response {
    Json(validator.validate(&body.text)).into_response()
}

#[derive(Serialize)]
struct ConvertResponse {
    bytes_hex: String,
    byte_length: usize,
    requires_complex_layout: bool,
}

async fn convert_thai(Json(body): Json<TextBody>) -> Response {
    let encoded = crate::charset::encode(&body.text);
    let bytes_hex = encoded.iter().map(|b| format!("{b:02x}")).collect::<String>();
    Json(ConvertResponse {
        byte_length: encoded.len(),
        bytes_hex,
        requires_complex_layout: crate::charset::requires_complex_layout(&body.text),
    })
    .into_response()
}

async fn thai_calendar() -> Response {
    Json(crate::thai::buddhist_date(Utc::now())).into_response()
}

pub fn make_app(state: ServerState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/health", get(get_health))
        .route("/images", get(list_images).post(add_image))
        .route("/images/scan", post(scan_images))
        .route("/images/:fingerprint", delete(remove_image))
        .route("/messages", get(list_messages).post(add_message))
        .route("/messages/:source_id", delete(remove_message))
        .route("/context", post(set_context))
        .route("/emergency", post(set_emergency).delete(clear_emergency))
        .route("/thai/validate", post(validate_thai))
        .route("/thai/convert", post(convert_thai))
        .route("/thai/calendar", get(thai_calendar))
        .route("/ws", get(ws::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
