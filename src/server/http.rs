//! HTTP API
//!
//! JSON endpoints for polls plus the two Slack callbacks (interactivity and
//! the Events API). Handlers validate untrusted input before it reaches the
//! store and translate store outcomes into status codes.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::error::ApiError;
use crate::channels::interaction::{parse_vote, payload_from_form};
use crate::channels::signing::{SlackVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::polls::{Poll, PollStore};

pub const INVALID_POLL_MESSAGE: &str =
    "Invalid poll data. Provide a question and at least two options.";
pub const MISSING_VOTE_FIELDS_MESSAGE: &str = "Both optionId and voterId are required";
pub const POLL_NOT_FOUND_MESSAGE: &str = "Poll not found";
pub const VOTE_TARGET_NOT_FOUND_MESSAGE: &str = "Poll or option not found";

/// Default request body limit (256 KiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<PollStore>,
    pub verifier: SlackVerifier,
}

impl AppState {
    pub fn new(store: Arc<PollStore>, verifier: SlackVerifier) -> Self {
        Self { store, verifier }
    }
}

/// Create the API router
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/polls", post(create_poll_handler).get(list_polls_handler))
        .route("/polls/{id}", get(get_poll_handler))
        .route("/polls/{id}/vote", post(vote_handler))
        .route("/interact", post(interact_handler))
        .route("/event-listener", post(event_listener_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreatePollRequest {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    options: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteRequest {
    #[serde(default)]
    option_id: Option<String>,
    #[serde(default)]
    voter_id: Option<String>,
}

async fn root_handler() -> &'static str {
    "OK"
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "polls": state.store.poll_count(),
    }))
}

async fn create_poll_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreatePollRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Poll>), ApiError> {
    let Json(req) = payload.map_err(|e| body_rejection(e, INVALID_POLL_MESSAGE))?;

    let (question, options) = match (req.question, req.options) {
        (Some(q), Some(o)) => (q, o),
        _ => return Err(ApiError::BadRequest(INVALID_POLL_MESSAGE.to_string())),
    };

    let poll = state
        .store
        .create_poll(&question, options.as_slice())
        .map_err(|e| match ApiError::from(e) {
            ApiError::BadRequest(_) => ApiError::BadRequest(INVALID_POLL_MESSAGE.to_string()),
            other => other,
        })?;

    Ok((StatusCode::CREATED, Json(poll)))
}

async fn list_polls_handler(State(state): State<AppState>) -> Json<Vec<Poll>> {
    Json(state.store.get_all_polls())
}

async fn get_poll_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Poll>, ApiError> {
    state
        .store
        .get_poll(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(POLL_NOT_FOUND_MESSAGE.to_string()))
}

async fn vote_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<Poll>, ApiError> {
    let missing = || ApiError::BadRequest(MISSING_VOTE_FIELDS_MESSAGE.to_string());
    let Json(req) = payload.map_err(|e| body_rejection(e, MISSING_VOTE_FIELDS_MESSAGE))?;

    let option_id = req.option_id.filter(|s| !s.is_empty()).ok_or_else(missing)?;
    let voter_id = req.voter_id.filter(|s| !s.is_empty()).ok_or_else(missing)?;

    state
        .store
        .vote(&id, &option_id, &voter_id)
        .map(Json)
        .map_err(|e| match ApiError::from(e) {
            ApiError::NotFound(_) => ApiError::NotFound(VOTE_TARGET_NOT_FOUND_MESSAGE.to_string()),
            other => other,
        })
}

/// Slack interactivity endpoint: a user picked a poll option
async fn interact_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    verify_slack(&state.verifier, &headers, &body)?;

    let payload = payload_from_form(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let choice = parse_vote(&payload).map_err(|e| {
        debug!(error = %e, "ignored Slack interaction");
        ApiError::BadRequest(e.to_string())
    })?;

    state
        .store
        .vote(&choice.poll_id, &choice.option_id, &choice.voter_id)
        .map_err(|e| {
            warn!(poll_id = %choice.poll_id, option_id = %choice.option_id, error = %e, "Slack vote rejected");
            ApiError::from(e)
        })?;

    info!(poll_id = %choice.poll_id, voter_id = %choice.voter_id, "Slack vote accepted");
    Ok("OK")
}

/// Slack Events API endpoint
async fn event_listener_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    verify_slack(&state.verifier, &headers, &body)?;

    let event: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid event body: {}", e)))?;

    match event.get("type").and_then(Value::as_str) {
        Some("url_verification") => {
            let challenge = event.get("challenge").cloned().unwrap_or(Value::Null);
            debug!("answered Slack url_verification challenge");
            Ok(Json(json!({ "challenge": challenge })).into_response())
        }
        other => {
            let inner = event
                .pointer("/event/type")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            info!(kind = other.unwrap_or("unknown"), event = inner, "Slack event received");
            Ok("OK".into_response())
        }
    }
}

/// Oversized bodies keep their 413; every other JSON rejection becomes `message`
fn body_rejection(rejection: JsonRejection, message: &str) -> ApiError {
    debug!(error = %rejection, "rejected request body");
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge(rejection.body_text());
    }
    ApiError::BadRequest(message.to_string())
}

fn verify_slack(verifier: &SlackVerifier, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    verifier
        .verify(
            header(TIMESTAMP_HEADER),
            header(SIGNATURE_HEADER),
            body,
            chrono::Utc::now().timestamp(),
        )
        .map_err(|e| {
            warn!(error = %e, "rejected unsigned Slack request");
            ApiError::Unauthorized(e.to_string())
        })
}
