use std::collections::BTreeMap;

use axum::{Json, extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use super::{
    error::ApiError,
    models::{
        AdjustmentRequest, HealthResponse, RegisterPersonRequest, RenamePersonRequest,
        RenameResponse,
    },
    state::AppState,
    utils,
};
use crate::auth::SignedRequest;

/// Read, authenticate, and unwrap a signed envelope.
///
/// Order: Content-Type, body size, JSON shape, then signature. Anything that
/// fails the signature check is counted as a rejected request.
async fn signed_content<T>(
    state: &AppState,
    headers: &HeaderMap,
    body: axum::body::Body,
) -> Result<T, ApiError>
where
    T: DeserializeOwned + Serialize,
{
    utils::require_json(headers)?;
    let bytes = utils::read_body(body, state.max_body_bytes()).await?;
    let request: SignedRequest<T> = serde_json::from_slice(&bytes)?;

    if let Err(err) = state.verifier.verify(&request) {
        state.metrics.request_rejected();
        warn!(error = %err, "Rejected signed request");
        return Err(err.into());
    }
    Ok(request.content)
}

/// List everyone enrolled (POST /api/users, content `null`)
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let () = signed_content(&state, &headers, body).await?;
    let people = state.ledger.list_people().await?;
    Ok(Json(people))
}

/// Enroll a person (POST /api/people)
pub async fn register_person(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: RegisterPersonRequest = signed_content(&state, &headers, body).await?;
    let person = state
        .ledger
        .register_person(&request.name, &request.email)
        .await?;
    Ok((StatusCode::CREATED, Json(person)))
}

/// Change a person's display name (POST /api/people/rename)
pub async fn rename_person(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: RenamePersonRequest = signed_content(&state, &headers, body).await?;
    let renamed = state
        .ledger
        .rename_person(&request.email, &request.name)
        .await?;
    Ok(Json(RenameResponse { renamed }))
}

/// Person report by email or id (POST /api/inspect, content is the identifier)
pub async fn inspect(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let identifier: String = signed_content(&state, &headers, body).await?;
    let report = state.ledger.inspect_person(&identifier).await?;
    Ok(Json(report))
}

/// Apply a point adjustment (POST /api/adjustments)
pub async fn apply_adjustment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: AdjustmentRequest = signed_content(&state, &headers, body).await?;
    let summary = state
        .ledger
        .apply_adjustment(&request.name, &request.people, request.points)
        .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Reverse an event (POST /api/events/remove); `null` removes the most recent
pub async fn remove_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let target: Option<String> = signed_content(&state, &headers, body).await?;
    let summary = match target {
        Some(raw) => {
            let id = Uuid::parse_str(raw.trim())
                .map_err(|_| ApiError::InvalidPayload(format!("invalid event id: {raw}")))?;
            state.ledger.remove_event(id).await?
        }
        None => state.ledger.remove_most_recent_event().await?,
    };
    Ok(Json(summary))
}

/// Leaderboard (POST /api/rank, content is the requested count)
pub async fn rank(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let count: i64 = signed_content(&state, &headers, body).await?;
    let entries = state.ledger.rank_top(count).await?;
    Ok(Json(entries))
}

/// Compare stored total with event history (POST /api/balance/validate)
pub async fn validate_balance(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let identifier: String = signed_content(&state, &headers, body).await?;
    let check = state.ledger.validate_balance(&identifier).await?;
    Ok(Json(check))
}

/// Overwrite a diverged total with the event sum (POST /api/balance/recompute)
pub async fn recompute_balance(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let identifier: String = signed_content(&state, &headers, body).await?;
    let check = state.ledger.recompute_balance(&identifier).await?;
    Ok(Json(check))
}

/// Health check endpoint (GET /health)
///
/// Unauthenticated. Reports component status, build version, and ledger
/// counters.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = BTreeMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    components.insert("ledger".to_string(), "healthy".to_string());

    let response = HealthResponse {
        status: "healthy".to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
    };

    (StatusCode::OK, Json(response))
}
