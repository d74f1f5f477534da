//! Route Handlers
//!
//! Thin adapters from HTTP extractors to [`DeliveryService`].

use crate::error::ApiError;
use crate::types::{EnqueueResponse, PollResponse};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use linkrelay_core::application::{DeliveryService, EnqueueOutcome};
use linkrelay_core::domain::QueryParams;
use linkrelay_core::error::AppError;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub delivery: Arc<DeliveryService>,
}

/// Which URL family a request came in on
///
/// `/api/{token}` predates the docs block; it keeps its own examples and
/// message wording and never returns `docs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Root,
    Legacy,
}

/// JSON body only when the request says so; malformed JSON counts as no body
fn json_body(headers: &HeaderMap, body: &Bytes) -> Option<Value> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    if !is_json || body.is_empty() {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "Ignoring unparseable JSON body");
            None
        }
    }
}

fn legacy_error(error: AppError) -> AppError {
    match error {
        AppError::NoLinks { examples } => AppError::NoLinks {
            examples: examples
                .into_iter()
                .map(|e| e.replacen("/<TOKEN>", "/api/<SECRET>", 1))
                .collect(),
        },
        other => other,
    }
}

fn legacy_outcome(mut outcome: EnqueueOutcome) -> EnqueueOutcome {
    outcome.message = format!("Queued {} link(s).", outcome.queued);
    outcome
}

async fn enqueue(
    state: &AppState,
    surface: Surface,
    token: &str,
    pairs: Vec<(String, String)>,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Json<EnqueueResponse>, ApiError> {
    let query = QueryParams::from_pairs(pairs);
    let body = json_body(headers, body);
    let result = state.delivery.enqueue(token, &query, body.as_ref()).await;

    match surface {
        Surface::Root => {
            let docs = state.delivery.docs(token);
            match result {
                Ok(outcome) => Ok(Json(EnqueueResponse::new(outcome, Some(docs)))),
                Err(e) => Err(ApiError::new(e, Some(docs))),
            }
        }
        Surface::Legacy => match result {
            Ok(outcome) => Ok(Json(EnqueueResponse::new(legacy_outcome(outcome), None))),
            Err(e) => Err(ApiError::from(legacy_error(e))),
        },
    }
}

/// `GET|POST /{token}`
pub async fn enqueue_root(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<EnqueueResponse>, ApiError> {
    enqueue(&state, Surface::Root, &token, pairs, &headers, &body).await
}

/// `GET|POST /api/{token}`
pub async fn enqueue_legacy(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<EnqueueResponse>, ApiError> {
    enqueue(&state, Surface::Legacy, &token, pairs, &headers, &body).await
}

/// `GET /{token}/extension-poll` and its `/api` twin
pub async fn poll(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<PollResponse>, ApiError> {
    let outcome = state.delivery.poll(&token).await?;
    Ok(Json(outcome.into()))
}
