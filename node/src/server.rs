// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::api::*;
use crate::coordinator::Authorization;
use crate::engine::Engine;
use crate::errors::{ApiError, GovernanceError};
use crate::escalation::ResolvedEscalation;
use axum::body::Body;
use axum::extract::{Path, Query, Request as AxumRequest, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use governance_kernel::ledger::LedgerEntry;
use governance_kernel::proof::ChainProof;
use governance_kernel::types::{IdentityId, MessageId, ResourceState, SignedRequest};
use governance_kernel::verify::ChainReport;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;

pub type SharedEngine = Arc<Engine>;

/// Most entries returned by one range read.
pub const MAX_PAGE: u64 = 1000;

async fn auth_guard(
    State(token): State<Arc<Option<String>>>,
    req: AxumRequest,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = token.as_ref() else {
        return Ok(next.run(req).await);
    };
    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "));
    match provided {
        Some(p) if p == expected => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

pub fn build_router(state: SharedEngine, auth_token: Option<String>) -> Router {
    let mut app = Router::new()
        .route("/v1/authorize", post(authorize))
        .route("/v1/ledger/entries", get(ledger_range))
        .route("/v1/ledger/entries/:seq", get(ledger_entry))
        .route("/v1/ledger/messages/:identity/:message_id", get(ledger_by_message))
        .route("/v1/ledger/verify", get(ledger_verify))
        .route("/v1/ledger/proof", get(ledger_proof))
        .route("/v1/ledger/download", get(ledger_download))
        .route("/v1/resources/:identity", get(resource_state))
        .route("/v1/identities/:identity/revoke", post(revoke_identity))
        .route("/v1/escalations", get(list_escalations))
        .route("/v1/escalations/:decision_id/resolve", post(resolve_escalation))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    if let Some(token) = auth_token {
        tracing::info!("Auth Enabled: Bearer token required");
        app = app.layer(from_fn_with_state(Arc::new(Some(token)), auth_guard));
    } else {
        tracing::warn!("Auth Disabled: No token configured");
    }

    app.layer(TraceLayer::new_for_http())
}

async fn authorize(
    State(engine): State<SharedEngine>,
    Query(params): Query<AuthorizeParams>,
    Json(signed): Json<SignedRequest>,
) -> Result<Json<Authorization>, GovernanceError> {
    let auth = match params.deadline_ms {
        Some(ms) => engine.coordinator.authorize_within(signed, Duration::from_millis(ms)).await?,
        None => engine.coordinator.authorize(signed).await?,
    };
    Ok(Json(auth))
}

async fn ledger_range(
    State(engine): State<SharedEngine>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    let from = params.from.unwrap_or(0);
    let cap = from.saturating_add(MAX_PAGE - 1);
    let to = params.to.map(|t| t.min(cap)).unwrap_or(cap);
    if to < from {
        return Err(ApiError::InvalidInput(format!("empty range {}..={}", from, to)));
    }
    Ok(Json(engine.ledger().range(from, Some(to))))
}

async fn ledger_entry(
    State(engine): State<SharedEngine>,
    Path(seq): Path<u64>,
) -> Result<Json<LedgerEntry>, ApiError> {
    engine
        .ledger()
        .entry(seq)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("entry {}", seq)))
}

async fn ledger_by_message(
    State(engine): State<SharedEngine>,
    Path((identity, message_id)): Path<(String, String)>,
) -> Result<Json<LedgerEntry>, ApiError> {
    let identity = IdentityId::from(identity);
    let message_id = MessageId::from(message_id);
    engine
        .ledger()
        .by_message(&identity, &message_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("decision for {}/{}", identity, message_id)))
}

async fn ledger_verify(
    State(engine): State<SharedEngine>,
    Query(params): Query<RangeParams>,
) -> Json<ChainReport> {
    Json(engine.ledger().verify(params.from.unwrap_or(0), params.to))
}

async fn ledger_proof(State(engine): State<SharedEngine>) -> Result<Json<ChainProof>, ApiError> {
    let ledger = engine.ledger().clone();
    let proof = tokio::task::spawn_blocking(move || ledger.proof())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    metrics::counter!("governance_proofs_generated_total", 1);
    Ok(Json(proof))
}

async fn ledger_download(State(engine): State<SharedEngine>) -> Result<Body, ApiError> {
    let path = engine
        .ledger()
        .path()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| ApiError::NotFound("ledger file (in-memory ledger)".into()))?;
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to open ledger: {}", e)))?;
    Ok(Body::from_stream(ReaderStream::new(file)))
}

async fn resource_state(
    State(engine): State<SharedEngine>,
    Path(identity): Path<String>,
) -> Result<Json<ResourceState>, ApiError> {
    let id = IdentityId::from(identity);
    engine
        .resources()
        .get(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("resource account {}", id)))
}

/// Revoke until restart. The registry file stays the source of truth.
async fn revoke_identity(
    State(engine): State<SharedEngine>,
    Path(identity): Path<String>,
) -> Result<Json<RevokeResponse>, ApiError> {
    let id = IdentityId::from(identity);
    if !engine.directory.revoke(&id) {
        return Err(ApiError::NotFound(format!("identity {}", id)));
    }
    tracing::warn!(
        "Identity {} revoked in memory only; set \"revoked\": true in the registry file to keep it across restarts",
        id
    );
    Ok(Json(RevokeResponse { identity_id: id.0, revoked: true }))
}

async fn list_escalations(State(engine): State<SharedEngine>) -> Json<EscalationsResponse> {
    Json(EscalationsResponse {
        pending: engine.escalations.pending(),
        resolved: engine.escalations.resolved(),
    })
}

async fn resolve_escalation(
    State(engine): State<SharedEngine>,
    Path(decision_id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolvedEscalation>, ApiError> {
    engine
        .escalations
        .resolve(&decision_id.into(), req.approve, req.resolver)
        .map(Json)
        .map_err(|e| ApiError::NotFound(e.to_string()))
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
