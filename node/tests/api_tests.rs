// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::*;
use governance_kernel::fxp::Amount;
use governance_kernel::ledger::LedgerEntry;
use governance_kernel::types::{Outcome, ResourceState, SignedRequest};
use governance_kernel::verify::ChainReport;
use governance_node::api::{EscalationsResponse, ResolveRequest};
use governance_node::coordinator::Authorization;
use governance_node::escalation::{Resolution, ResolvedEscalation};
use governance_node::server::build_router;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tower::ServiceExt; // for oneshot

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn json<T: DeserializeOwned>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn authorize_req(signed: &SignedRequest) -> Request<Body> {
    post_json("/v1/authorize", serde_json::to_vec(signed).unwrap())
}

#[tokio::test]
async fn test_authorize_then_read_the_ledger() {
    let (h, k) = single_agent(50);
    let app = build_router(h.engine.clone(), None);

    let signed = sign(&k, request("agent-a", "m-1", "deploy_service", 10));
    let (status, body) = send(&app, authorize_req(&signed)).await;
    assert_eq!(status, StatusCode::OK);
    let auth: Authorization = json(&body);
    assert_eq!(auth.decision.outcome, Outcome::Allow);

    let (status, body) = send(&app, get("/v1/ledger/entries?from=0")).await;
    assert_eq!(status, StatusCode::OK);
    let entries: Vec<LedgerEntry> = json(&body);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_hash, auth.entry_hash);

    let (status, body) = send(&app, get("/v1/ledger/entries/0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json::<LedgerEntry>(&body), entries[0]);

    let (status, _) = send(&app, get("/v1/ledger/entries/5")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/v1/ledger/messages/agent-a/m-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json::<LedgerEntry>(&body).sequence_id, 0);

    let (status, body) = send(&app, get("/v1/ledger/verify")).await;
    assert_eq!(status, StatusCode::OK);
    let report: ChainReport = json(&body);
    assert!(report.is_intact());
    assert_eq!(report.checked, 1);

    let (status, body) = send(&app, get("/v1/resources/agent-a")).await;
    assert_eq!(status, StatusCode::OK);
    let state: ResourceState = json(&body);
    assert_eq!(state.budget_remaining, Amount::from_units(40).unwrap());
}

#[tokio::test]
async fn test_refusals_map_to_status_codes() {
    let (h, k) = single_agent(50);
    let app = build_router(h.engine.clone(), None);

    let (status, _) = send(&app, authorize_req(&sign(&k, request("agent-a", "m-1", "deploy_service", 10)))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, authorize_req(&sign(&k, request("agent-a", "m-1", "deploy_service", 11)))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let err: serde_json::Value = json(&body);
    assert_eq!(err["kind"], "replayed_message");

    let (status, _) = send(&app, authorize_req(&sign(&key(9), request("agent-a", "m-2", "deploy_service", 10)))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, post_json("/v1/identities/agent-a/revoke", Vec::new())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, authorize_req(&sign(&k, request("agent-a", "m-3", "deploy_service", 10)))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let err: serde_json::Value = json(&body);
    assert_eq!(err["kind"], "revoked");

    let (status, _) = send(&app, post_json("/v1/identities/nobody/revoke", Vec::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bearer_token_is_enforced() {
    let (h, _k) = single_agent(50);
    let app = build_router(h.engine.clone(), Some("s3cret".into()));

    let (status, _) = send(&app, get("/v1/ledger/proof")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/v1/ledger/proof")
        .header("authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_escalation_is_listed_and_resolved() {
    let (h, k) = single_agent(5);
    h.engine.start_escalation_worker();
    let app = build_router(h.engine.clone(), None);

    let (status, body) = send(&app, authorize_req(&sign(&k, request("agent-a", "m-1", "deploy_service", 10)))).await;
    assert_eq!(status, StatusCode::OK);
    let auth: Authorization = json(&body);
    assert_eq!(auth.decision.outcome, Outcome::EscalateHuman);

    let mut listed = EscalationsResponse { pending: Vec::new(), resolved: Vec::new() };
    for _ in 0..100 {
        let (_, body) = send(&app, get("/v1/escalations")).await;
        listed = json(&body);
        if !listed.pending.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(listed.pending.len(), 1);

    let uri = format!("/v1/escalations/{}/resolve", auth.decision.decision_id);
    let body = serde_json::to_vec(&ResolveRequest { approve: false, resolver: Some("oncall".into()) }).unwrap();
    let (status, resp) = send(&app, post_json(&uri, body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let resolved: ResolvedEscalation = json(&resp);
    assert_eq!(resolved.resolution, Resolution::Denied);
    assert_eq!(resolved.resolver.as_deref(), Some("oncall"));

    let (status, _) = send(&app, post_json(&uri, body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Resolution never touches the resource ledger.
    assert_eq!(budget_of(&h, "agent-a"), Amount::from_units(5).unwrap());
}

#[tokio::test]
async fn test_download_requires_a_file_ledger() {
    let (h, _k) = single_agent(50);
    let app = build_router(h.engine.clone(), None);
    let (status, _) = send(&app, get("/v1/ledger/download")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_proof_requests_are_counted() {
    governance_node::telemetry::init_metrics();
    let (h, _k) = single_agent(50);
    let app = build_router(h.engine.clone(), None);

    let (status, _) = send(&app, get("/v1/ledger/proof")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("# HELP governance_proofs_generated_total Chain proofs served"));
    assert!(text.contains("governance_proofs_generated_total 1"));
}
