// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::Context;
use governance_node::config::NodeConfig;
use governance_node::engine::Engine;
use governance_node::server::{build_router, SharedEngine};
use governance_node::telemetry::init_telemetry;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry();

    let cfg = NodeConfig::from_env().context("invalid node configuration")?;
    tracing::info!(
        "Initializing Governance Node: bind={} ledger={:?} policy={:?} registry={:?}",
        cfg.bind_addr,
        cfg.ledger_path,
        cfg.policy_path,
        cfg.registry_path
    );

    let engine = Engine::open(&cfg).context("failed to start governance engine")?;
    tracing::info!(
        "Recovered {} entries ({} decisions, {} voided), {} accounts restored from the ledger",
        engine.recovery.entries,
        engine.recovery.decisions,
        engine.recovery.voided,
        engine.recovery.accounts_restored
    );
    engine.start_escalation_worker();

    let shared_state: SharedEngine = Arc::new(engine);
    let app = build_router(shared_state, cfg.auth_token.clone());

    let addr = cfg.bind_addr;
    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server terminated")?;
    Ok(())
}
