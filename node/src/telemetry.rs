// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "governance_node=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    init_metrics();
}

/// Install the Prometheus recorder. Idempotent.
pub fn init_metrics() {
    if PROM_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set");
            }
        }
        Err(e) => {
            tracing::warn!("Prometheus recorder not installed: {}", e);
            return;
        }
    }

    metrics::describe_counter!("governance_decisions_total", "Decisions durably recorded, by outcome and tier");
    metrics::describe_counter!("governance_rejections_total", "Requests rejected before the critical section, by reason");
    metrics::describe_counter!("governance_rollbacks_total", "Transactions rolled back after a ledger failure");
    metrics::describe_counter!("governance_replays_total", "Duplicate submissions answered from the ledger");
    metrics::describe_histogram!("governance_ledger_append_duration_seconds", "Time to durably append a ledger entry");
    metrics::describe_gauge!("governance_ledger_height", "Number of entries in the decision ledger");
    metrics::describe_counter!("governance_escalations_total", "Escalation records emitted");
    metrics::describe_counter!("governance_escalations_dropped_total", "Escalation records dropped on a full channel");
    metrics::describe_counter!("governance_proofs_generated_total", "Chain proofs served");

    metrics::gauge!("governance_node_up", 1.0);
}

/// Rendered Prometheus exposition.
pub fn get_metrics() -> String {
    match PROM_HANDLE.get() {
        Some(handle) => handle.render(),
        None => "# metrics not initialized".to_string(),
    }
}
