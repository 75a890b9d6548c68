// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::clock::{Clock, SystemClock};
use crate::config::NodeConfig;
use crate::coordinator::{Coordinator, CoordinatorParts};
use crate::directory::InMemoryDirectory;
use crate::errors::StartupError;
use crate::escalation::{self, EscalationHandler, EscalationRecord};
use crate::events::{DecisionLedger, FileStorage, LedgerStorage, MemoryStorage};
use crate::recovery::{restore_resource_states, RecoveryReport};
use crate::state::ResourceLedger;
use governance_kernel::identity::IdentityVerifier;
use governance_kernel::ledger::LedgerSigner;
use governance_kernel::types::ResourceState;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

const ESCALATION_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// The assembled node: both ledgers, the coordinator and its collaborators.
pub struct Engine {
    pub coordinator: Coordinator,
    pub directory: Arc<InMemoryDirectory>,
    pub escalations: Arc<EscalationHandler>,
    pub recovery: RecoveryReport,
    escalation_rx: Mutex<Option<mpsc::Receiver<EscalationRecord>>>,
}

impl Engine {
    /// Build from config: file-backed ledger when a path is set, else memory.
    pub fn open(cfg: &NodeConfig) -> Result<Self, StartupError> {
        let storage: Box<dyn LedgerStorage> = match &cfg.ledger_path {
            Some(path) => {
                tracing::info!("Opening decision ledger at {:?}", path);
                Box::new(FileStorage::open(path)?)
            }
            None => {
                tracing::warn!("No ledger path configured: decisions are not durable across restarts");
                Box::new(MemoryStorage::new())
            }
        };
        Self::with_storage(cfg, storage, Arc::new(SystemClock))
    }

    pub fn with_storage(
        cfg: &NodeConfig,
        storage: Box<dyn LedgerStorage>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StartupError> {
        let evaluator = cfg.load_policy()?;
        tracing::info!(
            "Policy {} v{} pinned at {}",
            evaluator.policy().policy_id,
            evaluator.policy().version,
            evaluator.policy_hash()
        );

        let registry = cfg.load_registry()?;
        let directory = Arc::new(InMemoryDirectory::new(registry.identities));

        let resources = Arc::new(ResourceLedger::new(cfg.lock_shards));
        for seed in registry.accounts {
            resources.provision(ResourceState::new(seed.identity_id, seed.budget, seed.ceilings));
        }

        let seed = cfg.signing_seed.unwrap_or_else(|| {
            tracing::warn!("GOV_SIGNING_KEY not set: using the development ledger key");
            blake3::derive_key("governance-node development ledger key", &[])
        });
        let ledger = Arc::new(DecisionLedger::open(storage, LedgerSigner::from_seed(seed), cfg.write_timeout)?);
        let recovery = restore_resource_states(&ledger, &resources);

        let (sender, rx) = escalation::channel(cfg.escalation_channel_capacity);
        let escalations = Arc::new(EscalationHandler::new(cfg.escalation_on_timeout, clock.clone()));

        let coordinator = Coordinator::new(CoordinatorParts {
            verifier: IdentityVerifier::new(
                cfg.replay_window.as_millis() as u64,
                cfg.clock_skew.as_millis() as u64,
            ),
            identities: directory.clone(),
            evaluator,
            resources,
            ledger,
            escalations: Some(sender),
            clock,
            default_deadline: cfg.authorize_deadline,
            escalation_sla: cfg.escalation_sla,
        });

        Ok(Self {
            coordinator,
            directory,
            escalations,
            recovery,
            escalation_rx: Mutex::new(Some(rx)),
        })
    }

    /// Spawn the escalation consumer. Only the first call has an effect.
    pub fn start_escalation_worker(&self) {
        let rx = self.escalation_rx.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(rx) = rx {
            tokio::spawn(self.escalations.clone().run(rx, ESCALATION_SWEEP_INTERVAL));
        }
    }

    pub fn ledger(&self) -> &Arc<DecisionLedger> {
        self.coordinator.ledger()
    }

    pub fn resources(&self) -> &Arc<ResourceLedger> {
        self.coordinator.resources()
    }
}
