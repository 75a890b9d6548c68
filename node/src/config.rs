// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::errors::ConfigError;
use governance_kernel::config::{BASELINE_POLICY_HASH, DEFAULT_CLOCK_SKEW_MS, DEFAULT_REPLAY_WINDOW_MS};
use governance_kernel::fxp::Amount;
use governance_kernel::policy::{PolicyEvaluator, PolicySet};
use governance_kernel::types::{Digest, Identity, IdentityId, ResourceCeilings};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// What an escalation resolves to when nobody answers before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutResolution {
    Deny,
    Allow,
}

impl FromStr for TimeoutResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deny" => Ok(TimeoutResolution::Deny),
            "allow" => Ok(TimeoutResolution::Allow),
            other => Err(format!("expected deny|allow, got {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    /// In-memory ledger when unset.
    pub ledger_path: Option<PathBuf>,
    /// Built-in baseline policy when unset.
    pub policy_path: Option<PathBuf>,
    pub policy_hash: Option<Digest>,
    pub registry_path: Option<PathBuf>,
    pub replay_window: Duration,
    pub clock_skew: Duration,
    pub write_timeout: Duration,
    pub authorize_deadline: Duration,
    pub escalation_sla: Duration,
    pub escalation_on_timeout: TimeoutResolution,
    pub escalation_channel_capacity: usize,
    pub lock_shards: usize,
    pub auth_token: Option<String>,
    /// Ed25519 seed of the ledger signing key.
    pub signing_seed: Option<[u8; 32]>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            ledger_path: None,
            policy_path: None,
            policy_hash: None,
            registry_path: None,
            replay_window: Duration::from_millis(DEFAULT_REPLAY_WINDOW_MS),
            clock_skew: Duration::from_millis(DEFAULT_CLOCK_SKEW_MS),
            write_timeout: Duration::from_secs(2),
            authorize_deadline: Duration::from_secs(5),
            escalation_sla: Duration::from_secs(4 * 60 * 60),
            escalation_on_timeout: TimeoutResolution::Deny,
            escalation_channel_capacity: 1024,
            lock_shards: 16,
            auth_token: None,
            signing_seed: None,
        }
    }
}

fn var(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| ConfigError::Env {
                var: name,
                reason: e.to_string(),
            })
        })
        .transpose()
}

impl NodeConfig {
    /// Defaults overridden by `GOV_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(addr) = parse_var::<SocketAddr>("GOV_BIND_ADDR")? {
            cfg.bind_addr = addr;
        }
        cfg.ledger_path = var("GOV_LEDGER_PATH").map(PathBuf::from);
        cfg.policy_path = var("GOV_POLICY_PATH").map(PathBuf::from);
        cfg.registry_path = var("GOV_REGISTRY_PATH").map(PathBuf::from);
        if let Some(hash) = var("GOV_POLICY_HASH") {
            cfg.policy_hash = Some(Digest::from_hex(&hash).map_err(|e| ConfigError::Env {
                var: "GOV_POLICY_HASH",
                reason: e.to_string(),
            })?);
        }
        if let Some(secs) = parse_var::<u64>("GOV_REPLAY_WINDOW_SECS")? {
            cfg.replay_window = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("GOV_CLOCK_SKEW_SECS")? {
            cfg.clock_skew = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>("GOV_WRITE_TIMEOUT_MS")? {
            cfg.write_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>("GOV_AUTHORIZE_DEADLINE_MS")? {
            cfg.authorize_deadline = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>("GOV_ESCALATION_SLA_SECS")? {
            cfg.escalation_sla = Duration::from_secs(secs);
        }
        if let Some(res) = parse_var::<TimeoutResolution>("GOV_ESCALATION_ON_TIMEOUT")? {
            cfg.escalation_on_timeout = res;
        }
        if let Some(shards) = parse_var::<usize>("GOV_LOCK_SHARDS")? {
            if shards == 0 {
                return Err(ConfigError::Env { var: "GOV_LOCK_SHARDS", reason: "must be positive".into() });
            }
            cfg.lock_shards = shards;
        }
        cfg.auth_token = var("GOV_AUTH_TOKEN");
        if let Some(seed) = var("GOV_SIGNING_KEY") {
            let mut out = [0u8; 32];
            hex::decode_to_slice(seed.trim(), &mut out).map_err(|e| ConfigError::Env {
                var: "GOV_SIGNING_KEY",
                reason: e.to_string(),
            })?;
            cfg.signing_seed = Some(out);
        }

        Ok(cfg)
    }

    /// Load and pin the configured policy.
    ///
    /// A policy file must come with its expected hash. Without a file the
    /// baseline policy is pinned at [`BASELINE_POLICY_HASH`].
    pub fn load_policy(&self) -> Result<PolicyEvaluator, ConfigError> {
        let Some(path) = &self.policy_path else {
            return PolicyEvaluator::new(PolicySet::baseline(), Digest(BASELINE_POLICY_HASH))
                .map_err(ConfigError::Policy);
        };
        let expected = self.policy_hash.ok_or(ConfigError::PolicyHashMissing)?;
        let policy: PolicySet = read_json(path)?;
        PolicyEvaluator::new(policy, expected).map_err(ConfigError::Policy)
    }

    pub fn load_registry(&self) -> Result<Registry, ConfigError> {
        match &self.registry_path {
            Some(path) => read_json(path),
            None => Ok(Registry::default()),
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Seed resource account for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSeed {
    pub identity_id: IdentityId,
    pub budget: Amount,
    #[serde(default)]
    pub ceilings: ResourceCeilings,
}

/// Identity and account registry file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub identities: Vec<Identity>,
    #[serde(default)]
    pub accounts: Vec<AccountSeed>,
}
