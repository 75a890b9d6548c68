// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Versioned, hash-addressed policy definitions.

use crate::error::KernelResult;
use crate::hash::hash_canonical;
use crate::policy::rules::Rule;
use crate::types::digest::Digest;
use crate::types::id::{ActionKind, Namespace, PolicyId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A complete rule set. Supplied externally; identified by
/// `BLAKE3(canonical(PolicySet))`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    pub policy_id: PolicyId,
    pub version: u32,
    /// Always denied, tier 3.
    #[serde(default)]
    pub prohibited_actions: BTreeSet<ActionKind>,
    /// Subject to the destructive-action safety gate.
    #[serde(default)]
    pub destructive_actions: BTreeSet<ActionKind>,
    #[serde(default)]
    pub read_only_actions: BTreeSet<ActionKind>,
    /// Safe to auto-approve when the request is flagged idempotent.
    #[serde(default)]
    pub idempotent_safe_actions: BTreeSet<ActionKind>,
    /// Destination prefix -> owning namespace. Longest prefix wins.
    #[serde(default)]
    pub destination_owners: BTreeMap<String, Namespace>,
    /// Evaluated in order; first match wins.
    #[serde(default = "Rule::standard")]
    pub rules: Vec<Rule>,
}

fn actions(names: &[&str]) -> BTreeSet<ActionKind> {
    names.iter().map(|n| ActionKind::from(*n)).collect()
}

impl PolicySet {
    /// Built-in policy used when no policy file is configured.
    pub fn baseline() -> Self {
        Self {
            policy_id: PolicyId::from("baseline"),
            version: 1,
            prohibited_actions: actions(&["credential_export", "audit_log_deletion", "policy_bypass"]),
            destructive_actions: actions(&[
                "delete_database",
                "drop_table",
                "delete_namespace",
                "terminate_instance",
                "purge_storage",
            ]),
            read_only_actions: actions(&["read_metrics", "list_resources", "get_status", "describe"]),
            idempotent_safe_actions: actions(&[
                "restart_pod",
                "scale_within_limits",
                "renew_certificate",
                "rotate_logs",
                "update_configmap",
                "rolling_restart",
            ]),
            destination_owners: BTreeMap::new(),
            rules: Rule::standard(),
        }
    }

    pub fn policy_hash(&self) -> KernelResult<Digest> {
        hash_canonical(self)
    }

    /// Owning namespace of `destination`, by longest matching prefix.
    pub fn owner_of(&self, destination: &str) -> Option<&Namespace> {
        self.destination_owners
            .iter()
            .filter(|(prefix, _)| destination.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, ns)| ns)
    }

    pub fn is_prohibited(&self, action: &ActionKind) -> bool {
        self.prohibited_actions.contains(action)
    }

    pub fn is_destructive(&self, action: &ActionKind) -> bool {
        self.destructive_actions.contains(action)
    }

    pub fn is_read_only(&self, action: &ActionKind) -> bool {
        self.read_only_actions.contains(action)
    }

    pub fn is_idempotent_safe(&self, action: &ActionKind) -> bool {
        self.idempotent_safe_actions.contains(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BASELINE_POLICY_HASH;

    #[test]
    fn test_baseline_matches_pinned_hash() {
        assert_eq!(PolicySet::baseline().policy_hash().unwrap(), Digest(BASELINE_POLICY_HASH));
    }

    #[test]
    fn test_policy_hash_changes_with_content() {
        let a = PolicySet::baseline();
        let mut b = PolicySet::baseline();
        assert_eq!(a.policy_hash().unwrap(), b.policy_hash().unwrap());
        b.prohibited_actions.insert("drop_everything".into());
        assert_ne!(a.policy_hash().unwrap(), b.policy_hash().unwrap());
    }

    #[test]
    fn test_longest_prefix_owner() {
        let mut p = PolicySet::baseline();
        p.destination_owners.insert("db/".into(), "data".into());
        p.destination_owners.insert("db/payments/".into(), "payments".into());
        assert_eq!(p.owner_of("db/payments/ledger").unwrap().as_str(), "payments");
        assert_eq!(p.owner_of("db/analytics").unwrap().as_str(), "data");
        assert!(p.owner_of("queue/jobs").is_none());
    }

    #[test]
    fn test_policy_json_defaults_rules() {
        let json = r#"{ "policy_id": "p", "version": 3, "prohibited_actions": ["x"] }"#;
        let p: PolicySet = serde_json::from_str(json).unwrap();
        assert_eq!(p.rules, Rule::standard());
        assert!(p.is_prohibited(&"x".into()));
    }
}
