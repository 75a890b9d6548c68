// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Weighted risk score for the optional risk rule.
//!
//! Three factors, each scored 10 (low) or 90 (high):
//! blast radius (weight 0.5), reversibility (0.3), cost impact (0.2).
//! The result is in `[10, 90]`.

use crate::fxp::Amount;
use crate::types::request::ActionRequest;

const BLAST_WEIGHT: u32 = 5;
const REVERSIBLE_WEIGHT: u32 = 3;
const COST_WEIGHT: u32 = 2;

const LOW: u32 = 10;
const HIGH: u32 = 90;

/// Affected resources at or above this count a wide blast radius.
pub const WIDE_BLAST_RADIUS: u64 = 10;

/// Whole-unit cost at or above which cost impact is high.
pub const HIGH_COST_UNITS: i64 = 100;

pub fn risk_score(request: &ActionRequest) -> u32 {
    let affected: u64 = request
        .param("affected_resources")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);
    let blast = if affected >= WIDE_BLAST_RADIUS { HIGH } else { LOW };

    let reversible = if has_rollback_plan(request) { LOW } else { HIGH };

    let high_cost = Amount::from_units(HIGH_COST_UNITS)
        .map(|threshold| request.estimated_cost >= threshold)
        .unwrap_or(false);
    let cost = if high_cost { HIGH } else { LOW };

    (blast * BLAST_WEIGHT + reversible * REVERSIBLE_WEIGHT + cost * COST_WEIGHT) / 10
}

pub fn has_rollback_plan(request: &ActionRequest) -> bool {
    request
        .param("rollback_plan")
        .map(|p| !p.trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::request;

    #[test]
    fn test_low_risk_reversible_action() {
        let mut r = request("a", "ns", "m", 0);
        r.params.insert("affected_resources".into(), "5".into());
        r.params.insert("rollback_plan".into(), "helm rollback".into());
        r.estimated_cost = Amount::from_units(50).unwrap();
        // 10*.5 + 10*.3 + 10*.2
        assert_eq!(risk_score(&r), 10);
    }

    #[test]
    fn test_high_risk_irreversible_action() {
        let mut r = request("a", "ns", "m", 0);
        r.params.insert("affected_resources".into(), "50".into());
        r.estimated_cost = Amount::from_units(5000).unwrap();
        assert_eq!(risk_score(&r), 90);
    }

    #[test]
    fn test_missing_rollback_alone_crosses_default_threshold() {
        let r = request("a", "ns", "m", 0);
        // 10*.5 + 90*.3 + 10*.2 = 34
        assert_eq!(risk_score(&r), 34);
    }
}
