// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::escalation::{EscalationRecord, ResolvedEscalation};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Default)]
pub struct AuthorizeParams {
    /// Caller deadline for reaching the critical section.
    pub deadline_ms: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RangeParams {
    pub from: Option<u64>,
    pub to: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RevokeResponse {
    pub identity_id: String,
    pub revoked: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct EscalationsResponse {
    pub pending: Vec<EscalationRecord>,
    pub resolved: Vec<ResolvedEscalation>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ResolveRequest {
    pub approve: bool,
    #[serde(default)]
    pub resolver: Option<String>,
}
