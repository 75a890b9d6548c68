// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use governance_kernel::error::KernelError;
use governance_kernel::identity::IdentityError;
use governance_kernel::policy::PolicyError;
use governance_kernel::types::{IdentityId, MessageId};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Why `authorize` refused. Every variant is a denial.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("message {message_id} was already used for a different request")]
    ReplayedMessage { message_id: MessageId },

    #[error("no resource account for identity {0}")]
    UnknownAccount(IdentityId),

    #[error("deadline exceeded before the transaction could start")]
    LockTimeout,

    /// The decision could not be made durable. Fail-closed.
    #[error("governance unavailable: {0}")]
    GovernanceUnavailable(String),
}

impl GovernanceError {
    /// Stable label for metrics and response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GovernanceError::InvalidRequest(_) => "invalid_request",
            GovernanceError::Identity(e) => e.kind(),
            GovernanceError::ReplayedMessage { .. } => "replayed_message",
            GovernanceError::UnknownAccount(_) => "unknown_account",
            GovernanceError::LockTimeout => "lock_timeout",
            GovernanceError::GovernanceUnavailable(_) => "governance_unavailable",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GovernanceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GovernanceError::Identity(IdentityError::Revoked(_))
            | GovernanceError::Identity(IdentityError::NamespaceMismatch { .. })
            | GovernanceError::UnknownAccount(_) => StatusCode::FORBIDDEN,
            GovernanceError::Identity(_) => StatusCode::UNAUTHORIZED,
            GovernanceError::ReplayedMessage { .. } => StatusCode::CONFLICT,
            GovernanceError::LockTimeout | GovernanceError::GovernanceUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl From<KernelError> for GovernanceError {
    fn from(e: KernelError) -> Self {
        GovernanceError::InvalidRequest(e.to_string())
    }
}

impl IntoResponse for GovernanceError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (self.status(), body).into_response()
    }
}

/// Errors from the read-side HTTP surface.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        let body = Json(json!({
            "error": self.to_string(),
            "kind": kind,
        }));
        (status, body).into_response()
    }
}

/// Anything that stops the node from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] crate::events::StorageError),
    #[error(transparent)]
    Ledger(#[from] crate::events::LedgerError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("cannot read {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("cannot parse {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("a policy file requires GOV_POLICY_HASH")]
    PolicyHashMissing,

    #[error(transparent)]
    Policy(#[from] PolicyError),
}
