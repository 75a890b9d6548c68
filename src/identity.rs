// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity Verifier.
//!
//! Pure checks over supplied identity data plus a revocation lookup, in this
//! order: signature, revocation, namespace, timestamp freshness. The first
//! failing check is reported. Nothing here mutates state.

use crate::config::{DEFAULT_CLOCK_SKEW_MS, DEFAULT_REPLAY_WINDOW_MS};
use crate::types::digest::SignatureBytes;
use crate::types::id::{IdentityId, Namespace};
use crate::types::identity::Identity;
use crate::types::request::SignedRequest;
use ed25519_dalek::{Signature, VerifyingKey};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("unknown identity {0}")]
    UnknownIdentity(IdentityId),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("identity {0} is revoked")]
    Revoked(IdentityId),

    #[error("namespace mismatch: claimed {claimed}, assigned {assigned}")]
    NamespaceMismatch { claimed: Namespace, assigned: Namespace },

    #[error("request expired: {age_ms}ms old (window {window_ms}ms)")]
    Expired { age_ms: u64, window_ms: u64 },

    #[error("request timestamp {ahead_ms}ms in the future")]
    FutureTimestamp { ahead_ms: u64 },
}

impl IdentityError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityError::UnknownIdentity(_) => "unknown_identity",
            IdentityError::InvalidSignature => "invalid_signature",
            IdentityError::Revoked(_) => "revoked",
            IdentityError::NamespaceMismatch { .. } => "namespace_mismatch",
            IdentityError::Expired { .. } | IdentityError::FutureTimestamp { .. } => "expired",
        }
    }
}

/// External identity and revocation source.
pub trait IdentitySource: Send + Sync {
    fn identity(&self, id: &IdentityId) -> Option<Identity>;

    /// Live revocation status. Defaults to the flag on the issued identity.
    fn is_revoked(&self, id: &IdentityId) -> bool {
        self.identity(id).map(|i| i.revoked).unwrap_or(true)
    }
}

/// An identity that passed every check. Only the verifier constructs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedIdentity {
    identity: Identity,
}

impl VerifiedIdentity {
    pub fn id(&self) -> &IdentityId {
        &self.identity.id
    }

    pub fn namespace(&self) -> &Namespace {
        &self.identity.namespace
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

#[derive(Clone, Copy, Debug)]
pub struct IdentityVerifier {
    freshness_window_ms: u64,
    max_clock_skew_ms: u64,
}

impl Default for IdentityVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_WINDOW_MS, DEFAULT_CLOCK_SKEW_MS)
    }
}

impl IdentityVerifier {
    pub fn new(freshness_window_ms: u64, max_clock_skew_ms: u64) -> Self {
        Self { freshness_window_ms, max_clock_skew_ms }
    }

    pub fn freshness_window_ms(&self) -> u64 {
        self.freshness_window_ms
    }

    /// Verify `signed` against an already-resolved identity.
    pub fn verify(
        &self,
        identity: &Identity,
        revoked: bool,
        signed: &SignedRequest,
        now_ms: u64,
    ) -> Result<VerifiedIdentity, IdentityError> {
        let request = &signed.request;
        if request.identity_id != identity.id {
            return Err(IdentityError::UnknownIdentity(request.identity_id.clone()));
        }

        let message = request
            .signing_bytes()
            .map_err(|_| IdentityError::InvalidSignature)?;
        check_signature(identity, &message, &signed.signature)?;

        if revoked || identity.revoked {
            return Err(IdentityError::Revoked(identity.id.clone()));
        }

        if request.namespace != identity.namespace {
            return Err(IdentityError::NamespaceMismatch {
                claimed: request.namespace.clone(),
                assigned: identity.namespace.clone(),
            });
        }

        self.check_freshness(request.timestamp, now_ms)?;

        Ok(VerifiedIdentity { identity: identity.clone() })
    }

    /// Resolve the claimed identity through `source`, then [`Self::verify`].
    pub fn verify_with(
        &self,
        source: &dyn IdentitySource,
        signed: &SignedRequest,
        now_ms: u64,
    ) -> Result<VerifiedIdentity, IdentityError> {
        let id = &signed.request.identity_id;
        let identity = source
            .identity(id)
            .ok_or_else(|| IdentityError::UnknownIdentity(id.clone()))?;
        let revoked = source.is_revoked(id);
        self.verify(&identity, revoked, signed, now_ms)
    }

    pub fn check_freshness(&self, timestamp_ms: u64, now_ms: u64) -> Result<(), IdentityError> {
        if timestamp_ms > now_ms {
            let ahead_ms = timestamp_ms - now_ms;
            if ahead_ms > self.max_clock_skew_ms {
                return Err(IdentityError::FutureTimestamp { ahead_ms });
            }
            return Ok(());
        }
        let age_ms = now_ms - timestamp_ms;
        if age_ms > self.freshness_window_ms {
            return Err(IdentityError::Expired {
                age_ms,
                window_ms: self.freshness_window_ms,
            });
        }
        Ok(())
    }
}

fn check_signature(identity: &Identity, message: &[u8], signature: &SignatureBytes) -> Result<(), IdentityError> {
    let key = VerifyingKey::from_bytes(identity.public_key.as_bytes())
        .map_err(|_| IdentityError::InvalidSignature)?;
    let sig = Signature::from_bytes(signature.as_bytes());
    key.verify_strict(message, &sig)
        .map_err(|_| IdentityError::InvalidSignature)
}
