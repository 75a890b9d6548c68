// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Governance data model.

pub mod id;
pub mod digest;
pub mod identity;
pub mod request;
pub mod resource;
pub mod decision;

pub use id::{ActionKind, DecisionId, IdentityId, MessageId, Namespace, PolicyId};
pub use digest::{Digest, PublicKey, SignatureBytes};
pub use identity::Identity;
pub use request::{ActionRequest, ResourceUsage, SignedRequest};
pub use resource::{ResourceCeilings, ResourceDelta, ResourceState, Shortfall};
pub use decision::{Decision, Outcome, RuleTag, Tier};
