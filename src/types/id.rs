// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identifier types.

use serde::{Deserialize, Serialize};
use core::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

string_id!(
    /// Agent identity issued by the external identity authority.
    IdentityId
);
string_id!(
    /// Tenant / scope an identity is confined to.
    Namespace
);
string_id!(
    /// Caller-chosen unique message id; the replay guard key.
    MessageId
);
string_id!(
    /// Kind of action an agent asks to perform (e.g. `scale_deployment`).
    ActionKind
);
string_id!(PolicyId);
string_id!(DecisionId);

impl DecisionId {
    /// Deterministic decision id: first 16 bytes of
    /// BLAKE3(identity ‖ 0x00 ‖ message_id), hex encoded.
    pub fn derive(identity: &IdentityId, message: &MessageId) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(identity.0.as_bytes());
        hasher.update(&[0]);
        hasher.update(message.0.as_bytes());
        let digest = hasher.finalize();
        DecisionId(hex::encode(&digest.as_bytes()[..16]))
    }
}
