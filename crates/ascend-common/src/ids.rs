//! ID types for characters and authored progression data.
//!
//! Every identifier is a UUID. Authored data (curves, stats, abilities) can
//! derive its ID from its name so that the same asset keeps the same ID
//! across loads; characters get random IDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when an ID cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind} ID '{input}'")]
pub struct IdParseError {
    /// Kind of ID that was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub input: String,
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $namespace:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Nil/invalid ID.
            pub const NIL: Self = Self(Uuid::nil());

            /// Namespace used for name-derived IDs of this kind.
            const NAMESPACE: Uuid = Uuid::from_u128($namespace);

            /// Creates a new random ID.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Derives a stable ID from a name.
            ///
            /// The same name always yields the same ID.
            #[must_use]
            pub fn from_name(name: &str) -> Self {
                Self(Uuid::new_v5(&Self::NAMESPACE, name.as_bytes()))
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Checks if this is a valid (non-nil) ID.
            #[must_use]
            pub fn is_valid(&self) -> bool {
                !self.0.is_nil()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|_| IdParseError {
                    kind: $kind,
                    input: s.to_string(),
                })
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a progression curve.
    CurveId,
    "curve",
    0x6a1c_2f5e_8d3b_4c71_9e02_b4d8_51f3_a7c0
);

uuid_id!(
    /// Unique identifier for a stat definition.
    StatId,
    "stat",
    0x0f4e_9b27_53a1_4d86_8c3f_e2a0_7d65_1b94
);

uuid_id!(
    /// Unique identifier for an ability definition.
    AbilityId,
    "ability",
    0xc83d_71a4_0e2b_49f5_a6d1_3f8e_92b7_6c05
);

uuid_id!(
    /// Unique identifier for a character.
    CharacterId,
    "character",
    0x51b7_e3c9_a402_4f1d_b85e_0c6a_d93f_2e78
);
