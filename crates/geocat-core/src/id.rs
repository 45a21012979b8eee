//! Typed catalog identifiers.
//!
//! Every catalog entity carries a 16-byte identifier generated when the entity
//! is constructed. Identifiers are never reused: the low half is a nanosecond
//! timestamp and the high half a process-wide counter, so two entities created
//! in the same process always differ and entities loaded from storage keep the
//! identifier they were persisted with.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Size of a raw identifier in bytes.
pub const ID_SIZE: usize = 16;

/// Untyped identifier bytes shared by all entity kinds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawId([u8; ID_SIZE]);

impl RawId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        // Counter to ensure uniqueness even with same timestamp
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

        let mut id = [0u8; ID_SIZE];
        id[..8].copy_from_slice(&now.to_be_bytes());
        id[8..].copy_from_slice(&counter.to_be_bytes());
        Self(id)
    }

    /// Wrap existing identifier bytes.
    pub const fn from_bytes(bytes: [u8; ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Decode identifier bytes from a slice, e.g. a storage key.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; ID_SIZE] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    /// The identifier bytes.
    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 32-character hex string.
    pub fn parse_hex(s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s)
            .map_err(|e| Error::InvalidData(format!("malformed identifier '{s}': {e}")))?;
        Self::from_slice(&bytes).ok_or_else(|| {
            Error::InvalidData(format!(
                "identifier '{s}' must be {ID_SIZE} bytes, got {}",
                bytes.len()
            ))
        })
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawId({})", self.to_hex())
    }
}

impl Serialize for RawId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RawId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_hex(&s).map_err(serde::de::Error::custom)
    }
}

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(RawId);

        impl $name {
            /// Display prefix for this identifier kind.
            pub const PREFIX: &'static str = $prefix;

            /// Generate a fresh identifier.
            pub fn generate() -> Self {
                Self(RawId::generate())
            }

            /// Wrap raw identifier bytes.
            pub const fn from_raw(raw: RawId) -> Self {
                Self(raw)
            }

            /// The untyped identifier.
            pub const fn raw(&self) -> RawId {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            /// Accepts both `prefix-hex` and bare hex.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let hex = s
                    .strip_prefix(concat!($prefix, "-"))
                    .unwrap_or(s);
                RawId::parse_hex(hex).map(Self)
            }
        }
    };
}

catalog_id!(
    /// Identifier of a [`Workspace`](crate::model::Workspace).
    WorkspaceId,
    "workspace"
);
catalog_id!(
    /// Identifier of a [`Namespace`](crate::model::Namespace).
    NamespaceId,
    "namespace"
);
catalog_id!(
    /// Identifier of a [`Store`](crate::model::Store).
    StoreId,
    "store"
);
catalog_id!(
    /// Identifier of a [`Resource`](crate::model::Resource).
    ResourceId,
    "resource"
);
catalog_id!(
    /// Identifier of a [`Layer`](crate::model::Layer).
    LayerId,
    "layer"
);
catalog_id!(
    /// Identifier of a [`Style`](crate::model::Style).
    StyleId,
    "style"
);
