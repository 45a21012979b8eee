//! Core error types.

use thiserror::Error;

use crate::event::{ListenerId, ListenerKind};
use crate::model::{EntityKind, InfoRef};

/// Catalog errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A uniqueness constraint (name, prefix, URI or id) would be violated.
    #[error("duplicate {kind} {key}: already taken by {existing}")]
    DuplicateKey {
        /// Kind of the entity being written.
        kind: EntityKind,
        /// Human readable description of the clashing key.
        key: String,
        /// Identifier of the entity that already owns the key.
        existing: String,
    },

    /// An entity references a parent that is not in the catalog.
    #[error("{referrer} references missing {target}")]
    DanglingReference {
        /// Entity holding the reference.
        referrer: InfoRef,
        /// Referenced entity that does not exist.
        target: InfoRef,
    },

    /// Entity not found.
    #[error("{0} not found")]
    NotFound(InfoRef),

    /// Removal rejected because other entities still depend on the target.
    #[error("cannot remove {target}: {count} dependent(s), including {first}")]
    DependentResourceExists {
        /// Entity whose removal was requested.
        target: InfoRef,
        /// First dependent found.
        first: InfoRef,
        /// Total number of direct dependents.
        count: usize,
    },

    /// A listener rejected the mutation in its pre-commit phase.
    #[error("listener '{listener}' vetoed {event}: {reason}")]
    ListenerVeto {
        /// Name of the vetoing listener.
        listener: String,
        /// Description of the vetoed event.
        event: String,
        /// Reason given by the listener.
        reason: String,
    },

    /// The persister failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistError),

    /// Invalid entity data (empty names, malformed identifiers, ...).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Infrastructure listeners can be replaced but never removed.
    #[error("{0} listeners are catalog infrastructure and cannot be removed")]
    InfrastructureListener(ListenerKind),

    /// No listener registered under the given id.
    #[error("listener {0} is not registered")]
    ListenerNotFound(ListenerId),
}

/// Errors raised by [`Persister`](crate::persist::Persister) implementations.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Entity encoding or decoding error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key decoding error.
    #[error("invalid key format")]
    InvalidKey,

    /// The backend refused the operation.
    #[error("persister unavailable: {0}")]
    Unavailable(String),
}
