//! Listener trait and its two result channels.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::CatalogEvent;
use crate::error::PersistError;

/// Role a listener plays for the surrounding system.
///
/// Infrastructure kinds are singletons: the catalog keeps exactly one
/// registration of each, across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerKind {
    /// Keeps the resource pool coherent with the catalog.
    CacheInvalidation,
    /// Mirrors committed changes to the persister.
    PersistenceSync,
    /// Any other listener.
    Custom,
}

impl ListenerKind {
    /// Whether listeners of this kind are singletons.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, ListenerKind::Custom)
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerKind::CacheInvalidation => write!(f, "cache-invalidation"),
            ListenerKind::PersistenceSync => write!(f, "persistence-sync"),
            ListenerKind::Custom => write!(f, "custom"),
        }
    }
}

/// Rejection of a mutation in the pre-commit phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Veto {
    /// Why the mutation was rejected.
    pub reason: String,
}

impl Veto {
    /// Create a veto with a reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failure of a listener after the mutation was committed.
///
/// Never rolls anything back. Persistence failures are reported to the
/// caller of the mutation; everything else is only logged.
#[derive(Debug, Error)]
pub enum ListenerFailure {
    /// The persister rejected the change.
    #[error(transparent)]
    Persistence(#[from] PersistError),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

/// Observer of catalog mutations.
///
/// Callbacks run synchronously while the catalog write lock is held. They
/// must return promptly and must not mutate the catalog they observe; a
/// listener that blocks stalls every writer.
pub trait CatalogListener: Send + Sync {
    /// Name used in logs and veto errors.
    fn name(&self) -> &str;

    /// Role of the listener.
    fn kind(&self) -> ListenerKind {
        ListenerKind::Custom
    }

    /// Called before the mutation is committed. Returning a veto aborts it.
    fn before_event(&self, event: &CatalogEvent) -> Result<(), Veto> {
        let _ = event;
        Ok(())
    }

    /// Called after the mutation is committed.
    fn after_event(&self, event: &CatalogEvent) -> Result<(), ListenerFailure> {
        let _ = event;
        Ok(())
    }

    /// Called after the catalog was reloaded.
    fn reloaded(&self) {}
}
