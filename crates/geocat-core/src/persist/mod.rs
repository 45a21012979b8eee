//! Persistence collaborators.
//!
//! The catalog never touches storage itself. Committed changes reach a
//! [`Persister`] through the [`PersistenceSyncListener`]; `reload` reads the
//! whole catalog back with [`Persister::load_all`].

mod listener;
mod memory;
mod sled_persister;

pub use listener::PersistenceSyncListener;
pub use memory::MemoryPersister;
pub use sled_persister::SledPersister;

use crate::error::PersistError;
use crate::model::{CatalogInfo, Defaults};

/// Everything a persister holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedCatalog {
    /// Entities in no particular order.
    pub entities: Vec<CatalogInfo>,
    /// Persisted defaults.
    pub defaults: Defaults,
}

/// Durable storage for catalog entities.
pub trait Persister: Send + Sync {
    /// Store a new or changed entity.
    fn persist(&self, info: &CatalogInfo) -> Result<(), PersistError>;

    /// Forget a removed entity.
    fn delete(&self, info: &CatalogInfo) -> Result<(), PersistError>;

    /// Store the default workspace and namespace.
    fn persist_defaults(&self, defaults: &Defaults) -> Result<(), PersistError>;

    /// Read back everything.
    fn load_all(&self) -> Result<PersistedCatalog, PersistError>;

    /// Make previous writes durable.
    fn flush(&self) -> Result<(), PersistError> {
        Ok(())
    }
}
