//! In-memory persister.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use super::{PersistedCatalog, Persister};
use crate::error::PersistError;
use crate::model::{CatalogInfo, Defaults, InfoRef};

/// Persister keeping everything in process memory.
///
/// Writes and loads can be switched to fail, which makes it the persister of
/// choice for exercising failure paths.
#[derive(Debug, Default)]
pub struct MemoryPersister {
    entities: RwLock<BTreeMap<InfoRef, CatalogInfo>>,
    defaults: RwLock<Defaults>,
    fail_writes: AtomicBool,
    fail_loads: AtomicBool,
    writes: AtomicU64,
}

impl MemoryPersister {
    /// Create an empty persister.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent loads fail (or succeed again).
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Stored version of an entity.
    pub fn get(&self, target: InfoRef) -> Option<CatalogInfo> {
        self.entities.read().get(&target).cloned()
    }

    /// Stored defaults.
    pub fn defaults(&self) -> Defaults {
        *self.defaults.read()
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<(), PersistError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable("writes disabled".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Persister for MemoryPersister {
    fn persist(&self, info: &CatalogInfo) -> Result<(), PersistError> {
        self.check_writable()?;
        self.entities.write().insert(info.reference(), info.clone());
        Ok(())
    }

    fn delete(&self, info: &CatalogInfo) -> Result<(), PersistError> {
        self.check_writable()?;
        self.entities.write().remove(&info.reference());
        Ok(())
    }

    fn persist_defaults(&self, defaults: &Defaults) -> Result<(), PersistError> {
        self.check_writable()?;
        *self.defaults.write() = *defaults;
        Ok(())
    }

    fn load_all(&self) -> Result<PersistedCatalog, PersistError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable("loads disabled".to_string()));
        }
        Ok(PersistedCatalog {
            entities: self.entities.read().values().cloned().collect(),
            defaults: self.defaults(),
        })
    }
}
