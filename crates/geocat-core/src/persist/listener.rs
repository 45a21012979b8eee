//! Listener mirroring committed changes to a persister.

use std::sync::Arc;

use tracing::trace;

use super::Persister;
use crate::event::{CatalogEvent, CatalogListener, ListenerFailure, ListenerKind};

/// Infrastructure listener forwarding every committed change to a persister.
pub struct PersistenceSyncListener {
    persister: Arc<dyn Persister>,
}

impl PersistenceSyncListener {
    /// Create a listener writing to `persister`.
    pub fn new(persister: Arc<dyn Persister>) -> Self {
        Self { persister }
    }

    /// The persister written to.
    pub fn persister(&self) -> &Arc<dyn Persister> {
        &self.persister
    }
}

impl CatalogListener for PersistenceSyncListener {
    fn name(&self) -> &str {
        "persistence-sync"
    }

    fn kind(&self) -> ListenerKind {
        ListenerKind::PersistenceSync
    }

    fn after_event(&self, event: &CatalogEvent) -> Result<(), ListenerFailure> {
        trace!(%event, "syncing to persister");
        match event {
            CatalogEvent::Add { info } | CatalogEvent::Modify { info, .. } => {
                self.persister.persist(info)?
            }
            CatalogEvent::Remove { info } => self.persister.delete(info)?,
            CatalogEvent::DefaultChanged { current, .. } => {
                self.persister.persist_defaults(current)?
            }
        }
        Ok(())
    }
}
