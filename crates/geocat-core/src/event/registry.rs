//! Ordered listener registry and event dispatch.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, trace, warn};

use super::{CatalogEvent, CatalogListener, ListenerFailure, ListenerKind};
use crate::error::{Error, PersistError};

/// Identifier of a listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Public view of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredListener {
    /// Registration id.
    pub id: ListenerId,
    /// Listener role.
    pub kind: ListenerKind,
    /// Listener name.
    pub name: String,
}

#[derive(Clone)]
struct Entry {
    id: ListenerId,
    kind: ListenerKind,
    listener: Arc<dyn CatalogListener>,
}

/// Listeners in registration order.
///
/// Dispatch iterates over a copy of the list, so callbacks may register or
/// remove listeners without deadlocking; changes apply to the next event
/// batch.
pub struct ListenerRegistry {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener.
    ///
    /// Registering an infrastructure kind that is already present replaces
    /// the existing listener in place and returns its id. The replaced
    /// listener receives no further events, and
    /// [`ensure_infrastructure`](Self::ensure_infrastructure) keeps the
    /// replacement.
    pub fn register(&self, listener: Arc<dyn CatalogListener>) -> ListenerId {
        let kind = listener.kind();
        let mut entries = self.entries.write();

        if kind.is_infrastructure() {
            if let Some(entry) = entries.iter_mut().find(|e| e.kind == kind) {
                warn!(
                    id = %entry.id,
                    %kind,
                    replaced = entry.listener.name(),
                    name = listener.name(),
                    "replaced infrastructure listener"
                );
                entry.listener = listener;
                return entry.id;
            }
        }

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        debug!(%id, %kind, name = listener.name(), "registered listener");
        entries.push(Entry { id, kind, listener });
        id
    }

    /// Remove a listener registration.
    pub fn remove(&self, id: ListenerId) -> Result<Arc<dyn CatalogListener>, Error> {
        let mut entries = self.entries.write();
        let position = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(Error::ListenerNotFound(id))?;

        let kind = entries[position].kind;
        if kind.is_infrastructure() {
            return Err(Error::InfrastructureListener(kind));
        }

        let entry = entries.remove(position);
        debug!(%id, name = entry.listener.name(), "removed listener");
        Ok(entry.listener)
    }

    /// Registrations in notification order.
    pub fn listeners(&self) -> Vec<RegisteredListener> {
        self.entries
            .read()
            .iter()
            .map(|e| RegisteredListener {
                id: e.id,
                kind: e.kind,
                name: e.listener.name().to_string(),
            })
            .collect()
    }

    /// Number of registrations of a kind.
    pub fn count(&self, kind: ListenerKind) -> usize {
        self.entries.read().iter().filter(|e| e.kind == kind).count()
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Guarantee exactly one registration per infrastructure kind.
    ///
    /// Duplicates (keeping the first) are dropped and each listener in
    /// `required` whose kind is missing is registered. Returns the number of
    /// re-attached listeners.
    pub fn ensure_infrastructure(&self, required: &[Arc<dyn CatalogListener>]) -> usize {
        let mut entries = self.entries.write();

        let mut seen = Vec::new();
        entries.retain(|e| {
            if !e.kind.is_infrastructure() {
                return true;
            }
            if seen.contains(&e.kind) {
                warn!(id = %e.id, kind = %e.kind, "dropping duplicate infrastructure listener");
                return false;
            }
            seen.push(e.kind);
            true
        });

        let mut attached = 0;
        for listener in required {
            let kind = listener.kind();
            if seen.contains(&kind) {
                continue;
            }
            let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
            debug!(%id, %kind, name = listener.name(), "re-attached infrastructure listener");
            entries.push(Entry {
                id,
                kind,
                listener: Arc::clone(listener),
            });
            seen.push(kind);
            attached += 1;
        }
        attached
    }

    fn snapshot(&self) -> Vec<Entry> {
        self.entries.read().clone()
    }

    /// Run the pre-commit phase for a batch of events.
    ///
    /// Stops at the first veto.
    pub(crate) fn before(&self, events: &[CatalogEvent]) -> Result<(), Error> {
        let entries = self.snapshot();
        for event in events {
            for entry in &entries {
                trace!(listener = entry.listener.name(), %event, "before event");
                if let Err(veto) = entry.listener.before_event(event) {
                    debug!(
                        listener = entry.listener.name(),
                        %event,
                        reason = %veto.reason,
                        "mutation vetoed"
                    );
                    return Err(Error::ListenerVeto {
                        listener: entry.listener.name().to_string(),
                        event: event.to_string(),
                        reason: veto.reason,
                    });
                }
            }
        }
        Ok(())
    }

    /// Run the post-commit phase for a batch of events.
    ///
    /// Every listener sees every event regardless of failures. Failures are
    /// logged; the first persistence failure is returned.
    pub(crate) fn after(&self, events: &[CatalogEvent]) -> Result<(), PersistError> {
        let entries = self.snapshot();
        let mut persistence = None;
        for event in events {
            for entry in &entries {
                trace!(listener = entry.listener.name(), %event, "after event");
                match entry.listener.after_event(event) {
                    Ok(()) => {}
                    Err(ListenerFailure::Persistence(e)) => {
                        warn!(
                            listener = entry.listener.name(),
                            %event,
                            error = %e,
                            "persistence failed after commit"
                        );
                        persistence.get_or_insert(e);
                    }
                    Err(ListenerFailure::Other(reason)) => {
                        warn!(
                            listener = entry.listener.name(),
                            %event,
                            %reason,
                            "listener failed after commit"
                        );
                    }
                }
            }
        }
        match persistence {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Tell every listener the catalog was reloaded.
    pub(crate) fn reloaded(&self) {
        for entry in self.snapshot() {
            entry.listener.reloaded();
        }
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Veto;
    use crate::model::Workspace;
    use parking_lot::Mutex;

    struct Recorder {
        name: String,
        kind: ListenerKind,
        log: Arc<Mutex<Vec<String>>>,
        veto: bool,
    }

    impl Recorder {
        fn new(name: &str, kind: ListenerKind, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                kind,
                log: Arc::clone(log),
                veto: false,
            })
        }
    }

    impl CatalogListener for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> ListenerKind {
            self.kind
        }

        fn before_event(&self, _event: &CatalogEvent) -> Result<(), Veto> {
            self.log.lock().push(format!("before:{}", self.name));
            if self.veto {
                return Err(Veto::new("read-only"));
            }
            Ok(())
        }

        fn after_event(&self, _event: &CatalogEvent) -> Result<(), ListenerFailure> {
            self.log.lock().push(format!("after:{}", self.name));
            Ok(())
        }
    }

    fn add_event() -> CatalogEvent {
        CatalogEvent::Add {
            info: Workspace::new("topp").into(),
        }
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        registry.register(Recorder::new("a", ListenerKind::Custom, &log));
        registry.register(Recorder::new("b", ListenerKind::Custom, &log));

        let events = [add_event()];
        registry.before(&events).unwrap();
        registry.after(&events).unwrap();
        assert_eq!(*log.lock(), vec!["before:a", "before:b", "after:a", "after:b"]);
    }

    #[test]
    fn test_veto_stops_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        registry.register(Arc::new(Recorder {
            name: "guard".to_string(),
            kind: ListenerKind::Custom,
            log: Arc::clone(&log),
            veto: true,
        }));
        registry.register(Recorder::new("late", ListenerKind::Custom, &log));

        let err = registry.before(&[add_event()]).unwrap_err();
        assert!(matches!(
            err,
            Error::ListenerVeto { ref listener, ref reason, .. } if listener == "guard" && reason == "read-only"
        ));
        assert_eq!(*log.lock(), vec!["before:guard"]);
    }

    #[test]
    fn test_infrastructure_registration_replaces_in_place() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let first = registry.register(Recorder::new("cache", ListenerKind::CacheInvalidation, &log));
        registry.register(Recorder::new("audit", ListenerKind::Custom, &log));
        let second = registry.register(Recorder::new("cache2", ListenerKind::CacheInvalidation, &log));

        assert_eq!(first, second);
        assert_eq!(registry.count(ListenerKind::CacheInvalidation), 1);
        let names: Vec<String> = registry.listeners().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["cache2", "audit"]);
    }

    #[test]
    fn test_infrastructure_listener_cannot_be_removed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let id = registry.register(Recorder::new("sync", ListenerKind::PersistenceSync, &log));
        assert!(matches!(
            registry.remove(id),
            Err(Error::InfrastructureListener(ListenerKind::PersistenceSync))
        ));

        let custom = registry.register(Recorder::new("audit", ListenerKind::Custom, &log));
        assert!(registry.remove(custom).is_ok());
        assert!(matches!(
            registry.remove(custom),
            Err(Error::ListenerNotFound(missing)) if missing == custom
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ensure_infrastructure_attaches_missing_kinds() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        registry.register(Recorder::new("cache", ListenerKind::CacheInvalidation, &log));

        let required: Vec<Arc<dyn CatalogListener>> = vec![
            Recorder::new("cache", ListenerKind::CacheInvalidation, &log),
            Recorder::new("sync", ListenerKind::PersistenceSync, &log),
        ];
        assert_eq!(registry.ensure_infrastructure(&required), 1);
        assert_eq!(registry.ensure_infrastructure(&required), 0);
        assert_eq!(registry.count(ListenerKind::CacheInvalidation), 1);
        assert_eq!(registry.count(ListenerKind::PersistenceSync), 1);
    }
}
