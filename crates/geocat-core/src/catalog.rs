//! The catalog facade.
//!
//! Every collaborator goes through [`Catalog`]. Reads work on an immutable
//! snapshot of the entity store; mutations are serialized by a write mutex
//! and follow the same protocol:
//!
//! 1. copy the current store and apply the change to the copy, which checks
//!    every constraint
//! 2. run the `before` phase for the resulting events (a veto aborts)
//! 3. swap the copy in
//! 4. run the `after` phase
//!
//! A failure in steps 1 or 2 leaves the catalog untouched.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cascade::{CascadeEngine, CascadeReport, CascadeStep, DeleteBehavior};
use crate::config::{CatalogConfig, DEFAULT_POOL_CAPACITY};
use crate::error::Error;
use crate::event::{
    CatalogEvent, CatalogListener, ListenerId, ListenerKind, ListenerRegistry, RegisteredListener,
};
use crate::id::{NamespaceId, ResourceId, StoreId, StyleId, WorkspaceId};
use crate::model::{
    CatalogEntity, CatalogInfo, Defaults, InfoRef, Layer, Namespace, PropertyChange, Resource,
    Store, Style, Workspace,
};
use crate::persist::{PersistenceSyncListener, Persister, SledPersister};
use crate::pool::{CacheClearingListener, ResourcePool};
use crate::store::EntityStore;

/// A catalog shared across threads.
pub type SharedCatalog = Arc<Catalog>;

/// Outcome of a reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadSummary {
    /// Number of entities now in the catalog.
    pub entities: usize,
    /// Defaults after the reload.
    pub defaults: Defaults,
    /// Infrastructure listeners that had to be re-attached.
    pub reattached: usize,
    /// Time spent.
    pub elapsed: Duration,
}

/// The catalog of geospatial configuration.
pub struct Catalog {
    current: RwLock<Arc<EntityStore>>,
    write_lock: Mutex<()>,
    listeners: ListenerRegistry,
    infrastructure: Vec<Arc<dyn CatalogListener>>,
    persister: Option<Arc<dyn Persister>>,
    pool: Arc<ResourcePool>,
}

impl Catalog {
    /// Create an empty in-memory catalog.
    pub fn new() -> Self {
        Self::build(None, DEFAULT_POOL_CAPACITY)
    }

    /// Create an empty catalog mirroring its changes to `persister`.
    ///
    /// Nothing is loaded; call [`reload`](Self::reload) to read the
    /// persisted state.
    pub fn with_persister(persister: Arc<dyn Persister>) -> Self {
        Self::build(Some(persister), DEFAULT_POOL_CAPACITY)
    }

    /// Create a catalog on top of `persister` and load its content.
    pub fn load(persister: Arc<dyn Persister>) -> Result<Self, Error> {
        let catalog = Self::with_persister(persister);
        catalog.reload()?;
        Ok(catalog)
    }

    /// Open the sled-backed catalog described by `config`.
    pub fn open(config: &CatalogConfig) -> Result<Self, Error> {
        let persister: Arc<dyn Persister> = Arc::new(SledPersister::open(config)?);
        let catalog = Self::build(Some(persister), config.pool_capacity);
        let summary = catalog.reload()?;
        info!(
            path = %config.path.display(),
            entities = summary.entities,
            "opened catalog"
        );
        Ok(catalog)
    }

    fn build(persister: Option<Arc<dyn Persister>>, pool_capacity: usize) -> Self {
        let pool = Arc::new(ResourcePool::new(pool_capacity));

        let mut infrastructure: Vec<Arc<dyn CatalogListener>> =
            vec![Arc::new(CacheClearingListener::new(Arc::clone(&pool)))];
        if let Some(persister) = &persister {
            infrastructure.push(Arc::new(PersistenceSyncListener::new(Arc::clone(
                persister,
            ))));
        }

        let listeners = ListenerRegistry::new();
        for listener in &infrastructure {
            listeners.register(Arc::clone(listener));
        }

        Self {
            current: RwLock::new(Arc::new(EntityStore::new())),
            write_lock: Mutex::new(()),
            listeners,
            infrastructure,
            persister,
            pool,
        }
    }

    // ========== Snapshots and reads ==========

    /// The current entity store.
    ///
    /// The snapshot never changes; later mutations produce new snapshots.
    pub fn snapshot(&self) -> Arc<EntityStore> {
        Arc::clone(&self.current.read())
    }

    /// Get an entity by identifier.
    pub fn get<T: CatalogEntity>(&self, id: T::Id) -> Option<T> {
        self.snapshot().get::<T>(id).cloned()
    }

    /// Get any entity by reference.
    pub fn get_info(&self, target: impl Into<InfoRef>) -> Option<CatalogInfo> {
        self.snapshot().get_info(target.into())
    }

    /// All entities of a kind.
    pub fn list<T: CatalogEntity>(&self) -> Vec<T> {
        self.snapshot().list::<T>().cloned().collect()
    }

    /// Entities of a kind matching `predicate`.
    pub fn find<T, P>(&self, predicate: P) -> Vec<T>
    where
        T: CatalogEntity,
        P: Fn(&T) -> bool,
    {
        self.snapshot()
            .list::<T>()
            .filter(|entity| predicate(entity))
            .cloned()
            .collect()
    }

    /// Number of entities of a kind.
    pub fn count<T: CatalogEntity>(&self) -> usize {
        self.snapshot().count::<T>()
    }

    /// All workspaces.
    pub fn workspaces(&self) -> Vec<Workspace> {
        self.list()
    }

    /// All namespaces.
    pub fn namespaces(&self) -> Vec<Namespace> {
        self.list()
    }

    /// All styles.
    pub fn styles(&self) -> Vec<Style> {
        self.list()
    }

    /// All stores.
    pub fn stores(&self) -> Vec<Store> {
        self.list()
    }

    /// All resources.
    pub fn resources(&self) -> Vec<Resource> {
        self.list()
    }

    /// All layers.
    pub fn layers(&self) -> Vec<Layer> {
        self.list()
    }

    /// Workspace by name.
    pub fn workspace_by_name(&self, name: &str) -> Option<Workspace> {
        self.snapshot().workspace_by_name(name).cloned()
    }

    /// Namespace by prefix.
    pub fn namespace_by_prefix(&self, prefix: &str) -> Option<Namespace> {
        self.snapshot().namespace_by_prefix(prefix).cloned()
    }

    /// Namespace by URI.
    pub fn namespace_by_uri(&self, uri: &str) -> Option<Namespace> {
        self.snapshot().namespace_by_uri(uri).cloned()
    }

    /// Store by workspace and name.
    pub fn store_by_name(&self, workspace: WorkspaceId, name: &str) -> Option<Store> {
        self.snapshot().store_by_name(workspace, name).cloned()
    }

    /// Resource by namespace and name.
    pub fn resource_by_name(&self, namespace: NamespaceId, name: &str) -> Option<Resource> {
        self.snapshot().resource_by_name(namespace, name).cloned()
    }

    /// Layer by `prefix:name` or bare name.
    pub fn layer_by_name(&self, name: &str) -> Option<Layer> {
        self.snapshot().layer_by_qualified_name(name).cloned()
    }

    /// Style by scope and name.
    pub fn style_by_name(&self, workspace: Option<WorkspaceId>, name: &str) -> Option<Style> {
        self.snapshot().style_by_name(workspace, name).cloned()
    }

    /// Stores owned by a workspace.
    pub fn stores_in(&self, workspace: WorkspaceId) -> Vec<Store> {
        self.snapshot().stores_in(workspace).cloned().collect()
    }

    /// Styles scoped to a workspace.
    pub fn styles_in(&self, workspace: WorkspaceId) -> Vec<Style> {
        self.snapshot().styles_in(workspace).cloned().collect()
    }

    /// Resources backed by a store.
    pub fn resources_in_store(&self, store: StoreId) -> Vec<Resource> {
        self.snapshot().resources_in_store(store).cloned().collect()
    }

    /// Resources published under a namespace.
    pub fn resources_in_namespace(&self, namespace: NamespaceId) -> Vec<Resource> {
        self.snapshot()
            .resources_in_namespace(namespace)
            .cloned()
            .collect()
    }

    /// Layers publishing a resource.
    pub fn layers_of(&self, resource: ResourceId) -> Vec<Layer> {
        self.snapshot().layers_of(resource).cloned().collect()
    }

    /// Layers referencing a style.
    pub fn layers_using_style(&self, style: StyleId) -> Vec<Layer> {
        self.snapshot().layers_using_style(style).cloned().collect()
    }

    /// Current defaults.
    pub fn defaults(&self) -> Defaults {
        self.snapshot().defaults()
    }

    /// The default workspace.
    pub fn default_workspace(&self) -> Option<Workspace> {
        self.snapshot().default_workspace().cloned()
    }

    /// The default namespace.
    pub fn default_namespace(&self) -> Option<Namespace> {
        self.snapshot().default_namespace().cloned()
    }

    // ========== Mutations ==========

    /// Add an entity and return its identifier.
    pub fn add<T: CatalogEntity>(&self, entity: T) -> Result<T::Id, Error> {
        let id = entity.id();
        self.add_info(entity.into())?;
        Ok(id)
    }

    /// Add an entity of any kind.
    pub fn add_info(&self, info: CatalogInfo) -> Result<(), Error> {
        self.add_all([info]).map(|_| ())
    }

    /// Add several entities in one commit.
    ///
    /// Entities are inserted in the given order, so parents come before
    /// their children. Either every entity is added or none is.
    pub fn add_all(
        &self,
        infos: impl IntoIterator<Item = CatalogInfo>,
    ) -> Result<Vec<InfoRef>, Error> {
        let _guard = self.write_lock.lock();
        let mut next = (*self.snapshot()).clone();

        let mut added = Vec::new();
        let mut events = Vec::new();
        for info in infos {
            next.insert(info.clone())?;
            added.push(info.reference());
            events.push(CatalogEvent::Add { info });
        }
        if events.is_empty() {
            return Ok(added);
        }
        if let Some((previous, current)) = next.promote_defaults() {
            events.push(CatalogEvent::DefaultChanged { previous, current });
        }

        self.commit(next, events)?;
        for target in &added {
            debug!(%target, "added");
        }
        Ok(added)
    }

    /// Save a changed entity.
    ///
    /// Returns the changed properties; an unchanged entity is a no-op.
    pub fn save<T: CatalogEntity>(&self, entity: T) -> Result<Vec<PropertyChange>, Error> {
        self.save_info(entity.into())
    }

    /// Save a changed entity of any kind.
    ///
    /// A workspace and its paired namespace are renamed together: changing
    /// the workspace name changes the namespace prefix and vice versa. The
    /// isolation flag follows the same rule.
    pub fn save_info(&self, info: CatalogInfo) -> Result<Vec<PropertyChange>, Error> {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();

        let target = info.reference();
        let previous = current.get_info(target).ok_or(Error::NotFound(target))?;
        let changes = previous.diff(&info)?;
        if changes.is_empty() {
            debug!(%target, "save without changes");
            return Ok(changes);
        }

        let mut next = (*current).clone();
        next.replace(info.clone())?;
        let mut events = vec![CatalogEvent::Modify {
            info: info.clone(),
            previous: previous.clone(),
            changes: changes.clone(),
        }];

        if let Some(paired) = paired_update(&current, &previous, &info) {
            let paired_previous = next.replace(paired.clone())?;
            let paired_changes = paired_previous.diff(&paired)?;
            debug!(
                target = %paired.reference(),
                changes = paired_changes.len(),
                "propagated pairing change"
            );
            events.push(CatalogEvent::Modify {
                info: paired,
                previous: paired_previous,
                changes: paired_changes,
            });
        }

        self.commit(next, events)?;
        debug!(%target, changes = changes.len(), "saved");
        Ok(changes)
    }

    /// Remove an entity and everything that depends on it.
    pub fn remove(&self, target: impl Into<InfoRef>) -> Result<CascadeReport, Error> {
        self.remove_with(target, DeleteBehavior::Cascade)
    }

    /// Remove an entity with an explicit dependent policy.
    pub fn remove_with(
        &self,
        target: impl Into<InfoRef>,
        behavior: DeleteBehavior,
    ) -> Result<CascadeReport, Error> {
        let target = target.into();
        let _guard = self.write_lock.lock();
        let current = self.snapshot();

        let plan = CascadeEngine::new(&current).plan(target, behavior)?;
        let mut next = (*current).clone();
        plan.apply(&mut next)?;

        let mut events = Vec::with_capacity(plan.steps().len() + 1);
        for step in plan.steps() {
            events.push(match step {
                CascadeStep::Remove(info) => CatalogEvent::Remove { info: info.clone() },
                CascadeStep::Detach { previous, current } => {
                    let previous = CatalogInfo::from(previous.clone());
                    let info = CatalogInfo::from(current.clone());
                    let changes = previous.diff(&info)?;
                    CatalogEvent::Modify {
                        info,
                        previous,
                        changes,
                    }
                }
            });
        }
        if let Some((previous, current)) = next.promote_defaults() {
            events.push(CatalogEvent::DefaultChanged { previous, current });
        }

        self.commit(next, events)?;
        let report = plan.report();
        debug!(
            %target,
            ?behavior,
            affected = report.affected_count(),
            "removed"
        );
        Ok(report)
    }

    /// Make `workspace` the default; its paired namespace becomes the default
    /// namespace.
    pub fn set_default_workspace(&self, workspace: WorkspaceId) -> Result<(), Error> {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        let mut next = (*current).clone();

        next.set_default_workspace(workspace)?;
        let paired = current
            .get::<Workspace>(workspace)
            .and_then(|ws| current.paired_namespace(ws))
            .map(|ns| ns.id);
        if let Some(namespace) = paired {
            next.set_default_namespace(namespace)?;
        }

        self.commit_defaults(&current, next)
    }

    /// Make `namespace` the default; its paired workspace becomes the default
    /// workspace.
    pub fn set_default_namespace(&self, namespace: NamespaceId) -> Result<(), Error> {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        let mut next = (*current).clone();

        next.set_default_namespace(namespace)?;
        let paired = current
            .get::<Namespace>(namespace)
            .and_then(|ns| current.paired_workspace(ns))
            .map(|ws| ws.id);
        if let Some(workspace) = paired {
            next.set_default_workspace(workspace)?;
        }

        self.commit_defaults(&current, next)
    }

    fn commit_defaults(&self, current: &EntityStore, next: EntityStore) -> Result<(), Error> {
        let previous = current.defaults();
        let defaults = next.defaults();
        if previous == defaults {
            return Ok(());
        }
        self.commit(
            next,
            vec![CatalogEvent::DefaultChanged {
                previous,
                current: defaults,
            }],
        )?;
        debug!(
            workspace = ?defaults.workspace,
            namespace = ?defaults.namespace,
            "changed defaults"
        );
        Ok(())
    }

    /// Run the listener phases around swapping `next` in.
    ///
    /// Must be called with the write lock held.
    fn commit(&self, mut next: EntityStore, events: Vec<CatalogEvent>) -> Result<(), Error> {
        let revision = self.snapshot().revision() + 1;
        next.set_revision(revision);

        self.listeners.before(&events)?;
        *self.current.write() = Arc::new(next);
        self.pool.retire_before(revision);
        self.listeners.after(&events)?;
        Ok(())
    }

    // ========== Reload ==========

    /// Replace the catalog content with the persisted state.
    ///
    /// The new store is fully built and validated before it is swapped in;
    /// on failure the current store stays active. Afterwards exactly one
    /// listener of each infrastructure kind is registered. Without a
    /// persister the current content is re-validated.
    pub fn reload(&self) -> Result<ReloadSummary, Error> {
        let _guard = self.write_lock.lock();
        let started = Instant::now();

        let mut store = match &self.persister {
            Some(persister) => {
                let persisted = persister.load_all()?;
                let store = EntityStore::from_entities(persisted.entities, persisted.defaults)?;
                if store.defaults() != persisted.defaults {
                    if let Err(e) = persister.persist_defaults(&store.defaults()) {
                        warn!(error = %e, "failed to persist repaired defaults");
                    }
                }
                store
            }
            None => {
                let store = (*self.snapshot()).clone();
                store.validate()?;
                store
            }
        };

        let entities = store.len();
        let defaults = store.defaults();
        let revision = self.snapshot().revision() + 1;
        store.set_revision(revision);
        *self.current.write() = Arc::new(store);
        self.pool.retire_before(revision);

        let reattached = self.listeners.ensure_infrastructure(&self.infrastructure);
        self.listeners.reloaded();

        let summary = ReloadSummary {
            entities,
            defaults,
            reattached,
            elapsed: started.elapsed(),
        };
        info!(
            entities = summary.entities,
            reattached = summary.reattached,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "reloaded catalog"
        );
        Ok(summary)
    }

    // ========== Listeners ==========

    /// Register a listener.
    ///
    /// Listener callbacks run while the write lock is held: they must not
    /// mutate this catalog and should return quickly.
    ///
    /// A listener reporting an infrastructure kind replaces the catalog's own
    /// listener of that kind, keeping its id, and stays in place across
    /// reloads. A [`ListenerKind::CacheInvalidation`] replacement therefore
    /// takes over clearing [`resource_pool`](Self::resource_pool), and a
    /// [`ListenerKind::PersistenceSync`] replacement takes over writing to the
    /// persister.
    pub fn add_listener(&self, listener: Arc<dyn CatalogListener>) -> ListenerId {
        self.listeners.register(listener)
    }

    /// Remove a listener. Infrastructure listeners cannot be removed.
    pub fn remove_listener(&self, id: ListenerId) -> Result<Arc<dyn CatalogListener>, Error> {
        self.listeners.remove(id)
    }

    /// Registered listeners in notification order.
    pub fn listeners(&self) -> Vec<RegisteredListener> {
        self.listeners.listeners()
    }

    /// Number of registered listeners of a kind.
    pub fn listener_count(&self, kind: ListenerKind) -> usize {
        self.listeners.count(kind)
    }

    // ========== Collaborators ==========

    /// The resource pool kept coherent with this catalog.
    pub fn resource_pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    /// The persister, if any.
    pub fn persister(&self) -> Option<&Arc<dyn Persister>> {
        self.persister.as_ref()
    }

    /// Make persisted changes durable.
    pub fn flush(&self) -> Result<(), Error> {
        if let Some(persister) = &self.persister {
            persister.flush()?;
        }
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("Catalog")
            .field("entities", &snapshot.len())
            .field("defaults", &snapshot.defaults())
            .field("listeners", &self.listeners)
            .field("persistent", &self.persister.is_some())
            .finish()
    }
}

/// Counterpart update implied by saving `proposed` over `previous`.
///
/// The counterpart is looked up by the old name/prefix in `current`.
fn paired_update(
    current: &EntityStore,
    previous: &CatalogInfo,
    proposed: &CatalogInfo,
) -> Option<CatalogInfo> {
    match (previous, proposed) {
        (CatalogInfo::Workspace(old), CatalogInfo::Workspace(new)) => {
            let ns = current.namespace_by_prefix(&old.name)?;
            let mut updated = ns.clone();
            updated.prefix = new.name.clone();
            if old.isolated != new.isolated {
                updated.isolated = new.isolated;
            }
            (updated != *ns).then(|| updated.into())
        }
        (CatalogInfo::Namespace(old), CatalogInfo::Namespace(new)) => {
            let ws = current.workspace_by_name(&old.prefix)?;
            let mut updated = ws.clone();
            updated.name = new.prefix.clone();
            if old.isolated != new.isolated {
                updated.isolated = new.isolated;
            }
            (updated != *ws).then(|| updated.into())
        }
        _ => None,
    }
}
