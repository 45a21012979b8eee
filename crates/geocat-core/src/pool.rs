//! Resource pool: cached per-store connection handles and per-resource
//! descriptors derived from the catalog.
//!
//! Entries are built lazily from catalog snapshots. The
//! [`CacheClearingListener`] drops entries whose source entities change, and
//! entries built from a snapshot older than the latest commit are never
//! cached, so callers never see a handle for a store configuration that no
//! longer exists.

use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::event::{CatalogEvent, CatalogListener, ListenerFailure, ListenerKind};
use crate::id::{NamespaceId, ResourceId, StoreId};
use crate::model::{CatalogInfo, Namespace, Resource, Store, StoreKind};
use crate::store::EntityStore;

/// Connection handle for a store.
#[derive(Debug)]
pub struct StoreHandle {
    /// Store the handle was opened for.
    pub store: StoreId,
    /// Store name at the time the handle was opened.
    pub name: String,
    /// Kind of data source.
    pub kind: StoreKind,
    /// Connection parameters the handle was opened with.
    pub connection: BTreeMap<String, String>,
    hits: AtomicU64,
}

impl StoreHandle {
    fn open(store: &Store) -> Self {
        Self {
            store: store.id,
            name: store.name.clone(),
            kind: store.kind,
            connection: store.connection.clone(),
            hits: AtomicU64::new(0),
        }
    }

    /// Number of cache hits for this handle.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

/// Service-facing description of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Described resource.
    pub resource: ResourceId,
    /// Backing store.
    pub store: StoreId,
    /// Namespace of the resource.
    pub namespace: NamespaceId,
    /// `prefix:name` as published.
    pub qualified_name: String,
    /// Name in the underlying store.
    pub native_name: String,
    /// Declared SRS.
    pub srs: Option<String>,
}

/// Pool statistics.
#[derive(Debug, Default)]
pub struct PoolStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PoolStats {
    /// Get hit count.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get miss count.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get eviction count.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

/// Cache of store handles and resource descriptors.
pub struct ResourcePool {
    stores: DashMap<StoreId, Arc<StoreHandle>>,
    resources: DashMap<ResourceId, Arc<ResourceDescriptor>>,
    capacity: usize,
    stats: PoolStats,
    floor: AtomicU64,
}

impl ResourcePool {
    /// Create a pool holding at most `capacity` entries of each kind.
    pub fn new(capacity: usize) -> Self {
        Self {
            stores: DashMap::new(),
            resources: DashMap::new(),
            capacity: capacity.max(1),
            stats: PoolStats::default(),
            floor: AtomicU64::new(0),
        }
    }

    /// Handle for `store`, opened from `catalog` on first use.
    ///
    /// Returns `None` if the store is not in `catalog`. A handle built from
    /// a snapshot older than the last commit is returned but not cached.
    pub fn store_handle(&self, catalog: &EntityStore, store: StoreId) -> Option<Arc<StoreHandle>> {
        if let Some(handle) = self.stores.get(&store) {
            handle.hits.fetch_add(1, Ordering::Relaxed);
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Some(Arc::clone(handle.value()));
        }

        let info = catalog.get::<Store>(store)?;
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        if self.stores.len() >= self.capacity {
            self.evict_store();
        }
        let handle = Arc::new(StoreHandle::open(info));
        trace!(%store, revision = catalog.revision(), "opened store handle");
        Some(self.publish(&self.stores, store, handle, catalog.revision()))
    }

    /// Descriptor for `resource`, resolved against `catalog`.
    ///
    /// Returns `None` if the resource or its namespace is not in `catalog`.
    /// A descriptor built from a snapshot older than the last commit is
    /// returned but not cached.
    pub fn resource_descriptor(
        &self,
        catalog: &EntityStore,
        resource: ResourceId,
    ) -> Option<Arc<ResourceDescriptor>> {
        if let Some(descriptor) = self.resources.get(&resource) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Some(Arc::clone(descriptor.value()));
        }

        let info = catalog.get::<Resource>(resource)?;
        let namespace = catalog.get::<Namespace>(info.namespace)?;
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        if self.resources.len() >= self.capacity {
            self.evict_resource();
        }

        let descriptor = Arc::new(ResourceDescriptor {
            resource,
            store: info.store,
            namespace: info.namespace,
            qualified_name: format!("{}:{}", namespace.prefix, info.name),
            native_name: info.native_name.clone(),
            srs: info.srs.clone(),
        });
        Some(self.publish(&self.resources, resource, descriptor, catalog.revision()))
    }

    /// Refuse entries built from snapshots older than `revision`.
    ///
    /// The catalog calls this after swapping in a new snapshot and before
    /// the listeners clear the entries that changed.
    pub fn retire_before(&self, revision: u64) {
        self.floor.fetch_max(revision, Ordering::SeqCst);
    }

    /// Cache `value` under `key` unless it was built from a retired snapshot.
    fn publish<K, V>(
        &self,
        map: &DashMap<K, Arc<V>>,
        key: K,
        value: Arc<V>,
        revision: u64,
    ) -> Arc<V>
    where
        K: Eq + Hash + Copy,
    {
        if revision < self.floor.load(Ordering::SeqCst) {
            trace!(revision, "stale snapshot, entry not cached");
            return value;
        }

        let cached = map
            .entry(key)
            .or_insert_with(|| Arc::clone(&value))
            .value()
            .clone();
        // a commit may have retired the snapshot after the first check, and
        // its clearing may already have run
        if revision < self.floor.load(Ordering::SeqCst) {
            map.remove_if(&key, |_, entry| Arc::ptr_eq(entry, &cached));
        }
        cached
    }

    /// Drop the handle of a store and the descriptors of its resources.
    pub fn clear_store(&self, store: StoreId) {
        self.stores.remove(&store);
        self.resources.retain(|_, d| d.store != store);
        debug!(%store, "cleared store from resource pool");
    }

    /// Drop the descriptor of a resource.
    pub fn clear_resource(&self, resource: ResourceId) {
        self.resources.remove(&resource);
    }

    /// Drop the descriptors of every resource in a namespace.
    pub fn clear_namespace(&self, namespace: NamespaceId) {
        self.resources.retain(|_, d| d.namespace != namespace);
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.stores.clear();
        self.resources.clear();
        debug!("cleared resource pool");
    }

    /// Whether a handle is cached for `store`.
    pub fn has_store(&self, store: StoreId) -> bool {
        self.stores.contains_key(&store)
    }

    /// Whether a descriptor is cached for `resource`.
    pub fn has_resource(&self, resource: ResourceId) -> bool {
        self.resources.contains_key(&resource)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.stores.len() + self.resources.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get pool statistics.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Evict the least used store handle.
    fn evict_store(&self) {
        let evict = self
            .stores
            .iter()
            .min_by_key(|entry| entry.value().hits())
            .map(|entry| *entry.key());
        if let Some(store) = evict {
            self.stores.remove(&store);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Evict an arbitrary resource descriptor.
    fn evict_resource(&self) {
        let evict = self.resources.iter().next().map(|entry| *entry.key());
        if let Some(resource) = evict {
            self.resources.remove(&resource);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("stores", &self.stores.len())
            .field("resources", &self.resources.len())
            .field("capacity", &self.capacity)
            .field("floor", &self.floor.load(Ordering::Relaxed))
            .finish()
    }
}

/// Infrastructure listener keeping a [`ResourcePool`] coherent.
pub struct CacheClearingListener {
    pool: Arc<ResourcePool>,
}

impl CacheClearingListener {
    /// Create a listener clearing `pool`.
    pub fn new(pool: Arc<ResourcePool>) -> Self {
        Self { pool }
    }
}

impl CatalogListener for CacheClearingListener {
    fn name(&self) -> &str {
        "cache-clearing"
    }

    fn kind(&self) -> ListenerKind {
        ListenerKind::CacheInvalidation
    }

    fn after_event(&self, event: &CatalogEvent) -> Result<(), ListenerFailure> {
        let (CatalogEvent::Modify { info, .. } | CatalogEvent::Remove { info }) = event else {
            return Ok(());
        };
        match info {
            CatalogInfo::Store(store) => self.pool.clear_store(store.id),
            CatalogInfo::Resource(resource) => self.pool.clear_resource(resource.id),
            // a prefix change renames every qualified name in the namespace
            CatalogInfo::Namespace(namespace) => self.pool.clear_namespace(namespace.id),
            _ => {}
        }
        Ok(())
    }

    fn reloaded(&self) {
        self.pool.clear();
    }
}
