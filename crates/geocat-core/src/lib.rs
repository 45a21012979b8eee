//! geocat core - the in-memory catalog of geospatial configuration.
//!
//! This crate provides the entity store, cascade removal, the listener bus
//! and the reload protocol behind the catalog facade.

pub mod cascade;
pub mod catalog;
pub mod config;
pub mod error;
pub mod event;
pub mod id;
pub mod model;
pub mod persist;
pub mod pool;
pub mod store;

pub use cascade::{CascadeEngine, CascadePlan, CascadeReport, CascadeStep, DeleteBehavior};
pub use catalog::{Catalog, ReloadSummary, SharedCatalog};
pub use config::CatalogConfig;
pub use error::{Error, PersistError};
pub use event::{
    CatalogEvent, CatalogListener, EventKind, ListenerFailure, ListenerId, ListenerKind,
    ListenerRegistry, RegisteredListener, Veto,
};
pub use id::{LayerId, NamespaceId, RawId, ResourceId, StoreId, StyleId, WorkspaceId};
pub use model::{
    workspace_pair, CatalogEntity, CatalogInfo, Defaults, EntityKind, InfoRef, Layer, Namespace,
    PropertyChange, Resource, Store, StoreKind, Style, Workspace,
};
pub use persist::{
    MemoryPersister, PersistedCatalog, PersistenceSyncListener, Persister, SledPersister,
};
pub use pool::{CacheClearingListener, ResourceDescriptor, ResourcePool, StoreHandle};
pub use store::EntityStore;
