//! Identifier → entity maps with unique-key indexes.

use im::OrdMap;
use tracing::warn;

use super::constraint::{ensure_unique, require_text};
use crate::error::Error;
use crate::id::{LayerId, NamespaceId, ResourceId, StoreId, StyleId, WorkspaceId};
use crate::model::{
    CatalogEntity, CatalogInfo, Defaults, EntityKind, InfoRef, Layer, Namespace, Resource, Store,
    Style, Workspace,
};

/// The authoritative set of catalog entities.
///
/// Maps are persistent (structurally shared), so cloning a store is cheap.
/// The catalog mutates a private clone and swaps it in once a mutation is
/// fully validated, which lets readers keep using the snapshot they hold.
///
/// Index layout:
/// - workspace name → workspace
/// - namespace prefix → namespace, namespace URI → namespace
/// - (workspace, store name) → store
/// - (namespace, resource name) → resource
/// - (workspace or global, style name) → style
///
/// Layer names are unique per namespace of the published resource and are
/// checked by scanning, since a layer's namespace moves with its resource.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    pub(crate) workspaces: OrdMap<WorkspaceId, Workspace>,
    pub(crate) namespaces: OrdMap<NamespaceId, Namespace>,
    pub(crate) styles: OrdMap<StyleId, Style>,
    pub(crate) stores: OrdMap<StoreId, Store>,
    pub(crate) resources: OrdMap<ResourceId, Resource>,
    pub(crate) layers: OrdMap<LayerId, Layer>,

    workspace_names: OrdMap<String, WorkspaceId>,
    namespace_prefixes: OrdMap<String, NamespaceId>,
    namespace_uris: OrdMap<String, NamespaceId>,
    store_names: OrdMap<(WorkspaceId, String), StoreId>,
    resource_names: OrdMap<(NamespaceId, String), ResourceId>,
    style_names: OrdMap<(Option<WorkspaceId>, String), StyleId>,

    defaults: Defaults,
    revision: u64,
}

impl EntityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from loaded entities.
    ///
    /// Entities may arrive in any order; they are inserted parents first and
    /// every constraint is checked. Persisted defaults that no longer resolve
    /// are dropped and replaced by promotion.
    pub fn from_entities(
        entities: impl IntoIterator<Item = CatalogInfo>,
        defaults: Defaults,
    ) -> Result<Self, Error> {
        let mut entities: Vec<CatalogInfo> = entities.into_iter().collect();
        entities.sort_by_key(|info| info.kind().depth());

        let mut store = Self::new();
        for info in entities {
            store.insert(info)?;
        }

        let workspace = defaults
            .workspace
            .filter(|id| store.workspaces.contains_key(id));
        let namespace = defaults
            .namespace
            .filter(|id| store.namespaces.contains_key(id));
        if workspace != defaults.workspace || namespace != defaults.namespace {
            warn!(
                workspace = ?defaults.workspace,
                namespace = ?defaults.namespace,
                "persisted default does not resolve, promoting a replacement"
            );
        }
        store.defaults = Defaults {
            workspace,
            namespace,
        };
        store.promote_defaults();
        store.validate()?;

        Ok(store)
    }

    // ========== Typed access ==========

    /// Get an entity by identifier.
    pub fn get<T: CatalogEntity>(&self, id: T::Id) -> Option<&T> {
        T::table(self).get(&id)
    }

    /// All entities of a kind, in identifier order.
    pub fn list<T: CatalogEntity>(&self) -> impl Iterator<Item = &T> + '_ {
        T::table(self).values()
    }

    /// Entities of a kind matching `predicate`.
    pub fn find<'a, T, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a T> + 'a
    where
        T: CatalogEntity,
        P: Fn(&T) -> bool + 'a,
    {
        self.list::<T>().filter(move |entity| predicate(entity))
    }

    /// Number of entities of a kind.
    pub fn count<T: CatalogEntity>(&self) -> usize {
        T::table(self).len()
    }

    /// Number of entities of a kind, selected at runtime.
    pub fn count_kind(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Workspace => self.workspaces.len(),
            EntityKind::Namespace => self.namespaces.len(),
            EntityKind::Style => self.styles.len(),
            EntityKind::Store => self.stores.len(),
            EntityKind::Resource => self.resources.len(),
            EntityKind::Layer => self.layers.len(),
        }
    }

    /// Commit counter of this snapshot. Every committed mutation and every
    /// reload produces a store with a higher revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    /// Total number of entities.
    pub fn len(&self) -> usize {
        EntityKind::ALL.iter().map(|kind| self.count_kind(*kind)).sum()
    }

    /// Whether the store holds no entity at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========== Heterogeneous access ==========

    /// Get any entity by reference.
    pub fn get_info(&self, target: InfoRef) -> Option<CatalogInfo> {
        match target {
            InfoRef::Workspace(id) => self.workspaces.get(&id).cloned().map(Into::into),
            InfoRef::Namespace(id) => self.namespaces.get(&id).cloned().map(Into::into),
            InfoRef::Style(id) => self.styles.get(&id).cloned().map(Into::into),
            InfoRef::Store(id) => self.stores.get(&id).cloned().map(Into::into),
            InfoRef::Resource(id) => self.resources.get(&id).cloned().map(Into::into),
            InfoRef::Layer(id) => self.layers.get(&id).cloned().map(Into::into),
        }
    }

    /// Whether the referenced entity exists.
    pub fn contains(&self, target: InfoRef) -> bool {
        match target {
            InfoRef::Workspace(id) => self.workspaces.contains_key(&id),
            InfoRef::Namespace(id) => self.namespaces.contains_key(&id),
            InfoRef::Style(id) => self.styles.contains_key(&id),
            InfoRef::Store(id) => self.stores.contains_key(&id),
            InfoRef::Resource(id) => self.resources.contains_key(&id),
            InfoRef::Layer(id) => self.layers.contains_key(&id),
        }
    }

    /// Every entity, parents before children.
    pub fn entities(&self) -> Vec<CatalogInfo> {
        let mut all = Vec::with_capacity(self.len());
        all.extend(self.workspaces.values().cloned().map(CatalogInfo::from));
        all.extend(self.namespaces.values().cloned().map(CatalogInfo::from));
        all.extend(self.styles.values().cloned().map(CatalogInfo::from));
        all.extend(self.stores.values().cloned().map(CatalogInfo::from));
        all.extend(self.resources.values().cloned().map(CatalogInfo::from));
        all.extend(self.layers.values().cloned().map(CatalogInfo::from));
        all
    }

    // ========== Defaults ==========

    /// Current default workspace and namespace.
    pub fn defaults(&self) -> Defaults {
        self.defaults
    }

    /// The default workspace, if any workspace exists.
    pub fn default_workspace(&self) -> Option<&Workspace> {
        self.defaults.workspace.and_then(|id| self.workspaces.get(&id))
    }

    /// The default namespace, if any namespace exists.
    pub fn default_namespace(&self) -> Option<&Namespace> {
        self.defaults.namespace.and_then(|id| self.namespaces.get(&id))
    }

    // ========== Lookups ==========

    /// Workspace by name.
    pub fn workspace_by_name(&self, name: &str) -> Option<&Workspace> {
        self.workspace_names
            .get(name)
            .and_then(|id| self.workspaces.get(id))
    }

    /// Namespace by prefix.
    pub fn namespace_by_prefix(&self, prefix: &str) -> Option<&Namespace> {
        self.namespace_prefixes
            .get(prefix)
            .and_then(|id| self.namespaces.get(id))
    }

    /// Namespace by URI.
    pub fn namespace_by_uri(&self, uri: &str) -> Option<&Namespace> {
        self.namespace_uris
            .get(uri)
            .and_then(|id| self.namespaces.get(id))
    }

    /// Store by workspace and name.
    pub fn store_by_name(&self, workspace: WorkspaceId, name: &str) -> Option<&Store> {
        self.store_names
            .get(&(workspace, name.to_string()))
            .and_then(|id| self.stores.get(id))
    }

    /// Resource by namespace and name.
    pub fn resource_by_name(&self, namespace: NamespaceId, name: &str) -> Option<&Resource> {
        self.resource_names
            .get(&(namespace, name.to_string()))
            .and_then(|id| self.resources.get(id))
    }

    /// Style by scope (`None` for global styles) and name.
    pub fn style_by_name(&self, workspace: Option<WorkspaceId>, name: &str) -> Option<&Style> {
        self.style_names
            .get(&(workspace, name.to_string()))
            .and_then(|id| self.styles.get(id))
    }

    /// Layer by namespace and name.
    pub fn layer_by_name(&self, namespace: NamespaceId, name: &str) -> Option<&Layer> {
        self.layers
            .values()
            .find(|layer| layer.name == name && self.layer_namespace(layer) == Some(namespace))
    }

    /// Layer by `prefix:name`, or by bare name.
    ///
    /// A bare name is looked up in the default namespace first, then in any
    /// namespace.
    pub fn layer_by_qualified_name(&self, name: &str) -> Option<&Layer> {
        if let Some((prefix, local)) = name.split_once(':') {
            let namespace = self.namespace_by_prefix(prefix)?;
            return self.layer_by_name(namespace.id, local);
        }
        self.defaults
            .namespace
            .and_then(|ns| self.layer_by_name(ns, name))
            .or_else(|| self.layers.values().find(|layer| layer.name == name))
    }

    /// Namespace a layer is published under (that of its resource).
    pub fn layer_namespace(&self, layer: &Layer) -> Option<NamespaceId> {
        self.resources.get(&layer.resource).map(|r| r.namespace)
    }

    /// Namespace paired with a workspace.
    pub fn paired_namespace(&self, workspace: &Workspace) -> Option<&Namespace> {
        self.namespace_by_prefix(&workspace.name)
    }

    /// Workspace paired with a namespace.
    pub fn paired_workspace(&self, namespace: &Namespace) -> Option<&Workspace> {
        self.workspace_by_name(&namespace.prefix)
    }

    // ========== Relationships ==========

    /// Stores owned by a workspace.
    pub fn stores_in(&self, workspace: WorkspaceId) -> impl Iterator<Item = &Store> + '_ {
        self.stores.values().filter(move |s| s.workspace == workspace)
    }

    /// Styles scoped to a workspace.
    pub fn styles_in(&self, workspace: WorkspaceId) -> impl Iterator<Item = &Style> + '_ {
        self.styles
            .values()
            .filter(move |s| s.workspace == Some(workspace))
    }

    /// Resources backed by a store.
    pub fn resources_in_store(&self, store: StoreId) -> impl Iterator<Item = &Resource> + '_ {
        self.resources.values().filter(move |r| r.store == store)
    }

    /// Resources published under a namespace.
    pub fn resources_in_namespace(
        &self,
        namespace: NamespaceId,
    ) -> impl Iterator<Item = &Resource> + '_ {
        self.resources
            .values()
            .filter(move |r| r.namespace == namespace)
    }

    /// Layers publishing a resource.
    pub fn layers_of(&self, resource: ResourceId) -> impl Iterator<Item = &Layer> + '_ {
        self.layers.values().filter(move |l| l.resource == resource)
    }

    /// Layers referencing a style in any role.
    pub fn layers_using_style(&self, style: StyleId) -> impl Iterator<Item = &Layer> + '_ {
        self.layers.values().filter(move |l| l.uses_style(style))
    }

    // ========== Mutation (catalog only) ==========

    /// Insert a new entity after checking every constraint.
    pub(crate) fn insert(&mut self, info: CatalogInfo) -> Result<(), Error> {
        let target = info.reference();
        if self.contains(target) {
            return Err(Error::DuplicateKey {
                kind: target.kind(),
                key: "id".to_string(),
                existing: target.to_string(),
            });
        }
        self.check(&info)?;
        self.index(&info);
        self.put(info);
        Ok(())
    }

    /// Replace an existing entity, returning the previous version.
    pub(crate) fn replace(&mut self, info: CatalogInfo) -> Result<CatalogInfo, Error> {
        let target = info.reference();
        let previous = self.get_info(target).ok_or(Error::NotFound(target))?;
        self.check(&info)?;
        self.unindex(&previous);
        self.index(&info);
        self.put(info);
        Ok(previous)
    }

    /// Remove an entity without looking at dependents.
    ///
    /// Dependents are the cascade engine's concern; callers remove them first.
    pub(crate) fn delete(&mut self, target: InfoRef) -> Option<CatalogInfo> {
        let previous = match target {
            InfoRef::Workspace(id) => self.workspaces.remove(&id).map(CatalogInfo::from),
            InfoRef::Namespace(id) => self.namespaces.remove(&id).map(CatalogInfo::from),
            InfoRef::Style(id) => self.styles.remove(&id).map(CatalogInfo::from),
            InfoRef::Store(id) => self.stores.remove(&id).map(CatalogInfo::from),
            InfoRef::Resource(id) => self.resources.remove(&id).map(CatalogInfo::from),
            InfoRef::Layer(id) => self.layers.remove(&id).map(CatalogInfo::from),
        }?;
        self.unindex(&previous);
        Some(previous)
    }

    /// Set the default workspace.
    pub(crate) fn set_default_workspace(&mut self, id: WorkspaceId) -> Result<(), Error> {
        if !self.workspaces.contains_key(&id) {
            return Err(Error::NotFound(id.into()));
        }
        self.defaults.workspace = Some(id);
        Ok(())
    }

    /// Set the default namespace.
    pub(crate) fn set_default_namespace(&mut self, id: NamespaceId) -> Result<(), Error> {
        if !self.namespaces.contains_key(&id) {
            return Err(Error::NotFound(id.into()));
        }
        self.defaults.namespace = Some(id);
        Ok(())
    }

    /// Repair the defaults after inserts or removals.
    ///
    /// A missing default is replaced by the workspace (namespace) with the
    /// smallest name (prefix), or cleared when none is left. Returns the
    /// previous and new defaults when anything changed.
    pub(crate) fn promote_defaults(&mut self) -> Option<(Defaults, Defaults)> {
        let previous = self.defaults;

        let workspace = match previous.workspace {
            Some(id) if self.workspaces.contains_key(&id) => Some(id),
            _ => self.workspace_names.get_min().map(|(_, id)| *id),
        };
        let namespace = match previous.namespace {
            Some(id) if self.namespaces.contains_key(&id) => Some(id),
            _ => self.namespace_prefixes.get_min().map(|(_, id)| *id),
        };
        self.defaults = Defaults {
            workspace,
            namespace,
        };

        (previous != self.defaults).then_some((previous, self.defaults))
    }

    // ========== Validation ==========

    /// Re-check every invariant over the whole store.
    pub fn validate(&self) -> Result<(), Error> {
        for info in self.entities() {
            self.check(&info)?;
        }

        match self.defaults.workspace {
            Some(id) if !self.workspaces.contains_key(&id) => {
                return Err(Error::InvalidData(format!(
                    "default workspace {id} is not in the catalog"
                )));
            }
            None if !self.workspaces.is_empty() => {
                return Err(Error::InvalidData(
                    "catalog has workspaces but no default workspace".to_string(),
                ));
            }
            _ => {}
        }
        match self.defaults.namespace {
            Some(id) if !self.namespaces.contains_key(&id) => {
                return Err(Error::InvalidData(format!(
                    "default namespace {id} is not in the catalog"
                )));
            }
            None if !self.namespaces.is_empty() => {
                return Err(Error::InvalidData(
                    "catalog has namespaces but no default namespace".to_string(),
                ));
            }
            _ => {}
        }

        Ok(())
    }

    fn check(&self, info: &CatalogInfo) -> Result<(), Error> {
        let referrer = info.reference();
        match info {
            CatalogInfo::Workspace(ws) => {
                require_text("workspace name", &ws.name)?;
                ensure_unique(
                    &self.workspace_names,
                    &ws.name,
                    ws.id,
                    EntityKind::Workspace,
                    || format!("name '{}'", ws.name),
                )
            }
            CatalogInfo::Namespace(ns) => {
                require_text("namespace prefix", &ns.prefix)?;
                require_text("namespace uri", &ns.uri)?;
                ensure_unique(
                    &self.namespace_prefixes,
                    &ns.prefix,
                    ns.id,
                    EntityKind::Namespace,
                    || format!("prefix '{}'", ns.prefix),
                )?;
                ensure_unique(
                    &self.namespace_uris,
                    &ns.uri,
                    ns.id,
                    EntityKind::Namespace,
                    || format!("uri '{}'", ns.uri),
                )
            }
            CatalogInfo::Style(style) => {
                require_text("style name", &style.name)?;
                if let Some(ws) = style.workspace {
                    self.require_ref(referrer, ws.into())?;
                }
                ensure_unique(
                    &self.style_names,
                    &(style.workspace, style.name.clone()),
                    style.id,
                    EntityKind::Style,
                    || format!("name '{}'", style.name),
                )
            }
            CatalogInfo::Store(store) => {
                require_text("store name", &store.name)?;
                self.require_ref(referrer, store.workspace.into())?;
                ensure_unique(
                    &self.store_names,
                    &(store.workspace, store.name.clone()),
                    store.id,
                    EntityKind::Store,
                    || format!("name '{}' in {}", store.name, store.workspace),
                )
            }
            CatalogInfo::Resource(resource) => {
                require_text("resource name", &resource.name)?;
                require_text("resource native name", &resource.native_name)?;
                self.require_ref(referrer, resource.store.into())?;
                self.require_ref(referrer, resource.namespace.into())?;
                ensure_unique(
                    &self.resource_names,
                    &(resource.namespace, resource.name.clone()),
                    resource.id,
                    EntityKind::Resource,
                    || format!("name '{}' in {}", resource.name, resource.namespace),
                )?;
                // moving a resource moves its layers into the new namespace
                for layer in self.layers_of(resource.id) {
                    self.check_layer_name(layer.id, &layer.name, resource.namespace)?;
                }
                Ok(())
            }
            CatalogInfo::Layer(layer) => {
                require_text("layer name", &layer.name)?;
                let resource = self.resources.get(&layer.resource).ok_or(
                    Error::DanglingReference {
                        referrer,
                        target: layer.resource.into(),
                    },
                )?;
                for style in layer.style_refs() {
                    self.require_ref(referrer, style.into())?;
                }
                self.check_layer_name(layer.id, &layer.name, resource.namespace)
            }
        }
    }

    fn require_ref(&self, referrer: InfoRef, target: InfoRef) -> Result<(), Error> {
        if self.contains(target) {
            Ok(())
        } else {
            Err(Error::DanglingReference { referrer, target })
        }
    }

    fn check_layer_name(&self, id: LayerId, name: &str, namespace: NamespaceId) -> Result<(), Error> {
        match self.layer_by_name(namespace, name) {
            Some(existing) if existing.id != id => Err(Error::DuplicateKey {
                kind: EntityKind::Layer,
                key: format!("name '{name}' in {namespace}"),
                existing: existing.id.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn index(&mut self, info: &CatalogInfo) {
        match info {
            CatalogInfo::Workspace(ws) => {
                self.workspace_names.insert(ws.name.clone(), ws.id);
            }
            CatalogInfo::Namespace(ns) => {
                self.namespace_prefixes.insert(ns.prefix.clone(), ns.id);
                self.namespace_uris.insert(ns.uri.clone(), ns.id);
            }
            CatalogInfo::Style(style) => {
                self.style_names
                    .insert((style.workspace, style.name.clone()), style.id);
            }
            CatalogInfo::Store(store) => {
                self.store_names
                    .insert((store.workspace, store.name.clone()), store.id);
            }
            CatalogInfo::Resource(resource) => {
                self.resource_names
                    .insert((resource.namespace, resource.name.clone()), resource.id);
            }
            CatalogInfo::Layer(_) => {}
        }
    }

    fn unindex(&mut self, info: &CatalogInfo) {
        match info {
            CatalogInfo::Workspace(ws) => {
                self.workspace_names.remove(&ws.name);
            }
            CatalogInfo::Namespace(ns) => {
                self.namespace_prefixes.remove(&ns.prefix);
                self.namespace_uris.remove(&ns.uri);
            }
            CatalogInfo::Style(style) => {
                self.style_names
                    .remove(&(style.workspace, style.name.clone()));
            }
            CatalogInfo::Store(store) => {
                self.store_names
                    .remove(&(store.workspace, store.name.clone()));
            }
            CatalogInfo::Resource(resource) => {
                self.resource_names
                    .remove(&(resource.namespace, resource.name.clone()));
            }
            CatalogInfo::Layer(_) => {}
        }
    }

    fn put(&mut self, info: CatalogInfo) {
        match info {
            CatalogInfo::Workspace(e) => {
                self.workspaces.insert(e.id, e);
            }
            CatalogInfo::Namespace(e) => {
                self.namespaces.insert(e.id, e);
            }
            CatalogInfo::Style(e) => {
                self.styles.insert(e.id, e);
            }
            CatalogInfo::Store(e) => {
                self.stores.insert(e.id, e);
            }
            CatalogInfo::Resource(e) => {
                self.resources.insert(e.id, e);
            }
            CatalogInfo::Layer(e) => {
                self.layers.insert(e.id, e);
            }
        }
    }
}
