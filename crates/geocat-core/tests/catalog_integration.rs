//! Integration tests for the catalog facade.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use geocat_core::{
    workspace_pair, CatalogConfig, CatalogEvent, CatalogInfo, CatalogListener, DeleteBehavior,
    EntityKind, Error, EventKind, InfoRef, Layer, ListenerFailure, ListenerKind, MemoryPersister,
    Namespace, Persister, Resource, Store, Style, Veto, Workspace,
};
use geocat_core::Catalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Before,
    After,
}

/// Records every callback it receives.
#[derive(Default)]
struct Recorder {
    log: Mutex<Vec<(Phase, CatalogEvent)>>,
    reloads: Mutex<usize>,
}

impl Recorder {
    fn events(&self, phase: Phase) -> Vec<CatalogEvent> {
        self.log
            .lock()
            .iter()
            .filter(|(p, _)| *p == phase)
            .map(|(_, e)| e.clone())
            .collect()
    }

    fn clear(&self) {
        self.log.lock().clear();
    }
}

impl CatalogListener for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn before_event(&self, event: &CatalogEvent) -> Result<(), Veto> {
        self.log.lock().push((Phase::Before, event.clone()));
        Ok(())
    }

    fn after_event(&self, event: &CatalogEvent) -> Result<(), ListenerFailure> {
        self.log.lock().push((Phase::After, event.clone()));
        Ok(())
    }

    fn reloaded(&self) {
        *self.reloads.lock() += 1;
    }
}

/// Rejects every new workspace.
struct NoNewWorkspaces;

impl CatalogListener for NoNewWorkspaces {
    fn name(&self) -> &str {
        "no-new-workspaces"
    }

    fn before_event(&self, event: &CatalogEvent) -> Result<(), Veto> {
        match event {
            CatalogEvent::Add {
                info: CatalogInfo::Workspace(_),
            } => Err(Veto::new("workspaces are frozen")),
            _ => Ok(()),
        }
    }
}

/// A published topp workspace: store, resource, layer and a workspace style.
struct Topp {
    ws: Workspace,
    ns: Namespace,
    store: Store,
    resource: Resource,
    layer: Layer,
    style: Style,
}

fn add_topp(catalog: &Catalog) -> Topp {
    let (ws, ns) = workspace_pair("topp", "http://www.openplans.org/topp");
    let store = Store::data("states_shapefile", ws.id)
        .with_param("url", "file:data/shapefiles/states.shp")
        .with_description("US states");
    let resource = Resource::new("states", ns.id, store.id)
        .with_title("USA Population")
        .with_keyword("census")
        .with_srs("EPSG:4326");
    let style = Style::new("population", "popshade.sld").with_workspace(ws.id);
    let layer = Layer::for_resource(&resource).with_default_style(style.id);

    catalog.add(ws.clone()).unwrap();
    catalog.add(ns.clone()).unwrap();
    catalog.add(style.clone()).unwrap();
    catalog.add(store.clone()).unwrap();
    catalog.add(resource.clone()).unwrap();
    catalog.add(layer.clone()).unwrap();

    Topp {
        ws,
        ns,
        store,
        resource,
        layer,
        style,
    }
}

fn add_pair(catalog: &Catalog, name: &str) -> (Workspace, Namespace) {
    let (ws, ns) = workspace_pair(name, format!("http://example.com/{name}"));
    catalog.add(ws.clone()).unwrap();
    catalog.add(ns.clone()).unwrap();
    (ws, ns)
}

fn persistent_catalog() -> (Catalog, Arc<MemoryPersister>) {
    let persister = Arc::new(MemoryPersister::new());
    let catalog = Catalog::with_persister(persister.clone());
    (catalog, persister)
}

// ========== Round trip and uniqueness ==========

#[test]
fn test_added_entities_round_trip() {
    let catalog = Catalog::new();
    let topp = add_topp(&catalog);

    assert_eq!(catalog.get::<Workspace>(topp.ws.id), Some(topp.ws.clone()));
    assert_eq!(catalog.get::<Namespace>(topp.ns.id), Some(topp.ns.clone()));
    assert_eq!(catalog.get::<Store>(topp.store.id), Some(topp.store.clone()));
    assert_eq!(
        catalog.get::<Resource>(topp.resource.id),
        Some(topp.resource.clone())
    );
    assert_eq!(catalog.get::<Layer>(topp.layer.id), Some(topp.layer.clone()));
    assert_eq!(catalog.get::<Style>(topp.style.id), Some(topp.style.clone()));

    assert_eq!(catalog.layer_by_name("topp:states"), Some(topp.layer.clone()));
    assert_eq!(
        catalog.store_by_name(topp.ws.id, "states_shapefile"),
        Some(topp.store)
    );
    assert_eq!(
        catalog.style_by_name(Some(topp.ws.id), "population"),
        Some(topp.style)
    );
    assert_eq!(catalog.snapshot().len(), 6);
}

#[test]
fn test_duplicate_workspace_name_leaves_catalog_unchanged() {
    let catalog = Catalog::new();
    let recorder = Arc::new(Recorder::default());
    add_pair(&catalog, "topp");
    catalog.add_listener(recorder.clone());

    let err = catalog.add(Workspace::new("topp")).unwrap_err();
    assert!(matches!(
        err,
        Error::DuplicateKey {
            kind: EntityKind::Workspace,
            ..
        }
    ));
    assert_eq!(catalog.workspaces().len(), 1);
    assert!(recorder.events(Phase::Before).is_empty());
    assert!(recorder.events(Phase::After).is_empty());
}

#[test]
fn test_dangling_reference_rejected() {
    let catalog = Catalog::new();
    let (ws, _) = add_pair(&catalog, "topp");
    let store = Store::data("states", ws.id);
    let orphan = Resource::new("roads", geocat_core::NamespaceId::generate(), store.id);

    assert!(matches!(
        catalog.add(orphan),
        Err(Error::DanglingReference { .. })
    ));
    assert!(catalog.resources().is_empty());
}

// ========== Cascade ==========

#[test]
fn test_workspace_cascade_leaves_nothing_behind() {
    let catalog = Catalog::new();
    let topp = add_topp(&catalog);
    let (sf, sf_ns) = add_pair(&catalog, "sf");

    assert_eq!(catalog.styles_in(topp.ws.id), vec![topp.style.clone()]);
    let report = catalog.remove(topp.ws.id).unwrap();
    assert_eq!(report.removed.len(), 6);
    assert_eq!(report.affected_count(), 6);

    let snapshot = snapshot_refs(&catalog);
    for removed in &report.removed {
        assert!(!snapshot.contains(removed), "{removed} survived");
    }
    assert!(catalog.stores_in(topp.ws.id).is_empty());
    assert!(catalog.styles_in(topp.ws.id).is_empty());
    assert!(catalog.resources_in_namespace(topp.ns.id).is_empty());
    assert!(catalog.layers_of(topp.resource.id).is_empty());

    // the other pair is untouched and takes over as default
    assert_eq!(catalog.workspaces(), vec![sf.clone()]);
    assert_eq!(catalog.namespaces(), vec![sf_ns.clone()]);
    assert_eq!(catalog.defaults().workspace, Some(sf.id));
    assert_eq!(catalog.defaults().namespace, Some(sf_ns.id));
    catalog.snapshot().validate().unwrap();
}

fn snapshot_refs(catalog: &Catalog) -> Vec<InfoRef> {
    catalog
        .snapshot()
        .entities()
        .iter()
        .map(CatalogInfo::reference)
        .collect()
}

#[test]
fn test_cascade_events_are_ordered_leaves_first() {
    let catalog = Catalog::new();
    let topp = add_topp(&catalog);
    let recorder = Arc::new(Recorder::default());
    catalog.add_listener(recorder.clone());

    catalog.remove(topp.ws.id).unwrap();

    let before: Vec<Option<InfoRef>> = recorder
        .events(Phase::Before)
        .iter()
        .map(CatalogEvent::reference)
        .collect();
    let after: Vec<Option<InfoRef>> = recorder
        .events(Phase::After)
        .iter()
        .map(CatalogEvent::reference)
        .collect();
    assert_eq!(before, after);
    assert_eq!(
        before,
        vec![
            Some(InfoRef::Layer(topp.layer.id)),
            Some(InfoRef::Resource(topp.resource.id)),
            Some(InfoRef::Store(topp.store.id)),
            Some(InfoRef::Style(topp.style.id)),
            Some(InfoRef::Namespace(topp.ns.id)),
            Some(InfoRef::Workspace(topp.ws.id)),
            // the last pair is gone, so are the defaults
            None,
        ]
    );

    // every before precedes every after
    let phases: Vec<Phase> = recorder.log.lock().iter().map(|(p, _)| *p).collect();
    let first_after = phases.iter().position(|p| *p == Phase::After).unwrap();
    assert!(phases[first_after..].iter().all(|p| *p == Phase::After));
}

#[test]
fn test_remove_all_then_re_add() {
    let catalog = Catalog::new();
    let pairs: Vec<(Workspace, Namespace)> = ["cite", "sf", "topp"]
        .iter()
        .map(|name| add_pair(&catalog, name))
        .collect();

    for (ws, _) in &pairs {
        catalog.remove(ws.id).unwrap();
    }
    assert_eq!(catalog.workspaces().len(), 0);
    assert_eq!(catalog.namespaces().len(), 0);
    assert_eq!(catalog.default_workspace(), None);
    assert_eq!(catalog.default_namespace(), None);

    let (ws, ns) = pairs[1].clone();
    catalog.add(ws.clone()).unwrap();
    catalog.add(ns.clone()).unwrap();
    assert_eq!(catalog.namespace_by_uri(&ns.uri), Some(ns.clone()));
    assert_eq!(catalog.default_workspace(), Some(ws));
    assert_eq!(catalog.default_namespace(), Some(ns));
}

#[test]
fn test_double_remove_is_not_found() {
    let catalog = Catalog::new();
    let topp = add_topp(&catalog);
    add_pair(&catalog, "sf");

    catalog.remove(topp.layer.id).unwrap();
    let before = catalog.snapshot();

    assert!(matches!(
        catalog.remove(topp.layer.id),
        Err(Error::NotFound(InfoRef::Layer(id))) if id == topp.layer.id
    ));
    assert_eq!(before.entities(), catalog.snapshot().entities());
}

#[test]
fn test_namespace_removal_requires_no_dependents() {
    let catalog = Catalog::new();
    let topp = add_topp(&catalog);

    assert!(matches!(
        catalog.remove(topp.ns.id),
        Err(Error::DependentResourceExists { .. })
    ));
    assert!(catalog.get::<Namespace>(topp.ns.id).is_some());
}

#[test]
fn test_restrict_removal() {
    let catalog = Catalog::new();
    let topp = add_topp(&catalog);

    let err = catalog
        .remove_with(topp.resource.id, DeleteBehavior::Restrict)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::DependentResourceExists { first, count: 1, .. } if first == InfoRef::Layer(topp.layer.id)
    ));

    catalog
        .remove_with(topp.layer.id, DeleteBehavior::Restrict)
        .unwrap();
    catalog
        .remove_with(topp.resource.id, DeleteBehavior::Restrict)
        .unwrap();
    assert!(catalog.get::<Store>(topp.store.id).is_some());
}

#[test]
fn test_style_removal_detaches_layers() {
    let catalog = Catalog::new();
    let topp = add_topp(&catalog);
    let recorder = Arc::new(Recorder::default());
    catalog.add_listener(recorder.clone());

    let report = catalog.remove(topp.style.id).unwrap();
    assert_eq!(report.detached, vec![topp.layer.id]);

    let layer = catalog.get::<Layer>(topp.layer.id).unwrap();
    assert_eq!(layer.default_style, None);

    let kinds: Vec<EventKind> = recorder
        .events(Phase::After)
        .iter()
        .map(CatalogEvent::kind)
        .collect();
    assert_eq!(kinds, vec![EventKind::Modify, EventKind::Remove]);
    let modify = &recorder.events(Phase::After)[0];
    assert!(modify.changes().iter().any(|c| c.is("default_style")));
}

// ========== Save and rename propagation ==========

#[test]
fn test_save_reports_delta_to_listeners() {
    let catalog = Catalog::new();
    let topp = add_topp(&catalog);
    let recorder = Arc::new(Recorder::default());
    catalog.add_listener(recorder.clone());

    let changed = topp.store.clone().with_enabled(false);
    let changes = catalog.save(changed.clone()).unwrap();
    assert_eq!(changes.len(), 1);
    assert!(changes[0].is("enabled"));
    assert_eq!(catalog.get::<Store>(topp.store.id), Some(changed));

    match &recorder.events(Phase::After)[..] {
        [CatalogEvent::Modify {
            previous, changes, ..
        }] => {
            assert_eq!(previous, &CatalogInfo::from(topp.store));
            assert_eq!(changes.len(), 1);
        }
        other => panic!("unexpected events {other:?}"),
    }
}

#[test]
fn test_namespace_rename_renames_workspace() {
    let (catalog, _) = persistent_catalog();
    let topp = add_topp(&catalog);
    let recorder = Arc::new(Recorder::default());
    catalog.add_listener(recorder.clone());

    let mut renamed = topp.ns.clone();
    renamed.prefix = "topp2".to_string();
    catalog.save(renamed).unwrap();

    assert_eq!(
        catalog.workspace_by_name("topp2").map(|ws| ws.id),
        Some(topp.ws.id)
    );
    assert_eq!(catalog.workspace_by_name("topp"), None);
    assert_eq!(catalog.layer_by_name("topp2:states"), Some(topp.layer));
    assert_eq!(recorder.events(Phase::After).len(), 2);

    // still true after reading everything back
    catalog.reload().unwrap();
    assert_eq!(
        catalog.workspace_by_name("topp2").map(|ws| ws.id),
        Some(topp.ws.id)
    );
    assert_eq!(catalog.workspace_by_name("topp"), None);
}

#[test]
fn test_rename_collision_changes_nothing() {
    let catalog = Catalog::new();
    let topp = add_topp(&catalog);
    // a workspace named sf without a namespace
    catalog.add(Workspace::new("sf")).unwrap();
    let before = catalog.snapshot();

    let mut renamed = topp.ns.clone();
    renamed.prefix = "sf".to_string();
    assert!(matches!(
        catalog.save(renamed),
        Err(Error::DuplicateKey {
            kind: EntityKind::Workspace,
            ..
        })
    ));
    assert_eq!(before.entities(), catalog.snapshot().entities());
    assert_eq!(catalog.namespace_by_prefix("topp"), Some(topp.ns));
}

#[test]
fn test_moving_resource_rechecks_layer_names() {
    let catalog = Catalog::new();
    let topp = add_topp(&catalog);
    let (sf, sf_ns) = add_pair(&catalog, "sf");
    let sf_store = Store::data("sf_store", sf.id);
    let sf_states = Resource::new("other_states", sf_ns.id, sf_store.id);
    catalog.add(sf_store).unwrap();
    catalog.add(sf_states.clone()).unwrap();
    catalog
        .add(Layer::new("states", sf_states.id))
        .unwrap();

    let mut moved = topp.resource.clone();
    moved.namespace = sf_ns.id;
    assert!(matches!(
        catalog.save(moved),
        Err(Error::DuplicateKey {
            kind: EntityKind::Layer,
            ..
        })
    ));
}

// ========== Listeners ==========

#[test]
fn test_veto_aborts_mutation() {
    let catalog = Catalog::new();
    let recorder = Arc::new(Recorder::default());
    catalog.add_listener(Arc::new(NoNewWorkspaces));
    catalog.add_listener(recorder.clone());

    let err = catalog.add(Workspace::new("topp")).unwrap_err();
    assert!(matches!(
        err,
        Error::ListenerVeto { ref listener, .. } if listener == "no-new-workspaces"
    ));
    assert!(catalog.workspaces().is_empty());
    assert!(recorder.log.lock().is_empty());

    // other kinds still go through
    catalog
        .add(Namespace::new("topp", "http://www.openplans.org/topp"))
        .unwrap();
    assert_eq!(recorder.events(Phase::After).len(), 2);
}

#[test]
fn test_persistence_failure_is_surfaced_but_committed() {
    let (catalog, persister) = persistent_catalog();
    add_pair(&catalog, "topp");
    persister.fail_writes(true);

    let ws = Workspace::new("sf");
    assert!(matches!(
        catalog.add(ws.clone()),
        Err(Error::Persistence(_))
    ));
    assert_eq!(catalog.get::<Workspace>(ws.id), Some(ws.clone()));
    assert!(persister.get(InfoRef::Workspace(ws.id)).is_none());

    persister.fail_writes(false);
    catalog.save(ws.with_isolated(true)).unwrap();
    assert_eq!(persister.len(), 3);
}

#[test]
fn test_infrastructure_listeners_survive_reloads() {
    let (catalog, _) = persistent_catalog();
    add_topp(&catalog);
    let recorder = Arc::new(Recorder::default());
    catalog.add_listener(recorder.clone());

    assert_eq!(catalog.listener_count(ListenerKind::CacheInvalidation), 1);
    assert_eq!(catalog.listener_count(ListenerKind::PersistenceSync), 1);
    let before = catalog.listeners();

    for _ in 0..5 {
        let summary = catalog.reload().unwrap();
        assert_eq!(summary.reattached, 0);
        assert_eq!(summary.entities, 6);
    }

    assert_eq!(catalog.listener_count(ListenerKind::CacheInvalidation), 1);
    assert_eq!(catalog.listener_count(ListenerKind::PersistenceSync), 1);
    assert_eq!(catalog.listeners(), before);
    assert_eq!(*recorder.reloads.lock(), 5);
}

#[test]
fn test_infrastructure_listener_replaced_not_duplicated() {
    let (catalog, persister) = persistent_catalog();
    let before = catalog.listeners().len();

    let replacement = Arc::new(geocat_core::PersistenceSyncListener::new(persister));
    catalog.add_listener(replacement);
    assert_eq!(catalog.listeners().len(), before);
    assert_eq!(catalog.listener_count(ListenerKind::PersistenceSync), 1);

    let id = catalog
        .listeners()
        .into_iter()
        .find(|l| l.kind == ListenerKind::PersistenceSync)
        .map(|l| l.id)
        .unwrap();
    assert!(matches!(
        catalog.remove_listener(id),
        Err(Error::InfrastructureListener(ListenerKind::PersistenceSync))
    ));
}

#[test]
fn test_custom_listener_removal() {
    let catalog = Catalog::new();
    let recorder = Arc::new(Recorder::default());
    let id = catalog.add_listener(recorder.clone());

    add_pair(&catalog, "topp");
    catalog.remove_listener(id).unwrap();
    recorder.clear();
    add_pair(&catalog, "sf");
    assert!(recorder.log.lock().is_empty());
}

// ========== Reload ==========

#[test]
fn test_failed_reload_keeps_current_store() {
    let (catalog, persister) = persistent_catalog();
    let topp = add_topp(&catalog);
    let before = catalog.snapshot();

    persister.fail_loads(true);
    assert!(matches!(catalog.reload(), Err(Error::Persistence(_))));
    assert_eq!(before.entities(), catalog.snapshot().entities());
    persister.fail_loads(false);

    // an orphan written behind the catalog's back fails validation
    let orphan = Store::data("orphan", geocat_core::WorkspaceId::generate());
    persister.persist(&orphan.into()).unwrap();
    assert!(matches!(
        catalog.reload(),
        Err(Error::DanglingReference { .. })
    ));
    assert_eq!(catalog.get::<Layer>(topp.layer.id), Some(topp.layer));
    assert_eq!(catalog.listener_count(ListenerKind::PersistenceSync), 1);
}

#[test]
fn test_reload_picks_up_persisted_state() {
    let persister = Arc::new(MemoryPersister::new());
    {
        let catalog = Catalog::with_persister(persister.clone());
        add_topp(&catalog);
        let (sf, _) = add_pair(&catalog, "sf");
        catalog.set_default_workspace(sf.id).unwrap();
    }

    let catalog = Catalog::load(persister).unwrap();
    assert_eq!(catalog.snapshot().len(), 8);
    assert_eq!(catalog.default_workspace().unwrap().name, "sf");
    assert_eq!(catalog.default_namespace().unwrap().prefix, "sf");
}

#[test]
fn test_reload_clears_resource_pool() {
    let catalog = Catalog::new();
    let topp = add_topp(&catalog);
    let pool = catalog.resource_pool();

    let snapshot = catalog.snapshot();
    assert!(pool.store_handle(&snapshot, topp.store.id).is_some());
    assert!(pool
        .resource_descriptor(&snapshot, topp.resource.id)
        .is_some());
    assert_eq!(pool.len(), 2);

    catalog.reload().unwrap();
    assert!(pool.is_empty());
}

#[test]
fn test_store_change_clears_pooled_handle() {
    let catalog = Catalog::new();
    let topp = add_topp(&catalog);
    let pool = catalog.resource_pool();
    let old = catalog.snapshot();
    pool.store_handle(&old, topp.store.id).unwrap();

    catalog
        .save(topp.store.clone().with_param("charset", "UTF-8"))
        .unwrap();
    assert!(!pool.has_store(topp.store.id));

    // a reader still holding the old snapshot cannot put the old handle back
    let stale = pool.store_handle(&old, topp.store.id).unwrap();
    assert!(stale.connection.get("charset").is_none());
    assert!(!pool.has_store(topp.store.id));

    let handle = pool
        .store_handle(&catalog.snapshot(), topp.store.id)
        .unwrap();
    assert_eq!(handle.connection.get("charset").map(String::as_str), Some("UTF-8"));
    assert!(pool.has_store(topp.store.id));
}

// ========== Defaults ==========

#[test]
fn test_default_promotion_is_deterministic() {
    let catalog = Catalog::new();
    let (b, _) = add_pair(&catalog, "b");
    let (a, a_ns) = add_pair(&catalog, "a");
    add_pair(&catalog, "c");

    // first added stays default until removed
    assert_eq!(catalog.defaults().workspace, Some(b.id));

    let recorder = Arc::new(Recorder::default());
    catalog.add_listener(recorder.clone());
    catalog.remove(b.id).unwrap();
    assert_eq!(catalog.defaults().workspace, Some(a.id));
    assert_eq!(catalog.defaults().namespace, Some(a_ns.id));

    let last = recorder.events(Phase::After).pop().unwrap();
    assert!(matches!(last, CatalogEvent::DefaultChanged { current, .. } if current.workspace == Some(a.id)));
}

#[test]
fn test_set_default_namespace_moves_workspace() {
    let catalog = Catalog::new();
    add_pair(&catalog, "topp");
    let (sf, sf_ns) = add_pair(&catalog, "sf");

    catalog.set_default_namespace(sf_ns.id).unwrap();
    assert_eq!(catalog.defaults().workspace, Some(sf.id));

    // setting the same default twice emits nothing
    let recorder = Arc::new(Recorder::default());
    catalog.add_listener(recorder.clone());
    catalog.set_default_namespace(sf_ns.id).unwrap();
    assert!(recorder.log.lock().is_empty());
}

// ========== Concurrency ==========

#[test]
fn test_concurrent_readers_see_complete_snapshots() {
    let catalog = Arc::new(Catalog::new());
    add_topp(&catalog);

    thread::scope(|scope| {
        for _ in 0..4 {
            let catalog = Arc::clone(&catalog);
            scope.spawn(move || {
                for _ in 0..200 {
                    let snapshot = catalog.snapshot();
                    snapshot.validate().unwrap();
                    assert!(snapshot.defaults().workspace.is_some());
                }
            });
        }

        let writer = Arc::clone(&catalog);
        scope.spawn(move || {
            for i in 0..50 {
                let (ws, ns) = workspace_pair(format!("ws{i}"), format!("urn:ws{i}"));
                let id = ws.id;
                let ns_info = CatalogInfo::from(ns);
                writer.add_info(ns_info).unwrap();
                writer.add(ws).unwrap();
                writer.remove(id).unwrap();
            }
        });
    });

    assert_eq!(catalog.workspaces().len(), 1);
    assert_eq!(catalog.namespaces().len(), 1);
}

// ========== Sled ==========

#[test]
fn test_sled_catalog_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = CatalogConfig::new(dir.path()).with_flush_every_ms(None);

    let (ws_id, layer) = {
        let catalog = Catalog::open(&config).unwrap();
        let topp = add_topp(&catalog);
        let mut renamed = topp.ns.clone();
        renamed.prefix = "tiger".to_string();
        catalog.save(renamed).unwrap();
        catalog.flush().unwrap();
        (topp.ws.id, topp.layer)
    };

    let catalog = Catalog::open(&config).unwrap();
    assert_eq!(catalog.snapshot().len(), 6);
    assert_eq!(catalog.workspace_by_name("tiger").map(|ws| ws.id), Some(ws_id));
    assert_eq!(catalog.layer_by_name("tiger:states"), Some(layer));
    assert_eq!(catalog.defaults().workspace, Some(ws_id));
    assert!(catalog.persister().is_some());
}
