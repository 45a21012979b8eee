//! Cascade engine for removals.
//!
//! Removing an entity must never leave a dangling reference behind:
//! - CASCADE: remove every dependent recursively, leaves first
//! - RESTRICT: refuse the removal if any direct dependent exists
//!
//! Layers that merely reference a removed style are kept and lose the
//! reference instead.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::error::Error;
use crate::id::{LayerId, StyleId};
use crate::model::{CatalogInfo, EntityKind, InfoRef, Layer, Namespace, Workspace};
use crate::store::EntityStore;

/// What to do with the dependents of a removal target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteBehavior {
    /// Remove dependents recursively.
    #[default]
    Cascade,
    /// Prevent removal if dependents exist.
    Restrict,
}

/// One change caused by a removal.
#[derive(Debug, Clone, PartialEq)]
pub enum CascadeStep {
    /// The entity is removed.
    Remove(CatalogInfo),
    /// A surviving layer loses references to removed styles.
    Detach {
        /// Layer before the change.
        previous: Layer,
        /// Layer after the change.
        current: Layer,
    },
}

impl CascadeStep {
    /// Entity affected by this step.
    pub fn reference(&self) -> InfoRef {
        match self {
            CascadeStep::Remove(info) => info.reference(),
            CascadeStep::Detach { current, .. } => InfoRef::Layer(current.id),
        }
    }

    // Layers, resources and stores go first; detaches must precede the
    // removal of the style they detach; the workspace pair goes last.
    fn rank(&self) -> usize {
        match self {
            CascadeStep::Remove(info) => match info.kind() {
                EntityKind::Layer => 0,
                EntityKind::Resource => 1,
                EntityKind::Store => 2,
                EntityKind::Style => 4,
                EntityKind::Namespace => 5,
                EntityKind::Workspace => 6,
            },
            CascadeStep::Detach { .. } => 3,
        }
    }
}

/// Ordered changes needed to remove an entity.
#[derive(Debug, Clone)]
pub struct CascadePlan {
    target: InfoRef,
    steps: Vec<CascadeStep>,
}

impl CascadePlan {
    /// Entity whose removal was requested.
    pub fn target(&self) -> InfoRef {
        self.target
    }

    /// Steps in application order.
    pub fn steps(&self) -> &[CascadeStep] {
        &self.steps
    }

    /// Apply every step to `store`.
    pub(crate) fn apply(&self, store: &mut EntityStore) -> Result<(), Error> {
        for step in &self.steps {
            match step {
                CascadeStep::Remove(info) => {
                    store
                        .delete(info.reference())
                        .ok_or(Error::NotFound(info.reference()))?;
                }
                CascadeStep::Detach { current, .. } => {
                    store.replace(current.clone().into())?;
                }
            }
        }
        Ok(())
    }

    /// Summary of the plan.
    pub fn report(&self) -> CascadeReport {
        let mut report = CascadeReport::new();
        for step in &self.steps {
            match step {
                CascadeStep::Remove(info) => report.removed.push(info.reference()),
                CascadeStep::Detach { current, .. } => report.detached.push(current.id),
            }
        }
        report
    }
}

/// Result of a removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Entities that were removed, in removal order.
    pub removed: Vec<InfoRef>,
    /// Layers that lost references to removed styles.
    pub detached: Vec<LayerId>,
}

impl CascadeReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of affected entities.
    pub fn affected_count(&self) -> usize {
        self.removed.len() + self.detached.len()
    }
}

/// Plans removals against a store.
pub struct CascadeEngine<'a> {
    store: &'a EntityStore,
}

impl<'a> CascadeEngine<'a> {
    /// Create a new cascade engine.
    pub fn new(store: &'a EntityStore) -> Self {
        Self { store }
    }

    /// Compute the changes needed to remove `target`.
    ///
    /// Nothing is modified; the plan is applied by the caller once listeners
    /// have accepted it.
    pub fn plan(&self, target: InfoRef, behavior: DeleteBehavior) -> Result<CascadePlan, Error> {
        if !self.store.contains(target) {
            return Err(Error::NotFound(target));
        }

        // a namespace removed on its own must not strand anything
        if let InfoRef::Namespace(_) = target {
            self.check_dependents(target, self.namespace_dependents(target))?;
        }

        let mut collector = Collector::default();
        match behavior {
            DeleteBehavior::Cascade => self.collect(target, &mut collector),
            DeleteBehavior::Restrict => {
                self.check_dependents(target, self.direct_dependents(target))?;
                if let InfoRef::Workspace(id) = target {
                    let paired = self
                        .store
                        .get::<Workspace>(id)
                        .and_then(|ws| self.store.paired_namespace(ws));
                    if let Some(ns) = paired {
                        collector.remove(self.info(ns.id.into()));
                    }
                }
                collector.remove(self.info(target));
            }
        }

        let mut steps = collector.removals;
        steps.extend(self.detach_steps(&collector.styles, &collector.visited));
        steps.sort_by_key(CascadeStep::rank);

        debug!(
            target = %target,
            ?behavior,
            steps = steps.len(),
            "planned removal"
        );

        Ok(CascadePlan { target, steps })
    }

    fn info(&self, target: InfoRef) -> Option<CatalogInfo> {
        self.store.get_info(target)
    }

    fn collect(&self, target: InfoRef, collector: &mut Collector) {
        if !collector.visited.insert(target) {
            return;
        }

        match target {
            InfoRef::Workspace(id) => {
                let Some(ws) = self.store.get::<Workspace>(id) else {
                    return;
                };
                for store in self.store.stores_in(id) {
                    self.collect(store.id.into(), collector);
                }
                if let Some(ns) = self.store.paired_namespace(ws) {
                    self.collect(ns.id.into(), collector);
                }
                for style in self.store.styles_in(id) {
                    self.collect(style.id.into(), collector);
                }
            }
            InfoRef::Namespace(id) => {
                for resource in self.store.resources_in_namespace(id) {
                    self.collect(resource.id.into(), collector);
                }
            }
            InfoRef::Store(id) => {
                for resource in self.store.resources_in_store(id) {
                    self.collect(resource.id.into(), collector);
                }
            }
            InfoRef::Resource(id) => {
                for layer in self.store.layers_of(id) {
                    self.collect(layer.id.into(), collector);
                }
            }
            InfoRef::Style(id) => {
                collector.styles.push(id);
            }
            InfoRef::Layer(_) => {}
        }

        collector.remove(self.info(target));
    }

    fn detach_steps(&self, styles: &[StyleId], removed: &HashSet<InfoRef>) -> Vec<CascadeStep> {
        let mut detached: BTreeMap<LayerId, (Layer, Layer)> = BTreeMap::new();
        for style in styles {
            for layer in self.store.layers_using_style(*style) {
                if removed.contains(&InfoRef::Layer(layer.id)) {
                    continue;
                }
                let (_, current) = detached
                    .entry(layer.id)
                    .or_insert_with(|| (layer.clone(), layer.clone()));
                current.detach_style(*style);
            }
        }
        detached
            .into_values()
            .map(|(previous, current)| CascadeStep::Detach { previous, current })
            .collect()
    }

    fn check_dependents(&self, target: InfoRef, dependents: Vec<InfoRef>) -> Result<(), Error> {
        match dependents.first() {
            Some(first) => Err(Error::DependentResourceExists {
                target,
                first: *first,
                count: dependents.len(),
            }),
            None => Ok(()),
        }
    }

    /// Entities that keep a standalone namespace removal from succeeding.
    fn namespace_dependents(&self, target: InfoRef) -> Vec<InfoRef> {
        let InfoRef::Namespace(id) = target else {
            return Vec::new();
        };
        let mut dependents: Vec<InfoRef> = self
            .store
            .resources_in_namespace(id)
            .map(InfoRef::from)
            .collect();
        let paired = self
            .store
            .get::<Namespace>(id)
            .and_then(|ns| self.store.paired_workspace(ns));
        if let Some(ws) = paired {
            dependents.extend(self.store.stores_in(ws.id).map(InfoRef::from));
        }
        dependents
    }

    /// Entities that directly depend on `target`.
    fn direct_dependents(&self, target: InfoRef) -> Vec<InfoRef> {
        match target {
            InfoRef::Workspace(id) => {
                let mut dependents: Vec<InfoRef> =
                    self.store.stores_in(id).map(InfoRef::from).collect();
                dependents.extend(self.store.styles_in(id).map(InfoRef::from));
                let paired = self
                    .store
                    .get::<Workspace>(id)
                    .and_then(|ws| self.store.paired_namespace(ws));
                if let Some(ns) = paired {
                    dependents.extend(
                        self.store
                            .resources_in_namespace(ns.id)
                            .map(InfoRef::from),
                    );
                }
                dependents
            }
            InfoRef::Namespace(_) => self.namespace_dependents(target),
            InfoRef::Store(id) => self
                .store
                .resources_in_store(id)
                .map(InfoRef::from)
                .collect(),
            InfoRef::Resource(id) => self.store.layers_of(id).map(InfoRef::from).collect(),
            InfoRef::Style(id) => self
                .store
                .layers_using_style(id)
                .map(InfoRef::from)
                .collect(),
            InfoRef::Layer(_) => Vec::new(),
        }
    }
}

#[derive(Default)]
struct Collector {
    visited: HashSet<InfoRef>,
    removals: Vec<CascadeStep>,
    styles: Vec<StyleId>,
}

impl Collector {
    fn remove(&mut self, info: Option<CatalogInfo>) {
        if let Some(info) = info {
            self.visited.insert(info.reference());
            self.removals.push(CascadeStep::Remove(info));
        }
    }
}
