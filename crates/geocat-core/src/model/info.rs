//! Heterogeneous views over catalog entities: kinds, references and the
//! tagged `CatalogInfo` union used by events and persisters.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Layer, Namespace, Resource, Store, Style, Workspace};
use crate::error::Error;
use crate::id::{LayerId, NamespaceId, RawId, ResourceId, StoreId, StyleId, WorkspaceId};

/// Kind of catalog entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Workspace.
    Workspace,
    /// Namespace.
    Namespace,
    /// Style.
    Style,
    /// Store.
    Store,
    /// Resource.
    Resource,
    /// Layer.
    Layer,
}

impl EntityKind {
    /// All kinds in dependency order: parents before children.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Workspace,
        EntityKind::Namespace,
        EntityKind::Style,
        EntityKind::Store,
        EntityKind::Resource,
        EntityKind::Layer,
    ];

    /// Position in dependency order. Loading walks it upwards, cascading
    /// removal downwards.
    pub fn depth(&self) -> usize {
        match self {
            EntityKind::Workspace => 0,
            EntityKind::Namespace => 1,
            EntityKind::Style => 2,
            EntityKind::Store => 3,
            EntityKind::Resource => 4,
            EntityKind::Layer => 5,
        }
    }

    /// Plural name, used for storage trees and CLI output.
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Workspace => "workspaces",
            EntityKind::Namespace => "namespaces",
            EntityKind::Style => "styles",
            EntityKind::Store => "stores",
            EntityKind::Resource => "resources",
            EntityKind::Layer => "layers",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Workspace => "workspace",
            EntityKind::Namespace => "namespace",
            EntityKind::Style => "style",
            EntityKind::Store => "store",
            EntityKind::Resource => "resource",
            EntityKind::Layer => "layer",
        };
        f.write_str(name)
    }
}

/// Lightweight typed reference to a catalog entity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum InfoRef {
    /// Workspace reference.
    Workspace(WorkspaceId),
    /// Namespace reference.
    Namespace(NamespaceId),
    /// Style reference.
    Style(StyleId),
    /// Store reference.
    Store(StoreId),
    /// Resource reference.
    Resource(ResourceId),
    /// Layer reference.
    Layer(LayerId),
}

impl InfoRef {
    /// Kind of the referenced entity.
    pub fn kind(&self) -> EntityKind {
        match self {
            InfoRef::Workspace(_) => EntityKind::Workspace,
            InfoRef::Namespace(_) => EntityKind::Namespace,
            InfoRef::Style(_) => EntityKind::Style,
            InfoRef::Store(_) => EntityKind::Store,
            InfoRef::Resource(_) => EntityKind::Resource,
            InfoRef::Layer(_) => EntityKind::Layer,
        }
    }

    /// Untyped identifier bytes.
    pub fn raw(&self) -> RawId {
        match self {
            InfoRef::Workspace(id) => id.raw(),
            InfoRef::Namespace(id) => id.raw(),
            InfoRef::Style(id) => id.raw(),
            InfoRef::Store(id) => id.raw(),
            InfoRef::Resource(id) => id.raw(),
            InfoRef::Layer(id) => id.raw(),
        }
    }
}

impl fmt::Display for InfoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoRef::Workspace(id) => fmt::Display::fmt(id, f),
            InfoRef::Namespace(id) => fmt::Display::fmt(id, f),
            InfoRef::Style(id) => fmt::Display::fmt(id, f),
            InfoRef::Store(id) => fmt::Display::fmt(id, f),
            InfoRef::Resource(id) => fmt::Display::fmt(id, f),
            InfoRef::Layer(id) => fmt::Display::fmt(id, f),
        }
    }
}

impl fmt::Debug for InfoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

macro_rules! info_conversions {
    ($($variant:ident => $entity:ty, $id:ty;)*) => {
        $(
            impl From<$id> for InfoRef {
                fn from(id: $id) -> Self {
                    InfoRef::$variant(id)
                }
            }

            impl From<&$entity> for InfoRef {
                fn from(entity: &$entity) -> Self {
                    InfoRef::$variant(entity.id)
                }
            }

            impl From<$entity> for CatalogInfo {
                fn from(entity: $entity) -> Self {
                    CatalogInfo::$variant(entity)
                }
            }
        )*
    };
}

info_conversions! {
    Workspace => Workspace, WorkspaceId;
    Namespace => Namespace, NamespaceId;
    Style => Style, StyleId;
    Store => Store, StoreId;
    Resource => Resource, ResourceId;
    Layer => Layer, LayerId;
}

/// Any catalog entity, tagged with its kind when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogInfo {
    /// Workspace.
    Workspace(Workspace),
    /// Namespace.
    Namespace(Namespace),
    /// Style.
    Style(Style),
    /// Store.
    Store(Store),
    /// Resource.
    Resource(Resource),
    /// Layer.
    Layer(Layer),
}

impl CatalogInfo {
    /// Kind of the entity.
    pub fn kind(&self) -> EntityKind {
        self.reference().kind()
    }

    /// Reference to the entity.
    pub fn reference(&self) -> InfoRef {
        match self {
            CatalogInfo::Workspace(e) => InfoRef::Workspace(e.id),
            CatalogInfo::Namespace(e) => InfoRef::Namespace(e.id),
            CatalogInfo::Style(e) => InfoRef::Style(e.id),
            CatalogInfo::Store(e) => InfoRef::Store(e.id),
            CatalogInfo::Resource(e) => InfoRef::Resource(e.id),
            CatalogInfo::Layer(e) => InfoRef::Layer(e.id),
        }
    }

    /// Display name: workspace name, namespace prefix, or entity name.
    pub fn name(&self) -> &str {
        match self {
            CatalogInfo::Workspace(e) => &e.name,
            CatalogInfo::Namespace(e) => &e.prefix,
            CatalogInfo::Style(e) => &e.name,
            CatalogInfo::Store(e) => &e.name,
            CatalogInfo::Resource(e) => &e.name,
            CatalogInfo::Layer(e) => &e.name,
        }
    }

    /// Field-level delta from `self` (stored version) to `proposed`.
    ///
    /// Both versions must describe the same entity. Properties are compared
    /// on their serialized form and reported in name order.
    pub fn diff(&self, proposed: &CatalogInfo) -> Result<Vec<PropertyChange>, Error> {
        if self.reference() != proposed.reference() {
            return Err(Error::InvalidData(format!(
                "cannot diff {} against {}",
                self.reference(),
                proposed.reference()
            )));
        }

        let old = properties(self)?;
        let new = properties(proposed)?;
        let names: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

        Ok(names
            .into_iter()
            .filter(|name| name.as_str() != "id" && name.as_str() != "kind")
            .filter_map(|name| {
                let before = old.get(name).cloned().unwrap_or(Value::Null);
                let after = new.get(name).cloned().unwrap_or(Value::Null);
                (before != after).then(|| PropertyChange {
                    property: name.clone(),
                    old: before,
                    new: after,
                })
            })
            .collect())
    }
}

fn properties(info: &CatalogInfo) -> Result<Map<String, Value>, Error> {
    match serde_json::to_value(info) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::InvalidData(format!(
            "{} serialized to a non-object value: {other}",
            info.reference()
        ))),
        Err(e) => Err(Error::InvalidData(e.to_string())),
    }
}

/// One changed attribute of a modified entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    /// Serialized property name (`name`, `prefix`, `connection`, ...).
    pub property: String,
    /// Value before the change (`null` when absent).
    pub old: Value,
    /// Value after the change (`null` when absent).
    pub new: Value,
}

impl PropertyChange {
    /// Whether this change concerns the named property.
    pub fn is(&self, property: &str) -> bool {
        self.property == property
    }
}

/// The catalog-wide default workspace and namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// Default workspace.
    #[serde(default)]
    pub workspace: Option<WorkspaceId>,
    /// Default namespace.
    #[serde(default)]
    pub namespace: Option<NamespaceId>,
}
