//! Catalog entity model.
//!
//! Entities reference each other by identifier only. The entity store owns
//! every instance; navigation goes through lookups, so the workspace/namespace
//! pairing and the store/resource/layer chain never form ownership cycles.

mod info;
mod resource;
mod store;
mod style;
mod workspace;

use std::fmt;

use im::OrdMap;

pub use info::{CatalogInfo, Defaults, EntityKind, InfoRef, PropertyChange};
pub use resource::{Layer, Resource};
pub use store::{Store, StoreKind};
pub use style::{Style, DEFAULT_STYLE_FORMAT};
pub use workspace::{workspace_pair, Namespace, Workspace};

use crate::id::{LayerId, NamespaceId, ResourceId, StoreId, StyleId, WorkspaceId};
use crate::store::EntityStore;

/// Behaviour shared by every entity kind, used for typed access through the
/// catalog (`catalog.get::<Workspace>(id)`, `catalog.find::<Layer>(..)`).
pub trait CatalogEntity:
    Clone + fmt::Debug + PartialEq + Into<CatalogInfo> + Send + Sync + 'static
{
    /// Identifier type.
    type Id: Copy + Ord + fmt::Display + fmt::Debug + Into<InfoRef> + Send + Sync + 'static;

    /// Entity kind.
    const KIND: EntityKind;

    /// Entity identifier.
    fn id(&self) -> Self::Id;

    /// Display name (namespace prefix for namespaces).
    fn name(&self) -> &str;

    /// Extract this kind from a heterogeneous info.
    fn from_info(info: CatalogInfo) -> Option<Self>;

    /// The entity map for this kind.
    fn table(store: &EntityStore) -> &OrdMap<Self::Id, Self>;
}

macro_rules! catalog_entity {
    ($entity:ident, $id:ty, $field:ident, $name:ident) => {
        impl CatalogEntity for $entity {
            type Id = $id;

            const KIND: EntityKind = EntityKind::$entity;

            fn id(&self) -> Self::Id {
                self.id
            }

            fn name(&self) -> &str {
                &self.$name
            }

            fn from_info(info: CatalogInfo) -> Option<Self> {
                match info {
                    CatalogInfo::$entity(entity) => Some(entity),
                    _ => None,
                }
            }

            fn table(store: &EntityStore) -> &OrdMap<Self::Id, Self> {
                &store.$field
            }
        }
    };
}

catalog_entity!(Workspace, WorkspaceId, workspaces, name);
catalog_entity!(Namespace, NamespaceId, namespaces, prefix);
catalog_entity!(Style, StyleId, styles, name);
catalog_entity!(Store, StoreId, stores, name);
catalog_entity!(Resource, ResourceId, resources, name);
catalog_entity!(Layer, LayerId, layers, name);
