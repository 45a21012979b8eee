//! Sled-backed persister.

use sled::{Db, Tree};
use tracing::debug;

use super::{PersistedCatalog, Persister};
use crate::config::CatalogConfig;
use crate::error::PersistError;
use crate::id::RawId;
use crate::model::{CatalogInfo, Defaults, EntityKind};

/// Tree name for catalog metadata.
const META_TREE: &str = "meta";

/// Key of the defaults record in the meta tree.
const DEFAULTS_KEY: &[u8] = b"defaults";

/// Persister storing one sled tree per entity kind.
///
/// Keys are raw identifier bytes; values are JSON-encoded entities.
pub struct SledPersister {
    db: Db,
    trees: Vec<(EntityKind, Tree)>,
    meta_tree: Tree,
}

impl SledPersister {
    /// Open or create the catalog database described by `config`.
    pub fn open(config: &CatalogConfig) -> Result<Self, PersistError> {
        let db = config.to_sled_config().open()?;
        let trees = EntityKind::ALL
            .iter()
            .map(|kind| Ok((*kind, db.open_tree(kind.plural())?)))
            .collect::<Result<Vec<_>, sled::Error>>()?;
        let meta_tree = db.open_tree(META_TREE)?;

        debug!(
            path = %config.path.display(),
            temporary = config.temporary,
            recovered = db.was_recovered(),
            "opened catalog database"
        );

        Ok(Self {
            db,
            trees,
            meta_tree,
        })
    }

    /// Check if the database was recovered from a previous run.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// Total size of the database on disk.
    pub fn size_on_disk(&self) -> Result<u64, PersistError> {
        Ok(self.db.size_on_disk()?)
    }

    fn tree(&self, kind: EntityKind) -> Result<&Tree, PersistError> {
        self.trees
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, tree)| tree)
            .ok_or_else(|| PersistError::Unavailable(format!("no tree for {kind}")))
    }
}

impl Persister for SledPersister {
    fn persist(&self, info: &CatalogInfo) -> Result<(), PersistError> {
        let target = info.reference();
        let bytes = serde_json::to_vec(info)?;
        self.tree(target.kind())?
            .insert(target.raw().as_bytes(), bytes)?;
        debug!(%target, "persisted entity");
        Ok(())
    }

    fn delete(&self, info: &CatalogInfo) -> Result<(), PersistError> {
        let target = info.reference();
        self.tree(target.kind())?.remove(target.raw().as_bytes())?;
        debug!(%target, "deleted entity");
        Ok(())
    }

    fn persist_defaults(&self, defaults: &Defaults) -> Result<(), PersistError> {
        let bytes = serde_json::to_vec(defaults)?;
        self.meta_tree.insert(DEFAULTS_KEY, bytes)?;
        Ok(())
    }

    fn load_all(&self) -> Result<PersistedCatalog, PersistError> {
        let mut entities = Vec::new();
        for (kind, tree) in &self.trees {
            for result in tree.iter() {
                let (key, value) = result?;
                let id = RawId::from_slice(&key).ok_or(PersistError::InvalidKey)?;
                let info: CatalogInfo = serde_json::from_slice(&value)?;
                if info.kind() != *kind || info.reference().raw() != id {
                    return Err(PersistError::InvalidKey);
                }
                entities.push(info);
            }
        }

        let defaults = match self.meta_tree.get(DEFAULTS_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Defaults::default(),
        };

        debug!(entities = entities.len(), "loaded catalog");
        Ok(PersistedCatalog { entities, defaults })
    }

    fn flush(&self) -> Result<(), PersistError> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{workspace_pair, Store};

    #[test]
    fn test_round_trip_through_trees() {
        let persister = SledPersister::open(&CatalogConfig::temporary()).unwrap();
        let (ws, ns) = workspace_pair("topp", "http://www.openplans.org/topp");
        let store = Store::data("states", ws.id).with_param("url", "file:states.shp");

        for info in [
            CatalogInfo::from(store.clone()),
            ws.clone().into(),
            ns.clone().into(),
        ] {
            persister.persist(&info).unwrap();
        }
        let defaults = Defaults {
            workspace: Some(ws.id),
            namespace: Some(ns.id),
        };
        persister.persist_defaults(&defaults).unwrap();

        let loaded = persister.load_all().unwrap();
        assert_eq!(loaded.defaults, defaults);
        // trees are read parents first
        assert_eq!(
            loaded.entities,
            vec![
                CatalogInfo::from(ws.clone()),
                ns.into(),
                store.clone().into()
            ]
        );

        persister.delete(&store.into()).unwrap();
        assert_eq!(persister.load_all().unwrap().entities.len(), 2);
    }

    #[test]
    fn test_empty_database_has_no_defaults() {
        let persister = SledPersister::open(&CatalogConfig::temporary()).unwrap();
        let loaded = persister.load_all().unwrap();
        assert!(loaded.entities.is_empty());
        assert_eq!(loaded.defaults, Defaults::default());
    }
}
