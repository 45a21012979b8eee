//! Data store definitions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{StoreId, WorkspaceId};

/// Kind of data source a store connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Vector data (feature types).
    Data,
    /// Raster data (coverages).
    Coverage,
    /// Cascaded remote WMS.
    Wms,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Data => write!(f, "data"),
            StoreKind::Coverage => write!(f, "coverage"),
            StoreKind::Wms => write!(f, "wms"),
        }
    }
}

/// Connection/configuration describing a data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    /// Stable identifier.
    pub id: StoreId,
    /// Store name (unique within its workspace).
    pub name: String,
    /// Kind of data source.
    #[serde(rename = "type")]
    pub kind: StoreKind,
    /// Owning workspace.
    pub workspace: WorkspaceId,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the store is enabled.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Connection parameters handed to the data access layer.
    #[serde(default)]
    pub connection: BTreeMap<String, String>,
}

fn enabled_default() -> bool {
    true
}

impl Store {
    /// Create a new store with a fresh identifier.
    pub fn new(name: impl Into<String>, kind: StoreKind, workspace: WorkspaceId) -> Self {
        Self {
            id: StoreId::generate(),
            name: name.into(),
            kind,
            workspace,
            description: None,
            enabled: true,
            connection: BTreeMap::new(),
        }
    }

    /// Create a vector data store.
    pub fn data(name: impl Into<String>, workspace: WorkspaceId) -> Self {
        Self::new(name, StoreKind::Data, workspace)
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a connection parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.connection.insert(key.into(), value.into());
        self
    }

    /// Enable or disable the store.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
