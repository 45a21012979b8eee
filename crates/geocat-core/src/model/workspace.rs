//! Workspace and namespace definitions.
//!
//! Workspaces and namespaces are stored independently but paired by
//! convention: a workspace named `topp` belongs with the namespace whose
//! prefix is `topp`.

use serde::{Deserialize, Serialize};

use crate::id::{NamespaceId, WorkspaceId};

/// Administrative grouping of configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Stable identifier.
    pub id: WorkspaceId,
    /// Workspace name (unique within the catalog).
    pub name: String,
    /// Isolated workspaces are only visible through their own virtual services.
    #[serde(default)]
    pub isolated: bool,
}

impl Workspace {
    /// Create a new workspace with a fresh identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: WorkspaceId::generate(),
            name: name.into(),
            isolated: false,
        }
    }

    /// Mark the workspace as isolated.
    pub fn with_isolated(mut self, isolated: bool) -> Self {
        self.isolated = isolated;
        self
    }
}

/// XML namespace bound to a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    /// Stable identifier.
    pub id: NamespaceId,
    /// Namespace prefix (unique, equals the paired workspace name).
    pub prefix: String,
    /// Namespace URI (unique).
    pub uri: String,
    /// Mirrors the isolation flag of the paired workspace.
    #[serde(default)]
    pub isolated: bool,
}

impl Namespace {
    /// Create a new namespace with a fresh identifier.
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: NamespaceId::generate(),
            prefix: prefix.into(),
            uri: uri.into(),
            isolated: false,
        }
    }

    /// Mark the namespace as isolated.
    pub fn with_isolated(mut self, isolated: bool) -> Self {
        self.isolated = isolated;
        self
    }

    /// Whether this namespace pairs with the given workspace.
    pub fn pairs_with(&self, workspace: &Workspace) -> bool {
        self.prefix == workspace.name
    }
}

/// Build a workspace together with its paired namespace.
pub fn workspace_pair(name: impl Into<String>, uri: impl Into<String>) -> (Workspace, Namespace) {
    let name = name.into();
    let namespace = Namespace::new(name.clone(), uri);
    (Workspace::new(name), namespace)
}
