//! Style definitions.

use serde::{Deserialize, Serialize};

use crate::id::{StyleId, WorkspaceId};

/// Default style encoding.
pub const DEFAULT_STYLE_FORMAT: &str = "sld";

fn format_default() -> String {
    DEFAULT_STYLE_FORMAT.to_string()
}

/// A named symbology definition layers can render with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    /// Stable identifier.
    pub id: StyleId,
    /// Style name (unique within its workspace, or among global styles).
    pub name: String,
    /// File holding the style body, relative to the styles directory.
    pub filename: String,
    /// Style encoding (`sld`, `css`, ...).
    #[serde(default = "format_default")]
    pub format: String,
    /// Owning workspace; `None` for global styles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<WorkspaceId>,
}

impl Style {
    /// Create a new global style with a fresh identifier.
    pub fn new(name: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: StyleId::generate(),
            name: name.into(),
            filename: filename.into(),
            format: format_default(),
            workspace: None,
        }
    }

    /// Scope the style to a workspace.
    pub fn with_workspace(mut self, workspace: WorkspaceId) -> Self {
        self.workspace = Some(workspace);
        self
    }

    /// Set the style encoding.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}
