//! Published resources and the layers that expose them.

use serde::{Deserialize, Serialize};

use crate::id::{LayerId, NamespaceId, ResourceId, StoreId, StyleId};

fn enabled_default() -> bool {
    true
}

/// A published dataset description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Stable identifier.
    pub id: ResourceId,
    /// Published name (unique within its namespace).
    pub name: String,
    /// Name of the dataset in the underlying store.
    pub native_name: String,
    /// Namespace the resource is published under.
    pub namespace: NamespaceId,
    /// Store backing the resource.
    pub store: StoreId,
    /// Human readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Abstract.
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Keywords.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Declared spatial reference system code, e.g. `EPSG:4326`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srs: Option<String>,
    /// Whether the resource is enabled.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

impl Resource {
    /// Create a new resource with a fresh identifier.
    ///
    /// The native name defaults to the published name.
    pub fn new(name: impl Into<String>, namespace: NamespaceId, store: StoreId) -> Self {
        let name = name.into();
        Self {
            id: ResourceId::generate(),
            native_name: name.clone(),
            name,
            namespace,
            store,
            title: None,
            summary: None,
            keywords: Vec::new(),
            srs: None,
            enabled: true,
        }
    }

    /// Set the native name.
    pub fn with_native_name(mut self, native_name: impl Into<String>) -> Self {
        self.native_name = native_name.into();
        self
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the abstract.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Add a keyword.
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    /// Set the declared SRS.
    pub fn with_srs(mut self, srs: impl Into<String>) -> Self {
        self.srs = Some(srs.into());
        self
    }
}

/// A service-visible publication of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Stable identifier.
    pub id: LayerId,
    /// Layer name (unique within the namespace of its resource).
    pub name: String,
    /// Published resource.
    pub resource: ResourceId,
    /// Default style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_style: Option<StyleId>,
    /// Additional styles clients may request.
    #[serde(default)]
    pub styles: Vec<StyleId>,
    /// Whether the layer is enabled.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Whether the layer is listed in capabilities documents.
    #[serde(default = "enabled_default")]
    pub advertised: bool,
}

impl Layer {
    /// Create a new layer with a fresh identifier.
    pub fn new(name: impl Into<String>, resource: ResourceId) -> Self {
        Self {
            id: LayerId::generate(),
            name: name.into(),
            resource,
            default_style: None,
            styles: Vec::new(),
            enabled: true,
            advertised: true,
        }
    }

    /// Create a layer named after the resource it publishes.
    pub fn for_resource(resource: &Resource) -> Self {
        Self::new(resource.name.clone(), resource.id)
    }

    /// Set the default style.
    pub fn with_default_style(mut self, style: StyleId) -> Self {
        self.default_style = Some(style);
        self
    }

    /// Add an alternate style.
    pub fn with_style(mut self, style: StyleId) -> Self {
        if !self.styles.contains(&style) {
            self.styles.push(style);
        }
        self
    }

    /// Every style the layer references, default first.
    pub fn style_refs(&self) -> impl Iterator<Item = StyleId> + '_ {
        self.default_style.into_iter().chain(self.styles.iter().copied())
    }

    /// Whether the layer references the given style in any role.
    pub fn uses_style(&self, style: StyleId) -> bool {
        self.style_refs().any(|s| s == style)
    }

    /// Drop every reference to `style`.
    pub fn detach_style(&mut self, style: StyleId) {
        if self.default_style == Some(style) {
            self.default_style = None;
        }
        self.styles.retain(|s| *s != style);
    }
}
