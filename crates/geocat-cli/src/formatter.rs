//! Output formatters for command results.

use clap::ValueEnum;
use comfy_table::Table;
use geocat_core::{
    CascadeReport, CatalogInfo, EntityKind, EntityStore, Layer, Namespace, PropertyChange,
    ReloadSummary, Resource, Store, Style, Workspace,
};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format entities of one kind, resolving references against `catalog`.
    fn format_entities(
        &self,
        catalog: &EntityStore,
        kind: EntityKind,
        entities: &[CatalogInfo],
    ) -> String;

    /// Format the changes made by a save.
    fn format_changes(&self, target: &str, changes: &[PropertyChange]) -> String;

    /// Format the outcome of a removal.
    fn format_removal(&self, report: &CascadeReport) -> String;

    /// Format the outcome of a reload.
    fn format_reload(&self, summary: &ReloadSummary) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_entities(
        &self,
        catalog: &EntityStore,
        kind: EntityKind,
        entities: &[CatalogInfo],
    ) -> String {
        if entities.is_empty() {
            return format!("No {}", kind.plural());
        }

        let mut table = Table::new();
        table.set_header(header(kind));
        for info in entities {
            table.add_row(row(catalog, info));
        }
        table.to_string()
    }

    fn format_changes(&self, target: &str, changes: &[PropertyChange]) -> String {
        if changes.is_empty() {
            return format!("{target}: no changes");
        }

        let mut table = Table::new();
        table.set_header(vec!["Property", "Old", "New"]);
        for change in changes {
            table.add_row(vec![
                change.property.clone(),
                change.old.to_string(),
                change.new.to_string(),
            ]);
        }
        format!("{target}\n{table}")
    }

    fn format_removal(&self, report: &CascadeReport) -> String {
        let mut output = format!("{} entity(ies) affected", report.affected_count());
        for removed in &report.removed {
            output.push_str(&format!("\n  removed {} {removed}", removed.kind()));
        }
        for layer in &report.detached {
            output.push_str(&format!("\n  detached style from {layer}"));
        }
        output
    }

    fn format_reload(&self, summary: &ReloadSummary) -> String {
        format!(
            "catalog ok: {} entities, {} listener(s) re-attached ({:.2?})",
            summary.entities, summary.reattached, summary.elapsed
        )
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

fn header(kind: EntityKind) -> Vec<&'static str> {
    match kind {
        EntityKind::Workspace => vec!["Name", "Isolated", "Default", "Id"],
        EntityKind::Namespace => vec!["Prefix", "URI", "Isolated", "Default", "Id"],
        EntityKind::Style => vec!["Name", "Workspace", "Filename", "Format", "Id"],
        EntityKind::Store => vec!["Name", "Workspace", "Kind", "Enabled", "Connection", "Id"],
        EntityKind::Resource => vec!["Name", "Namespace", "Store", "SRS", "Title", "Id"],
        EntityKind::Layer => vec!["Name", "Resource", "Default style", "Styles", "Id"],
    }
}

fn row(catalog: &EntityStore, info: &CatalogInfo) -> Vec<String> {
    let defaults = catalog.defaults();
    match info {
        CatalogInfo::Workspace(ws) => vec![
            ws.name.clone(),
            ws.isolated.to_string(),
            (defaults.workspace == Some(ws.id)).to_string(),
            ws.id.to_string(),
        ],
        CatalogInfo::Namespace(ns) => vec![
            ns.prefix.clone(),
            ns.uri.clone(),
            ns.isolated.to_string(),
            (defaults.namespace == Some(ns.id)).to_string(),
            ns.id.to_string(),
        ],
        CatalogInfo::Style(style) => vec![
            style.name.clone(),
            style
                .workspace
                .and_then(|id| catalog.get::<Workspace>(id))
                .map(|ws| ws.name.clone())
                .unwrap_or_else(|| "(global)".to_string()),
            style.filename.clone(),
            style.format.clone(),
            style.id.to_string(),
        ],
        CatalogInfo::Store(store) => vec![
            store.name.clone(),
            workspace_name(catalog, store),
            store.kind.to_string(),
            store.enabled.to_string(),
            store
                .connection
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join(", "),
            store.id.to_string(),
        ],
        CatalogInfo::Resource(resource) => vec![
            resource.name.clone(),
            catalog
                .get::<Namespace>(resource.namespace)
                .map(|ns| ns.prefix.clone())
                .unwrap_or_default(),
            catalog
                .get::<Store>(resource.store)
                .map(|store| store.name.clone())
                .unwrap_or_default(),
            resource.srs.clone().unwrap_or_default(),
            resource.title.clone().unwrap_or_default(),
            resource.id.to_string(),
        ],
        CatalogInfo::Layer(layer) => vec![
            layer.name.clone(),
            catalog
                .get::<Resource>(layer.resource)
                .map(|r| r.name.clone())
                .unwrap_or_default(),
            layer
                .default_style
                .map(|id| style_name(catalog, id))
                .unwrap_or_default(),
            style_names(catalog, layer),
            layer.id.to_string(),
        ],
    }
}

fn workspace_name(catalog: &EntityStore, store: &Store) -> String {
    catalog
        .get::<Workspace>(store.workspace)
        .map(|ws| ws.name.clone())
        .unwrap_or_default()
}

fn style_name(catalog: &EntityStore, id: geocat_core::StyleId) -> String {
    catalog
        .get::<Style>(id)
        .map(|style| style.name.clone())
        .unwrap_or_default()
}

fn style_names(catalog: &EntityStore, layer: &Layer) -> String {
    layer
        .styles
        .iter()
        .map(|id| style_name(catalog, *id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_entities(
        &self,
        _catalog: &EntityStore,
        _kind: EntityKind,
        entities: &[CatalogInfo],
    ) -> String {
        serde_json::to_string_pretty(entities).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_changes(&self, target: &str, changes: &[PropertyChange]) -> String {
        serde_json::json!({
            "target": target,
            "changes": changes,
        })
        .to_string()
    }

    fn format_removal(&self, report: &CascadeReport) -> String {
        serde_json::json!({
            "affected": report.affected_count(),
            "removed": report.removed.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "detached": report.detached.iter().map(ToString::to_string).collect::<Vec<_>>(),
        })
        .to_string()
    }

    fn format_reload(&self, summary: &ReloadSummary) -> String {
        serde_json::json!({
            "entities": summary.entities,
            "default_workspace": summary.defaults.workspace.map(|id| id.to_string()),
            "default_namespace": summary.defaults.namespace.map(|id| id.to_string()),
            "reattached": summary.reattached,
            "elapsed_ms": summary.elapsed.as_millis() as u64,
        })
        .to_string()
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({
            "message": message
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocat_core::{workspace_pair, Catalog};

    fn catalog() -> Catalog {
        let catalog = Catalog::new();
        let (ws, ns) = workspace_pair("topp", "http://www.openplans.org/topp");
        let store = Store::data("states", ws.id).with_param("url", "file:states.shp");
        catalog.add(ws).unwrap();
        catalog.add(ns).unwrap();
        catalog.add(store).unwrap();
        catalog
    }

    fn listing(catalog: &Catalog, kind: EntityKind) -> Vec<CatalogInfo> {
        catalog
            .snapshot()
            .entities()
            .into_iter()
            .filter(|info| info.kind() == kind)
            .collect()
    }

    #[test]
    fn test_table_resolves_parent_names() {
        let catalog = catalog();
        let stores = listing(&catalog, EntityKind::Store);
        let output =
            TableFormatter.format_entities(&catalog.snapshot(), EntityKind::Store, &stores);

        assert!(output.contains("states"));
        assert!(output.contains("topp"));
        assert!(output.contains("url=file:states.shp"));
    }

    #[test]
    fn test_table_empty_listing() {
        let catalog = catalog();
        let output = TableFormatter.format_entities(&catalog.snapshot(), EntityKind::Layer, &[]);
        assert_eq!(output, "No layers");
    }

    #[test]
    fn test_json_listing_is_an_array() {
        let catalog = catalog();
        let workspaces = listing(&catalog, EntityKind::Workspace);
        let output =
            JsonFormatter.format_entities(&catalog.snapshot(), EntityKind::Workspace, &workspaces);

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["name"], "topp");
    }

    #[test]
    fn test_json_removal() {
        let catalog = catalog();
        let ws = catalog.workspace_by_name("topp").unwrap();
        let report = catalog.remove(ws.id).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&JsonFormatter.format_removal(&report)).unwrap();
        assert_eq!(value["affected"], 3);
        assert_eq!(value["removed"].as_array().unwrap().len(), 3);
    }
}
