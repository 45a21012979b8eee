//! Command execution against an open catalog.

use geocat_core::{
    workspace_pair, Catalog, CatalogInfo, DeleteBehavior, EntityKind, EntityStore, InfoRef,
    Layer, Namespace, Resource, Store, Style, Workspace,
};
use tracing::info;

use crate::config::Command;
use crate::error::CliError;
use crate::formatter::Formatter;

/// Execute `command` and return its formatted output.
pub fn execute(
    catalog: &Catalog,
    command: &Command,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    match command {
        Command::List { kind } => {
            let kind = EntityKind::from(*kind);
            let snapshot = catalog.snapshot();
            let entities: Vec<CatalogInfo> = snapshot
                .entities()
                .into_iter()
                .filter(|info| info.kind() == kind)
                .collect();
            Ok(formatter.format_entities(&snapshot, kind, &entities))
        }

        Command::AddWorkspace {
            name,
            uri,
            isolated,
        } => {
            let (ws, ns) = workspace_pair(name.as_str(), uri.as_str());
            catalog.add_all([
                CatalogInfo::from(ws.with_isolated(*isolated)),
                CatalogInfo::from(ns.with_isolated(*isolated)),
            ])?;
            info!(workspace = %name, %uri, "added workspace");
            Ok(formatter.format_message(&format!("added workspace '{name}' ({uri})")))
        }

        Command::AddStore {
            workspace,
            name,
            kind,
            params,
            description,
        } => {
            let snapshot = catalog.snapshot();
            let ws = find_workspace(&snapshot, workspace)?;
            let mut store = Store::new(name.as_str(), (*kind).into(), ws.id);
            for (key, value) in params {
                store = store.with_param(key.as_str(), value.as_str());
            }
            if let Some(description) = description {
                store = store.with_description(description.as_str());
            }
            catalog.add(store)?;
            Ok(formatter.format_message(&format!("added store '{workspace}:{name}'")))
        }

        Command::AddResource {
            store,
            name,
            native_name,
            title,
            srs,
        } => {
            let snapshot = catalog.snapshot();
            let (workspace, store_name) = split_qualified(EntityKind::Store, store)?;
            let ws = find_workspace(&snapshot, workspace)?;
            let owner = snapshot
                .store_by_name(ws.id, store_name)
                .ok_or_else(|| CliError::not_found(EntityKind::Store, store))?;
            let ns = snapshot.paired_namespace(ws).ok_or_else(|| {
                CliError::InvalidArgument(format!("workspace '{workspace}' has no namespace"))
            })?;

            let mut resource = Resource::new(name.as_str(), ns.id, owner.id);
            if let Some(native_name) = native_name {
                resource = resource.with_native_name(native_name.as_str());
            }
            if let Some(title) = title {
                resource = resource.with_title(title.as_str());
            }
            if let Some(srs) = srs {
                resource = resource.with_srs(srs.as_str());
            }
            catalog.add(resource)?;
            Ok(formatter.format_message(&format!("added resource '{}:{name}'", ns.prefix)))
        }

        Command::AddStyle {
            name,
            filename,
            workspace,
        } => {
            let snapshot = catalog.snapshot();
            let mut style = Style::new(name.as_str(), filename.as_str());
            if let Some(workspace) = workspace {
                style = style.with_workspace(find_workspace(&snapshot, workspace)?.id);
            }
            catalog.add(style)?;
            Ok(formatter.format_message(&format!("added style '{name}'")))
        }

        Command::AddLayer {
            resource,
            name,
            style,
        } => {
            let snapshot = catalog.snapshot();
            let published = find_resource(&snapshot, resource)?;
            let mut layer = Layer::for_resource(published);
            if let Some(name) = name {
                layer.name = name.clone();
            }
            if let Some(style) = style {
                layer = layer.with_default_style(find_style(&snapshot, style)?.id);
            }
            let layer_name = layer.name.clone();
            catalog.add(layer)?;
            Ok(formatter.format_message(&format!("added layer '{layer_name}'")))
        }

        Command::RenameWorkspace { old, new } => {
            let snapshot = catalog.snapshot();
            let mut ws = find_workspace(&snapshot, old)?.clone();
            ws.name = new.clone();
            let changes = catalog.save(ws)?;
            info!(from = %old, to = %new, "renamed workspace");
            Ok(formatter.format_changes(new, &changes))
        }

        Command::Remove {
            kind,
            name,
            restrict,
        } => {
            let target = resolve(&catalog.snapshot(), (*kind).into(), name)?;
            let behavior = if *restrict {
                DeleteBehavior::Restrict
            } else {
                DeleteBehavior::Cascade
            };
            let report = catalog.remove_with(target, behavior)?;
            info!(%target, affected = report.affected_count(), "removed");
            Ok(formatter.format_removal(&report))
        }

        Command::SetDefault { workspace } => {
            let ws = find_workspace(&catalog.snapshot(), workspace)?.id;
            catalog.set_default_workspace(ws)?;
            Ok(formatter.format_message(&format!("default workspace is now '{workspace}'")))
        }

        Command::Check => {
            let summary = catalog.reload()?;
            Ok(formatter.format_reload(&summary))
        }
    }
}

/// Resolve a command-line name to an entity reference.
///
/// Stores are named `workspace:store`, resources `prefix:name`, layers
/// `prefix:name` or a bare name in the default namespace, and styles either
/// `workspace:name` or a bare global name.
pub fn resolve(catalog: &EntityStore, kind: EntityKind, name: &str) -> Result<InfoRef, CliError> {
    let target: InfoRef = match kind {
        EntityKind::Workspace => find_workspace(catalog, name)?.id.into(),
        EntityKind::Namespace => find_namespace(catalog, name)?.id.into(),
        EntityKind::Style => find_style(catalog, name)?.id.into(),
        EntityKind::Store => {
            let (workspace, local) = split_qualified(kind, name)?;
            let ws = find_workspace(catalog, workspace)?;
            catalog
                .store_by_name(ws.id, local)
                .ok_or_else(|| CliError::not_found(kind, name))?
                .id
                .into()
        }
        EntityKind::Resource => find_resource(catalog, name)?.id.into(),
        EntityKind::Layer => catalog
            .layer_by_qualified_name(name)
            .ok_or_else(|| CliError::not_found(kind, name))?
            .id
            .into(),
    };
    Ok(target)
}

fn split_qualified(kind: EntityKind, name: &str) -> Result<(&str, &str), CliError> {
    name.split_once(':').ok_or_else(|| {
        CliError::InvalidArgument(format!("{kind} must be given as <workspace>:<name>, got '{name}'"))
    })
}

fn find_workspace<'a>(catalog: &'a EntityStore, name: &str) -> Result<&'a Workspace, CliError> {
    catalog
        .workspace_by_name(name)
        .ok_or_else(|| CliError::not_found(EntityKind::Workspace, name))
}

fn find_namespace<'a>(catalog: &'a EntityStore, prefix: &str) -> Result<&'a Namespace, CliError> {
    catalog
        .namespace_by_prefix(prefix)
        .ok_or_else(|| CliError::not_found(EntityKind::Namespace, prefix))
}

fn find_resource<'a>(catalog: &'a EntityStore, name: &str) -> Result<&'a Resource, CliError> {
    let (prefix, local) = split_qualified(EntityKind::Resource, name)?;
    let ns = find_namespace(catalog, prefix)?;
    catalog
        .resource_by_name(ns.id, local)
        .ok_or_else(|| CliError::not_found(EntityKind::Resource, name))
}

fn find_style<'a>(catalog: &'a EntityStore, name: &str) -> Result<&'a Style, CliError> {
    let style = match name.split_once(':') {
        Some((workspace, local)) => {
            let ws = find_workspace(catalog, workspace)?;
            catalog.style_by_name(Some(ws.id), local)
        }
        None => catalog.style_by_name(None, name),
    };
    style.ok_or_else(|| CliError::not_found(EntityKind::Style, name))
}
