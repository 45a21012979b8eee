//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use geocat_core::{CatalogConfig, EntityKind, StoreKind};

use crate::formatter::OutputFormat;

/// Default catalog directory.
pub const DEFAULT_DATA_PATH: &str = "./geocat_data";

/// geocat - inspect and edit a catalog of geospatial configuration.
#[derive(Parser, Debug)]
#[command(name = "geocat")]
#[command(version, about = "Inspect and edit a geocat catalog")]
pub struct Args {
    /// Catalog directory
    #[arg(short = 'd', long, default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Sled page cache size in MB
    #[arg(long, default_value_t = 64)]
    pub cache_mb: u64,

    /// Resource pool capacity
    #[arg(long, default_value_t = geocat_core::config::DEFAULT_POOL_CAPACITY)]
    pub pool_capacity: usize,

    #[command(subcommand)]
    pub command: Command,
}

/// Catalog commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every entity of a kind
    List {
        /// Entity kind
        kind: KindArg,
    },

    /// Add a workspace together with its namespace
    AddWorkspace {
        /// Workspace name, also used as the namespace prefix
        name: String,
        /// Namespace URI
        #[arg(long)]
        uri: String,
        /// Create the pair as isolated
        #[arg(long)]
        isolated: bool,
    },

    /// Add a store to a workspace
    AddStore {
        /// Owning workspace
        workspace: String,
        /// Store name
        name: String,
        /// Kind of data source
        #[arg(long, default_value = "data", value_enum)]
        kind: StoreKindArg,
        /// Connection parameter as key=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },

    /// Add a resource served by a store
    AddResource {
        /// Store as workspace:store
        store: String,
        /// Resource name
        name: String,
        /// Name in the underlying store (defaults to the name)
        #[arg(long)]
        native_name: Option<String>,
        /// Human readable title
        #[arg(long)]
        title: Option<String>,
        /// Declared SRS, e.g. EPSG:4326
        #[arg(long)]
        srs: Option<String>,
    },

    /// Add a style
    AddStyle {
        /// Style name
        name: String,
        /// Style document file name
        filename: String,
        /// Owning workspace (global if omitted)
        #[arg(long)]
        workspace: Option<String>,
    },

    /// Publish a resource as a layer
    AddLayer {
        /// Resource as prefix:name
        resource: String,
        /// Layer name (defaults to the resource name)
        #[arg(long)]
        name: Option<String>,
        /// Default style, as name or workspace:name
        #[arg(long)]
        style: Option<String>,
    },

    /// Rename a workspace and its namespace
    RenameWorkspace {
        /// Current name
        old: String,
        /// New name
        new: String,
    },

    /// Remove an entity and everything that depends on it
    Remove {
        /// Entity kind
        kind: KindArg,
        /// Entity name (qualified as prefix:name where needed)
        name: String,
        /// Fail instead of cascading when dependents exist
        #[arg(long)]
        restrict: bool,
    },

    /// Make a workspace (and its namespace) the default
    SetDefault {
        /// Workspace name
        workspace: String,
    },

    /// Reload the catalog from disk and verify every invariant
    Check,
}

/// Entity kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Workspace,
    Namespace,
    Style,
    Store,
    Resource,
    Layer,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Workspace => EntityKind::Workspace,
            KindArg::Namespace => EntityKind::Namespace,
            KindArg::Style => EntityKind::Style,
            KindArg::Store => EntityKind::Store,
            KindArg::Resource => EntityKind::Resource,
            KindArg::Layer => EntityKind::Layer,
        }
    }
}

/// Store kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKindArg {
    Data,
    Coverage,
    Wms,
}

impl From<StoreKindArg> for StoreKind {
    fn from(kind: StoreKindArg) -> Self {
        match kind {
            StoreKindArg::Data => StoreKind::Data,
            StoreKindArg::Coverage => StoreKind::Coverage,
            StoreKindArg::Wms => StoreKind::Wms,
        }
    }
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

impl Args {
    /// Convert the arguments into a catalog configuration.
    pub fn into_config(&self) -> CatalogConfig {
        CatalogConfig::new(&self.data_path)
            .with_cache_capacity(self.cache_mb * 1024 * 1024)
            .with_pool_capacity(self.pool_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_config() {
        let args =
            Args::try_parse_from(["geocat", "--data-path", "/tmp/cat", "--cache-mb", "8", "check"])
                .unwrap();
        let config = args.into_config();

        assert_eq!(config.path, PathBuf::from("/tmp/cat"));
        assert_eq!(config.cache_capacity, 8 * 1024 * 1024);
        assert!(!config.temporary);
        assert_eq!(args.command, Command::Check);
    }

    #[test]
    fn test_store_params() {
        let args = Args::try_parse_from([
            "geocat",
            "add-store",
            "topp",
            "states",
            "-p",
            "url=file:states.shp",
            "--param",
            "charset=UTF-8",
        ])
        .unwrap();

        match args.command {
            Command::AddStore { params, kind, .. } => {
                assert_eq!(kind, StoreKindArg::Data);
                assert_eq!(
                    params,
                    vec![
                        ("url".to_string(), "file:states.shp".to_string()),
                        ("charset".to_string(), "UTF-8".to_string()),
                    ]
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_malformed_param() {
        assert!(Args::try_parse_from(["geocat", "add-store", "topp", "s", "-p", "nokey"]).is_err());
        assert!(parse_param("=value").is_err());
    }

    #[test]
    fn test_remove_flags() {
        let args =
            Args::try_parse_from(["geocat", "remove", "layer", "topp:states", "--restrict"])
                .unwrap();
        assert_eq!(
            args.command,
            Command::Remove {
                kind: KindArg::Layer,
                name: "topp:states".to_string(),
                restrict: true,
            }
        );
    }
}
