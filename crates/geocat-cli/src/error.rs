//! CLI errors.

use geocat_core::EntityKind;
use thiserror::Error;

/// Errors raised while executing a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The catalog rejected the operation.
    #[error(transparent)]
    Catalog(#[from] geocat_core::Error),

    /// No entity matches the given name.
    #[error("no {kind} named '{name}'")]
    NotFound {
        /// Kind searched for.
        kind: EntityKind,
        /// Name as given on the command line.
        name: String,
    },

    /// A name argument could not be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON output failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    pub(crate) fn not_found(kind: EntityKind, name: &str) -> Self {
        CliError::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}
