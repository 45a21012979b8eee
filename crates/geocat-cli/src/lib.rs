//! geocat command-line interface.
//!
//! Argument parsing, command execution and output formatting for the
//! `geocat` binary.

pub mod commands;
pub mod config;
pub mod error;
pub mod formatter;

pub use commands::{execute, resolve};
pub use config::{Args, Command, KindArg, StoreKindArg};
pub use error::CliError;
pub use formatter::{create_formatter, Formatter, OutputFormat};
