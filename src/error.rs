//! Typed errors for configuration and build failures
//!
//! Most of the tool propagates `anyhow::Result` with context attached at the
//! call site. The variants here are the failures callers may want to match on.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while validating `webroot.toml` or building a rule table
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("At least one entrypoint must be specified in webroot.toml")]
    NoEntrypoints,

    #[error("Entrypoint '{name}' points to non-existent file: {}", .path.display())]
    MissingEntrypoint { name: String, path: PathBuf },

    #[error("Invalid partition name '{0}': use ASCII letters, digits, '-', '_' or '.'")]
    InvalidPartitionName(String),

    #[error("Invalid entrypoint name '{0}': use ASCII letters, digits, '-', '_' or '.'")]
    InvalidEntrypointName(String),

    #[error("Partition '{0}' is declared more than once")]
    DuplicatePartition(String),

    #[error("Partition '{0}' has the same name as an entrypoint")]
    PartitionShadowsEntry(String),

    #[error("Empty {strategy} pattern")]
    EmptyPattern { strategy: &'static str },

    #[error("Invalid glob pattern '{pattern}'")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid regex pattern '{pattern}'")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while preparing build output
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(
        "Refusing to empty {}: it contains the project root {}",
        .out_dir.display(),
        .root.display()
    )]
    UnsafeOutDir { out_dir: PathBuf, root: PathBuf },
}
