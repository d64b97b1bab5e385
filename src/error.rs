use std::path::PathBuf;

use thiserror::Error;

/// Main error type for reqtree operations.
///
/// Every variant is fatal to the whole graph build; dynamic-resolution
/// failures are not errors and degrade to unresolved leaves instead.
#[derive(Error, Debug)]
pub enum ReqtreeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}")]
    Parse { path: PathBuf },

    #[error("Cannot resolve '{reference}' from {base}")]
    Resolve { reference: String, base: PathBuf },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReqtreeError>;
