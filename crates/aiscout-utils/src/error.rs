//! Error taxonomy shared across the pipeline (spec.md §7).
//!
//! Each component has its own leaf error type; `AiscoutError` is the
//! top-level enum the CLI matches on to decide the process exit code.

use thiserror::Error;

/// Configuration load/reload failures (spec.md §4.A, §7).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("io error reading configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound HTTP/transport failures (spec.md §4.C, §7).
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("{kind} (status {status:?})")]
    Transport { status: Option<u16>, kind: String },
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("rate limited by upstream host")]
    RateLimited,
}

/// Persistence failures for the state store / incremental sink.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error the CLI maps to an exit code.
#[derive(Debug, Error)]
pub enum AiscoutError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
