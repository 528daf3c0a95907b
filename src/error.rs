//! Error types for the fallible edges around the analysis engine.
//!
//! The engine itself never fails: missing or broken input degrades to
//! [`Warning`](crate::models::Warning)s. These errors cover CIDR parsing,
//! configuration values and writing exports.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to parse an IPv4 CIDR string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CidrError {
    #[error("invalid CIDR format: {0}")]
    Format(String),
    #[error("invalid IP address: {0}")]
    Address(String),
    #[error("invalid prefix length: {0}")]
    PrefixLength(String),
}

/// Invalid configuration value from the environment or the command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown duplicate key policy '{0}' (expected 'first' or 'last')")]
    DuplicateKeyPolicy(String),
    #[error("unknown route coverage '{0}' (expected 'supernet' or 'exact')")]
    RouteCoverage(String),
    #[error("invalid boolean '{value}' for {name}")]
    Flag { name: String, value: String },
}

/// Failure writing a report to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("error serializing report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("error writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
