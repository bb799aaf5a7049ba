//! PRB-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Top-level error type for the presence probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("[PRB-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[PRB-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[PRB-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[PRB-2001] duplicate product name in catalog: {name}")]
    DuplicateProduct { name: String },

    #[error("[PRB-2002] invalid path pattern '{pattern}': {details}")]
    InvalidPattern { pattern: String, details: String },

    #[error("[PRB-2003] invalid signature for {product}: {details}")]
    InvalidSignature { product: String, details: String },

    #[error("[PRB-2004] unsupported catalog schema version {found}, expected <= {expected}")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("[PRB-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[PRB-3001] session failure on {target}: {details}")]
    Session { target: String, details: String },

    #[error("[PRB-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProbeError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "PRB-1001",
            Self::MissingConfig { .. } => "PRB-1002",
            Self::ConfigParse { .. } => "PRB-1003",
            Self::DuplicateProduct { .. } => "PRB-2001",
            Self::InvalidPattern { .. } => "PRB-2002",
            Self::InvalidSignature { .. } => "PRB-2003",
            Self::UnsupportedSchema { .. } => "PRB-2004",
            Self::Serialization { .. } => "PRB-2101",
            Self::Session { .. } => "PRB-3001",
            Self::Io { .. } => "PRB-3002",
        }
    }

    /// Whether retrying (at the host/session level) might resolve the failure.
    ///
    /// The probe itself never retries; this is advice for the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Session { .. } | Self::Io { .. })
    }

    /// Whether the error invalidates a catalog or configuration before any scan starts.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::DuplicateProduct { .. }
                | Self::InvalidPattern { .. }
                | Self::InvalidSignature { .. }
                | Self::UnsupportedSchema { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for ProbeError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
