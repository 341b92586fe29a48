use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::records::{format_permissions, Permission};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode FIT data: {0}")]
    Parse(String),
    #[error("session message without `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// Multisportfiler (flere økter) og filer uten økt.
    #[error("expected exactly one session, found {found}")]
    NoSingleSession { found: usize },
    #[error("session window is empty: start {start} is not before end {end}")]
    InvalidSessionWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("health store unavailable: {0}")]
    Unavailable(String),
    #[error("missing permissions: {}", format_permissions(.missing))]
    PermissionDenied { missing: BTreeSet<Permission> },
    #[error("health store refused access (HTTP {0})")]
    Forbidden(u16),
    #[error("health store rejected the batch (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn is_permission(&self) -> bool {
        matches!(self, StoreError::PermissionDenied { .. } | StoreError::Forbidden(_))
    }
}

/// Sluttresultatet av ett importforsøk, slik brukeren får det rapportert.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    DecodeFailure(#[from] DecodeError),
    #[error(transparent)]
    UnsupportedFile(#[from] MappingError),
    #[error(transparent)]
    StoreUnavailable(StoreError),
    #[error(transparent)]
    StorePermissionDenied(StoreError),
    #[error(transparent)]
    StoreRejected(StoreError),
}

impl From<StoreError> for ImportError {
    fn from(e: StoreError) -> Self {
        match e {
            e if e.is_permission() => ImportError::StorePermissionDenied(e),
            StoreError::Rejected { .. } | StoreError::Serialize(_) => ImportError::StoreRejected(e),
            e => ImportError::StoreUnavailable(e),
        }
    }
}

impl ImportError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ImportError::DecodeFailure(_) | ImportError::UnsupportedFile(_) => {
                "Failed to parse .fit file content"
            }
            ImportError::StoreUnavailable(_) => "❌ Failed to connect to the health store",
            ImportError::StorePermissionDenied(_) => "❌ Missing health store permissions",
            ImportError::StoreRejected(_) => "❌ The health store rejected the records",
        }
    }

    /// Midlertidige lagerfeil beholder de mappede postene; de kan sendes på nytt uten ny dekoding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ImportError::StoreUnavailable(_) | ImportError::StorePermissionDenied(_)
        )
    }

    /// Kort etikett til metrikker.
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::DecodeFailure(_) => "decode_failure",
            ImportError::UnsupportedFile(_) => "unsupported_file",
            ImportError::StoreUnavailable(_) => "store_unavailable",
            ImportError::StorePermissionDenied(_) => "store_permission_denied",
            ImportError::StoreRejected(_) => "store_rejected",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}
