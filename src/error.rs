//! Error taxonomy for the codebase intelligence core (spec §7).
//!
//! Every tool-facing failure converts into [`CoreError`], which carries the
//! data needed to render the spec §6 error envelope
//! (`{status, errorCode, message, hint}`).

use std::path::PathBuf;
use thiserror::Error;

/// Top level error taxonomy (spec §7).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("'{path}' is not a directory")]
    InvalidRoot { path: PathBuf },

    #[error("invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("index is corrupted: {reason}")]
    IndexCorrupted { reason: String },

    #[error("indexing is already in progress")]
    IndexingInProgress,

    #[error("failed to parse {language} content: {reason}")]
    ParseFailed { language: String, reason: String },

    #[error("{component} timed out")]
    ProviderTimeout { component: String },

    #[error("{component} failed: {reason}")]
    ProviderFailure { component: String, reason: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Stable machine-readable code for the error envelope (spec §6).
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRoot { .. } => "invalid_params",
            Self::InvalidParams { .. } => "invalid_params",
            Self::IndexCorrupted { .. } => "index_corrupted",
            Self::IndexingInProgress => "indexing_in_progress",
            Self::ParseFailed { .. } => "internal",
            Self::ProviderTimeout { .. } => "internal",
            Self::ProviderFailure { .. } => "internal",
            Self::NotFound { .. } => "not_found",
            Self::Internal(_) => "internal",
            Self::Storage(_) => "index_corrupted",
            Self::Io(_) => "internal",
        }
    }

    /// Plain-English next-best-action, required on every failure (spec §7).
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidRoot { .. } => Some("pass an existing directory as the root, or set CODEBASE_ROOT"),
            Self::InvalidParams { .. } => Some("check the tool's parameter types and required fields"),
            Self::IndexCorrupted { .. } => Some("run refresh_index to trigger an auto-heal rebuild"),
            Self::IndexingInProgress => Some("retry once the current indexing run completes"),
            Self::ParseFailed { .. } => Some("the file was skipped; other files in the run are unaffected"),
            Self::ProviderTimeout { .. } => Some("retry the call; consider narrowing the query or batch size"),
            Self::ProviderFailure { .. } => Some("search falls back to the remaining channel; consider refresh_index"),
            Self::NotFound { .. } => Some("narrow the query to a specific symbol or file"),
            Self::Internal(_) => None,
            Self::Storage(_) => Some("run refresh_index to trigger an auto-heal rebuild"),
            Self::Io(_) => Some("check filesystem permissions under the index root"),
        }
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            status: "error",
            error_code: self.error_code(),
            message: self.to_string(),
            hint: self.hint(),
        }
    }
}

/// Wire shape of spec §6's error envelope.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorEnvelope {
    pub status: &'static str,
    #[serde(rename = "errorCode")]
    pub error_code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

/// Errors from the storage/artifact layer (§4.C1).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("manifest missing at {path}")]
    ManifestMissing { path: PathBuf },

    #[error("manifest malformed: {reason}")]
    ManifestMalformed { reason: String },

    #[error("manifest schema version {found} incompatible (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("artifact '{name}' fingerprint mismatch")]
    FingerprintMismatch { name: String },

    #[error("artifact '{name}' missing")]
    ArtifactMissing { name: String },

    #[error("failed to write artifact '{name}': {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read artifact '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize artifact '{name}': {source}")]
    Serde {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;
pub type StorageResult<T> = Result<T, StorageError>;

/// Helper trait mirroring the teacher's `ErrorContext`: attach a path or a
/// short message to an arbitrary error on its way into [`CoreError`].
pub trait ErrorContext<T> {
    fn with_context(self, msg: &str) -> CoreResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn with_context(self, msg: &str) -> CoreResult<T> {
        self.map_err(|e| CoreError::Internal(format!("{msg}: {e}")))
    }
}
