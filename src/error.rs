//! Error types for the export pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Upstream unavailable for {pid}: {reason}")]
    UpstreamUnavailable { pid: String, reason: String },

    #[error("Malformed response for {pid}: {reason}")]
    MalformedResponse { pid: String, reason: String },

    #[error("Page sequence for {pid} references unknown file id '{file_id}'")]
    DanglingPageReference { pid: String, file_id: String },

    #[error("Relation '{file_id}' of {pid} has no resolved identifier")]
    UnresolvedRelation { pid: String, file_id: String },

    #[error("No handle returned for {pid}")]
    HandleNotFound { pid: String },

    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("HTTP client initialization failed: {0}")]
    ClientInit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] serde_json::Error),
}

impl ExportError {
    pub(crate) fn malformed(pid: &str, reason: impl std::fmt::Display) -> Self {
        ExportError::MalformedResponse {
            pid: pid.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error must abort the whole batch rather than skip one pid.
    ///
    /// Transport failures abort (no partial-credit guesswork); everything in
    /// the per-identifier taxonomy skips that identifier and continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExportError::UpstreamUnavailable { .. }
                | ExportError::Io(_)
                | ExportError::Csv(_)
                | ExportError::Checkpoint(_)
                | ExportError::InvalidBaseUrl(_)
                | ExportError::ClientInit(_)
        )
    }
}
