//! crates/study_assistant_core/src/error.rs
//!
//! The error type returned by the core application services.

use crate::parser::ParseError;
use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    /// The uploaded file does not look like a PDF. Raised before anything is written.
    #[error("Only PDF files are allowed (got '{0}')")]
    InvalidFileType(String),

    /// The client's byte stream broke off mid-upload.
    #[error("Upload interrupted: {0}")]
    UploadInterrupted(String),

    /// Writing or removing the local copy of an upload failed.
    #[error("Local storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Transient failure talking to the remote assistant. Callers may retry.
    #[error("Remote assistant unavailable: {0}")]
    RemoteUnavailable(String),

    /// Any other failure reported by the remote assistant.
    #[error("Remote assistant error: {0}")]
    Remote(PortError),

    #[error("Assistant '{name}' did not become ready: {reason}")]
    AssistantNotReady { name: String, reason: String },

    #[error("Ingestion failed: {0}")]
    IngestionFailed(String),

    #[error("Ingestion timed out after {0:?}")]
    IngestionTimedOut(std::time::Duration),

    #[error("Ingestion cancelled")]
    IngestionCancelled,

    /// The assistant replied with nothing at all.
    #[error("Assistant returned an empty response")]
    EmptyReply,

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<PortError> for StudyError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Unavailable(msg) => Self::RemoteUnavailable(msg),
            other => Self::Remote(other),
        }
    }
}

pub type StudyResult<T> = Result<T, StudyError>;
