//! crates/study_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database, HTTP framework or remote API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

//=========================================================================================
// Remote Assistant Resource
//=========================================================================================

/// Lifecycle status reported by the remote assistant service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AssistantStatus {
    Initializing,
    Ready,
    Failed,
    Terminating,
    /// Any status string this service does not know about.
    Other(String),
}

impl AssistantStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Initializing" => Self::Initializing,
            "Ready" => Self::Ready,
            "Failed" => Self::Failed,
            "Terminating" => Self::Terminating,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Initializing => "Initializing",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
            Self::Terminating => "Terminating",
            Self::Other(s) => s,
        }
    }
}

/// A named remote assistant that indexes uploaded files and answers prompts against them.
///
/// Also used as the summary returned when listing resources; `name` is the stable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantInfo {
    pub name: String,
    pub status: AssistantStatus,
    pub host: Option<String>,
    pub created_on: Option<String>,
    pub updated_on: Option<String>,
}

/// Processing status of a file handed to the remote assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Processing,
    Available,
    ProcessingFailed,
    Deleting,
    Other(String),
}

impl FileStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Processing" => Self::Processing,
            "Available" => Self::Available,
            "ProcessingFailed" => Self::ProcessingFailed,
            "Deleting" => Self::Deleting,
            other => Self::Other(other.to_string()),
        }
    }
}

/// The remote service's record of an uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub status: FileStatus,
    pub error_message: Option<String>,
    pub percent_done: Option<f64>,
}

//=========================================================================================
// Documents
//=========================================================================================

/// A PDF accepted from a client and written to the uploads directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: Uuid,
    /// The filename as given by the client. Metadata only, never used as a path.
    pub original_name: String,
    pub path: PathBuf,
}

/// A stored document that the remote assistant has finished indexing.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub document: StoredDocument,
    pub file: RemoteFile,
    pub assistant: AssistantInfo,
    pub indexed_at: DateTime<Utc>,
}

//=========================================================================================
// Generation
//=========================================================================================

/// How hard the generated quiz questions should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller wants generated from the indexed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationRequest {
    Notes,
    Quiz(Difficulty),
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub explanation: String,
}

/// A validated set of quiz questions, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResponse {
    pub questions: Vec<Question>,
}

//=========================================================================================
// Users & Auth
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}
