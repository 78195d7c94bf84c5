//! crates/study_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

use crate::domain::{AssistantInfo, RemoteFile, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The item being created already exists. Callers doing create-or-fetch match on this.
    #[error("Item already exists: {0}")]
    AlreadyExists(String),
    /// Transient failure reaching the remote side (network, rate limit, 5xx).
    #[error("Remote service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The remote document assistant: a named resource that indexes files and chats about them.
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Creates a new assistant. Fails with `PortError::AlreadyExists` if the name is taken.
    async fn create_assistant(&self, name: &str, instructions: &str) -> PortResult<AssistantInfo>;

    async fn describe_assistant(&self, name: &str) -> PortResult<AssistantInfo>;

    /// Deletes an assistant. Fails with `PortError::NotFound` if it does not exist.
    async fn delete_assistant(&self, name: &str) -> PortResult<()>;

    async fn list_assistants(&self) -> PortResult<Vec<AssistantInfo>>;

    /// Uploads the file at `path` to the assistant under `display_name`.
    /// Returns as soon as the remote side has accepted the bytes; indexing continues remotely.
    async fn upload_file(
        &self,
        assistant: &str,
        path: &Path,
        display_name: &str,
    ) -> PortResult<RemoteFile>;

    async fn describe_file(&self, assistant: &str, file_id: &str) -> PortResult<RemoteFile>;

    /// Sends a single user message and returns the assistant's reply text.
    async fn chat(&self, assistant: &str, message: &str) -> PortResult<String>;
}

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    /// Inserts a new user. Fails with `PortError::AlreadyExists` if the email is taken.
    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        name: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user id, or `PortError::Unauthorized` for unknown or expired tokens.
    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, token: &str) -> PortResult<()>;
}
