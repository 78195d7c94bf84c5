//! crates/study_assistant_core/src/orchestrator.rs
//!
//! The transport-independent half of the request layer: gates generation on document
//! readiness and routes each request to the upload coordinator, the assistant manager and
//! the response parser.

use bytes::Bytes;
use futures::Stream;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, warn};

use crate::assistant::AssistantManager;
use crate::domain::{AssistantInfo, Difficulty, GenerationRequest, IndexedDocument, QuizResponse};
use crate::error::{StudyError, StudyResult};
use crate::parser::parse_quiz;
use crate::session::{DocumentSession, DocumentState};
use crate::upload::UploadCoordinator;

/// Outcome of a generation request. `NotReady` is a normal answer, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation<T> {
    Ready(T),
    NotReady,
}

pub struct StudyOrchestrator {
    assistant: Arc<AssistantManager>,
    uploads: Arc<UploadCoordinator>,
    session: Arc<DocumentSession>,
}

impl StudyOrchestrator {
    pub fn new(
        assistant: Arc<AssistantManager>,
        uploads: Arc<UploadCoordinator>,
        session: Arc<DocumentSession>,
    ) -> Self {
        Self {
            assistant,
            uploads,
            session,
        }
    }

    pub fn status(&self) -> DocumentState {
        self.session.snapshot()
    }

    /// Stores the file and makes it the assistant's only document.
    pub async fn upload<S, E>(&self, filename: &str, stream: S) -> StudyResult<IndexedDocument>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let stored = self.uploads.accept_upload(filename, stream).await?;
        self.uploads.ingest(&stored, &self.session).await
    }

    pub async fn generate_notes(&self) -> StudyResult<Generation<String>> {
        let Some(document) = self.ready_document() else {
            info!("Notes requested before any document was indexed");
            return Ok(Generation::NotReady);
        };

        let notes = self
            .assistant
            .generate(&document.assistant, GenerationRequest::Notes)
            .await?;
        if notes.trim().is_empty() {
            return Err(StudyError::EmptyReply);
        }
        Ok(Generation::Ready(notes))
    }

    pub async fn generate_quiz(&self, difficulty: Difficulty) -> StudyResult<Generation<QuizResponse>> {
        let Some(document) = self.ready_document() else {
            info!(%difficulty, "Quiz requested before any document was indexed");
            return Ok(Generation::NotReady);
        };

        let raw = self
            .assistant
            .generate(&document.assistant, GenerationRequest::Quiz(difficulty))
            .await?;
        if raw.trim().is_empty() {
            return Err(StudyError::EmptyReply);
        }

        let quiz = parse_quiz(&raw).map_err(|e| {
            warn!(%difficulty, raw = %e.raw(), "Rejected quiz reply: {}", e);
            e
        })?;
        info!(%difficulty, questions = quiz.questions.len(), "Quiz generated");
        Ok(Generation::Ready(quiz))
    }

    pub async fn ensure_resource(&self) -> StudyResult<AssistantInfo> {
        self.assistant
            .ensure_resource(self.assistant.resource_name())
            .await
    }

    /// Deletes the assistant. Any indexed document goes with it.
    pub async fn delete_resource(&self) -> StudyResult<()> {
        self.uploads.retire(&self.session).await
    }

    pub async fn list_resources(&self) -> StudyResult<Vec<AssistantInfo>> {
        self.assistant.list_resources().await
    }

    fn ready_document(&self) -> Option<IndexedDocument> {
        match self.session.snapshot() {
            DocumentState::DocumentReady(document) => Some(document),
            DocumentState::NoDocument => None,
        }
    }
}
