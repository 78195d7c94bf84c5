//! crates/study_assistant_core/src/session.rs
//!
//! Tracks whether a document is indexed and ready for generation.

use std::sync::RwLock;

use crate::domain::IndexedDocument;

/// The two states of a document session.
#[derive(Debug, Clone, Default)]
pub enum DocumentState {
    #[default]
    NoDocument,
    DocumentReady(IndexedDocument),
}

impl DocumentState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::DocumentReady(_))
    }
}

/// Shared readiness state. Writers are serialized by the upload coordinator's ingest lock;
/// this lock only guards the value itself and is never held across an await.
#[derive(Debug, Default)]
pub struct DocumentSession {
    state: RwLock<DocumentState>,
}

impl DocumentSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DocumentState {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_ready()
    }

    pub(crate) fn mark_ready(&self, document: IndexedDocument) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) =
            DocumentState::DocumentReady(document);
    }

    pub(crate) fn clear(&self) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = DocumentState::NoDocument;
    }
}
