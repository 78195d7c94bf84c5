//! crates/study_assistant_core/src/testing.rs
//!
//! An in-memory `AssistantService` used by the unit tests here and by the api crate's
//! integration tests (through the `test-util` feature).

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::{AssistantInfo, AssistantStatus, FileStatus, RemoteFile};
use crate::ports::{AssistantService, PortError, PortResult};

#[derive(Default)]
struct FakeState {
    assistants: HashMap<String, AssistantInfo>,
    files: HashMap<String, (RemoteFile, usize)>,
    /// Assistants being deleted, with the describes left before they disappear.
    terminating: HashMap<String, usize>,
    deletion_polls: usize,
    calls: Vec<String>,
    chat_reply: String,
    chat_error: Option<PortError>,
    create_error: Option<PortError>,
    upload_error: Option<PortError>,
    upload_delay: Duration,
    processing_polls: usize,
    final_file_status: Option<FileStatus>,
    last_message: Option<String>,
    next_file: usize,
}

/// Records every call and keeps assistants and files in memory.
pub struct FakeAssistant {
    state: Mutex<FakeState>,
}

impl Default for FakeAssistant {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAssistant {
    pub fn new() -> Self {
        let state = FakeState {
            chat_reply: "fake reply".to_string(),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_chat_reply(&self, reply: impl Into<String>) {
        self.lock().chat_reply = reply.into();
    }

    pub fn fail_chat_with(&self, err: PortError) {
        self.lock().chat_error = Some(err);
    }

    /// The next `create_assistant` call fails with `err`.
    pub fn fail_next_create_with(&self, err: PortError) {
        self.lock().create_error = Some(err);
    }

    /// The next `upload_file` call fails with `err`.
    pub fn fail_next_upload_with(&self, err: PortError) {
        self.lock().upload_error = Some(err);
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        self.lock().upload_delay = delay;
    }

    /// Makes deletion asynchronous: a deleted assistant stays `Terminating` for this many
    /// `describe_assistant` calls before it is gone.
    pub fn set_deletion_polls(&self, polls: usize) {
        self.lock().deletion_polls = polls;
    }

    /// How many `describe_file` polls report `Processing` before the final status.
    pub fn set_processing_polls(&self, polls: usize) {
        self.lock().processing_polls = polls;
    }

    /// The status files settle on once processing ends. Defaults to `Available`.
    pub fn set_final_file_status(&self, status: FileStatus) {
        self.lock().final_file_status = Some(status);
    }

    pub fn insert_assistant(&self, name: &str) {
        self.lock()
            .assistants
            .insert(name.to_string(), info(name, AssistantStatus::Ready));
    }

    pub fn has_assistant(&self, name: &str) -> bool {
        self.lock().assistants.contains_key(name)
    }

    /// Every call made so far, as `"<operation>:<assistant>"`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn last_chat_message(&self) -> Option<String> {
        self.lock().last_message.clone()
    }

    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }
}

fn info(name: &str, status: AssistantStatus) -> AssistantInfo {
    AssistantInfo {
        name: name.to_string(),
        status,
        host: None,
        created_on: None,
        updated_on: None,
    }
}

#[async_trait]
impl AssistantService for FakeAssistant {
    async fn create_assistant(&self, name: &str, _instructions: &str) -> PortResult<AssistantInfo> {
        let mut state = self.lock();
        state.calls.push(format!("create:{name}"));
        if let Some(err) = state.create_error.take() {
            return Err(err);
        }
        if state.assistants.contains_key(name) {
            return Err(PortError::AlreadyExists(name.to_string()));
        }
        let created = info(name, AssistantStatus::Initializing);
        state.assistants.insert(name.to_string(), created.clone());
        Ok(created)
    }

    async fn describe_assistant(&self, name: &str) -> PortResult<AssistantInfo> {
        let mut state = self.lock();
        state.calls.push(format!("describe:{name}"));
        let gone = match state.terminating.get_mut(name) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                false
            }
            Some(_) => true,
            None => false,
        };
        if gone {
            state.terminating.remove(name);
            state.assistants.remove(name);
        }
        let terminating = state.terminating.contains_key(name);
        let assistant = state
            .assistants
            .get_mut(name)
            .ok_or_else(|| PortError::NotFound(name.to_string()))?;
        // Initialization finishes by the first time anyone looks.
        if !terminating {
            assistant.status = AssistantStatus::Ready;
        }
        Ok(assistant.clone())
    }

    async fn delete_assistant(&self, name: &str) -> PortResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("delete:{name}"));
        if !state.assistants.contains_key(name) {
            return Err(PortError::NotFound(name.to_string()));
        }
        state.files.clear();
        let polls = state.deletion_polls;
        if polls == 0 {
            state.assistants.remove(name);
        } else {
            if let Some(assistant) = state.assistants.get_mut(name) {
                assistant.status = AssistantStatus::Terminating;
            }
            state.terminating.entry(name.to_string()).or_insert(polls);
        }
        Ok(())
    }

    async fn list_assistants(&self) -> PortResult<Vec<AssistantInfo>> {
        let mut state = self.lock();
        state.calls.push("list".to_string());
        let mut all: Vec<_> = state.assistants.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn upload_file(
        &self,
        assistant: &str,
        path: &Path,
        display_name: &str,
    ) -> PortResult<RemoteFile> {
        let delay = {
            let mut state = self.lock();
            state.calls.push(format!("upload:{assistant}"));
            state.upload_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if !path.exists() {
            return Err(PortError::Unexpected(format!(
                "{} does not exist",
                path.display()
            )));
        }

        let mut state = self.lock();
        state.calls.push(format!("uploaded:{assistant}"));
        if let Some(err) = state.upload_error.take() {
            return Err(err);
        }
        if !state.assistants.contains_key(assistant) {
            return Err(PortError::NotFound(assistant.to_string()));
        }
        state.next_file += 1;
        let file = RemoteFile {
            id: format!("file-{}", state.next_file),
            name: display_name.to_string(),
            status: FileStatus::Processing,
            error_message: None,
            percent_done: Some(0.0),
        };
        let polls = state.processing_polls;
        state.files.insert(file.id.clone(), (file.clone(), polls));
        Ok(file)
    }

    async fn describe_file(&self, assistant: &str, file_id: &str) -> PortResult<RemoteFile> {
        let mut state = self.lock();
        state.calls.push(format!("describe_file:{assistant}"));
        let final_status = state
            .final_file_status
            .clone()
            .unwrap_or(FileStatus::Available);
        let (file, remaining) = state
            .files
            .get_mut(file_id)
            .ok_or_else(|| PortError::NotFound(file_id.to_string()))?;
        if *remaining > 0 {
            *remaining -= 1;
        } else {
            file.status = final_status;
            file.percent_done = Some(1.0);
            if file.status == FileStatus::ProcessingFailed {
                file.error_message = Some("could not extract text".to_string());
            }
        }
        Ok(file.clone())
    }

    async fn chat(&self, assistant: &str, message: &str) -> PortResult<String> {
        let mut state = self.lock();
        state.calls.push(format!("chat:{assistant}"));
        state.last_message = Some(message.to_string());
        if let Some(err) = state.chat_error.clone() {
            return Err(err);
        }
        if !state.assistants.contains_key(assistant) {
            return Err(PortError::NotFound(assistant.to_string()));
        }
        Ok(state.chat_reply.clone())
    }
}
