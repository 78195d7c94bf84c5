//! crates/study_assistant_core/src/assistant.rs
//!
//! Lifecycle of the single named remote assistant, plus the two generation calls.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::domain::{AssistantInfo, AssistantStatus, GenerationRequest, RemoteFile};
use crate::error::{StudyError, StudyResult};
use crate::ports::{AssistantService, PortError};
use crate::prompts;

/// The name every upload is indexed under unless configured otherwise.
pub const DEFAULT_ASSISTANT_NAME: &str = "pdf-assistant";

#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub name: String,
    pub instructions: String,
    /// How long a freshly created assistant may stay `Initializing`.
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_ASSISTANT_NAME.to_string(),
            instructions: prompts::ASSISTANT_INSTRUCTIONS.to_string(),
            ready_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Owns the remote assistant resource and talks to it on behalf of the rest of the core.
pub struct AssistantManager {
    service: Arc<dyn AssistantService>,
    settings: AssistantSettings,
}

impl AssistantManager {
    pub fn new(service: Arc<dyn AssistantService>, settings: AssistantSettings) -> Self {
        Self { service, settings }
    }

    /// The configured resource name.
    pub fn resource_name(&self) -> &str {
        &self.settings.name
    }

    pub fn poll_interval(&self) -> Duration {
        self.settings.poll_interval
    }

    /// Creates the assistant, or fetches it if one with this name already exists.
    ///
    /// Only `PortError::AlreadyExists` selects the fetch path; every other failure,
    /// including a dropped connection during creation, is returned to the caller. An
    /// existing assistant that is still `Terminating` is waited out and created again.
    pub async fn ensure_resource(&self, name: &str) -> StudyResult<AssistantInfo> {
        let deadline = Instant::now() + self.settings.ready_timeout;
        loop {
            let assistant = match self
                .service
                .create_assistant(name, &self.settings.instructions)
                .await
            {
                Ok(created) => {
                    info!(assistant = name, "Created assistant");
                    created
                }
                Err(PortError::AlreadyExists(_)) => {
                    match self.service.describe_assistant(name).await {
                        Ok(existing) => existing,
                        // Gone between the create and the describe.
                        Err(PortError::NotFound(_)) if Instant::now() < deadline => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => {
                    error!(assistant = name, "Failed to create assistant: {}", e);
                    return Err(e.into());
                }
            };

            if assistant.status == AssistantStatus::Terminating {
                info!(assistant = name, "Assistant is still being deleted, waiting to recreate it");
                self.wait_until_gone(name, deadline).await?;
                continue;
            }

            info!(assistant = name, status = assistant.status.as_str(), "Using assistant");
            return self.wait_until_ready(assistant, deadline).await;
        }
    }

    async fn wait_until_ready(
        &self,
        mut assistant: AssistantInfo,
        deadline: Instant,
    ) -> StudyResult<AssistantInfo> {
        loop {
            match assistant.status {
                AssistantStatus::Ready => return Ok(assistant),
                AssistantStatus::Failed | AssistantStatus::Terminating => {
                    return Err(StudyError::AssistantNotReady {
                        name: assistant.name,
                        reason: format!("status is {}", assistant.status.as_str()),
                    });
                }
                _ => {}
            }
            if Instant::now() >= deadline {
                return Err(StudyError::AssistantNotReady {
                    name: assistant.name,
                    reason: format!(
                        "still {} after {:?}",
                        assistant.status.as_str(),
                        self.settings.ready_timeout
                    ),
                });
            }
            tokio::time::sleep(self.settings.poll_interval).await;
            assistant = self.service.describe_assistant(&assistant.name).await?;
        }
    }

    /// Polls until the remote side no longer knows the assistant.
    async fn wait_until_gone(&self, name: &str, deadline: Instant) -> StudyResult<()> {
        loop {
            let assistant = match self.service.describe_assistant(name).await {
                Ok(assistant) => assistant,
                Err(PortError::NotFound(_)) => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            if Instant::now() >= deadline {
                return Err(StudyError::AssistantNotReady {
                    name: name.to_string(),
                    reason: format!(
                        "still {} after {:?}",
                        assistant.status.as_str(),
                        self.settings.ready_timeout
                    ),
                });
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Deletes the assistant and waits until it is gone. A missing assistant is logged and
    /// treated as success.
    pub async fn delete_resource(&self, name: &str) -> StudyResult<()> {
        match self.service.delete_assistant(name).await {
            Ok(()) => {
                info!(assistant = name, "Deleting assistant");
                self.wait_until_gone(name, Instant::now() + self.settings.ready_timeout)
                    .await?;
                info!(assistant = name, "Deleted assistant");
                Ok(())
            }
            Err(PortError::NotFound(_)) => {
                warn!(assistant = name, "Assistant to delete does not exist");
                Ok(())
            }
            Err(e) => {
                error!(assistant = name, "Failed to delete assistant: {}", e);
                Err(e.into())
            }
        }
    }

    pub async fn list_resources(&self) -> StudyResult<Vec<AssistantInfo>> {
        Ok(self.service.list_assistants().await?)
    }

    pub async fn upload_file(
        &self,
        resource: &AssistantInfo,
        path: &Path,
        display_name: &str,
    ) -> StudyResult<RemoteFile> {
        Ok(self
            .service
            .upload_file(&resource.name, path, display_name)
            .await?)
    }

    pub async fn file_status(&self, resource: &AssistantInfo, file_id: &str) -> StudyResult<RemoteFile> {
        Ok(self.service.describe_file(&resource.name, file_id).await?)
    }

    /// Sends the prompt for `request` and returns the reply exactly as received.
    pub async fn generate(
        &self,
        resource: &AssistantInfo,
        request: GenerationRequest,
    ) -> StudyResult<String> {
        let prompt = prompts::render(request);
        info!(assistant = %resource.name, ?request, "Requesting generation");

        let reply = self
            .service
            .chat(&resource.name, &prompt)
            .await
            .map_err(|e| {
                error!(assistant = %resource.name, ?request, "Generation failed: {}", e);
                StudyError::from(e)
            })?;

        info!(assistant = %resource.name, chars = reply.len(), "Generation finished");
        Ok(reply)
    }
}
