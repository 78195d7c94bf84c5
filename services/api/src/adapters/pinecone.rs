//! services/api/src/adapters/pinecone.rs
//!
//! This module contains the adapter for the Pinecone Assistant REST API.
//! It implements the `AssistantService` port from the `core` crate.
//!
//! Assistant lifecycle calls go to the control plane; file and chat calls go to the
//! assistant data-plane host.

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use study_assistant_core::domain::{AssistantInfo, AssistantStatus, FileStatus, RemoteFile};
use study_assistant_core::ports::{AssistantService, PortError, PortResult};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub control_url: String,
    pub assistant_host: String,
    pub api_version: String,
    pub region: String,
    /// Overall per-request timeout. `None` lets long chat calls run as long as they need.
    pub request_timeout: Option<Duration>,
}

impl PineconeConfig {
    pub fn from_app_config(config: &crate::config::Config) -> Self {
        Self {
            api_key: config.pinecone_api_key.clone(),
            control_url: config.pinecone_control_url.clone(),
            assistant_host: config.pinecone_assistant_host.clone(),
            api_version: config.pinecone_api_version.clone(),
            region: config.assistant_region.clone(),
            request_timeout: config.remote_request_timeout,
        }
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct CreateAssistantRequest<'a> {
    name: &'a str,
    instructions: &'a str,
    region: &'a str,
}

#[derive(Deserialize)]
struct AssistantModel {
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}
impl AssistantModel {
    fn to_domain(self) -> AssistantInfo {
        AssistantInfo {
            name: self.name,
            status: AssistantStatus::parse(self.status.as_deref().unwrap_or("Ready")),
            host: self.host,
            created_on: self.created_at,
            updated_on: self.updated_at,
        }
    }
}

#[derive(Deserialize)]
struct ListAssistantsResponse {
    #[serde(default)]
    assistants: Vec<AssistantModel>,
}

#[derive(Deserialize)]
struct FileModel {
    id: String,
    name: String,
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    percent_done: Option<f64>,
}
impl FileModel {
    fn to_domain(self) -> RemoteFile {
        RemoteFile {
            id: self.id,
            name: self.name,
            status: FileStatus::parse(&self.status),
            error_message: self.error_message,
            percent_done: self.percent_done,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AssistantService` against Pinecone Assistant.
#[derive(Clone)]
pub struct PineconeAssistantAdapter {
    client: Client,
    config: PineconeConfig,
}

impl PineconeAssistantAdapter {
    /// Creates a new `PineconeAssistantAdapter`.
    pub fn new(config: PineconeConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder().connect_timeout(Duration::from_secs(10));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    fn control_url(&self, path: &str) -> String {
        format!("{}{}", self.config.control_url.trim_end_matches('/'), path)
    }

    fn data_url(&self, path: &str) -> String {
        format!("{}{}", self.config.assistant_host.trim_end_matches('/'), path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", &self.config.api_version)
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> PortResult<Response> {
        let response = self
            .authed(request)
            .send()
            .await
            .map_err(|e| transport_error(e, context))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, context, body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> PortResult<T> {
        self.send(request, context)
            .await?
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("{context}: invalid response body: {e}")))
    }
}

fn transport_error(e: reqwest::Error, context: &str) -> PortError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        PortError::Unavailable(format!("{context}: {e}"))
    } else {
        PortError::Unexpected(format!("{context}: {e}"))
    }
}

fn status_error(status: StatusCode, context: &str, body: String) -> PortError {
    let detail = format!("{context}: HTTP {status}: {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            warn!("{}", detail);
            PortError::Unauthorized
        }
        StatusCode::NOT_FOUND => PortError::NotFound(detail),
        StatusCode::CONFLICT => PortError::AlreadyExists(detail),
        StatusCode::TOO_MANY_REQUESTS => PortError::Unavailable(detail),
        s if s.is_server_error() => PortError::Unavailable(detail),
        _ => PortError::Unexpected(detail),
    }
}

//=========================================================================================
// `AssistantService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AssistantService for PineconeAssistantAdapter {
    async fn create_assistant(&self, name: &str, instructions: &str) -> PortResult<AssistantInfo> {
        let body = CreateAssistantRequest {
            name,
            instructions,
            region: &self.config.region,
        };
        let request = self
            .client
            .post(self.control_url("/assistant/assistants"))
            .json(&body);
        let model: AssistantModel = self.send_json(request, "create assistant").await?;
        Ok(model.to_domain())
    }

    async fn describe_assistant(&self, name: &str) -> PortResult<AssistantInfo> {
        let request = self
            .client
            .get(self.control_url(&format!("/assistant/assistants/{name}")));
        let model: AssistantModel = self.send_json(request, "describe assistant").await?;
        Ok(model.to_domain())
    }

    async fn delete_assistant(&self, name: &str) -> PortResult<()> {
        let request = self
            .client
            .delete(self.control_url(&format!("/assistant/assistants/{name}")));
        self.send(request, "delete assistant").await?;
        Ok(())
    }

    async fn list_assistants(&self) -> PortResult<Vec<AssistantInfo>> {
        let request = self.client.get(self.control_url("/assistant/assistants"));
        let list: ListAssistantsResponse = self.send_json(request, "list assistants").await?;
        Ok(list
            .assistants
            .into_iter()
            .map(AssistantModel::to_domain)
            .collect())
    }

    async fn upload_file(
        &self,
        assistant: &str,
        path: &Path,
        display_name: &str,
    ) -> PortResult<RemoteFile> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PortError::Unexpected(format!("could not read {}: {}", path.display(), e))
        })?;
        debug!(assistant, bytes = bytes.len(), "Uploading file");

        let part = multipart::Part::bytes(bytes)
            .file_name(display_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let request = self
            .client
            .post(self.data_url(&format!("/assistant/files/{assistant}")))
            .multipart(form);
        let model: FileModel = self.send_json(request, "upload file").await?;
        Ok(model.to_domain())
    }

    async fn describe_file(&self, assistant: &str, file_id: &str) -> PortResult<RemoteFile> {
        let request = self
            .client
            .get(self.data_url(&format!("/assistant/files/{assistant}/{file_id}")));
        let model: FileModel = self.send_json(request, "describe file").await?;
        Ok(model.to_domain())
    }

    async fn chat(&self, assistant: &str, message: &str) -> PortResult<String> {
        let body = ChatRequest {
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: message.to_string(),
            }],
            stream: false,
        };
        let request = self
            .client
            .post(self.data_url(&format!("/assistant/chat/{assistant}")))
            .json(&body);
        let response: ChatResponse = self.send_json(request, "chat").await?;
        Ok(response.message.content)
    }
}
