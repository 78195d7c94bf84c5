//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the study endpoints (upload, notes, quizzes and the
//! assistant administration passthroughs) and the master definition for the OpenAPI
//! specification.

use crate::web::{auth, state::AppState};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_assistant_core::{
    AssistantInfo, Difficulty, Generation, Question, QuizResponse, StudyError,
};
use tracing::{error, info, warn};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        root_handler,
        upload_pdf_handler,
        generate_notes_handler,
        generate_mcq_handler,
        create_assistant_handler,
        delete_assistant_handler,
        list_assistants_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
    ),
    components(
        schemas(
            StatusResponse,
            UploadResponse,
            NotesResponse,
            NotReadyResponse,
            McqRequest,
            McqResponse,
            QuizDto,
            QuestionDto,
            MessageResponse,
            AssistantSummary,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::TokenResponse,
            auth::MeResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "study", description = "Upload a PDF, then generate notes and quizzes from it."),
        (name = "admin", description = "Manage the remote assistant resource."),
        (name = "auth", description = "Account registration and bearer tokens.")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub pdf_uploaded: bool,
}

/// The response payload sent after a PDF has been stored and indexed.
#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    /// Where the server stored the upload.
    pub file_path: String,
    /// The filename the client sent.
    pub file_name: String,
    /// The remote assistant's identifier for the indexed file.
    pub file_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct NotesResponse {
    pub notes: String,
}

/// Returned with 200 when generation is requested before any document is indexed.
#[derive(Serialize, ToSchema)]
pub struct NotReadyResponse {
    pub message: String,
    pub ready: bool,
}

impl NotReadyResponse {
    fn new() -> Self {
        Self {
            message: "No PDF has been uploaded yet. Please upload a PDF first.".to_string(),
            ready: false,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct McqRequest {
    #[schema(value_type = String, example = "medium")]
    pub difficulty_level: Difficulty,
}

#[derive(Serialize, ToSchema)]
pub struct QuestionDto {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub explanation: String,
}

impl From<Question> for QuestionDto {
    fn from(q: Question) -> Self {
        Self {
            question: q.question,
            options: q.options,
            answer: q.answer,
            explanation: q.explanation,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuizDto {
    pub questions: Vec<QuestionDto>,
}

impl From<QuizResponse> for QuizDto {
    fn from(quiz: QuizResponse) -> Self {
        Self {
            questions: quiz.questions.into_iter().map(QuestionDto::from).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct McqResponse {
    pub mcq: QuizDto,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct AssistantSummary {
    pub name: String,
    pub status: String,
    pub host: Option<String>,
    pub created_on: Option<String>,
    pub updated_on: Option<String>,
}

impl From<AssistantInfo> for AssistantSummary {
    fn from(info: AssistantInfo) -> Self {
        Self {
            status: info.status.as_str().to_string(),
            name: info.name,
            host: info.host,
            created_on: info.created_on,
            updated_on: info.updated_on,
        }
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Logs a core error and maps it to the status code and message sent to the client.
pub fn study_error_response(err: StudyError) -> (StatusCode, String) {
    match err {
        StudyError::InvalidFileType(_) => {
            (StatusCode::BAD_REQUEST, "Only PDF files are allowed".to_string())
        }
        StudyError::UploadInterrupted(reason) => {
            warn!("Upload interrupted: {}", reason);
            (StatusCode::BAD_REQUEST, format!("Upload interrupted: {}", reason))
        }
        StudyError::RemoteUnavailable(reason) => {
            warn!("Remote assistant unavailable: {}", reason);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "The assistant service is unavailable, please retry".to_string(),
            )
        }
        StudyError::Remote(e) => {
            error!("Remote assistant error: {}", e);
            (StatusCode::BAD_GATEWAY, format!("Assistant service error: {}", e))
        }
        StudyError::IngestionTimedOut(after) => {
            error!("Ingestion timed out after {:?}", after);
            (
                StatusCode::GATEWAY_TIMEOUT,
                "Upload failed: the document was not indexed in time".to_string(),
            )
        }
        StudyError::IngestionCancelled => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Upload failed: the server is shutting down".to_string(),
        ),
        StudyError::EmptyReply => {
            error!("Assistant returned an empty response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Response formatting error: the assistant returned an empty response".to_string(),
            )
        }
        StudyError::Parse(e) => {
            error!("Failed to parse assistant reply: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Response formatting error: {}", e),
            )
        }
        other => {
            error!("Request failed: {}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Upload failed: {}", other))
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check that also reports whether a document is ready.
#[utoipa::path(
    get,
    path = "/",
    tag = "study",
    responses((status = 200, description = "Server is running", body = StatusResponse))
)]
pub async fn root_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running".to_string(),
        pdf_uploaded: state.study.status().is_ready(),
    })
}

/// Upload a PDF and make it the assistant's only document.
///
/// Accepts a multipart/form-data request with a `file` part. The request returns once
/// the remote assistant has finished indexing the file.
#[utoipa::path(
    post,
    path = "/upload_pdf",
    tag = "study",
    request_body(content_type = "multipart/form-data", description = "The PDF to upload, in a part named `file`."),
    responses(
        (status = 200, description = "PDF stored and indexed", body = UploadResponse),
        (status = 400, description = "Missing file or not a PDF"),
        (status = 503, description = "Remote assistant unavailable"),
        (status = 500, description = "Upload failed")
    )
)]
pub async fn upload_pdf_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, String)> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        if field.name() != Some("file") && field.file_name().is_none() {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();

        let indexed = state
            .study
            .upload(&file_name, field)
            .await
            .map_err(study_error_response)?;

        info!(
            file_name = %file_name,
            file_id = %indexed.file.id,
            assistant = %indexed.assistant.name,
            "PDF uploaded"
        );
        return Ok(Json(UploadResponse {
            message: "PDF uploaded successfully.".to_string(),
            file_path: indexed.document.path.display().to_string(),
            file_name,
            file_id: indexed.file.id,
        }));
    }

    Err((
        StatusCode::BAD_REQUEST,
        "Multipart form must include a file".to_string(),
    ))
}

/// Generate study notes from the uploaded PDF.
#[utoipa::path(
    get,
    path = "/generate_notes",
    tag = "study",
    responses(
        (status = 200, description = "Notes, or a not-ready message when no PDF is indexed", body = NotesResponse),
        (status = 503, description = "Remote assistant unavailable"),
        (status = 500, description = "Generation failed")
    )
)]
pub async fn generate_notes_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Response, (StatusCode, String)> {
    match state.study.generate_notes().await.map_err(study_error_response)? {
        Generation::Ready(notes) => Ok(Json(NotesResponse { notes }).into_response()),
        Generation::NotReady => Ok(Json(NotReadyResponse::new()).into_response()),
    }
}

/// Generate a multiple-choice quiz from the uploaded PDF.
#[utoipa::path(
    post,
    path = "/generate_mcq",
    tag = "study",
    request_body = McqRequest,
    responses(
        (status = 200, description = "Quiz, or a not-ready message when no PDF is indexed", body = McqResponse),
        (status = 422, description = "Unknown difficulty level"),
        (status = 503, description = "Remote assistant unavailable"),
        (status = 500, description = "Empty or malformed assistant reply")
    )
)]
pub async fn generate_mcq_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<McqRequest>,
) -> Result<Response, (StatusCode, String)> {
    match state
        .study
        .generate_quiz(req.difficulty_level)
        .await
        .map_err(study_error_response)?
    {
        Generation::Ready(quiz) => Ok(Json(McqResponse { mcq: quiz.into() }).into_response()),
        Generation::NotReady => Ok(Json(NotReadyResponse::new()).into_response()),
    }
}

/// Create the assistant, or confirm it already exists.
#[utoipa::path(
    get,
    path = "/create_pinecone_assistant",
    tag = "admin",
    responses(
        (status = 200, description = "Assistant exists and is ready", body = MessageResponse),
        (status = 503, description = "Remote assistant unavailable")
    )
)]
pub async fn create_assistant_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    state
        .study
        .ensure_resource()
        .await
        .map_err(study_error_response)?;
    Ok(Json(MessageResponse {
        message: "Pinecone assistant created successfully.".to_string(),
    }))
}

/// Delete the assistant together with any indexed document.
#[utoipa::path(
    get,
    path = "/delete_pinecone_assistant",
    tag = "admin",
    responses(
        (status = 200, description = "Assistant deleted", body = MessageResponse),
        (status = 503, description = "Remote assistant unavailable")
    )
)]
pub async fn delete_assistant_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    state
        .study
        .delete_resource()
        .await
        .map_err(study_error_response)?;
    Ok(Json(MessageResponse {
        message: "Pinecone assistant deleted successfully.".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/assistant_list",
    tag = "admin",
    responses(
        (status = 200, description = "All assistants on the account", body = [AssistantSummary]),
        (status = 503, description = "Remote assistant unavailable")
    )
)]
pub async fn list_assistants_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AssistantSummary>>, (StatusCode, String)> {
    let assistants = state
        .study
        .list_resources()
        .await
        .map_err(study_error_response)?;
    Ok(Json(assistants.into_iter().map(AssistantSummary::from).collect()))
}
