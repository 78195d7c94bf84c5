//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, logout and the current user.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_assistant_core::ports::PortError;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{middleware::bearer_token, state::AppState};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

fn normalize_email(email: &str) -> Result<String, (StatusCode, String)> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err((StatusCode::BAD_REQUEST, "Invalid email address".to_string())),
    }
}

/// Stores a fresh bearer token for `user_id` and returns it.
async fn issue_token(
    state: &AppState,
    user_id: Uuid,
) -> Result<TokenResponse, (StatusCode, String)> {
    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + state.config.token_ttl;

    state
        .db
        .create_auth_session(&token, user_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
        })?;

    Ok(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        expires_at,
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created, token issued", body = TokenResponse),
        (status = 400, description = "Invalid request or email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let email = normalize_email(&req.email)?;
    if req.password.is_empty() || req.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password and name are required".to_string(),
        ));
    }

    // 1. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    // 2. Create user in database
    let user = state
        .db
        .create_user(&email, &password_hash, req.name.trim())
        .await
        .map_err(|e| match e {
            PortError::AlreadyExists(_) => {
                (StatusCode::BAD_REQUEST, "Email already registered".to_string())
            }
            other => {
                error!("Failed to create user: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "User creation failed".to_string())
            }
        })?;

    // 3. Issue a token
    let token = issue_token(&state, user.id).await?;
    info!(user_id = %user.id, "Registered user");

    Ok((StatusCode::CREATED, Json(token)))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Incorrect email or password"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let rejected = || (StatusCode::UNAUTHORIZED, "Incorrect email or password".to_string());
    let email = normalize_email(&req.email).map_err(|_| rejected())?;

    // 1. Get user by email
    let creds = state.db.get_user_by_email(&email).await.map_err(|e| match e {
        PortError::NotFound(_) => rejected(),
        other => {
            error!("Failed to get user: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
        }
    })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| rejected())?;

    // 3. Issue a token
    let token = issue_token(&state, creds.user.id).await?;
    Ok((StatusCode::OK, Json(token)))
}

/// POST /auth/logout - Revoke the presented bearer token
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "No bearer token presented")
    ),
    security(("bearer" = []))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let token = bearer_token(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No bearer token found".to_string()))?;

    state.db.delete_auth_session(token).await.map_err(|e| {
        error!("Failed to delete auth session: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
    })?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - The account that owns the bearer token
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<MeResponse>, (StatusCode, String)> {
    let user = state.db.get_user_by_id(user_id).await.map_err(|e| match e {
        PortError::NotFound(_) => (StatusCode::UNAUTHORIZED, "Could not validate credentials".to_string()),
        other => {
            error!("Failed to load user: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load user".to_string())
        }
    })?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        name: user.name,
    }))
}
