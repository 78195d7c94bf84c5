pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use middleware::require_auth;
use state::AppState;

/// Builds the complete API router (without the Swagger UI).
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(rest::root_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    let study_routes = Router::new()
        .route("/upload_pdf", post(rest::upload_pdf_handler))
        .route("/generate_notes", get(rest::generate_notes_handler))
        .route("/generate_mcq", post(rest::generate_mcq_handler))
        .route("/create_pinecone_assistant", get(rest::create_assistant_handler))
        .route("/delete_pinecone_assistant", get(rest::delete_assistant_handler))
        .route("/assistant_list", get(rest::list_assistants_handler));
    let study_routes = if state.config.require_auth_for_study {
        study_routes.layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
    } else {
        study_routes
    };

    let cors = match &state.config.cors_allowed_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.clone())
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]),
        None => CorsLayer::permissive(),
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(study_routes)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}
