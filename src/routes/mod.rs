//! Router assembly: HTTP endpoints, static files, CORS, body limit, and HTTP
//! tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - auth, upload, quiz, flashcards, and download endpoints
/// - Static SPA from `./static` with index fallback
/// - Upload body limit from the env-driven policy
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    let max_upload_bytes = state.uploads.max_bytes;

    Router::new()
        .route("/health", get(http::http_health))
        // Auth
        .route("/signup", post(http::http_signup))
        .route("/login", post(http::http_login))
        .route("/logout", post(http::http_logout))
        .route("/me", get(http::http_me))
        // Quiz history
        .route("/api/quiz", get(http::http_api_quiz))
        .route("/dashboard", get(http::http_dashboard))
        // Generation and attempts
        .route("/generate_quiz", post(http::http_generate_quiz))
        .route("/save_quiz", post(http::http_save_quiz))
        .route("/leaderboard", get(http::http_leaderboard))
        .route("/explain_answer", post(http::http_explain_answer))
        .route("/batch_explanations", post(http::http_batch_explanations))
        .route("/save_attempt", post(http::http_save_attempt))
        // Upload & exports
        .route("/upload", post(http::http_upload))
        .route("/download_summary/:quiz_id", get(http::http_download_summary))
        .route("/download_quiz/:quiz_id", get(http::http_download_quiz))
        // Flashcards
        .route("/generate_flashcards", post(http::http_generate_flashcards))
        // State + limits + CORS + HTTP tracing
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
