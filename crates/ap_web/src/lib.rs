use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod state;

pub use auth::{AuthState, AuthUser, CurrentUser};
pub use error::ApiError;
pub use state::AppState;

/// Base64 media travels inside JSON bodies
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();
    let auth = state.auth.clone();

    Router::new()
        .route("/", get(handlers::index))
        .route("/auth/signin", get(handlers::sign_in))
        .route("/dashboard", get(handlers::dashboard))
        .route("/history", get(handlers::history_page))
        .route("/health", get(handlers::health))
        .route("/api/analyze-conversation", post(handlers::analyze_conversation))
        .route("/api/analyze-image", post(handlers::analyze_image))
        .route("/api/analyze-document", post(handlers::analyze_document))
        .route("/api/analyze-url", post(handlers::analyze_url))
        .route(
            "/api/content-history",
            get(handlers::list_history)
                .post(handlers::save_history)
                .delete(handlers::delete_history),
        )
        .route("/api/content-history/all", delete(handlers::clear_history))
        .layer(middleware::from_fn(guard::page_guard))
        .layer(middleware::from_fn_with_state(auth, auth::identify))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use ap_core::{Error, Result};
    pub use crate::{create_app, AppState, AuthState};
}
