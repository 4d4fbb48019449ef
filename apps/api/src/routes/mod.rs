pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::profile::handlers;
use crate::state::AppState;

/// Room for multipart framing around the avatar bytes.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let avatar_body_limit = state.config.max_avatar_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Profile editing sessions
        .route(
            "/api/v1/profile/sessions",
            post(handlers::handle_open_session),
        )
        .route(
            "/api/v1/profile/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_close_session),
        )
        .route(
            "/api/v1/profile/sessions/:id/fields",
            patch(handlers::handle_set_field),
        )
        .route(
            "/api/v1/profile/sessions/:id/skills",
            post(handlers::handle_add_skill).delete(handlers::handle_remove_skill),
        )
        .route(
            "/api/v1/profile/sessions/:id/avatar",
            put(handlers::handle_set_avatar).layer(DefaultBodyLimit::max(avatar_body_limit)),
        )
        .route(
            "/api/v1/profile/sessions/:id/save",
            post(handlers::handle_save),
        )
        .route(
            "/api/v1/profile/sessions/:id/skip",
            post(handlers::handle_skip),
        )
        // Stored profiles
        .route("/api/v1/profiles/:user_id", get(handlers::handle_get_profile))
        .with_state(state)
}
