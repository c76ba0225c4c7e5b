use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{require_auth, session_middleware};
use crate::error::endpoint_not_found;
use crate::handlers::{
    authenticated_user, create_note, delete_note, get_note, health_check, list_notes, login,
    logout, signup, update_note,
};
use crate::state::ServerState;

/// Limit request body size for every JSON endpoint
const MAX_API_BODY_SIZE: usize = 1024 * 1024;

/// Routes plus session handling. Everything the API does is reachable
/// through this router; [`build_app`] only adds transport concerns.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/users/signup", post(signup))
        .route("/api/users/login", post(login))
        .route("/api/users/logout", post(logout));

    let protected_routes = Router::new()
        .route("/api/users", get(authenticated_user))
        .route("/api/notes", get(list_notes).post(create_note))
        .route(
            "/api/notes/{note_id}",
            get(get_note).patch(update_note).delete(delete_note),
        )
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(endpoint_not_found)
        .method_not_allowed_fallback(endpoint_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .with_state(state)
}

/// Full application: the router wrapped in request tracing, CORS and the
/// body size limit.
pub fn build_app(state: Arc<ServerState>) -> Router {
    let cors_origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(cors_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    build_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_API_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
