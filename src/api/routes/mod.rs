pub mod chat;
pub mod documents;
pub mod health;
pub mod session;
pub mod stores;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, Method};
use axum::middleware::from_fn;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::middleware::{request_logger, session_id, SESSION_HEADER};
use crate::api::state::AppState;

/// The vendor rejects files above 100 MB.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.config.cors.allowed_origins);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", api_v1_routes())
        .layer(from_fn(request_logger))
        .layer(from_fn(session_id))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let session = HeaderName::from_static(SESSION_HEADER);
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, session.clone()])
        .expose_headers([session]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/stores",
            get(stores::list_stores).post(stores::create_store),
        )
        .route("/stores/refresh", post(stores::refresh_stores))
        .route(
            "/session",
            get(session::get_session).delete(session::end_session),
        )
        .route("/session/store", put(session::select_store))
        .route(
            "/documents",
            get(documents::current_page).delete(documents::delete_documents),
        )
        .route("/documents/next", post(documents::next_page))
        .route("/documents/previous", post(documents::previous_page))
        .route(
            "/documents/upload",
            post(documents::upload_documents).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/query", post(chat::query))
        .route(
            "/chat",
            get(chat::chat_history)
                .post(chat::chat_handler)
                .delete(chat::reset_chat),
        )
}
