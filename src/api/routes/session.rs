use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{ApiError, AppState, CurrentSession};
use crate::application::Session;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub selected_store: Option<String>,
    pub page_index: usize,
    pub chat_turns: usize,
    pub uploads_processed: usize,
    pub last_answer: Option<String>,
}

impl SessionResponse {
    fn new(id: Uuid, session: &Session) -> Self {
        let store = session.selected_store();
        Self {
            session_id: id,
            selected_store: store.map(str::to_string),
            page_index: store
                .and_then(|s| session.cursor(s))
                .map_or(0, |c| c.current_index()),
            chat_turns: store
                .and_then(|s| session.chat(s))
                .map_or(0, |h| h.len()),
            uploads_processed: session.uploads().len(),
            last_answer: session.last_answer().map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectStoreRequest {
    pub name: Option<String>,
}

pub async fn get_session(current: CurrentSession) -> Json<SessionResponse> {
    let session = current.session.lock().await;
    Json(SessionResponse::new(current.id.0, &session))
}

/// Selects a single store (or clears the selection with `name: null`).
pub async fn select_store(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(request): Json<SelectStoreRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let mut session = current.session.lock().await;
    match request.name {
        Some(name) => {
            let store = state.catalog.find_store(&name).await?;
            tracing::info!(store = %store.name, "store selected");
            session.select_store(store.name);
        }
        None => session.clear_selection(),
    }
    Ok(Json(SessionResponse::new(current.id.0, &session)))
}

/// Drops the caller's session together with its chat histories and cursors.
pub async fn end_session(State(state): State<AppState>, current: CurrentSession) -> StatusCode {
    if state.sessions.remove(&current.id.0) {
        tracing::info!(session_id = %current.id.0, "session ended");
    }
    StatusCode::NO_CONTENT
}
