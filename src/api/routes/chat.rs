use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, AppState, CurrentSession};
use crate::domain::ChatMessage;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub store: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub turns: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub store: String,
    pub messages: Vec<ChatMessage>,
}

pub async fn query(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let mut session = current.session.lock().await;
    let store = session.require_store()?;
    let answer = state
        .chat
        .query(&mut session, &store, &request.prompt)
        .await?;
    Ok(Json(QueryResponse { store, answer }))
}

pub async fn chat_handler(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let mut session = current.session.lock().await;
    let store = session.require_store()?;
    let reply = state
        .chat
        .ask(&mut session, &store, &request.message)
        .await?;
    let turns = session.chat(&store).map_or(0, |h| h.len());
    Ok(Json(ChatResponse { reply, turns }))
}

pub async fn chat_history(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = current.session.lock().await;
    let store = session.require_store()?;
    let messages = state.chat.history(&session, &store);
    Ok(Json(HistoryResponse { store, messages }))
}

pub async fn reset_chat(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<StatusCode, ApiError> {
    let mut session = current.session.lock().await;
    let store = session.require_store()?;
    state.chat.reset(&mut session, &store);
    Ok(StatusCode::NO_CONTENT)
}
