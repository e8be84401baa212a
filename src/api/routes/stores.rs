use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, AppState, CurrentSession};
use crate::domain::FileSearchStore;

#[derive(Debug, Serialize)]
pub struct StoreResponse {
    pub name: String,
    pub display_name: String,
    pub active_documents_count: u64,
    pub pending_documents_count: u64,
    pub failed_documents_count: u64,
    pub size_bytes: u64,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    pub selected: bool,
}

impl StoreResponse {
    fn new(store: FileSearchStore, selected: Option<&str>) -> Self {
        Self {
            selected: selected == Some(store.name.as_str()),
            name: store.name,
            display_name: store.display_name,
            active_documents_count: store.active_documents_count,
            pending_documents_count: store.pending_documents_count,
            failed_documents_count: store.failed_documents_count,
            size_bytes: store.size_bytes,
            create_time: store.create_time,
            update_time: store.update_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StoreListResponse {
    pub count: usize,
    pub stores: Vec<StoreResponse>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
    pub display_name: String,
}

async fn store_list(state: &AppState, selected: Option<&str>) -> Result<StoreListResponse, ApiError> {
    let stores = state.catalog.list_stores().await?;
    Ok(StoreListResponse {
        count: stores.len(),
        stores: stores
            .into_iter()
            .map(|s| StoreResponse::new(s, selected))
            .collect(),
    })
}

pub async fn list_stores(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<StoreListResponse>, ApiError> {
    let selected = current.session.lock().await.selected_store().map(str::to_string);
    Ok(Json(store_list(&state, selected.as_deref()).await?))
}

pub async fn refresh_stores(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<StoreListResponse>, ApiError> {
    let mut session = current.session.lock().await;
    state.catalog.refresh(&mut session);
    let selected = session.selected_store().map(str::to_string);
    drop(session);

    Ok(Json(store_list(&state, selected.as_deref()).await?))
}

pub async fn create_store(
    State(state): State<AppState>,
    Json(request): Json<CreateStoreRequest>,
) -> Result<(StatusCode, Json<StoreResponse>), ApiError> {
    let store = state.catalog.create_store(&request.display_name).await?;
    Ok((StatusCode::CREATED, Json(StoreResponse::new(store, None))))
}
