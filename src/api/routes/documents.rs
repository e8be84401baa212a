use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, AppState, CurrentSession};
use crate::application::{DeleteOutcome, Session, UploadFile, UploadOutcome};
use crate::domain::{DocumentPage, DocumentState, StoreDocument};

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub name: String,
    pub display_name: String,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
    pub state: DocumentState,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl From<StoreDocument> for DocumentResponse {
    fn from(doc: StoreDocument) -> Self {
        Self {
            name: doc.name,
            display_name: doc.display_name,
            size_bytes: doc.size_bytes,
            mime_type: doc.mime_type,
            state: doc.state,
            create_time: doc.create_time,
            update_time: doc.update_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub store: String,
    pub page_index: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub documents: Vec<DocumentResponse>,
}

impl PageResponse {
    fn new(store: String, session: &Session, page: DocumentPage) -> Self {
        let cursor = session.cursor(&store);
        Self {
            page_index: cursor.map_or(0, |c| c.current_index()),
            has_previous: cursor.is_some_and(|c| c.has_previous()),
            has_next: page.has_next(),
            documents: page.documents.into_iter().map(Into::into).collect(),
            store,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteDocumentsRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteDocumentsResponse {
    pub deleted: usize,
    pub failed: usize,
    pub outcomes: Vec<DeleteOutcome>,
}

#[derive(Debug, Serialize)]
pub struct UploadDocumentsResponse {
    pub outcomes: Vec<UploadOutcome>,
}

pub async fn current_page(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<PageResponse>, ApiError> {
    let mut session = current.session.lock().await;
    let store = session.require_store()?;
    let page = state.documents.page(&mut session, &store).await?;
    Ok(Json(PageResponse::new(store, &session, page)))
}

pub async fn next_page(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<PageResponse>, ApiError> {
    let mut session = current.session.lock().await;
    let store = session.require_store()?;
    let page = state.documents.next_page(&mut session, &store).await?;
    Ok(Json(PageResponse::new(store, &session, page)))
}

pub async fn previous_page(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<PageResponse>, ApiError> {
    let mut session = current.session.lock().await;
    let store = session.require_store()?;
    let page = state.documents.previous_page(&mut session, &store).await?;
    Ok(Json(PageResponse::new(store, &session, page)))
}

pub async fn delete_documents(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(request): Json<DeleteDocumentsRequest>,
) -> Result<Json<DeleteDocumentsResponse>, ApiError> {
    if request.names.is_empty() {
        return Err(ApiError::bad_request("no documents selected"));
    }

    let mut session = current.session.lock().await;
    let store = session.require_store()?;
    let outcomes = state
        .documents
        .delete(&mut session, &store, &request.names)
        .await;

    let deleted = outcomes.iter().filter(|o| o.deleted).count();
    Ok(Json(DeleteDocumentsResponse {
        deleted,
        failed: outcomes.len() - deleted,
        outcomes,
    }))
}

/// Accepts any number of `multipart/form-data` file fields.
pub async fn upload_documents(
    State(state): State<AppState>,
    current: CurrentSession,
    mut multipart: Multipart,
) -> Result<Json<UploadDocumentsResponse>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        files.push(UploadFile::new(file_name, bytes.to_vec()));
    }
    if files.is_empty() {
        return Err(ApiError::bad_request("no files in request"));
    }

    let mut session = current.session.lock().await;
    let store = session.require_store()?;
    let outcomes = state.uploads.upload_files(&mut session, &store, files).await;

    Ok(Json(UploadDocumentsResponse { outcomes }))
}
