use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::wire::{
    CreateStoreRequest, GenerateContentRequest, GenerateContentResponse, ListDocumentsResponse,
    ListStoresResponse, OperationWire, StoreWire, UploadMetadata,
};
use crate::domain::{
    ports::{FileSearchApi, UploadRequest},
    ChatMessage, DocumentPage, DomainError, FileSearchStore, UploadOperation,
};
use crate::infrastructure::config::GeminiConfig;

const API_VERSION: &str = "v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
const STORE_PAGE_SIZE: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GeminiError> for DomainError {
    fn from(e: GeminiError) -> Self {
        match e {
            GeminiError::Api { status: 404, .. } => DomainError::not_found(e.to_string()),
            GeminiError::Http(ref inner) if inner.is_timeout() => {
                DomainError::timeout(e.to_string())
            }
            other => DomainError::external(other.to_string()),
        }
    }
}

/// REST client for Gemini file search stores.
pub struct GeminiFileSearch {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiFileSearch {
    pub fn new(api_key: impl Into<String>, config: &GeminiConfig) -> Result<Self, DomainError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(GeminiError::from)?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_VERSION, path)
    }

    fn upload_url(&self, store: &str) -> String {
        format!(
            "{}/upload/{}/{}:uploadToFileSearchStore",
            self.base_url, API_VERSION, store
        )
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GeminiError> {
        let resp = check(request.header(API_KEY_HEADER, &self.api_key).send().await?).await?;
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| GeminiError::Parse(e.to_string()))
    }

    async fn list_store_page(
        &self,
        page_token: Option<&str>,
    ) -> Result<ListStoresResponse, GeminiError> {
        let mut query = vec![("pageSize", STORE_PAGE_SIZE.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        self.send(self.http.get(self.url("fileSearchStores")).query(&query))
            .await
    }

    async fn upload(&self, request: UploadRequest<'_>) -> Result<OperationWire, GeminiError> {
        let bytes = tokio::fs::read(request.path).await?;

        let start = self
            .http
            .post(self.upload_url(request.store))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", request.mime_type)
            .json(&UploadMetadata {
                display_name: request.display_name,
                mime_type: request.mime_type,
            })
            .send()
            .await?;
        let start = check(start).await?;

        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| GeminiError::Parse("upload session URL missing".into()))?;

        let size = bytes.len();
        self.send(
            self.http
                .post(session_url)
                .header("X-Goog-Upload-Command", "upload, finalize")
                .header("X-Goog-Upload-Offset", "0")
                .header(reqwest::header::CONTENT_LENGTH, size.to_string())
                .body(bytes),
        )
        .await
    }
}

async fn check(resp: Response) -> Result<Response, GeminiError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    Err(GeminiError::Api { status, message })
}

#[async_trait]
impl FileSearchApi for GeminiFileSearch {
    async fn list_stores(&self) -> Result<Vec<FileSearchStore>, DomainError> {
        let mut stores = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.list_store_page(token.as_deref()).await?;
            stores.extend(page.file_search_stores.into_iter().map(FileSearchStore::from));
            match page.next_page_token {
                Some(next) if !next.is_empty() && Some(&next) != token.as_ref() => {
                    token = Some(next)
                }
                _ => break,
            }
        }
        tracing::debug!(count = stores.len(), "listed stores");
        Ok(stores)
    }

    async fn create_store(&self, display_name: &str) -> Result<FileSearchStore, DomainError> {
        let store: StoreWire = self
            .send(
                self.http
                    .post(self.url("fileSearchStores"))
                    .json(&CreateStoreRequest { display_name }),
            )
            .await?;
        Ok(store.into())
    }

    async fn list_documents(
        &self,
        store: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<DocumentPage, DomainError> {
        let mut query = vec![("pageSize", page_size.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        let page: ListDocumentsResponse = self
            .send(
                self.http
                    .get(self.url(&format!("{store}/documents")))
                    .query(&query),
            )
            .await?;

        Ok(DocumentPage::new(
            page.documents.into_iter().map(Into::into).collect(),
            page.next_page_token,
        ))
    }

    async fn upload_document(
        &self,
        request: UploadRequest<'_>,
    ) -> Result<UploadOperation, DomainError> {
        let operation = self.upload(request).await?;
        Ok(operation.into())
    }

    async fn get_operation(&self, name: &str) -> Result<UploadOperation, DomainError> {
        let operation: OperationWire = self.send(self.http.get(self.url(name))).await?;
        Ok(operation.into())
    }

    async fn delete_document(&self, name: &str, force: bool) -> Result<(), DomainError> {
        let resp = self
            .http
            .delete(self.url(name))
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("force", force.to_string())])
            .send()
            .await
            .map_err(GeminiError::from)?;
        check(resp).await?;
        Ok(())
    }

    async fn generate_content(
        &self,
        store: &str,
        contents: &[ChatMessage],
    ) -> Result<String, DomainError> {
        let body = GenerateContentRequest::bound_to(store, contents);
        let response: GenerateContentResponse = self
            .send(
                self.http
                    .post(self.url(&format!("models/{}:generateContent", self.model)))
                    .json(&body),
            )
            .await?;

        response
            .text()
            .ok_or_else(|| DomainError::external("model returned no text"))
    }
}
