use std::path::Path;

use async_trait::async_trait;

use crate::domain::{
    errors::DomainError, ChatMessage, DocumentPage, FileSearchStore, UploadOperation,
};

/// Document to import into a store from a local file.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub store: &'a str,
    pub path: &'a Path,
    pub display_name: &'a str,
    pub mime_type: &'a str,
}

#[async_trait]
pub trait FileSearchApi: Send + Sync {
    async fn list_stores(&self) -> Result<Vec<FileSearchStore>, DomainError>;
    async fn create_store(&self, display_name: &str) -> Result<FileSearchStore, DomainError>;
    async fn list_documents(
        &self,
        store: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<DocumentPage, DomainError>;
    async fn upload_document(
        &self,
        request: UploadRequest<'_>,
    ) -> Result<UploadOperation, DomainError>;
    async fn get_operation(&self, name: &str) -> Result<UploadOperation, DomainError>;
    async fn delete_document(&self, name: &str, force: bool) -> Result<(), DomainError>;
    async fn generate_content(
        &self,
        store: &str,
        contents: &[ChatMessage],
    ) -> Result<String, DomainError>;
}
