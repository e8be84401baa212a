use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    ports::{FileSearchApi, UploadRequest},
    ChatMessage, ChatRole, DocumentPage, DomainError, FileSearchStore, OperationError,
    StoreDocument, UploadOperation,
};

/// Number of calls made per remote operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_stores: usize,
    pub create_store: usize,
    pub list_documents: usize,
    pub upload_document: usize,
    pub get_operation: usize,
    pub delete_document: usize,
    pub generate_content: usize,
}

#[derive(Default)]
struct State {
    stores: Vec<FileSearchStore>,
    documents: HashMap<String, Vec<StoreDocument>>,
    operations: HashMap<String, PendingOperation>,
    calls: CallCounts,
    failures: HashSet<&'static str>,
    last_contents: Vec<ChatMessage>,
    last_upload_suffix: Option<String>,
    operation_polls: u32,
    operation_error: Option<OperationError>,
    echo_last_token: bool,
}

struct PendingOperation {
    remaining_polls: u32,
    document: StoreDocument,
}

/// Process-local file search backend.
///
/// Used for offline runs (`backend: memory`) and as the test double: it counts
/// calls, can fail the next call of a given operation, and can reproduce the
/// vendor pager echoing the requested token on the last page.
pub struct InMemoryFileSearch {
    state: RwLock<State>,
}

impl InMemoryFileSearch {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                operation_polls: 1,
                ..State::default()
            }),
        }
    }

    pub fn seed_store(&self, name: &str, display_name: &str) {
        if let Ok(mut state) = self.state.write() {
            state.stores.push(FileSearchStore::new(name, display_name));
            state.documents.entry(name.to_string()).or_default();
        }
    }

    pub fn seed_document(&self, store: &str, display_name: &str, size_bytes: u64) {
        let document = StoreDocument::new(store, &short_id(), display_name, size_bytes);
        if let Ok(mut state) = self.state.write() {
            state
                .documents
                .entry(store.to_string())
                .or_default()
                .push(document);
            refresh_counts(&mut state, store);
        }
    }

    /// Polls an operation needs before it reports `done`.
    pub fn set_operation_polls(&self, polls: u32) {
        if let Ok(mut state) = self.state.write() {
            state.operation_polls = polls;
        }
    }

    /// Makes imports finish with this error status instead of adding the
    /// document. `None` restores normal imports.
    pub fn set_operation_error(&self, error: Option<OperationError>) {
        if let Ok(mut state) = self.state.write() {
            state.operation_error = error;
        }
    }

    pub fn set_echo_last_token(&self, echo: bool) {
        if let Ok(mut state) = self.state.write() {
            state.echo_last_token = echo;
        }
    }

    /// Makes the next call of `operation` fail with an external error.
    pub fn fail_next(&self, operation: &'static str) {
        if let Ok(mut state) = self.state.write() {
            state.failures.insert(operation);
        }
    }

    pub fn calls(&self) -> CallCounts {
        self.state.read().map(|s| s.calls).unwrap_or_default()
    }

    pub fn document_count(&self, store: &str) -> usize {
        self.state
            .read()
            .map(|s| s.documents.get(store).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn last_contents(&self) -> Vec<ChatMessage> {
        self.state
            .read()
            .map(|s| s.last_contents.clone())
            .unwrap_or_default()
    }

    pub fn last_upload_suffix(&self) -> Option<String> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.last_upload_suffix.clone())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, DomainError> {
        self.state
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))
    }
}

impl Default for InMemoryFileSearch {
    fn default() -> Self {
        Self::new()
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn refresh_counts(state: &mut State, store: &str) {
    let (count, size) = state
        .documents
        .get(store)
        .map(|docs| (docs.len() as u64, docs.iter().map(|d| d.size_bytes).sum()))
        .unwrap_or((0, 0));
    if let Some(s) = state.stores.iter_mut().find(|s| s.name == store) {
        s.active_documents_count = count;
        s.size_bytes = size;
        s.update_time = Some(chrono::Utc::now());
    }
}

/// Counts the call and consumes an injected failure, if any.
fn begin(state: &mut State, operation: &'static str) -> Result<(), DomainError> {
    let calls = &mut state.calls;
    match operation {
        "list_stores" => calls.list_stores += 1,
        "create_store" => calls.create_store += 1,
        "list_documents" => calls.list_documents += 1,
        "upload_document" => calls.upload_document += 1,
        "get_operation" => calls.get_operation += 1,
        "delete_document" => calls.delete_document += 1,
        "generate_content" => calls.generate_content += 1,
        _ => {}
    }
    if state.failures.remove(operation) {
        return Err(DomainError::external(format!("{operation} failed")));
    }
    Ok(())
}

#[async_trait]
impl FileSearchApi for InMemoryFileSearch {
    async fn list_stores(&self) -> Result<Vec<FileSearchStore>, DomainError> {
        let mut state = self.write()?;
        begin(&mut state, "list_stores")?;
        Ok(state.stores.clone())
    }

    async fn create_store(&self, display_name: &str) -> Result<FileSearchStore, DomainError> {
        let mut state = self.write()?;
        begin(&mut state, "create_store")?;
        let store = FileSearchStore::new(format!("fileSearchStores/{}", short_id()), display_name);
        state.documents.insert(store.name.clone(), Vec::new());
        state.stores.push(store.clone());
        Ok(store)
    }

    async fn list_documents(
        &self,
        store: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<DocumentPage, DomainError> {
        let mut state = self.write()?;
        begin(&mut state, "list_documents")?;

        let documents = state
            .documents
            .get(store)
            .ok_or_else(|| DomainError::not_found(format!("store {store}")))?;
        let offset = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| DomainError::validation(format!("invalid page token {token}")))?,
            None => 0,
        };
        let end = (offset + page_size.max(1) as usize).min(documents.len());
        let page = documents.get(offset..end).unwrap_or_default().to_vec();

        let next_page_token = if end < documents.len() {
            Some(end.to_string())
        } else if state.echo_last_token {
            page_token.map(str::to_string)
        } else {
            None
        };

        Ok(DocumentPage::new(page, next_page_token))
    }

    async fn upload_document(
        &self,
        request: UploadRequest<'_>,
    ) -> Result<UploadOperation, DomainError> {
        {
            let mut state = self.write()?;
            begin(&mut state, "upload_document")?;
        }

        let bytes = tokio::fs::read(request.path)
            .await
            .map_err(|e| DomainError::external(format!("cannot read upload: {e}")))?;

        let mut state = self.write()?;
        if !state.documents.contains_key(request.store) {
            return Err(DomainError::not_found(format!("store {}", request.store)));
        }
        state.last_upload_suffix = request
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_string);

        let document = StoreDocument::new(
            request.store,
            &short_id(),
            request.display_name,
            bytes.len() as u64,
        )
        .with_mime_type(request.mime_type);
        let name = format!("{}/upload/operations/{}", request.store, short_id());
        let remaining_polls = state.operation_polls;
        state.operations.insert(
            name.clone(),
            PendingOperation {
                remaining_polls,
                document,
            },
        );

        Ok(UploadOperation::pending(name))
    }

    async fn get_operation(&self, name: &str) -> Result<UploadOperation, DomainError> {
        let mut state = self.write()?;
        begin(&mut state, "get_operation")?;

        let pending = state
            .operations
            .get_mut(name)
            .ok_or_else(|| DomainError::not_found(format!("operation {name}")))?;
        pending.remaining_polls = pending.remaining_polls.saturating_sub(1);
        if pending.remaining_polls > 0 {
            return Ok(UploadOperation::pending(name));
        }

        let Some(PendingOperation { document, .. }) = state.operations.remove(name) else {
            return Err(DomainError::internal("operation vanished"));
        };
        if let Some(error) = state.operation_error.clone() {
            return Ok(UploadOperation::failed(name, error));
        }
        let store = document.store_name().unwrap_or_default().to_string();
        let document_name = document.name.clone();
        state.documents.entry(store.clone()).or_default().push(document);
        refresh_counts(&mut state, &store);

        Ok(UploadOperation::completed(name, document_name))
    }

    async fn delete_document(&self, name: &str, _force: bool) -> Result<(), DomainError> {
        let mut state = self.write()?;
        begin(&mut state, "delete_document")?;

        let store = name
            .find("/documents/")
            .map(|idx| name[..idx].to_string())
            .ok_or_else(|| DomainError::validation(format!("invalid document name {name}")))?;
        let documents = state
            .documents
            .get_mut(&store)
            .ok_or_else(|| DomainError::not_found(format!("store {store}")))?;
        let before = documents.len();
        documents.retain(|d| d.name != name);
        if documents.len() == before {
            return Err(DomainError::not_found(format!("document {name}")));
        }
        refresh_counts(&mut state, &store);
        Ok(())
    }

    async fn generate_content(
        &self,
        store: &str,
        contents: &[ChatMessage],
    ) -> Result<String, DomainError> {
        let mut state = self.write()?;
        begin(&mut state, "generate_content")?;
        state.last_contents = contents.to_vec();

        let question = contents
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.text.as_str())
            .unwrap_or_default();
        let titles = state
            .documents
            .get(store)
            .map(|docs| {
                docs.iter()
                    .map(|d| d.display_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        Ok(if titles.is_empty() {
            format!("No documents in {store} match \"{question}\".")
        } else {
            format!("Answer to \"{question}\" based on: {titles}")
        })
    }
}
