mod catalog;
mod chat;
mod documents;
mod operations;
mod upload;

pub use catalog::{CatalogService, Mutation};
pub use chat::ChatService;
pub use documents::{DeleteOutcome, DocumentService};
pub use operations::{wait_for_operation, PollPolicy};
pub use upload::{UploadFile, UploadOutcome, UploadService};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::application::CatalogService;
    use crate::infrastructure::InMemoryFileSearch;

    pub const STORE: &str = "fileSearchStores/wiki";

    pub fn backend_with_documents(count: usize) -> Arc<InMemoryFileSearch> {
        let backend = Arc::new(InMemoryFileSearch::new());
        backend.seed_store(STORE, "wiki");
        for i in 0..count {
            backend.seed_document(STORE, &format!("doc-{i}.md"), 100 + i as u64);
        }
        backend
    }

    pub fn catalog(backend: &Arc<InMemoryFileSearch>, page_size: u32) -> Arc<CatalogService> {
        Arc::new(CatalogService::new(
            backend.clone(),
            Duration::from_secs(60),
            page_size,
        ))
    }
}
