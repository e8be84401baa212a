use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::application::{CatalogService, Mutation, Session};
use crate::domain::{ports::FileSearchApi, DocumentPage, DomainError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub name: String,
    pub deleted: bool,
    pub error: Option<String>,
}

impl DeleteOutcome {
    fn deleted(name: &str) -> Self {
        Self {
            name: name.to_string(),
            deleted: true,
            error: None,
        }
    }

    fn failed(name: &str, error: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            deleted: false,
            error: Some(error.to_string()),
        }
    }
}

/// Paged browsing and batch deletion of a store's documents.
pub struct DocumentService {
    api: Arc<dyn FileSearchApi>,
    catalog: Arc<CatalogService>,
}

impl DocumentService {
    pub fn new(api: Arc<dyn FileSearchApi>, catalog: Arc<CatalogService>) -> Self {
        Self { api, catalog }
    }

    /// The page the session's cursor currently points at. A cursor built
    /// before the store's documents last changed is rewound first.
    #[instrument(skip(self, session))]
    pub async fn page(
        &self,
        session: &mut Session,
        store: &str,
    ) -> Result<DocumentPage, DomainError> {
        self.catalog.sync_cursor(session, store);
        let token = session.current_token(store);
        self.catalog.document_page(store, token.as_deref()).await
    }

    #[instrument(skip(self, session))]
    pub async fn next_page(
        &self,
        session: &mut Session,
        store: &str,
    ) -> Result<DocumentPage, DomainError> {
        let current = self.page(session, store).await?;
        session
            .cursor_mut(store)
            .advance(current.next_page_token.as_deref())?;
        self.page(session, store).await
    }

    #[instrument(skip(self, session))]
    pub async fn previous_page(
        &self,
        session: &mut Session,
        store: &str,
    ) -> Result<DocumentPage, DomainError> {
        self.catalog.sync_cursor(session, store);
        session.cursor_mut(store).retreat()?;
        self.page(session, store).await
    }

    /// Force-deletes every named document independently. A failure for one
    /// document does not stop the others; listings are invalidated once.
    #[instrument(skip(self, session, names), fields(count = names.len()))]
    pub async fn delete(
        &self,
        session: &mut Session,
        store: &str,
        names: &[String],
    ) -> Vec<DeleteOutcome> {
        if names.is_empty() {
            return Vec::new();
        }

        let deletion = async {
            let mut outcomes = Vec::with_capacity(names.len());
            for name in names {
                if !belongs_to(name, store) {
                    outcomes.push(DeleteOutcome::failed(
                        name,
                        DomainError::validation(format!("{name} is not a document of {store}")),
                    ));
                    continue;
                }

                match self.api.delete_document(name, true).await {
                    Ok(()) => {
                        tracing::info!(document = %name, "document deleted");
                        outcomes.push(DeleteOutcome::deleted(name));
                    }
                    Err(e) => {
                        tracing::error!(document = %name, error = %e, "failed to delete document");
                        outcomes.push(DeleteOutcome::failed(name, e));
                    }
                }
            }
            Mutation::new(outcomes, true)
        };

        self.catalog.mutate(session, store, deletion).await
    }
}

fn belongs_to(document: &str, store: &str) -> bool {
    document
        .strip_prefix(store)
        .is_some_and(|rest| rest.starts_with("/documents/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{backend_with_documents, catalog, STORE};

    fn service(
        docs: usize,
        page_size: u32,
    ) -> (Arc<crate::infrastructure::InMemoryFileSearch>, DocumentService) {
        let backend = backend_with_documents(docs);
        let catalog = catalog(&backend, page_size);
        let service = DocumentService::new(backend.clone(), catalog);
        (backend, service)
    }

    #[tokio::test]
    async fn test_walk_pages_forward_and_back() {
        let (backend, service) = service(5, 2);
        let mut session = Session::new();

        let first = service.page(&mut session, STORE).await.unwrap();
        assert_eq!(first.documents.len(), 2);
        assert!(first.has_next());

        service.next_page(&mut session, STORE).await.unwrap();
        let last = service.next_page(&mut session, STORE).await.unwrap();
        assert_eq!(last.documents.len(), 1);
        assert!(!last.has_next());
        assert!(service.next_page(&mut session, STORE).await.is_err());

        let calls_before = backend.calls().list_documents;
        let back = service.previous_page(&mut session, STORE).await.unwrap();
        assert_eq!(back.documents.len(), 2);
        assert_eq!(backend.calls().list_documents, calls_before);
        assert_eq!(session.cursor(STORE).unwrap().current_index(), 1);
    }

    #[tokio::test]
    async fn test_echoed_token_stops_pagination() {
        let (backend, service) = service(3, 2);
        backend.set_echo_last_token(true);
        let mut session = Session::new();

        let second = service.next_page(&mut session, STORE).await.unwrap();

        assert_eq!(second.documents.len(), 1);
        assert!(!second.has_next());
        assert!(service.next_page(&mut session, STORE).await.is_err());
        assert_eq!(session.cursor(STORE).unwrap().current_index(), 1);
    }

    #[tokio::test]
    async fn test_delete_resets_cursor_and_reports_each_outcome() {
        let (backend, service) = service(5, 2);
        let mut session = Session::new();
        service.next_page(&mut session, STORE).await.unwrap();

        let page = service.page(&mut session, STORE).await.unwrap();
        let mut names: Vec<String> = page.documents.iter().map(|d| d.name.clone()).collect();
        names.push(format!("{STORE}/documents/missing"));

        let outcomes = service.delete(&mut session, STORE, &names).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].deleted);
        assert!(outcomes[1].deleted);
        assert!(!outcomes[2].deleted);
        assert!(outcomes[2].error.is_some());
        assert!(session.cursor(STORE).unwrap().is_initial());
        assert_eq!(backend.document_count(STORE), 3);
    }

    #[tokio::test]
    async fn test_delete_invalidates_listing_once() {
        let (backend, service) = service(4, 10);
        let mut session = Session::new();

        let page = service.page(&mut session, STORE).await.unwrap();
        let names: Vec<String> = page.documents.iter().map(|d| d.name.clone()).collect();
        service.delete(&mut session, STORE, &names[..2]).await;

        let after = service.page(&mut session, STORE).await.unwrap();
        assert_eq!(after.documents.len(), 2);
        assert_eq!(backend.calls().list_documents, 2);
        assert_eq!(backend.calls().delete_document, 2);
    }

    #[tokio::test]
    async fn test_other_session_restarts_after_delete() {
        let (_, service) = service(5, 2);
        let mut reader = Session::new();
        let mut writer = Session::new();
        service.next_page(&mut reader, STORE).await.unwrap();
        assert_eq!(reader.cursor(STORE).unwrap().current_index(), 1);

        let page = service.page(&mut writer, STORE).await.unwrap();
        let names: Vec<String> = page.documents.iter().map(|d| d.name.clone()).collect();
        service.delete(&mut writer, STORE, &names).await;

        let first = service.page(&mut reader, STORE).await.unwrap();
        assert!(reader.cursor(STORE).unwrap().is_initial());
        assert_eq!(first.documents.len(), 2);
        assert!(first.has_next());
        assert!(service.previous_page(&mut reader, STORE).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_rejects_foreign_document_without_remote_call() {
        let (backend, service) = service(1, 10);
        let mut session = Session::new();

        let outcomes = service
            .delete(
                &mut session,
                STORE,
                &["fileSearchStores/other/documents/x".to_string()],
            )
            .await;

        assert!(!outcomes[0].deleted);
        assert_eq!(backend.calls().delete_document, 0);
    }
}
