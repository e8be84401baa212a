use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::instrument;

use crate::application::{wait_for_operation, CatalogService, Mutation, PollPolicy, Session};
use crate::domain::{
    ports::{FileSearchApi, UploadRequest},
    DomainError, UploadKey, UploadOperation,
};

/// A file received from the client, not yet staged on disk.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    fn key(&self, store: &str) -> UploadKey {
        UploadKey::new(store, &self.file_name, self.bytes.len() as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    Uploaded {
        file_name: String,
        document_name: Option<String>,
    },
    Skipped {
        file_name: String,
    },
    Failed {
        file_name: String,
        error: String,
    },
}

/// Stages files to temporary storage, imports them into a store and waits for
/// the import operation to finish.
pub struct UploadService {
    api: Arc<dyn FileSearchApi>,
    catalog: Arc<CatalogService>,
    policy: PollPolicy,
    staging_dir: Option<PathBuf>,
}

impl UploadService {
    pub fn new(api: Arc<dyn FileSearchApi>, catalog: Arc<CatalogService>) -> Self {
        Self {
            api,
            catalog,
            policy: PollPolicy::default(),
            staging_dir: None,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Uploads one file and waits for the vendor to finish importing it.
    ///
    /// The staged copy is removed before returning, on success and on error.
    /// Cancelling the returned future removes it as well.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        store: &str,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<UploadOperation, DomainError> {
        let staged = self.stage(bytes, file_name).await?;
        let mime_type = mime_guess::from_path(file_name).first_or_octet_stream();

        let result = async {
            let operation = self
                .api
                .upload_document(UploadRequest {
                    store,
                    path: staged.path(),
                    display_name: file_name,
                    mime_type: mime_type.essence_str(),
                })
                .await?;
            tracing::debug!(operation = %operation.name, "upload submitted");
            wait_for_operation(&*self.api, operation, self.policy).await
        }
        .await;

        if let Err(e) = staged.close() {
            tracing::warn!(error = %e, "failed to remove staged upload");
        }
        result
    }

    /// Uploads a batch, skipping files already processed in this session.
    ///
    /// Each import is its own mutation: as soon as a file lands, listings are
    /// invalidated, cursors rewound and the file recorded as processed. A batch
    /// dropped halfway keeps everything it already imported accounted for.
    #[instrument(skip(self, session, files), fields(count = files.len()))]
    pub async fn upload_files(
        &self,
        session: &mut Session,
        store: &str,
        files: Vec<UploadFile>,
    ) -> Vec<UploadOutcome> {
        let mut seen = HashSet::new();
        let mut outcomes = Vec::with_capacity(files.len());

        for file in files {
            let key = file.key(store);
            if session.uploads().is_processed(&key) || !seen.insert(key.clone()) {
                tracing::info!(file = %file.file_name, "already processed, skipping");
                outcomes.push(UploadOutcome::Skipped {
                    file_name: file.file_name,
                });
                continue;
            }

            let import = async {
                let result = self.upload(store, &file.bytes, &file.file_name).await;
                let changed = result.is_ok();
                Mutation::new(result, changed)
            };

            match self.catalog.mutate(session, store, import).await {
                Ok(operation) => {
                    tracing::info!(file = %file.file_name, operation = %operation.name, "upload completed");
                    session.uploads_mut().mark_processed(key);
                    outcomes.push(UploadOutcome::Uploaded {
                        file_name: file.file_name,
                        document_name: operation.document_name,
                    });
                }
                Err(e) => {
                    tracing::error!(file = %file.file_name, error = %e, "upload failed");
                    outcomes.push(UploadOutcome::Failed {
                        file_name: file.file_name,
                        error: e.to_string(),
                    });
                }
            }
        }
        outcomes
    }

    async fn stage(&self, bytes: &[u8], file_name: &str) -> Result<NamedTempFile, DomainError> {
        let suffix = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let mut builder = tempfile::Builder::new();
        builder.prefix("upload-").suffix(&suffix);
        let staged = match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| DomainError::internal(format!("failed to stage {file_name}: {e}")))?;

        tokio::fs::write(staged.path(), bytes)
            .await
            .map_err(|e| DomainError::internal(format!("failed to stage {file_name}: {e}")))?;

        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{backend_with_documents, catalog, STORE};
    use crate::domain::OperationError;
    use crate::infrastructure::InMemoryFileSearch;
    use std::time::Duration;

    fn service(backend: &Arc<InMemoryFileSearch>, dir: &Path) -> UploadService {
        UploadService::new(backend.clone(), catalog(backend, 10)).with_staging_dir(dir)
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_removes_staged_file_on_success() {
        let backend = backend_with_documents(0);
        backend.set_operation_polls(2);
        let dir = tempfile::tempdir().unwrap();
        let service = service(&backend, dir.path());

        let operation = service.upload(STORE, b"# vim", "vim.md").await.unwrap();

        assert!(operation.done);
        assert_eq!(staged_files(dir.path()), 0);
        assert_eq!(backend.document_count(STORE), 1);
        assert_eq!(backend.last_upload_suffix().as_deref(), Some("md"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_removes_staged_file_on_submit_error() {
        let backend = backend_with_documents(0);
        backend.fail_next("upload_document");
        let dir = tempfile::tempdir().unwrap();
        let service = service(&backend, dir.path());

        let result = service.upload(STORE, b"# vim", "vim.md").await;

        assert!(result.is_err());
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_removes_staged_file_on_timeout() {
        let backend = backend_with_documents(0);
        backend.set_operation_polls(u32::MAX);
        let dir = tempfile::tempdir().unwrap();
        let service = service(&backend, dir.path()).with_policy(PollPolicy::new(
            std::time::Duration::from_secs(2),
            Some(std::time::Duration::from_secs(10)),
        ));

        let result = service.upload(STORE, b"# vim", "vim.md").await;

        assert!(matches!(result, Err(DomainError::Timeout(_))));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_skips_duplicates_and_resets_cursor() {
        let backend = backend_with_documents(3);
        let dir = tempfile::tempdir().unwrap();
        let service = service(&backend, dir.path());
        let mut session = Session::new();
        session.cursor_mut(STORE).advance(Some("2")).unwrap();

        let outcomes = service
            .upload_files(
                &mut session,
                STORE,
                vec![
                    UploadFile::new("a.md", b"aaa".to_vec()),
                    UploadFile::new("a.md", b"aaa".to_vec()),
                ],
            )
            .await;

        assert!(matches!(outcomes[0], UploadOutcome::Uploaded { .. }));
        assert!(matches!(outcomes[1], UploadOutcome::Skipped { .. }));
        assert!(session.cursor(STORE).unwrap().is_initial());

        let again = service
            .upload_files(
                &mut session,
                STORE,
                vec![UploadFile::new("a.md", b"aaa".to_vec())],
            )
            .await;

        assert!(matches!(again[0], UploadOutcome::Skipped { .. }));
        assert_eq!(backend.calls().upload_document, 1);
        assert_eq!(backend.document_count(STORE), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_upload_is_reported_and_retryable() {
        let backend = backend_with_documents(0);
        let dir = tempfile::tempdir().unwrap();
        let service = service(&backend, dir.path());
        let mut session = Session::new();
        backend.fail_next("upload_document");

        let outcomes = service
            .upload_files(&mut session, STORE, vec![UploadFile::new("b.pdf", vec![1, 2])])
            .await;
        assert!(matches!(outcomes[0], UploadOutcome::Failed { .. }));
        assert!(session.uploads().is_empty());

        let retry = service
            .upload_files(&mut session, STORE, vec![UploadFile::new("b.pdf", vec![1, 2])])
            .await;
        assert!(matches!(retry[0], UploadOutcome::Uploaded { .. }));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_import_error_fails_file_and_leaves_ledger_unmarked() {
        let backend = backend_with_documents(0);
        backend.set_operation_error(Some(OperationError {
            code: 3,
            message: "unsupported mime type".into(),
        }));
        let dir = tempfile::tempdir().unwrap();
        let service = service(&backend, dir.path());
        let mut session = Session::new();

        let outcomes = service
            .upload_files(&mut session, STORE, vec![UploadFile::new("c.xyz", vec![7; 8])])
            .await;

        match &outcomes[0] {
            UploadOutcome::Failed { file_name, error } => {
                assert_eq!(file_name, "c.xyz");
                assert!(error.contains("unsupported mime type"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(staged_files(dir.path()), 0);
        assert!(session.uploads().is_empty());
        assert_eq!(backend.document_count(STORE), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_batch_keeps_completed_imports() {
        let backend = backend_with_documents(0);
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(&backend, 10);
        let service = UploadService::new(backend.clone(), catalog.clone())
            .with_staging_dir(dir.path());
        let mut session = Session::new();
        catalog.document_page(STORE, None).await.unwrap();

        // first import finishes at t=2s, the second is still polling at t=3s
        let batch = service.upload_files(
            &mut session,
            STORE,
            vec![
                UploadFile::new("a.md", b"aaa".to_vec()),
                UploadFile::new("b.md", b"bbb".to_vec()),
            ],
        );
        assert!(tokio::time::timeout(Duration::from_secs(3), batch).await.is_err());

        assert_eq!(session.uploads().len(), 1);
        assert_eq!(staged_files(dir.path()), 0);
        let page = catalog.document_page(STORE, None).await.unwrap();
        assert_eq!(page.documents.len(), 1);
        assert_eq!(backend.calls().list_documents, 2);
    }
}
