use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::instrument;

use crate::application::{Session, TtlCache};
use crate::domain::{ports::FileSearchApi, DocumentPage, DomainError, FileSearchStore};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PageKey {
    store: String,
    token: Option<String>,
    page_size: u32,
}

/// Result of a mutating action, plus whether the remote document set changed.
#[derive(Debug)]
pub struct Mutation<T> {
    pub value: T,
    pub changed: bool,
}

impl<T> Mutation<T> {
    pub fn new(value: T, changed: bool) -> Self {
        Self { value, changed }
    }
}

/// Cached view of stores and document pages.
///
/// Every path that mutates the remote document set goes through [`mutate`],
/// which invalidates both listings and bumps the store's generation once the
/// mutation has run. Cursors of every session are checked against that
/// generation by [`sync_cursor`] before their tokens are used.
///
/// [`mutate`]: CatalogService::mutate
/// [`sync_cursor`]: CatalogService::sync_cursor
pub struct CatalogService {
    api: Arc<dyn FileSearchApi>,
    stores: TtlCache<(), Vec<FileSearchStore>>,
    pages: TtlCache<PageKey, DocumentPage>,
    generations: Mutex<HashMap<String, u64>>,
    page_size: u32,
}

impl CatalogService {
    pub fn new(api: Arc<dyn FileSearchApi>, ttl: Duration, page_size: u32) -> Self {
        Self {
            api,
            stores: TtlCache::new(ttl),
            pages: TtlCache::new(ttl),
            generations: Mutex::new(HashMap::new()),
            page_size,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_stores(&self) -> Result<Vec<FileSearchStore>, DomainError> {
        self.stores
            .get_or_fetch((), || self.api.list_stores())
            .await
    }

    pub async fn find_store(&self, name: &str) -> Result<FileSearchStore, DomainError> {
        self.list_stores()
            .await?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| DomainError::not_found(format!("store {name}")))
    }

    #[instrument(skip(self))]
    pub async fn create_store(&self, display_name: &str) -> Result<FileSearchStore, DomainError> {
        if display_name.trim().is_empty() {
            return Err(DomainError::validation("display name must not be empty"));
        }
        let store = self.api.create_store(display_name).await?;
        self.stores.invalidate();
        tracing::info!(store = %store.name, "store created");
        Ok(store)
    }

    /// One page of documents for `token` (`None` = first page).
    #[instrument(skip(self))]
    pub async fn document_page(
        &self,
        store: &str,
        token: Option<&str>,
    ) -> Result<DocumentPage, DomainError> {
        let key = PageKey {
            store: store.to_string(),
            token: token.map(str::to_string),
            page_size: self.page_size,
        };
        self.pages
            .get_or_fetch(key, || async {
                let page = self
                    .api
                    .list_documents(store, self.page_size, token)
                    .await?;
                Ok(page.normalized(token))
            })
            .await
    }

    /// Manual refresh: drops cached listings and rewinds every cursor of the session.
    pub fn refresh(&self, session: &mut Session) {
        self.stores.invalidate();
        self.pages.invalidate();
        session.reset_all_cursors();
        tracing::info!("catalog refreshed");
    }

    /// Number of document-set changes recorded for `store`.
    pub fn generation(&self, store: &str) -> u64 {
        self.generations
            .lock()
            .map(|g| g.get(store).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Rewinds the session's cursor for `store` when the store's documents
    /// changed after its tokens were collected, whichever session changed them.
    pub fn sync_cursor(&self, session: &mut Session, store: &str) {
        let generation = self.generation(store);
        let cursor = session.cursor_mut(store);
        let previous = cursor.generation();
        if cursor.rebase(generation) {
            tracing::debug!(store, previous, generation, "stale cursor rewound");
        }
    }

    /// Runs a mutation against `store`, then invalidates listings and rewinds
    /// cursors for that store when the mutation reports a change.
    ///
    /// If the mutation future is dropped before it finishes, the listings are
    /// invalidated anyway since an unknown part of it may have reached the
    /// backend.
    pub async fn mutate<T, Fut>(&self, session: &mut Session, store: &str, mutation: Fut) -> T
    where
        Fut: Future<Output = Mutation<T>>,
    {
        let pending = PendingMutation {
            catalog: self,
            store,
            armed: true,
        };
        let Mutation { value, changed } = mutation.await;
        pending.finish(changed);
        if changed {
            self.sync_cursor(session, store);
        }
        value
    }

    fn document_set_changed(&self, store: &str) {
        self.pages.invalidate();
        self.stores.invalidate();
        let generation = match self.generations.lock() {
            Ok(mut g) => bump(&mut g, store),
            Err(poisoned) => bump(&mut poisoned.into_inner(), store),
        };
        tracing::debug!(store, generation, "document set changed, listings invalidated");
    }
}

fn bump(generations: &mut HashMap<String, u64>, store: &str) -> u64 {
    let generation = generations.entry(store.to_string()).or_default();
    *generation += 1;
    *generation
}

/// Invalidates on drop unless [`finish`](PendingMutation::finish) ran first.
struct PendingMutation<'a> {
    catalog: &'a CatalogService,
    store: &'a str,
    armed: bool,
}

impl PendingMutation<'_> {
    fn finish(mut self, changed: bool) {
        self.armed = false;
        if changed {
            self.catalog.document_set_changed(self.store);
        }
    }
}

impl Drop for PendingMutation<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(store = self.store, "mutation cancelled, invalidating listings");
            self.catalog.document_set_changed(self.store);
        }
    }
}
