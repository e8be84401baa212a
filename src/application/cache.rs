use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::DomainError;

/// Memoizes the results of one remote listing function for a fixed TTL.
///
/// Failed fetches are never stored. `invalidate` bumps a generation counter, and
/// a fetch only stores its result if the generation it started under is still
/// current, so a fetch racing an invalidation cannot resurrect stale data.
pub struct TtlCache<K, V> {
    ttl: Duration,
    state: Mutex<CacheState<K, V>>,
}

struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    generation: u64,
}

struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                generation: 0,
            }),
        }
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, DomainError>>,
    {
        let generation = {
            let state = self
                .state
                .lock()
                .map_err(|e| DomainError::internal(e.to_string()))?;

            if let Some(entry) = state.entries.get(&key) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.value.clone());
                }
            }
            state.generation
        };

        let value = fetch().await?;

        let mut state = self
            .state
            .lock()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        if state.generation == generation {
            state.entries.insert(
                key,
                CacheEntry {
                    value: value.clone(),
                    fetched_at: Instant::now(),
                },
            );
        } else {
            tracing::debug!("cache invalidated during fetch, result not stored");
        }
        Ok(value)
    }

    /// Drops every entry regardless of age.
    pub fn invalidate(&self) {
        match self.state.lock() {
            Ok(mut state) => {
                state.entries.clear();
                state.generation += 1;
            }
            Err(poisoned) => {
                let mut state = poisoned.into_inner();
                state.entries.clear();
                state.generation += 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
