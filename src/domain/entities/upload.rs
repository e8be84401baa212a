use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Identity of a file picked for upload within one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadKey {
    pub store: String,
    pub file_name: String,
    pub size_bytes: u64,
}

impl UploadKey {
    pub fn new(store: impl Into<String>, file_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            store: store.into(),
            file_name: file_name.into(),
            size_bytes,
        }
    }
}

/// Files already uploaded in this session.
#[derive(Debug, Clone, Default)]
pub struct UploadLedger {
    processed: HashSet<UploadKey>,
}

impl UploadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_processed(&self, key: &UploadKey) -> bool {
        self.processed.contains(key)
    }

    /// Returns `false` when the key was already recorded.
    pub fn mark_processed(&mut self, key: UploadKey) -> bool {
        self.processed.insert(key)
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_is_processed_once() {
        let mut ledger = UploadLedger::new();
        let key = UploadKey::new("fileSearchStores/s1", "vim.md", 42);

        assert!(ledger.mark_processed(key.clone()));
        assert!(!ledger.mark_processed(key.clone()));
        assert!(ledger.is_processed(&key));
    }

    #[test]
    fn test_size_is_part_of_identity() {
        let mut ledger = UploadLedger::new();
        ledger.mark_processed(UploadKey::new("fileSearchStores/s1", "vim.md", 42));

        assert!(!ledger.is_processed(&UploadKey::new("fileSearchStores/s1", "vim.md", 43)));
        assert!(!ledger.is_processed(&UploadKey::new("fileSearchStores/s2", "vim.md", 42)));
    }
}
