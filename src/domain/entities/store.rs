use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A remote file search store as reported by the vendor.
///
/// `name` is the vendor resource name (`fileSearchStores/<id>`) and is the only
/// stable identity; everything else is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSearchStore {
    pub name: String,
    pub display_name: String,
    pub active_documents_count: u64,
    pub pending_documents_count: u64,
    pub failed_documents_count: u64,
    pub size_bytes: u64,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl FileSearchStore {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            display_name: display_name.into(),
            active_documents_count: 0,
            pending_documents_count: 0,
            failed_documents_count: 0,
            size_bytes: 0,
            create_time: Some(now),
            update_time: Some(now),
        }
    }

    /// The trailing id segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_last_segment() {
        let store = FileSearchStore::new("fileSearchStores/abc-123", "wiki");
        assert_eq!(store.id(), "abc-123");
    }
}
