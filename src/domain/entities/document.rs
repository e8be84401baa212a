use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentState {
    #[default]
    Unspecified,
    Pending,
    Active,
    Failed,
}

/// A document registered inside exactly one file search store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDocument {
    pub name: String,
    pub display_name: String,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
    pub state: DocumentState,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl StoreDocument {
    pub fn new(store: &str, id: &str, display_name: impl Into<String>, size_bytes: u64) -> Self {
        let now = Utc::now();
        Self {
            name: format!("{store}/documents/{id}"),
            display_name: display_name.into(),
            size_bytes,
            mime_type: None,
            state: DocumentState::Active,
            create_time: Some(now),
            update_time: Some(now),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Resource name of the owning store (`fileSearchStores/<id>`).
    pub fn store_name(&self) -> Option<&str> {
        self.name
            .find("/documents/")
            .map(|idx| &self.name[..idx])
    }
}

/// One page of a document listing plus the vendor's continuation token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub documents: Vec<StoreDocument>,
    pub next_page_token: Option<String>,
}

impl DocumentPage {
    pub fn new(documents: Vec<StoreDocument>, next_page_token: Option<String>) -> Self {
        Self {
            documents,
            next_page_token,
        }
    }

    /// Normalizes the continuation token against the token that was requested.
    ///
    /// An empty token, or one equal to the requested token, means there is no
    /// further page. The vendor pager has been observed echoing the input token
    /// at the end of a listing instead of returning nothing.
    pub fn normalized(mut self, requested: Option<&str>) -> Self {
        let is_end = match self.next_page_token.as_deref() {
            None | Some("") => true,
            Some(next) => requested == Some(next),
        };
        if is_end {
            self.next_page_token = None;
        }
        self
    }

    pub fn has_next(&self) -> bool {
        self.next_page_token.is_some()
    }
}
