//! JSON shapes of the Gemini `v1beta` file search endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{
    ChatMessage, DocumentState, FileSearchStore, OperationError, StoreDocument, UploadOperation,
};

/// int64 fields arrive as JSON strings; accept numbers too.
fn int64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(0),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid int64 {n}"))),
        Some(serde_json::Value::String(s)) => s.parse().map_err(serde::de::Error::custom),
        Some(other) => Err(serde::de::Error::custom(format!("invalid int64 {other}"))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreWire {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, deserialize_with = "int64")]
    pub active_documents_count: u64,
    #[serde(default, deserialize_with = "int64")]
    pub pending_documents_count: u64,
    #[serde(default, deserialize_with = "int64")]
    pub failed_documents_count: u64,
    #[serde(default, deserialize_with = "int64")]
    pub size_bytes: u64,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl From<StoreWire> for FileSearchStore {
    fn from(w: StoreWire) -> Self {
        Self {
            name: w.name,
            display_name: w.display_name,
            active_documents_count: w.active_documents_count,
            pending_documents_count: w.pending_documents_count,
            failed_documents_count: w.failed_documents_count,
            size_bytes: w.size_bytes,
            create_time: w.create_time,
            update_time: w.update_time,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStoresResponse {
    #[serde(default)]
    pub file_search_stores: Vec<StoreWire>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreRequest<'a> {
    pub display_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentWire {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, deserialize_with = "int64")]
    pub size_bytes: u64,
    pub mime_type: Option<String>,
    pub state: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl From<DocumentWire> for StoreDocument {
    fn from(w: DocumentWire) -> Self {
        let state = match w.state.as_deref() {
            Some("STATE_PENDING") => DocumentState::Pending,
            Some("STATE_ACTIVE") => DocumentState::Active,
            Some("STATE_FAILED") => DocumentState::Failed,
            _ => DocumentState::Unspecified,
        };
        Self {
            name: w.name,
            display_name: w.display_name,
            size_bytes: w.size_bytes,
            mime_type: w.mime_type,
            state,
            create_time: w.create_time,
            update_time: w.update_time,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<DocumentWire>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata<'a> {
    pub display_name: &'a str,
    pub mime_type: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct StatusWire {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct OperationWire {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    pub error: Option<StatusWire>,
    pub response: Option<serde_json::Value>,
}

impl From<OperationWire> for UploadOperation {
    fn from(w: OperationWire) -> Self {
        let document_name = w
            .response
            .as_ref()
            .and_then(|r| r.get("documentName"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Self {
            name: w.name,
            done: w.done,
            error: w.error.map(|e| OperationError {
                code: e.code,
                message: e.message,
            }),
            document_name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PartWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<PartWire>,
}

impl From<&ChatMessage> for ContentWire {
    fn from(m: &ChatMessage) -> Self {
        Self {
            role: Some(m.role.as_str().to_string()),
            parts: vec![PartWire {
                text: Some(m.text.clone()),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSearchWire {
    pub file_search_store_names: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolWire {
    pub file_search: FileSearchWire,
}

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<ContentWire>,
    pub tools: Vec<ToolWire>,
}

impl GenerateContentRequest {
    pub fn bound_to(store: &str, contents: &[ChatMessage]) -> Self {
        Self {
            contents: contents.iter().map(ContentWire::from).collect(),
            tools: vec![ToolWire {
                file_search: FileSearchWire {
                    file_search_store_names: vec![store.to_string()],
                },
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CandidateWire {
    pub content: Option<ContentWire>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<CandidateWire>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}
