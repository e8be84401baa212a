use serde::{Deserialize, Serialize};

/// Handle for a long-running vendor operation (document import).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOperation {
    pub name: String,
    pub done: bool,
    pub error: Option<OperationError>,
    pub document_name: Option<String>,
}

impl UploadOperation {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            error: None,
            document_name: None,
        }
    }

    pub fn completed(name: impl Into<String>, document_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            error: None,
            document_name: Some(document_name.into()),
        }
    }

    pub fn failed(name: impl Into<String>, error: OperationError) -> Self {
        Self {
            name: name.into(),
            done: true,
            error: Some(error),
            document_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    pub code: i32,
    pub message: String,
}
