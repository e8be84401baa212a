mod conversation;
mod document;
mod operation;
mod pagination;
mod store;
mod upload;

pub use conversation::{ChatHistory, ChatMessage, ChatRole};
pub use document::{DocumentPage, DocumentState, StoreDocument};
pub use operation::{OperationError, UploadOperation};
pub use pagination::PageCursor;
pub use store::FileSearchStore;
pub use upload::{UploadKey, UploadLedger};
