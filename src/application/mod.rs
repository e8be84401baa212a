//! Application layer - Use cases and orchestration.
//!
//! Services here depend on the `FileSearchApi` port rather than a concrete
//! vendor client. Per-client state lives in [`Session`]; the response cache is
//! shared by every session.

pub mod cache;
pub mod services;
pub mod session;

pub use cache::TtlCache;
pub use services::{
    wait_for_operation, CatalogService, ChatService, DeleteOutcome, DocumentService, Mutation,
    PollPolicy, UploadFile, UploadOutcome, UploadService,
};
pub use session::{Session, SessionRegistry};
