mod logging;
mod session;

pub use logging::request_logger;
pub use session::{session_id, SessionId, SESSION_HEADER};
