mod in_memory;

use std::sync::Arc;

pub use in_memory::{CallCounts, InMemoryFileSearch};

use crate::domain::ports::FileSearchApi;
use crate::infrastructure::config::{AppConfig, Backend};
use crate::infrastructure::gemini::GeminiFileSearch;

/// Builds the backend selected by `backend` in the config.
pub fn connect(config: &AppConfig) -> anyhow::Result<Arc<dyn FileSearchApi>> {
    let api: Arc<dyn FileSearchApi> = match config.config.backend {
        Backend::Gemini => Arc::new(GeminiFileSearch::new(
            config.api_key()?,
            &config.config.gemini,
        )?),
        Backend::Memory => {
            tracing::warn!("using in-memory file search backend, nothing is persisted");
            Arc::new(InMemoryFileSearch::new())
        }
    };
    Ok(api)
}
