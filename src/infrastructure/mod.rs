pub mod config;
pub mod file_search;
pub mod gemini;

pub use config::{AppConfig, Backend, Config, ConfigError};
pub use file_search::{connect, CallCounts, InMemoryFileSearch};
pub use gemini::{GeminiError, GeminiFileSearch};
