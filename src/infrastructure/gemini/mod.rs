mod client;
mod wire;

pub use client::{GeminiError, GeminiFileSearch};
