//! Text-generation service adapters.

pub mod gemini;

pub use gemini::{DEFAULT_GEMINI_MODEL, GeminiClient};
