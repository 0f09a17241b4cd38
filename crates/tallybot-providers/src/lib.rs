//! LLM provider layer for Tallybot.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`] — trait that all providers implement
//! - [`gemini::GeminiProvider`] — Google Gemini `generateContent` client
//! - [`openai::OpenAiProvider`] — generic OpenAI-compatible `/chat/completions` client
//! - [`retry`] — bounded exponential backoff for transient failures
//! - [`registry::create_provider`] — picks and builds a provider from config

pub mod error;
pub mod gemini;
pub mod openai;
pub mod registry;
pub mod retry;
pub mod traits;

// Re-export main types for convenience
pub use error::ProviderError;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use registry::{create_provider, ProviderKind};
pub use traits::{GenerationConfig, LlmProvider};
