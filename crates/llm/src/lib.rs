//! LLM integration crate for IAMSage.
//!
//! This crate provides a provider-agnostic abstraction for generating
//! answers with Large Language Models through a unified trait.
//!
//! # Providers
//! - **Gemini**: Google's hosted models (default)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use iamsage_llm::{LlmClient, LlmRequest, providers::GeminiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::new(std::env::var("GOOGLE_API_KEY")?);
//! let request = LlmRequest::new("What is least privilege?", "gemini-2.5-pro");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GeminiClient, OllamaClient};
pub use types::ProviderType;
