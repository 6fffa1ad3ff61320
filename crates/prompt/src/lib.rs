//! Prompt system for IAMSage.
//!
//! This crate provides structured prompt management with:
//! - a built-in grounded answer prompt
//! - YAML prompt overrides in `.iamsage/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{
    default_answer_prompt, load_prompt, DEFAULT_ANSWER_PROMPT_ID,
    INSUFFICIENT_CONTEXT_REPLY,
};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptOutputSpec,
};
