//! LLM service client: scoring, free-form generation, grammar correction.

mod client;
mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use types::{Correction, GrammarCorrection, ScoreResult};
