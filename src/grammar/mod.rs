//! Rule-based grammar checker client.

mod client;
mod types;

pub use client::{GrammarCheckClient, GrammarCheckClientBuilder};
pub use types::GrammarReport;
