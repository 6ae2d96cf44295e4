//! Speech-to-text client.

mod client;
mod types;

pub use client::{TranscriptionClient, TranscriptionClientBuilder};
pub use types::{Segment, TranscriptionResult};
