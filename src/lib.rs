//! # lingokit
//!
//! Resilient upstream service clients for a language-practice backend.
//!
//! This crate is the layer between the application and four independent
//! network services: a speech-to-text service, an LLM service (scoring,
//! free-form generation, grammar correction), a rule-based grammar checker,
//! and an S3-compatible object store. It owns retry/backoff policy
//! selection per operation, classification of failures into retryable vs.
//! fatal, decoding of fixed-schema and caller-defined JSON responses, and
//! idempotent provisioning of storage buckets and access policies.
//!
//! It deliberately does not own HTTP routing, persistence, authentication,
//! or any business rules; those consume the value objects returned here.
//! No client method imposes an internal timeout — every operation takes a
//! [`tokio_util::sync::CancellationToken`] and the caller governs the
//! overall deadline.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use lingokit::TranscriptionClient;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> lingokit::Result<()> {
//!     let client = TranscriptionClient::builder()
//!         .base_url("http://stt.internal:8080")
//!         .build()?;
//!
//!     let audio = bytes::Bytes::from(vec![0u8; 16_000]);
//!     let cancel = CancellationToken::new();
//!     let transcription = client.transcribe(audio, "clip.wav", &cancel).await?;
//!     println!("{}", transcription.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`retry`] | Retry policies and the generic execute-with-retry combinator |
//! | [`stt`] | Speech-to-text client |
//! | [`grammar`] | Rule-based grammar checker client |
//! | [`llm`] | LLM scoring, generation and grammar-correction client |
//! | [`storage`] | S3-compatible object storage gateway |
//! | [`transport`] | Shared HTTP client construction |

pub mod error;
pub mod grammar;
pub mod llm;
pub mod retry;
pub mod storage;
pub mod stt;
pub mod transport;

pub use error::Error;
pub use grammar::{GrammarCheckClient, GrammarReport};
pub use llm::{Correction, GrammarCorrection, LlmClient, ScoreResult};
pub use retry::RetryPolicy;
pub use storage::{ObjectStorageGateway, StorageConfig, AVATAR_BUCKET};
pub use stt::{Segment, TranscriptionClient, TranscriptionResult};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
