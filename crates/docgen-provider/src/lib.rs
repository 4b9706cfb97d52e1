//! # docgen-provider
//!
//! Boundary to the external content-generation provider.
//!
//! - [`poller`]: drives a provider-side long-running operation to
//!   completion with a bounded wait and fallback retrieval strategies
//! - [`gemini`]: reqwest client for the Gemini REST API
//! - [`response`]: tolerant parsing of model output into artifacts
//! - [`quality`]: checks on a generated document

pub mod client;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod operation;
pub mod poller;
pub mod prompt;
pub mod quality;
pub mod response;

pub use client::{OperationClient, OperationRef, RetrievalStrategy};
pub use error::{PollError, ProviderError};
pub use gemini::GeminiClient;
pub use generation::{
    EmbeddingProvider, Generation, GenerationProvider, GenerationRequest, ResponseFormat,
};
pub use operation::{DriveOutcome, OperationError, OperationHandle, OperationSnapshot};
pub use poller::OperationPoller;
pub use quality::QualityChecker;
