//! # docgen-service
//!
//! Use cases behind the HTTP surface. Services take their collaborators
//! as `Arc` handles at construction time and never create connections of
//! their own.

pub mod generation;
pub mod operation;
pub mod passage;
pub mod status;
pub mod version;

pub use generation::{ArtifactOutcome, GenerationService, IntakeOutcome};
pub use operation::OperationService;
pub use passage::PassageService;
pub use status::StatusQueryService;
pub use version::VersionService;
