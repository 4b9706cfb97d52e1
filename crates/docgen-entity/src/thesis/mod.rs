//! Thesis entities and generated artifacts.

pub mod artifact;
pub mod model;
pub mod passage;
pub mod version;

pub use artifact::{Citation, DocumentArtifact, QualityReport, QuizQuestion, SearchQuery};
pub use model::Thesis;
pub use passage::Passage;
pub use version::ThesisVersion;
