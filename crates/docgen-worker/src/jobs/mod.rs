//! Job handler implementations.

pub mod generation;
pub mod provider;
pub mod queries;
pub mod quiz;

pub use generation::ThesisGenerationHandler;
pub use provider::ProviderCall;
pub use queries::SearchQueryHandler;
pub use quiz::QuizGenerationHandler;
