//! Queue job entities.

pub mod backoff;
pub mod model;
pub mod payload;
pub mod status;

pub use backoff::BackoffPolicy;
pub use model::{Job, NewJob};
pub use payload::{
    CitationStyle, GenerationParams, LengthUnit, QuizParams, SearchQueryParams, SourceReference,
    ThesisSpecifications,
};
pub use status::{JobKind, JobStatus};
