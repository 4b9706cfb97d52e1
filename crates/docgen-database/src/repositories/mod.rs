//! PostgreSQL implementations of the store traits.

pub mod passage;
pub mod status;
pub mod thesis;

pub use passage::PassageRepository;
pub use status::StatusRepository;
pub use thesis::ThesisRepository;
