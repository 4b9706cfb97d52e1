//! Generation status records.

pub mod record;
pub mod status;

pub use record::StatusRecord;
pub use status::GenerationStatus;
