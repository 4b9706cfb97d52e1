//! HTTP handlers grouped by resource.

pub mod generation;
pub mod health;
pub mod jobs;
pub mod operations;
pub mod theses;
