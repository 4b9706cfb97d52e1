//! Core type definitions used across the Docgen workspace.

pub mod id;

pub use id::*;
