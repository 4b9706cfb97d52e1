//! # docgen-entity
//!
//! Domain entity models for Docgen. Stored entities derive
//! `sqlx::FromRow`; jobs live in the message broker and only derive serde.

pub mod generation;
pub mod job;
pub mod thesis;
