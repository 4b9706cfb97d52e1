//! Operation retrieval seam.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::operation::{OperationHandle, OperationSnapshot};

/// How an operation is addressed in a retrieval call.
#[derive(Debug, Clone, Copy)]
pub enum OperationRef<'a> {
    /// The full structured handle.
    Handle(&'a OperationHandle),
    /// Only the bare identifier.
    Id(&'a str),
}

/// Provider API able to read operation state.
#[async_trait]
pub trait OperationClient: Send + Sync + std::fmt::Debug + 'static {
    /// Read the current state of an operation. Never mutates provider state.
    async fn get_operation(
        &self,
        operation: OperationRef<'_>,
    ) -> Result<OperationSnapshot, ProviderError>;
}

/// One way of invoking the retrieval call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStrategy {
    /// Pass the handle as a structured object (full name).
    StructuredHandle,
    /// Pass only the bare identifier.
    BareIdentifier,
}

impl RetrievalStrategy {
    /// Default order: structured first, bare identifier as fallback.
    pub fn default_order() -> Vec<Self> {
        vec![Self::StructuredHandle, Self::BareIdentifier]
    }

    /// Build the reference this strategy passes for `handle`.
    pub fn reference<'a>(&self, handle: &'a OperationHandle) -> OperationRef<'a> {
        match self {
            Self::StructuredHandle => OperationRef::Handle(handle),
            Self::BareIdentifier => OperationRef::Id(handle.id()),
        }
    }

    /// Name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StructuredHandle => "structured_handle",
            Self::BareIdentifier => "bare_identifier",
        }
    }
}
