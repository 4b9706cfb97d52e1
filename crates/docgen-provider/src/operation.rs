//! Long-running operation types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reference to a long-running action at the provider.
///
/// The handle is only a name; polling can resume from it in any process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHandle {
    name: String,
}

impl OperationHandle {
    /// Wrap an operation name such as `models/x/operations/abc`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().trim_matches('/').to_string(),
        }
    }

    /// Full operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bare identifier: the last path segment of the name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Whether the handle carries no name at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Failure reported by the provider for the operation itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationError {
    /// Provider status code.
    #[serde(default)]
    pub code: i32,
    /// Provider message.
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation failed ({}): {}", self.code, self.message)
    }
}

/// State of an operation as last reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSnapshot {
    /// Operation name.
    #[serde(default)]
    pub name: String,
    /// Whether the operation finished, successfully or not.
    #[serde(default)]
    pub done: bool,
    /// Provider-side failure, only meaningful when `done`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
    /// Result payload once done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    /// Progress metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl OperationSnapshot {
    /// A snapshot of an operation still running.
    pub fn running(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            error: None,
            response: None,
            metadata: None,
        }
    }

    /// A snapshot of an operation finished with `response`.
    pub fn finished(name: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            done: true,
            response: Some(response),
            ..Self::running(name)
        }
    }

    /// A snapshot of an operation that failed at the provider.
    pub fn failed(name: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            done: true,
            error: Some(OperationError {
                code,
                message: message.into(),
            }),
            ..Self::running(name)
        }
    }

    /// Text payload of the response.
    ///
    /// Accepts a bare string, a `{ "text": ... }` object, or a
    /// `generateContent` response with candidates.
    pub fn response_text(&self) -> Option<String> {
        let response = self.response.as_ref()?;
        if let Some(text) = response.as_str() {
            return Some(text.to_string());
        }
        if let Some(text) = response.get("text").and_then(|t| t.as_str()) {
            return Some(text.to_string());
        }
        let parts = response
            .pointer("/candidates/0/content/parts")?
            .as_array()?;
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Result of driving an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DriveOutcome {
    /// The operation finished successfully.
    Completed(OperationSnapshot),
    /// The operation finished with a provider-side error.
    Failed {
        /// Final snapshot.
        snapshot: OperationSnapshot,
        /// Reported error.
        error: OperationError,
    },
    /// The wait budget ran out before the operation finished.
    TimedOut {
        /// Last snapshot seen, if any poll succeeded.
        last: Option<OperationSnapshot>,
        /// Time spent waiting.
        elapsed: Duration,
    },
}

impl DriveOutcome {
    /// Classify a snapshot that reports `done`.
    pub fn from_done(snapshot: OperationSnapshot) -> Self {
        match snapshot.error.clone() {
            Some(error) => Self::Failed { snapshot, error },
            None => Self::Completed(snapshot),
        }
    }

    /// The snapshot carried by the outcome.
    pub fn snapshot(&self) -> Option<&OperationSnapshot> {
        match self {
            Self::Completed(snapshot) | Self::Failed { snapshot, .. } => Some(snapshot),
            Self::TimedOut { last, .. } => last.as_ref(),
        }
    }

    /// Whether the wait budget ran out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handle_id_is_last_segment() {
        let handle = OperationHandle::new("models/gemini-2.5-pro/operations/op-42");
        assert_eq!(handle.id(), "op-42");
        assert_eq!(OperationHandle::new("op-7").id(), "op-7");
        assert_eq!(OperationHandle::new("/operations/op-9/").name(), "operations/op-9");
    }

    #[test]
    fn test_snapshot_from_provider_json() {
        let snapshot: OperationSnapshot = serde_json::from_value(json!({
            "name": "operations/op-1",
            "done": true,
            "error": { "code": 13, "message": "internal", "details": [] }
        }))
        .expect("snapshot");
        let outcome = DriveOutcome::from_done(snapshot);
        match outcome {
            DriveOutcome::Failed { error, .. } => assert_eq!(error.code, 13),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_response_text_shapes() {
        let plain = OperationSnapshot::finished("op", json!("DOC"));
        assert_eq!(plain.response_text().as_deref(), Some("DOC"));

        let candidates = OperationSnapshot::finished(
            "op",
            json!({ "candidates": [{ "content": { "parts": [{ "text": "A" }, { "text": "B" }] } }] }),
        );
        assert_eq!(candidates.response_text().as_deref(), Some("AB"));
        assert!(OperationSnapshot::running("op").response_text().is_none());
    }
}
