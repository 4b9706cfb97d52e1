//! Request DTOs.
//!
//! Identifiers arrive as strings and are parsed by the handlers so a
//! missing or malformed id is reported as a validation error.

use serde::Deserialize;

use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use docgen_core::types::ThesisId;

/// Parse a thesis id supplied by a client.
pub fn parse_thesis_id(raw: Option<&str>) -> AppResult<ThesisId> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("domainId is required"))?;
    raw.parse()
        .map_err(|_| AppError::validation(format!("domainId is not a valid id: {raw}")))
}

/// POST /api/generations
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGenerationRequest {
    /// Thesis the document is for.
    pub domain_id: Option<String>,
    /// Generation parameters snapshot.
    pub generation_payload: Option<serde_json::Value>,
}

/// GET /api/generations/status
#[derive(Debug, Clone, Deserialize)]
pub struct StatusQuery {
    /// Thesis id.
    pub id: Option<String>,
}

/// POST /api/operations/status
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatusRequest {
    /// Provider operation name.
    #[serde(default)]
    pub operation_handle: String,
}

/// POST /api/operations/poll
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPollRequest {
    /// Provider operation name.
    #[serde(default)]
    pub operation_handle: String,
    /// Longest time to block, in milliseconds.
    pub max_wait_time: Option<u64>,
}

/// POST /api/theses/rollback
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRequest {
    /// Thesis id.
    pub domain_id: Option<String>,
    /// Version to restore.
    pub version_number: Option<i32>,
}

/// POST /api/theses/quiz
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
    /// Thesis id.
    pub domain_id: Option<String>,
    /// Number of questions.
    pub question_count: Option<u32>,
}

/// POST /api/theses/search-queries
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQueriesRequest {
    /// Thesis id.
    pub domain_id: Option<String>,
    /// Number of queries.
    pub query_count: Option<u32>,
}

/// POST /api/theses/passages
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassageSearchRequest {
    /// Thesis id.
    pub domain_id: Option<String>,
    /// Free-text query.
    #[serde(default)]
    pub query: String,
    /// Maximum passages to return.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Minimum similarity.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_limit() -> u32 {
    5
}

fn default_threshold() -> f64 {
    0.5
}

#[cfg(test)]
mod tests {
    use docgen_core::error::ErrorKind;

    use super::*;

    #[test]
    fn test_parse_thesis_id() {
        let id = ThesisId::new();
        assert_eq!(parse_thesis_id(Some(&id.to_string())).unwrap(), id);
        assert_eq!(
            parse_thesis_id(None).unwrap_err().kind,
            ErrorKind::Validation
        );
        assert_eq!(
            parse_thesis_id(Some("t1")).unwrap_err().kind,
            ErrorKind::Validation
        );
    }
}
