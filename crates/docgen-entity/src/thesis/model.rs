//! Thesis entity model.

use chrono::{DateTime, Utc};
use docgen_core::types::ThesisId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A thesis row with its generated artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Thesis {
    /// Unique identifier.
    pub id: ThesisId,
    /// Title.
    pub title: String,
    /// Generated document (markdown).
    pub content: Option<String>,
    /// Citations extracted from the document.
    pub citations: Option<serde_json::Value>,
    /// Generated quiz (array of questions).
    pub quiz_data: Option<serde_json::Value>,
    /// Generated literature search queries.
    pub search_queries: Option<serde_json::Value>,
    /// Version number of the snapshot `content` was taken from.
    pub current_version: Option<i32>,
    /// When the thesis was created.
    pub created_at: DateTime<Utc>,
    /// When the thesis was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Thesis {
    /// A thesis without artifacts.
    pub fn new(id: ThesisId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            content: None,
            citations: None,
            quiz_data: None,
            search_queries: None,
            current_version: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Generated content, if any non-blank content exists.
    pub fn existing_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Existing quiz, if it holds at least one question.
    pub fn existing_quiz(&self) -> Option<&serde_json::Value> {
        non_empty_array(self.quiz_data.as_ref())
    }

    /// Existing search queries, if at least one was generated.
    pub fn existing_search_queries(&self) -> Option<&serde_json::Value> {
        non_empty_array(self.search_queries.as_ref())
    }
}

fn non_empty_array(value: Option<&serde_json::Value>) -> Option<&serde_json::Value> {
    value.filter(|v| v.as_array().is_some_and(|items| !items.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_quiz_is_not_an_artifact() {
        let mut thesis = Thesis::new(ThesisId::new(), "T");
        thesis.quiz_data = Some(json!([]));
        assert!(thesis.existing_quiz().is_none());
        thesis.quiz_data = Some(json!([{ "question": "Q" }]));
        assert!(thesis.existing_quiz().is_some());
    }

    #[test]
    fn test_blank_content_is_not_an_artifact() {
        let mut thesis = Thesis::new(ThesisId::new(), "T");
        thesis.content = Some("   ".into());
        assert!(thesis.existing_content().is_none());
    }
}
