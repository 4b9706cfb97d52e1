//! Generated artifact shapes.

use serde::{Deserialize, Serialize};

/// Citation metadata extracted from a generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Identifier within the document (`cite1`, `cite2`...).
    #[serde(default)]
    pub id: String,
    /// Author names.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Publication year.
    #[serde(default)]
    pub year: Option<i32>,
    /// Title of the work.
    #[serde(default)]
    pub title: String,
    /// Journal or publisher.
    #[serde(default)]
    pub journal: String,
    /// DOI.
    #[serde(default)]
    pub doi: String,
    /// Cited page range.
    #[serde(default)]
    pub pages: String,
    /// URL.
    #[serde(default)]
    pub url: String,
}

/// Result of the document quality checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    /// No check failed.
    pub valid: bool,
    /// Words in the document.
    pub word_count: u32,
    /// Hard ceiling the count was checked against.
    pub max_words: u32,
    /// `word_count <= max_words`.
    pub word_count_within_limit: bool,
    /// Mandatory sources neither cited nor mentioned.
    pub missing_mandatory_sources: Vec<String>,
    /// Human-readable findings.
    pub errors: Vec<String>,
}

/// Reference stored in the status record once a document is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentArtifact {
    /// Version snapshot holding the content.
    pub version_number: i32,
    /// Words in the document.
    pub word_count: u32,
    /// Citations found.
    pub citation_count: usize,
    /// Quality findings.
    pub quality: QualityReport,
}

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    /// Question text.
    pub question: String,
    /// Answer options.
    pub options: Vec<String>,
    /// Index of the correct option.
    pub correct_index: usize,
    /// Why the answer is correct.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// A literature search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query string for a literature database.
    pub query: String,
    /// What the query is meant to find.
    #[serde(default)]
    pub purpose: Option<String>,
    /// Language of the query.
    #[serde(default)]
    pub language: Option<String>,
}
