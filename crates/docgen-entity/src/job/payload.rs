//! Typed job payloads.
//!
//! Payloads are copied into the job at enqueue time, so later edits to the
//! thesis never change what an in-flight job generates.

use std::fmt;
use std::str::FromStr;

use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use serde::{Deserialize, Serialize};

/// Words per page when a target length is given in pages.
pub const WORDS_PER_PAGE: u32 = 300;

/// Allowed overshoot of the target word count.
pub const WORD_COUNT_TOLERANCE: f64 = 0.10;

/// Parameters for generating a thesis document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    /// Working title.
    pub title: String,
    /// Topic or subject area.
    #[serde(default)]
    pub topic: Option<String>,
    /// The research question the thesis answers.
    pub research_question: String,
    /// Chapter outline (array of chapters, each with optional sections).
    pub outline: serde_json::Value,
    /// Formal requirements.
    pub specifications: ThesisSpecifications,
    /// Sources that must be cited (titles or DOIs).
    #[serde(default)]
    pub mandatory_sources: Vec<String>,
    /// Sources found during research that may be cited.
    #[serde(default)]
    pub available_sources: Vec<SourceReference>,
    /// Provider-side file search store holding uploaded sources.
    #[serde(default)]
    pub filesearch_store_id: Option<String>,
    /// Generate again even when content already exists.
    #[serde(default)]
    pub regenerate: bool,
}

impl GenerationParams {
    /// Reject snapshots that cannot produce a document.
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("title must not be empty"));
        }
        if self.research_question.trim().is_empty() {
            return Err(AppError::validation("researchQuestion must not be empty"));
        }
        match self.outline.as_array() {
            Some(chapters) if !chapters.is_empty() => {}
            _ => return Err(AppError::validation("outline must be a non-empty array")),
        }
        if self.specifications.target_length == 0 {
            return Err(AppError::validation("targetLength must be positive"));
        }
        Ok(())
    }

    /// Target word count, converting pages at [`WORDS_PER_PAGE`].
    pub fn target_words(&self) -> u32 {
        match self.specifications.length_unit {
            LengthUnit::Words => self.specifications.target_length,
            LengthUnit::Pages => self.specifications.target_length * WORDS_PER_PAGE,
        }
    }

    /// Hard ceiling on the word count.
    pub fn max_words(&self) -> u32 {
        (f64::from(self.target_words()) * (1.0 + WORD_COUNT_TOLERANCE)) as u32
    }
}

/// Formal requirements of a thesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThesisSpecifications {
    /// Target length in `length_unit`.
    pub target_length: u32,
    /// Unit of `target_length`.
    #[serde(default)]
    pub length_unit: LengthUnit,
    /// Citation style.
    #[serde(default)]
    pub citation_style: CitationStyle,
    /// Language code of the document (e.g. `"de"`).
    #[serde(default = "default_language")]
    pub language: String,
    /// Kind of thesis (bachelor, master, seminar paper...).
    #[serde(default)]
    pub thesis_type: Option<String>,
    /// Academic field.
    #[serde(default)]
    pub field: Option<String>,
}

fn default_language() -> String {
    "de".to_string()
}

/// Unit of a target length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// Words.
    #[default]
    Words,
    /// Pages of roughly [`WORDS_PER_PAGE`] words.
    Pages,
}

/// Supported citation styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CitationStyle {
    /// APA.
    #[default]
    Apa,
    /// Harvard.
    Harvard,
    /// MLA.
    Mla,
    /// German footnote citation.
    DeutscheZitierweise,
}

impl CitationStyle {
    /// Return the style as its wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apa => "apa",
            Self::Harvard => "harvard",
            Self::Mla => "mla",
            Self::DeutscheZitierweise => "deutsche-zitierweise",
        }
    }
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CitationStyle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "apa" => Ok(Self::Apa),
            "harvard" => Ok(Self::Harvard),
            "mla" => Ok(Self::Mla),
            "deutsche-zitierweise" => Ok(Self::DeutscheZitierweise),
            other => Err(AppError::validation(format!(
                "unsupported citation style: {other}"
            ))),
        }
    }
}

/// A source found during research.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    /// Title.
    pub title: String,
    /// Author names.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Publication year.
    #[serde(default)]
    pub year: Option<i32>,
    /// DOI.
    #[serde(default)]
    pub doi: Option<String>,
    /// URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Abstract.
    #[serde(default, rename = "abstract")]
    pub summary: Option<String>,
}

/// Parameters of a quiz job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizParams {
    /// Number of questions to generate.
    #[serde(default = "default_question_count")]
    pub question_count: u32,
}

impl Default for QuizParams {
    fn default() -> Self {
        Self {
            question_count: default_question_count(),
        }
    }
}

fn default_question_count() -> u32 {
    25
}

/// Parameters of a search query job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQueryParams {
    /// Number of queries to generate.
    #[serde(default = "default_query_count")]
    pub query_count: u32,
}

impl Default for SearchQueryParams {
    fn default() -> Self {
        Self {
            query_count: default_query_count(),
        }
    }
}

fn default_query_count() -> u32 {
    10
}
