//! Quality checks on a generated document.

use regex::{Regex, RegexBuilder};

use docgen_entity::job::GenerationParams;
use docgen_entity::thesis::{Citation, QualityReport};

/// Patterns that must not appear in a finished document.
const FORBIDDEN_PATTERNS: &[&str] = &[
    r"!\[.*?\]\(.*?\)",
    r"\|.*\|.*\|",
    r"<table>",
    r"Here is a table",
    r"As an AI",
    r"I cannot create",
];

/// Checks word count, mandatory sources and forbidden content.
#[derive(Debug, Clone)]
pub struct QualityChecker {
    forbidden: Vec<(&'static str, Regex)>,
}

impl Default for QualityChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityChecker {
    /// Compile the forbidden patterns (case-insensitive).
    pub fn new() -> Self {
        let forbidden = FORBIDDEN_PATTERNS
            .iter()
            .filter_map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|re| (*p, re))
            })
            .collect();
        Self { forbidden }
    }

    /// Check `content` against the generation parameters.
    pub fn check(
        &self,
        content: &str,
        params: &GenerationParams,
        citations: &[Citation],
    ) -> QualityReport {
        let word_count = count_words(content);
        let max_words = params.max_words();
        let word_count_within_limit = word_count <= max_words;

        let missing_mandatory_sources = missing_sources(content, &params.mandatory_sources, citations);

        let mut errors: Vec<String> = self
            .forbidden
            .iter()
            .filter(|(_, re)| re.is_match(content))
            .map(|(pattern, _)| format!("Found forbidden pattern: {pattern}"))
            .collect();
        if !word_count_within_limit {
            errors.push(format!("Word count {word_count} exceeds limit {max_words}"));
        }
        if !missing_mandatory_sources.is_empty() {
            errors.push(format!(
                "Missing mandatory sources: {}",
                missing_mandatory_sources.join(", ")
            ));
        }

        QualityReport {
            valid: errors.is_empty(),
            word_count,
            max_words,
            word_count_within_limit,
            missing_mandatory_sources,
            errors,
        }
    }
}

/// Whitespace-separated words.
pub fn count_words(content: &str) -> u32 {
    u32::try_from(content.split_whitespace().count()).unwrap_or(u32::MAX)
}

/// Mandatory sources matched neither by a citation title/DOI nor by the text.
fn missing_sources(content: &str, mandatory: &[String], citations: &[Citation]) -> Vec<String> {
    let cited: Vec<String> = citations
        .iter()
        .flat_map(|c| [c.title.to_lowercase(), c.doi.to_lowercase()])
        .filter(|s| !s.trim().is_empty())
        .collect();
    let text = content.to_lowercase();

    mandatory
        .iter()
        .filter(|source| {
            let needle = source.trim().to_lowercase();
            if needle.is_empty() {
                return false;
            }
            let cited_match = cited
                .iter()
                .any(|c| c.contains(&needle) || needle.contains(c.as_str()));
            !cited_match && !text.contains(&needle)
        })
        .cloned()
        .collect()
}
