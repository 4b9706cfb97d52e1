//! Tolerant parsing of model output.
//!
//! Models wrap JSON in code fences, prepend narrative, or stop mid-array
//! when they hit the output limit. The helpers here recover what is
//! usable and report the rest as [`ProviderError::InvalidResponse`].

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use docgen_entity::thesis::{Citation, QuizQuestion, SearchQuery};

use crate::error::ProviderError;

/// A generated document split into text and citation metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// Document text.
    pub content: String,
    /// Citations the model reported.
    pub citations: Vec<Citation>,
}

#[derive(Debug, Deserialize)]
struct DocumentEnvelope {
    content: String,
    #[serde(default)]
    citations: Vec<serde_json::Value>,
}

/// Parse a document answer: a `{content, citations}` object, or plain text.
pub fn parse_document(raw: &str) -> Result<ParsedDocument, ProviderError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(ProviderError::InvalidResponse("empty document".into()));
    }

    if !text.starts_with('{') {
        return Ok(ParsedDocument {
            content: text.to_string(),
            citations: Vec::new(),
        });
    }

    let envelope: DocumentEnvelope = serde_json::from_str(text)
        .ok()
        .or_else(|| first_json_value(text).and_then(|v| serde_json::from_str(v).ok()))
        .ok_or_else(|| {
            ProviderError::InvalidResponse("document JSON could not be parsed".into())
        })?;

    if envelope.content.trim().is_empty() {
        return Err(ProviderError::InvalidResponse(
            "document content is empty".into(),
        ));
    }

    let total = envelope.citations.len();
    let citations: Vec<Citation> = envelope
        .citations
        .into_iter()
        .filter_map(|c| serde_json::from_value(c).ok())
        .collect();
    if citations.len() < total {
        warn!(
            dropped = total - citations.len(),
            "Dropped malformed citations from document"
        );
    }

    Ok(ParsedDocument {
        content: envelope.content,
        citations,
    })
}

/// Parse a quiz answer, keeping only well-formed questions.
pub fn parse_quiz(raw: &str) -> Result<Vec<QuizQuestion>, ProviderError> {
    let questions: Vec<QuizQuestion> = parse_json_array(raw)?
        .into_iter()
        .filter(|q: &QuizQuestion| {
            !q.question.trim().is_empty()
                && q.options.len() >= 2
                && q.correct_index < q.options.len()
        })
        .collect();
    if questions.is_empty() {
        return Err(ProviderError::InvalidResponse(
            "quiz contains no valid questions".into(),
        ));
    }
    Ok(questions)
}

/// Parse a search query answer, dropping blank queries.
pub fn parse_search_queries(raw: &str) -> Result<Vec<SearchQuery>, ProviderError> {
    let queries: Vec<SearchQuery> = parse_json_array(raw)?
        .into_iter()
        .filter(|q: &SearchQuery| !q.query.trim().is_empty())
        .collect();
    if queries.is_empty() {
        return Err(ProviderError::InvalidResponse(
            "no search queries in response".into(),
        ));
    }
    Ok(queries)
}

/// Parse a JSON array of `T`, repairing common damage.
///
/// Tries the text as-is, then an object wrapping a single array, then a
/// repaired array: fences removed, a missing `[` added, and everything
/// after the last complete object dropped.
pub fn parse_json_array<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, ProviderError> {
    let text = strip_code_fences(raw);

    if let Ok(items) = serde_json::from_str::<Vec<T>>(text) {
        return Ok(items);
    }

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(text)
        && let Some(array) = map.into_iter().map(|(_, v)| v).find(|v| v.is_array())
    {
        return serde_json::from_value(array)
            .map_err(|e| ProviderError::InvalidResponse(format!("unexpected array items: {e}")));
    }

    let repaired = repair_array(text)
        .ok_or_else(|| ProviderError::InvalidResponse("no JSON array in response".into()))?;
    serde_json::from_str(&repaired)
        .map_err(|e| ProviderError::InvalidResponse(format!("JSON array could not be parsed: {e}")))
}

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (`json`, `markdown`...).
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn repair_array(text: &str) -> Option<String> {
    let start = text.find(['[', '{'])?;
    let body = &text[start..];
    let end = body.rfind('}')?;
    let body = body[..=end].trim_start_matches('[').trim();
    Some(format!("[{body}]"))
}

fn first_json_value(text: &str) -> Option<&str> {
    for (idx, ch) in text.char_indices() {
        if ch == '{' || ch == '[' {
            let candidate = &text[idx..];
            let mut values =
                serde_json::Deserializer::from_str(candidate).into_iter::<serde_json::Value>();
            if let Some(Ok(_)) = values.next() {
                return Some(&candidate[..values.byte_offset()]);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_json_with_citations() {
        let raw = "```json\n{\"content\": \"# Intro\\nText\", \"citations\": [\
            {\"id\": \"cite1\", \"authors\": [\"Smith\"], \"year\": 2020, \"title\": \"Remote Teams\"},\
            {\"id\": \"cite2\", \"year\": \"unknown\"}]}\n```";
        let doc = parse_document(raw).unwrap();
        assert_eq!(doc.content, "# Intro\nText");
        assert_eq!(doc.citations.len(), 1);
        assert_eq!(doc.citations[0].title, "Remote Teams");
    }

    #[test]
    fn test_document_plain_text() {
        let doc = parse_document("DOC").unwrap();
        assert_eq!(doc.content, "DOC");
        assert!(doc.citations.is_empty());
    }

    #[test]
    fn test_broken_document_json_is_format_error() {
        let err = parse_document("{\"content\": ").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
        assert!(parse_document("   ").is_err());
    }

    #[test]
    fn test_quiz_repairs_truncated_array() {
        let raw = "```json\n[{\"question\": \"Q1\", \"options\": [\"a\", \"b\"], \"correctIndex\": 1},\
            {\"question\": \"Q2\", \"options\": [\"a\", \"b\"], \"correctIndex\": 0},\
            {\"question\": \"Q3\", \"opti";
        let quiz = parse_quiz(raw).unwrap();
        assert_eq!(quiz.len(), 2);
        assert_eq!(quiz[1].question, "Q2");
    }

    #[test]
    fn test_quiz_adds_missing_bracket_and_drops_invalid() {
        let raw = "{\"question\": \"Q1\", \"options\": [\"a\", \"b\"], \"correctIndex\": 5},\
            {\"question\": \"Q2\", \"options\": [\"a\", \"b\", \"c\"], \"correctIndex\": 2}";
        let quiz = parse_quiz(raw).unwrap();
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].correct_index, 2);
    }

    #[test]
    fn test_search_queries_from_wrapped_object() {
        let raw = r#"{"queries": [{"query": "remote work cohesion"}, {"query": " "}]}"#;
        let queries = parse_search_queries(raw).unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].query, "remote work cohesion");
    }

    #[test]
    fn test_garbage_is_format_error() {
        assert!(parse_search_queries("I cannot help with that.").is_err());
    }
}
