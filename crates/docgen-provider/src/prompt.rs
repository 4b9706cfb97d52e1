//! Prompt builders.
//!
//! Prompts only state the task and the output contract the parsers in
//! [`crate::response`] rely on.

use std::fmt::Write;

use docgen_entity::job::GenerationParams;

/// Characters of thesis content included in follow-up prompts.
const CONTENT_EXCERPT_CHARS: usize = 60_000;

/// Prompt for a full thesis document.
pub fn document_prompt(params: &GenerationParams) -> String {
    let specs = &params.specifications;
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Write an academic thesis.");
    let _ = writeln!(prompt, "Title: {}", params.title);
    if let Some(topic) = &params.topic {
        let _ = writeln!(prompt, "Topic: {topic}");
    }
    let _ = writeln!(prompt, "Research question: {}", params.research_question);
    if let Some(kind) = &specs.thesis_type {
        let _ = writeln!(prompt, "Thesis type: {kind}");
    }
    if let Some(field) = &specs.field {
        let _ = writeln!(prompt, "Field: {field}");
    }
    let _ = writeln!(prompt, "Language: {}", specs.language);
    let _ = writeln!(prompt, "Citation style: {}", specs.citation_style);
    let _ = writeln!(
        prompt,
        "Length: about {} words, never more than {} words.",
        params.target_words(),
        params.max_words()
    );
    let _ = writeln!(prompt, "Outline (JSON): {}", params.outline);

    if !params.mandatory_sources.is_empty() {
        let _ = writeln!(prompt, "These sources must be cited:");
        for source in &params.mandatory_sources {
            let _ = writeln!(prompt, "- {source}");
        }
    }
    if !params.available_sources.is_empty() {
        let _ = writeln!(prompt, "Further sources that may be cited:");
        for source in &params.available_sources {
            let year = source.year.map(|y| format!(" ({y})")).unwrap_or_default();
            let _ = writeln!(prompt, "- {}{}", source.title, year);
        }
    }

    let _ = writeln!(
        prompt,
        "Do not use tables or images. Answer with a JSON object \
         {{\"content\": \"<markdown text>\", \"citations\": [{{\"id\", \"authors\", \"year\", \
         \"title\", \"journal\", \"doi\", \"pages\", \"url\"}}]}}."
    );
    prompt
}

/// Prompt for a multiple-choice quiz about a thesis.
pub fn quiz_prompt(title: &str, content: &str, question_count: u32) -> String {
    format!(
        "Create {question_count} multiple-choice questions about the thesis \"{title}\". \
         Write them in the language of the thesis. Answer with a JSON array of objects \
         {{\"question\", \"options\" (4 strings), \"correctIndex\", \"explanation\"}}.\n\n{}",
        excerpt(content)
    )
}

/// Prompt for literature search queries supporting a thesis.
pub fn search_query_prompt(title: &str, content: &str, query_count: u32) -> String {
    format!(
        "Suggest {query_count} literature database search queries for the thesis \"{title}\". \
         Answer with a JSON array of objects {{\"query\", \"purpose\", \"language\"}}.\n\n{}",
        excerpt(content)
    )
}

fn excerpt(content: &str) -> &str {
    match content.char_indices().nth(CONTENT_EXCERPT_CHARS) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}
