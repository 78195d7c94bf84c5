//! crates/study_assistant_core/src/parser.rs
//!
//! Turns the assistant's free-text quiz reply into a validated `QuizResponse`.
//!
//! The model is asked for bare JSON but routinely wraps it in a markdown code fence,
//! sometimes with a `json` language tag left dangling on its own line. Those artifacts are
//! removed before strict decoding; nothing else about the text is repaired.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::{Question, QuizResponse};

// Greedy up to the last fence, so backticks quoted inside the JSON do not end the block.
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*)```").expect("fence regex is valid")
});

/// Why a reply could not be turned into a trusted quiz.
///
/// Both variants keep the raw reply so it can be logged for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("model output is not valid JSON: {reason}")]
    MalformedOutput { raw: String, reason: String },

    #[error("model output does not match the quiz schema: {reason}")]
    SchemaViolation { raw: String, reason: String },
}

impl ParseError {
    /// The unmodified text the assistant returned.
    pub fn raw(&self) -> &str {
        match self {
            Self::MalformedOutput { raw, .. } | Self::SchemaViolation { raw, .. } => raw,
        }
    }
}

/// Parses a quiz reply. Either every question is valid or the whole reply is rejected.
pub fn parse_quiz(raw: &str) -> Result<QuizResponse, ParseError> {
    let body = strip_wrapping(raw);

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ParseError::MalformedOutput {
            raw: raw.to_string(),
            reason: e.to_string(),
        })?;

    let schema_violation = |reason: String| ParseError::SchemaViolation {
        raw: raw.to_string(),
        reason,
    };

    if !value.is_object() {
        return Err(schema_violation(
            "top-level value must be an object with a \"questions\" field".to_string(),
        ));
    }

    // Unknown top-level keys are tolerated; serde ignores them.
    let quiz: QuizResponse =
        serde_json::from_value(value).map_err(|e| schema_violation(e.to_string()))?;

    for (index, question) in quiz.questions.iter().enumerate() {
        validate_question(question).map_err(|reason| {
            schema_violation(format!("question {}: {}", index + 1, reason))
        })?;
    }

    Ok(quiz)
}

fn validate_question(question: &Question) -> Result<(), String> {
    if question.options.is_empty() {
        return Err("has no answer options".to_string());
    }
    let answer = question.answer.trim();
    if !question.options.iter().any(|o| o.trim() == answer) {
        return Err(format!("answer '{}' is not one of the options", question.answer));
    }
    Ok(())
}

/// Removes code fences and a stray language tag, returning the trimmed body.
fn strip_wrapping(raw: &str) -> &str {
    let text = raw.trim();
    if text.starts_with(['{', '[']) {
        return text;
    }
    let inner = match FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        Some(block) => block.as_str(),
        // An unterminated fence, e.g. a truncated reply.
        None => text.trim_start_matches("```").trim_end_matches("```"),
    };
    strip_language_tag(inner.trim()).trim()
}

fn strip_language_tag(text: &str) -> &str {
    let Some(prefix) = text.get(..4) else {
        return text;
    };
    let rest = &text[4..];
    if prefix.eq_ignore_ascii_case("json") && rest.trim_start().starts_with(['{', '[']) {
        rest
    } else {
        text
    }
}
