//! Parsers for loosely-structured oracle output.
//!
//! The oracle is an unreliable remote function: it may answer with strict
//! JSON, JSON wrapped in markdown fences, a numbered list, or garbage. Each
//! parser here degrades through those shapes and is testable without the
//! oracle itself.

use std::sync::LazyLock;

use regex::Regex;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:\d+\.|\*|\-)\s+").unwrap());

static RATING_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([1-9]|10)\b").unwrap());

/// Extract a question list from oracle output.
///
/// Strategy (a): a JSON object with a `questions` array, fenced or bare.
/// Strategy (b): line-based extraction of lines that end in `?` or carry a
/// numbered/bulleted list marker.
/// Strategy (c): nothing recognizable, an empty list.
pub fn extract_questions(raw: &str) -> Vec<String> {
    let json_text = FENCED_JSON
        .captures(raw)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| raw.trim().to_string());

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&json_text) {
        if let Some(arr) = value.get("questions").and_then(|q| q.as_array()) {
            let questions: Vec<String> = arr
                .iter()
                .filter_map(|q| q.as_str())
                .map(str::to_string)
                .collect();
            if !questions.is_empty() {
                return questions;
            }
        }
    }

    raw.lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with('{')
                && !line.ends_with('}')
                && !line.starts_with("```")
        })
        .filter(|line| line.ends_with('?') || LIST_MARKER.is_match(line))
        .map(|line| LIST_MARKER.replace(line, "").to_string())
        .collect()
}

/// Extract the first standalone integer token in [1,10].
pub fn extract_rating(raw: &str) -> Option<f64> {
    RATING_TOKEN
        .captures(raw)
        .and_then(|c| c[1].parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strict_json() {
        let raw = r#"{"questions": ["What is Rust?", "Why async?"]}"#;
        assert_eq!(extract_questions(raw), vec!["What is Rust?", "Why async?"]);
    }

    #[test]
    fn parses_json_inside_markdown_fences() {
        let raw = "Here you go:\n```json\n{\"questions\": [\"Tell me about borrowing?\"]}\n```";
        assert_eq!(extract_questions(raw), vec!["Tell me about borrowing?"]);
    }

    #[test]
    fn falls_back_to_line_extraction() {
        let raw = "1. What drew you to this role?\n2. Describe a hard bug.\nnot a question line";
        assert_eq!(
            extract_questions(raw),
            vec!["What drew you to this role?", "Describe a hard bug."]
        );
    }

    #[test]
    fn keeps_unmarked_lines_that_end_in_a_question_mark() {
        let raw = "How do you test async code?\nrandom filler";
        assert_eq!(extract_questions(raw), vec!["How do you test async code?"]);
    }

    #[test]
    fn total_garbage_yields_nothing() {
        assert!(extract_questions("I cannot help with that.").is_empty());
        assert!(extract_questions("").is_empty());
    }

    #[test]
    fn rating_takes_the_first_valid_token() {
        assert_eq!(extract_rating("8"), Some(8.0));
        assert_eq!(extract_rating("I'd say 7 out of 10"), Some(7.0));
        assert_eq!(extract_rating("10"), Some(10.0));
    }

    #[test]
    fn rating_rejects_out_of_range_and_empty_output() {
        assert_eq!(extract_rating("0"), None);
        assert_eq!(extract_rating("eleven"), None);
        assert_eq!(extract_rating(""), None);
    }
}
