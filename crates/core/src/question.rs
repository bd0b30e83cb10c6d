//! Question normalization, the canned fallback set, and oracle-backed
//! generation.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::oracle::Oracle;
use crate::{parser, prompts};

/// Every interview carries at least this many questions; short or failed
/// generations are padded from `FALLBACK_QUESTIONS`.
pub const MIN_QUESTIONS: usize = 5;

/// Canned questions used when the oracle returns too few.
pub const FALLBACK_QUESTIONS: [&str; 5] = [
    "Tell me about your relevant experience for this role?",
    "What technical skills do you have that match this position?",
    "Describe a challenging project you've worked on and how you handled it?",
    "How do you handle tight deadlines and pressure?",
    "What interests you most about this role and company?",
];

static NUMBERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\.|\[?\d+\]?|Q\d+:?|Question\s+\d+:?)\s*").unwrap());

/// Canonicalize raw generated question text: strip list numbering and
/// symmetric quoting, enforce terminal punctuation, capitalize the first
/// letter. Empty input stays empty.
pub fn normalize(raw: &str) -> String {
    let mut cleaned = NUMBERING.replace(raw.trim(), "").to_string();
    cleaned = strip_symmetric_quotes(&cleaned).to_string();

    if !cleaned.is_empty()
        && !cleaned.ends_with('?')
        && !cleaned.ends_with('.')
        && !cleaned.ends_with('!')
        && !cleaned.ends_with(':')
    {
        cleaned.push('?');
    }

    capitalize_first(&cleaned)
}

fn strip_symmetric_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        let stripped = text
            .strip_prefix(quote)
            .and_then(|t| t.strip_suffix(quote));
        if let Some(inner) = stripped {
            return inner;
        }
    }
    text
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Top a question list up to `MIN_QUESTIONS` with canned fallbacks. Each
/// missing slot takes the fallback at its own index, so a partial generation
/// keeps its questions and the padding stays deterministic.
pub fn pad_with_fallbacks(mut questions: Vec<String>) -> Vec<String> {
    while questions.len() < MIN_QUESTIONS {
        match FALLBACK_QUESTIONS.get(questions.len()) {
            Some(fallback) => questions.push((*fallback).to_string()),
            None => break,
        }
    }
    questions
}

/// Oracle-backed question generation. Failures never surface: a dead oracle
/// yields an empty list and creation pads from the fallback set.
pub struct QuestionGenerator {
    oracle: Arc<dyn Oracle>,
}

impl QuestionGenerator {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    pub async fn generate(&self, resume_text: &str, job_description: &str) -> Vec<String> {
        let prompt = prompts::questions_prompt(resume_text, job_description);
        let raw = match self.oracle.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Question generation failed: {e:?}");
                return Vec::new();
            }
        };

        parser::extract_questions(&raw)
            .iter()
            .map(|q| normalize(q))
            .filter(|q| !q.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockOracle;

    #[test]
    fn normalize_strips_numbering_variants() {
        assert_eq!(normalize("1. What is Rust?"), "What is Rust?");
        assert_eq!(normalize("[2] What is Rust?"), "What is Rust?");
        assert_eq!(normalize("Q3: What is Rust?"), "What is Rust?");
        assert_eq!(normalize("Question 4: What is Rust?"), "What is Rust?");
    }

    #[test]
    fn normalize_strips_symmetric_quotes_only() {
        assert_eq!(normalize("\"What is Rust?\""), "What is Rust?");
        assert_eq!(normalize("'What is Rust?'"), "What is Rust?");
        assert_eq!(normalize("\"unbalanced"), "\"unbalanced?");
    }

    #[test]
    fn normalize_appends_a_question_mark_when_unpunctuated() {
        assert_eq!(normalize("tell me about yourself"), "Tell me about yourself?");
        // Existing terminal punctuation is left alone.
        assert_eq!(normalize("Describe a hard bug."), "Describe a hard bug.");
    }

    #[test]
    fn normalize_capitalizes_and_handles_empty() {
        assert_eq!(normalize("what is ownership?"), "What is ownership?");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn padding_tops_up_to_the_minimum() {
        let padded = pad_with_fallbacks(vec!["A?".into(), "B?".into(), "C?".into()]);
        assert_eq!(padded.len(), MIN_QUESTIONS);
        assert_eq!(padded[3], FALLBACK_QUESTIONS[3]);
        assert_eq!(padded[4], FALLBACK_QUESTIONS[4]);
    }

    #[test]
    fn padding_leaves_full_lists_alone() {
        let full: Vec<String> = (0..6).map(|i| format!("Q{i}?")).collect();
        assert_eq!(pad_with_fallbacks(full.clone()), full);
    }

    #[test]
    fn empty_generation_pads_to_the_entire_fallback_set() {
        let padded = pad_with_fallbacks(Vec::new());
        assert_eq!(padded.len(), MIN_QUESTIONS);
        assert_eq!(padded[0], FALLBACK_QUESTIONS[0]);
    }

    #[tokio::test]
    async fn generator_normalizes_oracle_output() {
        let mut oracle = MockOracle::new();
        oracle.expect_generate().returning(|_| {
            Box::pin(async {
                Ok(r#"{"questions": ["1. what is Rust", "\"Why async?\""]}"#.to_string())
            })
        });

        let generator = QuestionGenerator::new(Arc::new(oracle));
        let questions = generator.generate("resume", "job").await;
        assert_eq!(questions, vec!["What is Rust?", "Why async?"]);
    }

    #[tokio::test]
    async fn generator_swallows_oracle_failure() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_generate()
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("oracle down")) }));

        let generator = QuestionGenerator::new(Arc::new(oracle));
        assert!(generator.generate("resume", "job").await.is_empty());
    }
}
