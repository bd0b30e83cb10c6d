//! The interview aggregate and its turn history.
//!
//! An `Interview` is the root document persisted in the store: a fixed list of
//! questions, an append-only history of turns, and the bookkeeping the session
//! orchestrator and the insights compiler read and advance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Who produced a turn. `System` turns are error/status notices and do not
/// consume a question slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
    System,
}

/// One entry in the interview history. Immutable once appended, except that a
/// rating may be annotated onto the most recent user turn before any
/// subsequent read treats it as final.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(rename = "final", skip_serializing_if = "Option::is_none")]
    pub is_final: Option<bool>,
}

impl Turn {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            rating: None,
            is_final: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            rating: None,
            is_final: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            rating: None,
            is_final: None,
        }
    }

    /// The closing assistant turn that terminates an interview.
    pub fn closing(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            rating: None,
            is_final: Some(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    CompletedWithErrors,
}

/// Aggregated metrics computed by the insights compiler once an interview is
/// complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub average_rating: f64,
    pub questions_answered: usize,
    pub total_questions: usize,
    pub key_strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<String>,
}

/// Candidate-facing bookkeeping stored alongside the interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDetails {
    pub interview_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_question_answered: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
}

/// How many characters of the resume are kept as the short summary field.
const RESUME_SUMMARY_CHARS: usize = 500;

/// The root aggregate. Mutated only through the session orchestrator; the
/// history is append-only and never reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    pub interview_id: String,
    pub questions: Vec<String>,
    #[serde(default)]
    pub history: Vec<Turn>,
    #[serde(default)]
    pub question_index: usize,
    pub job_description: String,
    pub resume_summary: String,
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub status: InterviewStatus,
    /// Ratings keyed `q{index}`, mirroring how they are set in the store.
    #[serde(default)]
    pub ratings: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub candidate_details: CandidateDetails,
    pub created_at: String,
}

impl Interview {
    pub fn new(
        interview_id: impl Into<String>,
        questions: Vec<String>,
        job_description: impl Into<String>,
        resume_text: impl Into<String>,
    ) -> Self {
        let resume_text = resume_text.into();
        let now = now_iso();
        Self {
            interview_id: interview_id.into(),
            questions,
            history: Vec::new(),
            question_index: 0,
            job_description: job_description.into(),
            resume_summary: summarize_resume(&resume_text),
            resume_text,
            status: InterviewStatus::Pending,
            ratings: BTreeMap::new(),
            summary: None,
            candidate_details: CandidateDetails {
                interview_date: now.clone(),
                completion_date: None,
                last_question_answered: None,
                last_update: None,
                insights: None,
            },
            created_at: now,
        }
    }

    /// The question the next user turn answers, if any remain.
    pub fn current_question(&self) -> Option<&str> {
        self.questions.get(self.question_index).map(String::as_str)
    }

    /// `question_index == len(questions)` marks the terminal state.
    pub fn is_complete(&self) -> bool {
        self.question_index >= self.questions.len()
    }

    /// Key used for the ratings map, e.g. `q3` for the fourth question.
    pub fn rating_key(index: usize) -> String {
        format!("q{index}")
    }
}

fn summarize_resume(resume_text: &str) -> String {
    if resume_text.chars().count() > RESUME_SUMMARY_CHARS {
        let head: String = resume_text.chars().take(RESUME_SUMMARY_CHARS).collect();
        format!("{head}...")
    } else {
        resume_text.to_string()
    }
}

/// Current time as an RFC 3339 string, the timestamp format persisted
/// throughout the store.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_serializes_final_under_its_wire_name() {
        let turn = Turn::closing("Thank you.");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["final"], serde_json::json!(true));
        assert_eq!(json["role"], serde_json::json!("assistant"));
        assert!(json.get("rating").is_none());
    }

    #[test]
    fn turn_omits_absent_rating_and_final() {
        let json = serde_json::to_value(Turn::user("hello")).unwrap();
        assert!(json.get("rating").is_none());
        assert!(json.get("final").is_none());
    }

    #[test]
    fn status_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&InterviewStatus::CompletedWithErrors).unwrap();
        assert_eq!(json, "\"completed_with_errors\"");
    }

    #[test]
    fn long_resumes_are_truncated_into_the_summary() {
        let resume = "x".repeat(800);
        let interview = Interview::new("int_1", vec!["Q?".into()], "job", resume);
        assert_eq!(interview.resume_summary.chars().count(), 503);
        assert!(interview.resume_summary.ends_with("..."));
        assert_eq!(interview.resume_text.len(), 800);
    }

    #[test]
    fn completion_tracks_question_index() {
        let mut interview = Interview::new("int_2", vec!["A?".into(), "B?".into()], "job", "cv");
        assert!(!interview.is_complete());
        assert_eq!(interview.current_question(), Some("A?"));
        interview.question_index = 2;
        assert!(interview.is_complete());
        assert_eq!(interview.current_question(), None);
    }
}
