//! Post-interview insights: rating statistics, strengths/improvements, and
//! the narrative summary.
//!
//! Compilation is idempotent with respect to an already-set summary and is
//! normally triggered as a detached task when the closing turn goes out; the
//! HTTP insights endpoint calls the same entry point.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::Value;

use crate::interview::{Insights, Interview, InterviewStatus, Turn, now_iso};
use crate::oracle::Oracle;
use crate::prompts;
use crate::store::InterviewStore;

/// Summary reported while answers are still outstanding.
pub const IN_PROGRESS_SUMMARY: &str =
    "Interview not yet completed. Summary will be available when all questions are answered.";

/// Summary persisted when the narrative oracle call fails; the interview is
/// still resolved, just flagged.
pub const FAILED_SUMMARY: &str =
    "Summary generation failed. Please review the transcript manually.";

/// Ratings at or above this mark a question topic as a strength.
const STRENGTH_THRESHOLD: f64 = 8.0;
/// Ratings at or below this mark a question topic as an improvement area.
const IMPROVEMENT_THRESHOLD: f64 = 4.0;
/// Strength/improvement lists are capped at this many entries.
const TOPIC_CAP: usize = 3;
/// Question topics are truncated to this many characters.
const TOPIC_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
    pub rating: Option<f64>,
}

/// What the insights entry point returns to callers.
#[derive(Debug, Clone, Serialize)]
pub struct InsightsReport {
    pub transcript: Vec<Turn>,
    pub questions: Vec<String>,
    pub summary: String,
    pub candidate_details: Value,
}

pub struct InsightsCompiler {
    store: InterviewStore,
    oracle: Arc<dyn Oracle>,
}

impl InsightsCompiler {
    pub fn new(store: InterviewStore, oracle: Arc<dyn Oracle>) -> Self {
        Self { store, oracle }
    }

    /// Compile insights for an interview. Returns `None` for an unknown id.
    ///
    /// An existing summary is returned unchanged. A complete history (every
    /// question paired with an answer) triggers one generation pass; anything
    /// less reports the in-progress placeholder and marks the interview
    /// `in_progress`.
    pub async fn compile(&self, interview_id: &str) -> Result<Option<InsightsReport>> {
        let Some(interview) = self.store.load(interview_id).await? else {
            return Ok(None);
        };

        let summary = if let Some(existing) = &interview.summary {
            existing.clone()
        } else if interview.history.len() >= interview.questions.len() * 2 {
            match self.generate(&interview).await {
                Ok((summary, insights)) => {
                    self.store
                        .store_summary(
                            interview_id,
                            &summary,
                            InterviewStatus::Completed,
                            Some(&insights),
                        )
                        .await?;
                    summary
                }
                Err(e) => {
                    tracing::error!("Summary generation failed for {interview_id}: {e:?}");
                    self.store
                        .store_summary(
                            interview_id,
                            FAILED_SUMMARY,
                            InterviewStatus::CompletedWithErrors,
                            None,
                        )
                        .await?;
                    FAILED_SUMMARY.to_string()
                }
            }
        } else {
            self.store
                .set_status(interview_id, InterviewStatus::InProgress)
                .await?;
            IN_PROGRESS_SUMMARY.to_string()
        };

        // Re-read so the report reflects what was just persisted.
        let updated = self
            .store
            .load(interview_id)
            .await?
            .ok_or_else(|| anyhow!("Interview disappeared: {interview_id}"))?;

        Ok(Some(InsightsReport {
            candidate_details: candidate_details_view(&updated)?,
            transcript: updated.history,
            questions: updated.questions,
            summary,
        }))
    }

    /// One generation pass over a complete history: statistics from the
    /// paired turns, then the narrative from the oracle.
    async fn generate(&self, interview: &Interview) -> Result<(String, Insights)> {
        let mut qa_pairs = Vec::new();
        let mut total = 0.0;
        let mut rated = 0usize;
        let mut key_strengths = Vec::new();
        let mut areas_for_improvement = Vec::new();

        // Pair consecutive (assistant, user) turns by position.
        for pair in interview.history.chunks(2) {
            let [question, answer] = pair else { break };
            let rating = answer.rating;
            if let Some(rating) = rating {
                total += rating;
                rated += 1;
                if rating >= STRENGTH_THRESHOLD {
                    key_strengths.push(topic_of(&question.content));
                } else if rating <= IMPROVEMENT_THRESHOLD {
                    areas_for_improvement.push(topic_of(&question.content));
                }
            }
            qa_pairs.push(QaPair {
                question: question.content.clone(),
                answer: answer.content.clone(),
                rating,
            });
        }

        let average_rating = if rated > 0 { total / rated as f64 } else { 0.0 };
        key_strengths.truncate(TOPIC_CAP);
        areas_for_improvement.truncate(TOPIC_CAP);

        let qa_json =
            serde_json::to_string_pretty(&qa_pairs).context("Failed to serialize Q&A pairs")?;
        let summary = self
            .oracle
            .generate(&prompts::summary_prompt(&interview.job_description, &qa_json))
            .await?;

        let insights = Insights {
            average_rating,
            questions_answered: rated,
            total_questions: interview.questions.len(),
            key_strengths,
            areas_for_improvement,
            completion_date: Some(now_iso()),
        };

        Ok((summary.trim().to_string(), insights))
    }
}

/// The candidate-details object reported to callers: the stored details plus
/// the authoritative interview status.
fn candidate_details_view(interview: &Interview) -> Result<Value> {
    let mut details = serde_json::to_value(&interview.candidate_details)
        .context("Failed to serialize candidate details")?;
    if let Some(map) = details.as_object_mut() {
        map.insert("status".to_string(), serde_json::to_value(interview.status)?);
    }
    Ok(details)
}

/// Topic label for a question: everything before its first `?`, truncated.
fn topic_of(question: &str) -> String {
    let topic = question.split('?').next().unwrap_or_default().trim();
    if topic.chars().count() > TOPIC_CHARS {
        let head: String = topic.chars().take(TOPIC_CHARS).collect();
        format!("{head}...")
    } else {
        topic.to_string()
    }
}
