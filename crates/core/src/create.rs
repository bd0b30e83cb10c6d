//! Interview creation: the entry call that turns a resume and job
//! description into a persisted interview with its question list.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::interview::Interview;
use crate::question::{QuestionGenerator, pad_with_fallbacks};
use crate::store::InterviewStore;

#[derive(Debug, Clone, Serialize)]
pub struct CreatedInterview {
    pub interview_id: String,
    pub questions: Vec<String>,
}

/// Generate questions, pad to the guaranteed minimum, and persist the new
/// interview aggregate. Question-generation failure is absorbed by the
/// fallback set; only a store failure propagates.
pub async fn create_interview(
    store: &InterviewStore,
    generator: &QuestionGenerator,
    resume_text: &str,
    job_description: &str,
) -> Result<CreatedInterview> {
    let generated = generator.generate(resume_text, job_description).await;
    let questions = pad_with_fallbacks(generated);

    let interview_id = new_interview_id();
    let interview = Interview::new(
        interview_id.clone(),
        questions.clone(),
        job_description,
        resume_text,
    );
    store
        .create(&interview)
        .await
        .context("Failed to persist new interview")?;

    tracing::info!(
        "Created interview {interview_id} with {} questions",
        questions.len()
    );
    Ok(CreatedInterview {
        interview_id,
        questions,
    })
}

fn new_interview_id() -> String {
    format!("int_{:016x}", rand::random::<u64>())
}
