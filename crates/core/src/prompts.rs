//! Prompt construction for every oracle call.
//!
//! These are pure functions so each caller's behavior can be tested against
//! the prompt text without a live oracle.

/// Prompt asking for interview questions tailored to a resume and job
/// description. The oracle is asked for strict JSON; `parser::extract_questions`
/// handles the loosely-formatted fallbacks.
pub fn questions_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        r#"You are an expert AI interviewer for job candidates. Based on the following resume and job description:

JOB DESCRIPTION:
{job_description}

RESUME:
{resume_text}

Generate 5 specific, thoughtful interview questions that assess the candidate's fit for this role.
Focus on questions that evaluate skills, experience, and problem-solving abilities relevant to the role.
Each question should be concise and clear.

Return ONLY the questions in JSON format with the key 'questions' and an array of strings.
Example: {{"questions": ["Question 1", "Question 2", ...]}}"#
    )
}

/// Prompt asking for a bare 1-10 rating of one answer.
pub fn rating_prompt(question: &str, answer: &str) -> String {
    format!(
        r#"You are an AI interviewer evaluating a candidate's response.

Question: {question}
Candidate response: {answer}

Rate the candidate's response from 1-10 based on:
- Relevance to the question
- Clarity of communication
- Depth of knowledge shown

Return ONLY a number between 1 and 10. No explanation or other text."#
    )
}

/// Prompt asking for a one-sentence bridge between two questions. The oracle
/// is told not to restate the next question; the orchestrator still checks
/// for overlap before composing the outbound turn.
pub fn transition_prompt(prev_question: &str, next_question: &str) -> String {
    format!(
        r#"You are an AI interviewer. The candidate just answered a question about: "{prev_question}"

The next question will be about: "{next_question}"

Write a very brief (1 sentence) natural transition to introduce the next topic.
Be professional but conversational. Don't analyze their previous answer.
IMPORTANT: Do NOT include or repeat the full next question in your transition.
Just create a bridge phrase like "Let's move on to talk about..." or "Now I'd like to ask about...""#
    )
}

/// Prompt asking for the narrative post-interview assessment.
/// `qa_pairs_json` is the serialized list of (question, answer, rating)
/// triples.
pub fn summary_prompt(job_description: &str, qa_pairs_json: &str) -> String {
    format!(
        r#"You are an expert HR professional reviewing a job interview.

Job Description:
{job_description}

Interview Summary:
{qa_pairs_json}

Provide a short, actionable assessment of this candidate (150-200 words max).
Include strengths, areas for improvement, and overall fit for the role."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn questions_prompt_embeds_both_inputs() {
        let prompt = questions_prompt("Rust developer, 5 years", "Backend engineer");
        assert!(prompt.contains("Rust developer, 5 years"));
        assert!(prompt.contains("Backend engineer"));
        assert!(prompt.contains("'questions'"));
    }

    #[test]
    fn rating_prompt_requests_a_bare_number() {
        let prompt = rating_prompt("Why Rust?", "Because of the borrow checker.");
        assert!(prompt.contains("Why Rust?"));
        assert!(prompt.contains("ONLY a number between 1 and 10"));
    }

    #[test]
    fn transition_prompt_forbids_restating_the_question() {
        let prompt = transition_prompt("A?", "B?");
        assert!(prompt.contains("Do NOT include or repeat the full next question"));
    }

    #[test]
    fn summary_prompt_carries_the_transcript() {
        let prompt = summary_prompt("DevOps role", r#"[{"question":"Q?","answer":"A","rating":7.0}]"#);
        assert!(prompt.contains("DevOps role"));
        assert!(prompt.contains(r#""rating":7.0"#));
    }
}
