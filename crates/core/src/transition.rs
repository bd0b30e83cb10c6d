use std::sync::Arc;

use crate::oracle::Oracle;
use crate::prompts;

/// Bridge used whenever the oracle cannot supply one. Deliberately generic so
/// it never duplicates the upcoming question.
pub const FALLBACK_TRANSITION: &str = "Let's move to the next question.";

/// Produces a short bridging phrase between consecutive questions. Never
/// fails; overlap detection against the next question is the orchestrator's
/// job, not this component's.
pub struct TransitionGenerator {
    oracle: Arc<dyn Oracle>,
}

impl TransitionGenerator {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    pub async fn bridge(&self, prev_question: &str, next_question: &str) -> String {
        let prompt = prompts::transition_prompt(prev_question, next_question);
        match self.oracle.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => FALLBACK_TRANSITION.to_string(),
            Err(e) => {
                tracing::error!("Transition oracle call failed: {e:?}");
                FALLBACK_TRANSITION.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockOracle;

    #[tokio::test]
    async fn trims_the_oracle_bridge() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_generate()
            .returning(|_| Box::pin(async { Ok("  Now, about your backend work.  ".to_string()) }));

        let transitions = TransitionGenerator::new(Arc::new(oracle));
        assert_eq!(
            transitions.bridge("A?", "B?").await,
            "Now, about your backend work."
        );
    }

    #[tokio::test]
    async fn blank_or_failed_oracle_uses_the_fallback() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_generate()
            .returning(|_| Box::pin(async { Ok("   ".to_string()) }))
            .times(1);
        oracle
            .expect_generate()
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("down")) }))
            .times(1);

        let transitions = TransitionGenerator::new(Arc::new(oracle));
        assert_eq!(transitions.bridge("A?", "B?").await, FALLBACK_TRANSITION);
        assert_eq!(transitions.bridge("A?", "B?").await, FALLBACK_TRANSITION);
    }
}
