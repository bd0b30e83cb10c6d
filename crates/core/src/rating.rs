use std::sync::Arc;

use crate::oracle::Oracle;
use crate::{parser, prompts};

/// Rating substituted whenever the oracle fails or answers unparseably.
pub const DEFAULT_RATING: f64 = 5.0;

/// Scores one answer against its question. Never fails: every degraded path
/// collapses to `DEFAULT_RATING` so a turn is never lost to a rating error.
pub struct RatingEngine {
    oracle: Arc<dyn Oracle>,
}

impl RatingEngine {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Rate `answer` against `question`, returning a score in [1, 10].
    pub async fn rate(&self, question: &str, answer: &str) -> f64 {
        let prompt = prompts::rating_prompt(question, answer);
        match self.oracle.generate(&prompt).await {
            Ok(raw) => match parser::extract_rating(&raw) {
                Some(rating) => rating.clamp(1.0, 10.0),
                None => {
                    tracing::warn!("Unparseable rating output: {raw:?}");
                    DEFAULT_RATING
                }
            },
            Err(e) => {
                tracing::error!("Rating oracle call failed: {e:?}");
                DEFAULT_RATING
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockOracle;

    fn engine_with_reply(reply: Result<&'static str, ()>) -> RatingEngine {
        let mut oracle = MockOracle::new();
        oracle.expect_generate().returning(move |_| {
            Box::pin(async move {
                match reply {
                    Ok(text) => Ok(text.to_string()),
                    Err(()) => Err(anyhow::anyhow!("oracle unavailable")),
                }
            })
        });
        RatingEngine::new(Arc::new(oracle))
    }

    #[tokio::test]
    async fn parses_a_bare_number() {
        let engine = engine_with_reply(Ok("8"));
        assert_eq!(engine.rate("Q?", "A").await, 8.0);
    }

    #[tokio::test]
    async fn parses_a_number_embedded_in_chatter() {
        let engine = engine_with_reply(Ok("I would rate this 7 overall."));
        assert_eq!(engine.rate("Q?", "A").await, 7.0);
    }

    #[tokio::test]
    async fn unparseable_output_defaults() {
        let engine = engine_with_reply(Ok("excellent answer!"));
        assert_eq!(engine.rate("Q?", "A").await, DEFAULT_RATING);
    }

    #[tokio::test]
    async fn oracle_failure_defaults() {
        let engine = engine_with_reply(Err(()));
        assert_eq!(engine.rate("Q?", "A").await, DEFAULT_RATING);
    }
}
