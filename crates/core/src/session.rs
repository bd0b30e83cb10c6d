//! The per-interview session orchestrator.
//!
//! One `InterviewSession` drives one interview over a live connection: it
//! emits the current question on open, then processes inbound turns strictly
//! sequentially (the `&mut self` entry points make a second in-flight turn on
//! the same session unrepresentable). Every downstream call (rating,
//! transition, synthesis, summary) may fail without corrupting interview
//! progress.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::insights::InsightsCompiler;
use crate::interview::{InterviewStatus, Turn};
use crate::oracle::Oracle;
use crate::rating::{DEFAULT_RATING, RatingEngine};
use crate::speech::SpeechGateway;
use crate::store::InterviewStore;
use crate::transition::TransitionGenerator;

/// Transcript placeholder some clients send while speech recognition is
/// still listening; never recorded as an answer.
pub const LISTENING_PLACEHOLDER: &str = "[ Listening... ]";

/// Closing message for the final turn. Text-only: the closing turn never
/// gets a synthesis call.
pub const CLOSING_MESSAGE: &str =
    "Thank you for completing this interview. Your responses have been recorded.";

/// Voice used for the opening question when the client has not asked for one.
const DEFAULT_OPEN_VOICE: &str = "Callum";

/// Synthesis wait for the opening question.
const OPEN_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(8);

/// Synthesis wait per subsequent turn, slightly tighter to catch problem
/// audio earlier once the conversation is flowing.
const TURN_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(7);

/// Above this word-overlap ratio the transition is assumed to already carry
/// the next question's substance.
const OVERLAP_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Audio,
}

/// Inbound per-turn message from the duplex channel.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(rename = "voiceStyle", default)]
    pub voice_style: Option<String>,
}

impl InboundMessage {
    /// Resolve the effective transcript: explicit transcription for audio,
    /// the content field for text. Audio without a transcription has no
    /// transcript (server-side transcription is out of scope).
    pub fn effective_transcript(&self) -> Option<String> {
        match self.kind {
            MessageKind::Audio => self.transcription.clone(),
            MessageKind::Text => Some(self.content.clone()),
        }
    }
}

/// Outbound message to the caller. Serializes with a `role` tag so the wire
/// shape matches the transcript entries clients already render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum OutboundMessage {
    Assistant {
        content: String,
        /// Base64 mp3, empty when synthesis was skipped, failed or timed out.
        audio: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        rating: Option<f64>,
        #[serde(rename = "interviewComplete", skip_serializing_if = "Option::is_none")]
        interview_complete: Option<bool>,
    },
    System {
        content: String,
    },
}

impl OutboundMessage {
    pub fn notice(content: impl Into<String>) -> Self {
        OutboundMessage::System {
            content: content.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            OutboundMessage::Assistant {
                interview_complete: Some(true),
                ..
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingFirstQuestion,
    AwaitingUserTurn,
    ProcessingUserTurn,
    Completed,
}

/// The three distinguishable ways a session fails to open, surfaced to the
/// transport so it can close the channel with a matching code.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Interview not found: {0}")]
    NotFound(String),
    #[error("Interview already completed: {0}")]
    AlreadyComplete(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct InterviewSession {
    interview_id: String,
    state: SessionState,
    store: InterviewStore,
    ratings: RatingEngine,
    transitions: TransitionGenerator,
    speech: Arc<SpeechGateway>,
    insights: Arc<InsightsCompiler>,
}

impl InterviewSession {
    pub fn new(
        interview_id: impl Into<String>,
        store: InterviewStore,
        oracle: Arc<dyn Oracle>,
        speech: Arc<SpeechGateway>,
        insights: Arc<InsightsCompiler>,
    ) -> Self {
        Self {
            interview_id: interview_id.into(),
            state: SessionState::AwaitingFirstQuestion,
            ratings: RatingEngine::new(Arc::clone(&oracle)),
            transitions: TransitionGenerator::new(oracle),
            store,
            speech,
            insights,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Open the session: load the interview and emit the question at the
    /// current index. The assistant turn is appended to history before any
    /// synthesis wait, so text delivery never depends on audio.
    pub async fn open(&mut self) -> Result<OutboundMessage, SessionError> {
        let interview = self
            .store
            .load(&self.interview_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(self.interview_id.clone()))?;

        if interview.is_complete() {
            self.state = SessionState::Completed;
            return Err(SessionError::AlreadyComplete(self.interview_id.clone()));
        }

        let question = interview
            .current_question()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Interview has no questions: {}", self.interview_id))?;

        if interview.status == InterviewStatus::Pending {
            self.store
                .set_status(&self.interview_id, InterviewStatus::InProgress)
                .await?;
        }

        tracing::info!(
            "Opening interview {} at question {}/{}",
            self.interview_id,
            interview.question_index + 1,
            interview.questions.len()
        );

        self.store
            .append_turn(&self.interview_id, &Turn::assistant(question.clone()))
            .await?;

        let audio = self
            .synthesize_bounded(&question, Some(DEFAULT_OPEN_VOICE), OPEN_SYNTHESIS_TIMEOUT)
            .await;

        self.state = SessionState::AwaitingUserTurn;
        Ok(OutboundMessage::Assistant {
            content: question,
            audio,
            rating: None,
            interview_complete: None,
        })
    }

    /// Sole per-turn entry point. Never fails outward: malformed payloads,
    /// invalid transcripts and internal errors all come back as system
    /// notices and leave the session open for the next turn.
    pub async fn submit_turn(&mut self, raw: &str) -> OutboundMessage {
        match self.state {
            SessionState::Completed => {
                return OutboundMessage::notice("The interview has already concluded.");
            }
            SessionState::AwaitingFirstQuestion => {
                return OutboundMessage::notice("The session has not been opened yet.");
            }
            SessionState::AwaitingUserTurn | SessionState::ProcessingUserTurn => {}
        }

        let Ok(message) = serde_json::from_str::<InboundMessage>(raw) else {
            tracing::warn!("Unparseable message on {}", self.interview_id);
            return OutboundMessage::notice("Invalid message format. Please try again.");
        };

        let transcript = match message.effective_transcript() {
            Some(t) if !t.trim().is_empty() && t.trim() != LISTENING_PLACEHOLDER => {
                t.trim().to_string()
            }
            _ => {
                return OutboundMessage::notice(
                    "No valid response received. Please try speaking again or use the text input option.",
                );
            }
        };

        self.state = SessionState::ProcessingUserTurn;
        match self
            .advance(&transcript, message.voice_style.as_deref())
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Error processing turn for {}: {e:?}", self.interview_id);
                self.state = SessionState::AwaitingUserTurn;
                OutboundMessage::notice(
                    "An error occurred while processing your response. Please try again.",
                )
            }
        }
    }

    /// Record one accepted user turn and produce the next assistant turn.
    async fn advance(
        &mut self,
        transcript: &str,
        voice: Option<&str>,
    ) -> anyhow::Result<OutboundMessage> {
        let interview = self
            .store
            .load(&self.interview_id)
            .await?
            .ok_or_else(|| anyhow!("Interview disappeared: {}", self.interview_id))?;

        if interview.is_complete() {
            // The store can be ahead of this session (e.g. a concurrent
            // session finished the interview). Honor the terminal state.
            self.state = SessionState::Completed;
            return Ok(OutboundMessage::notice(
                "The interview has already concluded.",
            ));
        }

        let question_index = interview.question_index;
        let turn_position = interview.history.len();

        // The user turn goes in first; its rating is annotated onto the same
        // record below, before anything reads it back.
        self.store
            .append_turn(&self.interview_id, &Turn::user(transcript))
            .await?;

        // Rate against the question being answered, i.e. before the index
        // advances.
        let rating = match interview.current_question() {
            Some(question) => self.ratings.rate(question, transcript).await,
            None => DEFAULT_RATING,
        };
        tracing::info!(
            "Rated answer {}/{} on {}: {rating}",
            question_index + 1,
            interview.questions.len(),
            self.interview_id
        );

        // Rating, index increment and turn annotation are one logical step.
        self.store
            .complete_user_turn(&self.interview_id, question_index, turn_position, rating)
            .await?;

        let next_index = question_index + 1;
        if let Some(next_question) = interview.questions.get(next_index) {
            let prev_question = &interview.questions[question_index];
            let transition = self.transitions.bridge(prev_question, next_question).await;
            let content = compose_next_message(&transition, next_question);

            // Text is durable and ready to send before synthesis starts.
            self.store
                .append_turn(&self.interview_id, &Turn::assistant(content.clone()))
                .await?;

            let audio = self
                .synthesize_bounded(&content, voice, TURN_SYNTHESIS_TIMEOUT)
                .await;

            self.state = SessionState::AwaitingUserTurn;
            Ok(OutboundMessage::Assistant {
                content,
                audio,
                rating: Some(rating),
                interview_complete: None,
            })
        } else {
            // Closing turn: text only, no synthesis call.
            self.store
                .append_turn(&self.interview_id, &Turn::closing(CLOSING_MESSAGE))
                .await?;
            self.store.mark_completed(&self.interview_id).await?;

            let compiler = Arc::clone(&self.insights);
            let interview_id = self.interview_id.clone();
            tokio::spawn(async move {
                if let Err(e) = compiler.compile(&interview_id).await {
                    tracing::error!("Insights compilation failed for {interview_id}: {e:?}");
                }
            });

            tracing::info!("Interview {} completed", self.interview_id);
            self.state = SessionState::Completed;
            Ok(OutboundMessage::Assistant {
                content: CLOSING_MESSAGE.to_string(),
                audio: String::new(),
                rating: Some(rating),
                interview_complete: Some(true),
            })
        }
    }

    /// Run synthesis as a cancellable background task and wait at most
    /// `limit` for it. Timeouts and failures degrade to empty audio.
    async fn synthesize_bounded(
        &self,
        text: &str,
        voice: Option<&str>,
        limit: Duration,
    ) -> String {
        let speech = Arc::clone(&self.speech);
        let text = text.to_string();
        let voice = voice.map(str::to_string);
        let mut task = tokio::spawn(async move { speech.synthesize(&text, voice.as_deref()).await });

        match tokio::time::timeout(limit, &mut task).await {
            Ok(Ok(Some(bytes))) => BASE64.encode(bytes),
            Ok(Ok(None)) => {
                tracing::warn!("Synthesis produced no audio for {}", self.interview_id);
                String::new()
            }
            Ok(Err(e)) => {
                tracing::error!("Synthesis task failed for {}: {e:?}", self.interview_id);
                String::new()
            }
            Err(_) => {
                task.abort();
                tracing::warn!(
                    "Synthesis timed out after {limit:?} for {}",
                    self.interview_id
                );
                String::new()
            }
        }
    }
}

/// Fraction of the next question's words already present in the transition,
/// case-insensitive, tokens trimmed of edge punctuation.
pub fn overlap_ratio(next_question: &str, transition: &str) -> f64 {
    let next_words = words(next_question);
    if next_words.is_empty() {
        return 0.0;
    }
    let transition_words = words(transition);
    let overlap = next_words.intersection(&transition_words).count();
    overlap as f64 / next_words.len() as f64
}

fn words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Compose the next outbound content: the transition alone when it already
/// implies the question, otherwise transition plus question.
fn compose_next_message(transition: &str, next_question: &str) -> String {
    if transition.is_empty() {
        return next_question.to_string();
    }
    if overlap_ratio(next_question, transition) > OVERLAP_THRESHOLD {
        tracing::debug!("Transition already carries the next question, sending it alone");
        transition.to_string()
    } else {
        format!("{transition} {next_question}")
    }
}
