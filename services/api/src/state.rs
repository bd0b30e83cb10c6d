//! Shared application state: every long-lived component is built once at
//! startup and cloned (cheaply, via `Arc`s) into the handlers that need it.

use std::sync::Arc;

use interviewer_core::insights::InsightsCompiler;
use interviewer_core::oracle::{GeminiClient, Oracle};
use interviewer_core::question::QuestionGenerator;
use interviewer_core::speech::{GeminiTts, SpeechGateway, TranslateTts};
use interviewer_core::store::{InterviewStore, MemoryStore};

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub store: InterviewStore,
    pub oracle: Arc<dyn Oracle>,
    pub questions: Arc<QuestionGenerator>,
    pub speech: Arc<SpeechGateway>,
    pub insights: Arc<InsightsCompiler>,
    pub chat_model: String,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let oracle: Arc<dyn Oracle> = Arc::new(GeminiClient::new(
            config.gemini_api_key.clone(),
            config.chat_model.clone(),
        ));

        // Primary provider is the fast unauthenticated endpoint; Gemini is
        // the richer fallback. The gateway owns the process-wide audio cache.
        let speech = Arc::new(SpeechGateway::new(
            Arc::new(TranslateTts::new()),
            Arc::new(GeminiTts::new(config.gemini_api_key.clone())),
        ));

        // The in-process store is the shipped default; durability is the
        // document-store collaborator's concern.
        let store = InterviewStore::new(Arc::new(MemoryStore::new()));

        let insights = Arc::new(InsightsCompiler::new(store.clone(), Arc::clone(&oracle)));
        let questions = Arc::new(QuestionGenerator::new(Arc::clone(&oracle)));

        Self {
            store,
            oracle,
            questions,
            speech,
            insights,
            chat_model: config.chat_model.clone(),
        }
    }
}
