//! Speech synthesis gateway: cache, voice mapping, and the two-provider
//! fallback chain.
//!
//! The gateway never errors and never blocks beyond the providers themselves;
//! callers bound the total wait with their own timeout and treat `None` (or a
//! timeout) as a degraded, text-only response.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
#[cfg(test)]
use mockall::automock;
use tokio::sync::Mutex;

/// Friendly voice names exposed to clients, mapped to provider voice
/// identifiers. Unrecognized names fall back to the default identifier.
pub const VOICE_MAP: &[(&str, &str)] = &[
    ("Nova", "en-US-Neural2-F"),
    ("Orion", "en-US-Neural2-D"),
    ("Capella", "en-GB-Neural2-F"),
    ("Callum", "en-GB-Neural2-D"),
];

pub const DEFAULT_VOICE_ID: &str = "en-US-Neural2-F";

/// Cached clips kept per process. The cache is explicit state owned by the
/// gateway, created once at startup and never reset mid-process; once full,
/// new clips are served but not retained.
const CACHE_CAPACITY: usize = 256;

pub fn voice_id(name: Option<&str>) -> &'static str {
    name.and_then(|n| VOICE_MAP.iter().find(|(k, _)| *k == n))
        .map(|(_, v)| *v)
        .unwrap_or(DEFAULT_VOICE_ID)
}

#[async_trait]
#[cfg_attr(test, automock)]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

pub struct SpeechGateway {
    primary: Arc<dyn SpeechProvider>,
    secondary: Arc<dyn SpeechProvider>,
    cache: Mutex<HashMap<String, Vec<u8>>>,
}

impl SpeechGateway {
    pub fn new(primary: Arc<dyn SpeechProvider>, secondary: Arc<dyn SpeechProvider>) -> Self {
        Self {
            primary,
            secondary,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Turn text into audio bytes: cache, then primary, then secondary, then
    /// `None`. Successes from either provider populate the cache.
    pub async fn synthesize(&self, text: &str, voice: Option<&str>) -> Option<Vec<u8>> {
        if text.is_empty() {
            return None;
        }

        let key = format!("{}:{}", text, voice.unwrap_or("default"));
        if let Some(hit) = self.cache.lock().await.get(&key) {
            tracing::debug!("Using cached audio for voice {:?}", voice);
            return Some(hit.clone());
        }

        let voice_id = voice_id(voice);
        for provider in [&self.primary, &self.secondary] {
            match provider.synthesize(text, voice_id).await {
                Ok(bytes) if !bytes.is_empty() => {
                    let mut cache = self.cache.lock().await;
                    if cache.len() < CACHE_CAPACITY {
                        cache.insert(key, bytes.clone());
                    }
                    return Some(bytes);
                }
                Ok(_) => {
                    tracing::warn!("{} returned empty audio", provider.name());
                }
                Err(e) => {
                    tracing::warn!("{} synthesis failed: {e:?}", provider.name());
                }
            }
        }

        None
    }
}

fn translate_lang(voice_id: &str) -> &'static str {
    if voice_id.starts_with("en-GB") { "en-gb" } else { "en" }
}

/// Primary provider: the Google Translate TTS endpoint. Fast, no auth, mp3
/// out.
pub struct TranslateTts {
    client: reqwest::Client,
}

impl TranslateTts {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for TranslateTts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechProvider for TranslateTts {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get("https://translate.google.com/translate_tts")
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", translate_lang(voice_id)),
                ("q", text),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.bytes().await?.to_vec())
    }

    fn name(&self) -> &'static str {
        "translate-tts"
    }
}

#[derive(Debug, serde::Deserialize)]
struct TtsResponse {
    #[serde(default)]
    candidates: Vec<TtsCandidate>,
}

#[derive(Debug, serde::Deserialize)]
struct TtsCandidate {
    content: TtsContent,
}

#[derive(Debug, serde::Deserialize)]
struct TtsContent {
    #[serde(default)]
    parts: Vec<TtsPart>,
}

#[derive(Debug, serde::Deserialize)]
struct TtsPart {
    #[serde(rename = "inlineData")]
    inline_data: Option<TtsInlineData>,
}

#[derive(Debug, serde::Deserialize)]
struct TtsInlineData {
    data: String,
}

/// Secondary provider: Gemini audio generation. Slower but handles text the
/// primary endpoint rejects.
pub struct GeminiTts {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

const GEMINI_TTS_MODEL: &str = "gemini-1.5-pro";

impl GeminiTts {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: GEMINI_TTS_MODEL.to_string(),
        }
    }
}

#[async_trait]
impl SpeechProvider for GeminiTts {
    async fn synthesize(&self, text: &str, _voice_id: &str) -> Result<Vec<u8>> {
        let body = serde_json::json!({
            "contents": [
                { "parts": [ { "text": format!("Convert this text to speech: '{text}'. Return just the audio.") } ] }
            ],
            "generationConfig": { "response_mime_type": "audio/mp3" }
        });

        let resp = self
            .client
            .post(format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<TtsResponse>()
            .await?;

        let encoded = resp
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .and_then(|p| p.inline_data.as_ref())
            .map(|d| d.data.as_str())
            .ok_or_else(|| anyhow::anyhow!("No audio data in response"))?;

        Ok(BASE64.decode(encoded)?)
    }

    fn name(&self) -> &'static str {
        "gemini-tts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_names_map_to_provider_identifiers() {
        assert_eq!(voice_id(Some("Callum")), "en-GB-Neural2-D");
        assert_eq!(voice_id(Some("Nova")), "en-US-Neural2-F");
        assert_eq!(voice_id(Some("NoSuchVoice")), DEFAULT_VOICE_ID);
        assert_eq!(voice_id(None), DEFAULT_VOICE_ID);
    }

    #[test]
    fn british_voices_select_the_gb_language() {
        assert_eq!(translate_lang("en-GB-Neural2-D"), "en-gb");
        assert_eq!(translate_lang("en-US-Neural2-F"), "en");
    }

    fn ok_provider(bytes: &'static [u8], times: usize) -> MockSpeechProvider {
        let mut provider = MockSpeechProvider::new();
        provider
            .expect_synthesize()
            .times(times)
            .returning(move |_, _| Box::pin(async move { Ok(bytes.to_vec()) }));
        provider.expect_name().return_const("mock-primary");
        provider
    }

    fn failing_provider() -> MockSpeechProvider {
        let mut provider = MockSpeechProvider::new();
        provider
            .expect_synthesize()
            .returning(|_, _| Box::pin(async { Err(anyhow::anyhow!("provider down")) }));
        provider.expect_name().return_const("mock-failing");
        provider
    }

    fn unused_provider() -> MockSpeechProvider {
        let mut provider = MockSpeechProvider::new();
        provider.expect_synthesize().times(0);
        provider.expect_name().return_const("mock-unused");
        provider
    }

    #[tokio::test]
    async fn repeated_synthesis_hits_the_cache() {
        // The underlying provider must be invoked at most once for the same
        // (text, voice) pair.
        let gateway = SpeechGateway::new(
            Arc::new(ok_provider(b"mp3-bytes", 1)),
            Arc::new(unused_provider()),
        );

        let first = gateway.synthesize("Tell me about yourself", Some("Nova")).await;
        let second = gateway.synthesize("Tell me about yourself", Some("Nova")).await;
        assert_eq!(first.as_deref(), Some(b"mp3-bytes".as_slice()));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn different_voices_are_distinct_cache_entries() {
        let gateway = SpeechGateway::new(
            Arc::new(ok_provider(b"clip", 2)),
            Arc::new(unused_provider()),
        );

        gateway.synthesize("Same text", Some("Nova")).await;
        gateway.synthesize("Same text", Some("Callum")).await;
    }

    #[tokio::test]
    async fn primary_failure_falls_back_to_secondary() {
        let gateway = SpeechGateway::new(
            Arc::new(failing_provider()),
            Arc::new(ok_provider(b"secondary-bytes", 1)),
        );

        let audio = gateway.synthesize("Hello", None).await;
        assert_eq!(audio.as_deref(), Some(b"secondary-bytes".as_slice()));
    }

    #[tokio::test]
    async fn both_providers_failing_yields_none() {
        let gateway = SpeechGateway::new(Arc::new(failing_provider()), Arc::new(failing_provider()));
        assert_eq!(gateway.synthesize("Hello", None).await, None);
    }

    #[tokio::test]
    async fn empty_text_short_circuits() {
        let gateway = SpeechGateway::new(Arc::new(unused_provider()), Arc::new(unused_provider()));
        assert_eq!(gateway.synthesize("", None).await, None);
    }

    #[tokio::test]
    async fn empty_provider_output_is_not_cached_as_success() {
        let mut primary = MockSpeechProvider::new();
        primary
            .expect_synthesize()
            .returning(|_, _| Box::pin(async { Ok(Vec::new()) }));
        primary.expect_name().return_const("mock-empty");

        let gateway = SpeechGateway::new(
            Arc::new(primary),
            Arc::new(ok_provider(b"fallback", 1)),
        );
        assert_eq!(
            gateway.synthesize("Hi", None).await.as_deref(),
            Some(b"fallback".as_slice())
        );
    }
}
