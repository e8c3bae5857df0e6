//! Text-to-speech (TTS) processing

use async_trait::async_trait;

use super::{SynthesizedAudio, Synthesizer};
use crate::config::TtsProvider;
use crate::language::LanguageTag;
use crate::{Error, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
const GOOGLE_TRANSLATE_BASE_URL: &str = "https://translate.google.com";

/// Longest text the Google Translate voice accepts per request
pub const GOOGLE_CHUNK_CHARS: usize = 100;

/// Voice identifier per reply language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceMap {
    pub english: String,
    pub arabic: String,
}

impl VoiceMap {
    /// Voice for a language
    #[must_use]
    pub fn voice_for(&self, language: LanguageTag) -> &str {
        match language {
            LanguageTag::Arabic => &self.arabic,
            LanguageTag::English => &self.english,
        }
    }
}

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: String,
    voices: VoiceMap,
    speed: f32,
    model: String,
    base_url: String,
    provider: TtsProvider,
}

impl TextToSpeech {
    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: String, voices: VoiceMap, speed: f32) -> Result<Self> {
        Self::new_openai_with_model(api_key, voices, speed, "tts-1".to_string())
    }

    /// Create a new TTS instance using `OpenAI` with custom model
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai_with_model(
        api_key: String,
        voices: VoiceMap,
        speed: f32,
        model: String,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voices,
            speed,
            model,
            base_url: OPENAI_BASE_URL.to_string(),
            provider: TtsProvider::OpenAI,
        })
    }

    /// Create a new TTS instance using ElevenLabs with custom model
    ///
    /// Voices are ElevenLabs voice IDs; use a multilingual model for Arabic.
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs_with_model(
        api_key: String,
        voices: VoiceMap,
        model: String,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voices,
            speed: 1.0, // ElevenLabs doesn't use speed in the same way
            model,
            base_url: ELEVENLABS_BASE_URL.to_string(),
            provider: TtsProvider::ElevenLabs,
        })
    }

    /// Create a keyless TTS instance using the Google Translate voice
    ///
    /// The voice is always the language code ("en", "ar").
    #[must_use]
    pub fn new_google_translate() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: String::new(),
            voices: VoiceMap {
                english: LanguageTag::English.code().to_string(),
                arabic: LanguageTag::Arabic.code().to_string(),
            },
            speed: 1.0,
            model: String::new(),
            base_url: GOOGLE_TRANSLATE_BASE_URL.to_string(),
            provider: TtsProvider::GoogleTranslate,
        }
    }

    /// Point at a different API host (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Synthesize using OpenAI TTS
    async fn synthesize_openai(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed: self.speed,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("OpenAI TTS request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(format!("OpenAI TTS body: {e}")))?;
        Ok(audio.to_vec())
    }

    /// Synthesize using ElevenLabs TTS
    async fn synthesize_elevenlabs(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.base_url,
            urlencoding::encode(voice)
        );

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("ElevenLabs request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!(
                "ElevenLabs TTS error {status}: {body}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(format!("ElevenLabs TTS body: {e}")))?;
        Ok(audio.to_vec())
    }

    /// Synthesize using the Google Translate voice, one request per chunk
    async fn synthesize_google(&self, text: &str, lang: &str) -> Result<Vec<u8>> {
        let chunks = chunk_text(text, GOOGLE_CHUNK_CHARS);
        let total = chunks.len();
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let url = format!(
                "{}/translate_tts?ie=UTF-8&client=tw-ob&tl={}&q={}&total={total}&idx={idx}&textlen={}",
                self.base_url,
                urlencoding::encode(lang),
                urlencoding::encode(chunk),
                chunk.chars().count()
            );

            let response = self
                .client
                .get(&url)
                .header("Referer", "http://translate.google.com/")
                .header("User-Agent", "Mozilla/5.0")
                .send()
                .await
                .map_err(|e| Error::Synthesis(format!("Google TTS request failed: {e}")))?;

            if !response.status().is_success() {
                let status = response.status();
                return Err(Error::Synthesis(format!(
                    "Google TTS error {status} on chunk {idx}/{total}"
                )));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::Synthesis(format!("Google TTS body: {e}")))?;
            audio.extend_from_slice(&bytes);
        }

        Ok(audio)
    }
}

#[async_trait]
impl Synthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str, language: LanguageTag) -> Result<SynthesizedAudio> {
        if text.trim().is_empty() {
            return Err(Error::Synthesis("empty text".to_string()));
        }

        let voice = self.voices.voice_for(language).to_string();
        tracing::debug!(
            provider = self.name(),
            %language,
            voice = %voice,
            chars = text.len(),
            "starting synthesis"
        );

        let data = match self.provider {
            TtsProvider::OpenAI => self.synthesize_openai(text, &voice).await?,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text, &voice).await?,
            TtsProvider::GoogleTranslate => self.synthesize_google(text, &voice).await?,
        };

        if data.is_empty() {
            return Err(Error::Synthesis(format!("{} returned no audio", self.name())));
        }

        tracing::info!(audio_bytes = data.len(), %language, "synthesis complete");
        Ok(SynthesizedAudio {
            data,
            mime_type: "audio/mpeg",
            voice,
            language,
        })
    }

    fn name(&self) -> &'static str {
        match self.provider {
            TtsProvider::OpenAI => "openai-tts",
            TtsProvider::ElevenLabs => "elevenlabs-tts",
            TtsProvider::GoogleTranslate => "google-translate-tts",
        }
    }
}

/// Split text into chunks of at most `max_chars` characters, breaking on
/// whitespace where possible
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
