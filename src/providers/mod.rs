//! External provider abstractions and their HTTP adapters
//!
//! The pipeline only sees the [`Transcriber`], [`Generator`] and
//! [`Synthesizer`] traits. Concrete adapters talk to hosted APIs.

mod chat;
mod stt;
mod tts;

pub use chat::ChatGenerator;
pub use stt::SpeechToText;
pub use tts::{TextToSpeech, VoiceMap, chunk_text};

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::audio::AudioPayload;
use crate::config::{Config, SttProvider, TtsProvider};
use crate::language::LanguageTag;
use crate::{Error, Result};

/// Speech-to-text provider
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio to text; the result may be empty
    ///
    /// # Errors
    ///
    /// Returns `Error::Transcription` if the provider call fails
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Input for one text generation call
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// User's transcript
    pub prompt: &'a str,
    /// System instruction
    pub persona: &'a str,
    /// Reply length hint in tokens
    pub max_tokens: Option<u32>,
}

/// Language model provider
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply
    ///
    /// # Errors
    ///
    /// Returns `Error::Generation` if the provider call fails
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Synthesized speech
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    /// Encoded audio bytes
    pub data: Vec<u8>,
    /// MIME type of `data`
    pub mime_type: &'static str,
    /// Voice or locale the provider used
    pub voice: String,
    /// Language the voice was chosen for
    pub language: LanguageTag,
}

/// Text-to-speech provider
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` with the voice for `language`
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` if the provider call fails
    async fn synthesize(&self, text: &str, language: LanguageTag) -> Result<SynthesizedAudio>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

fn required_key(key: Option<&secrecy::SecretString>, var: &str) -> Result<String> {
    key.map(|k| k.expose_secret().to_string())
        .ok_or_else(|| Error::Config(format!("{var} is not set")))
}

/// Build the configured transcriber
///
/// # Errors
///
/// Returns error if the provider's credential is missing
pub fn build_transcriber(config: &Config) -> Result<Arc<dyn Transcriber>> {
    let stt = match config.stt.provider {
        SttProvider::Whisper => SpeechToText::new_whisper(
            required_key(config.api_keys.openai.as_ref(), "OPENAI_API_KEY")?,
            config.stt.model.clone(),
        )?,
        SttProvider::Deepgram => SpeechToText::new_deepgram(
            required_key(config.api_keys.deepgram.as_ref(), "DEEPGRAM_API_KEY")?,
            config.stt.model.clone(),
        )?,
    };
    Ok(Arc::new(stt.with_language(config.stt.language.clone())))
}

/// Build the configured generator
///
/// # Errors
///
/// Returns error if the `OpenAI` credential is missing
pub fn build_generator(config: &Config) -> Result<Arc<dyn Generator>> {
    let generator = ChatGenerator::new(
        required_key(config.api_keys.openai.as_ref(), "OPENAI_API_KEY")?,
        config.llm.model.clone(),
    )?
    .with_temperature(config.llm.temperature);
    Ok(Arc::new(generator))
}

/// Build the configured synthesizer
///
/// # Errors
///
/// Returns error if the provider's credential is missing
pub fn build_synthesizer(config: &Config) -> Result<Arc<dyn Synthesizer>> {
    let voices = VoiceMap {
        english: config.tts.english_voice.clone(),
        arabic: config.tts.arabic_voice.clone(),
    };
    let tts = match config.tts.provider {
        TtsProvider::OpenAI => TextToSpeech::new_openai_with_model(
            required_key(config.api_keys.openai.as_ref(), "OPENAI_API_KEY")?,
            voices,
            config.tts.speed,
            config.tts.model.clone(),
        )?,
        TtsProvider::ElevenLabs => TextToSpeech::new_elevenlabs_with_model(
            required_key(config.api_keys.elevenlabs.as_ref(), "ELEVENLABS_API_KEY")?,
            voices,
            config.tts.model.clone(),
        )?,
        TtsProvider::GoogleTranslate => TextToSpeech::new_google_translate(),
    };
    Ok(Arc::new(tts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::GatewayConfigFile;

    fn config_with(pairs: &[(&str, &str)]) -> Config {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_sources(GatewayConfigFile::default(), move |key| {
            pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    #[test]
    fn test_build_default_providers() {
        let config = config_with(&[("OPENAI_API_KEY", "sk-test")]);

        assert_eq!(build_transcriber(&config).unwrap().name(), "whisper");
        assert_eq!(build_generator(&config).unwrap().name(), "openai-chat");
        assert_eq!(build_synthesizer(&config).unwrap().name(), "openai-tts");
    }

    #[test]
    fn test_build_alternate_providers() {
        let config = config_with(&[
            ("DEEPGRAM_API_KEY", "dg-test"),
            ("VOICE_ASSISTANT_STT_PROVIDER", "deepgram"),
            ("VOICE_ASSISTANT_TTS_PROVIDER", "google"),
        ]);

        assert_eq!(build_transcriber(&config).unwrap().name(), "deepgram");
        assert_eq!(build_synthesizer(&config).unwrap().name(), "google-translate-tts");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let config = config_with(&[]);
        assert!(matches!(build_transcriber(&config), Err(Error::Config(_))));
        assert!(matches!(build_generator(&config), Err(Error::Config(_))));
    }
}
