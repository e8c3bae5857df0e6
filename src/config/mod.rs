//! Configuration management for the voice assistant gateway
//!
//! Values resolve once at startup with precedence env > TOML file > default,
//! and are passed into constructors from there.

pub mod file;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::audio::DEFAULT_MAX_AUDIO_BYTES;
use crate::language::LanguageSource;
use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "VOICE_ASSISTANT_CONFIG";

/// Persona used when none is configured
pub const DEFAULT_PERSONA: &str = "You are a helpful assistant. Respond in {language} only.";

/// Gateway configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// API keys
    pub api_keys: ApiKeys,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Speech-to-text configuration
    pub stt: SttConfig,

    /// Language model configuration
    pub llm: LlmConfig,

    /// Text-to-speech configuration
    pub tts: TtsConfig,

    /// Canned-response lookup configuration
    pub lookup: LookupConfig,

    /// Pipeline policy
    pub pipeline: PipelineConfig,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper, chat completions, TTS)
    pub openai: Option<SecretString>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,
}

/// How synthesized audio reaches the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudioTransport {
    /// Base64 audio embedded in the JSON response
    #[default]
    Inline,
    /// Audio stored server-side and fetched from `/api/audio/{id}`
    Reference,
}

impl FromStr for AudioTransport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "reference" | "url" => Ok(Self::Reference),
            other => Err(Error::Config(format!("unknown audio transport: {other}"))),
        }
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,

    /// Audio delivery strategy
    pub audio_transport: AudioTransport,

    /// Clips retained for reference transport
    pub audio_cache_size: usize,

    /// Maximum accepted inbound audio size
    pub max_audio_bytes: usize,

    /// Per-request deadline
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_origins: Vec::new(),
            audio_transport: AudioTransport::Inline,
            audio_cache_size: 64,
            max_audio_bytes: DEFAULT_MAX_AUDIO_BYTES,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// STT provider backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SttProvider {
    #[default]
    Whisper,
    Deepgram,
}

impl FromStr for SttProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

impl SttProvider {
    /// Model used when none is configured
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Whisper => "whisper-1",
            Self::Deepgram => "nova-2",
        }
    }
}

/// Speech-to-text configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Provider backend
    pub provider: SttProvider,

    /// Model (e.g. "whisper-1", "nova-2")
    pub model: String,

    /// Optional language hint (ISO 639-1)
    pub language: Option<String>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            provider: SttProvider::Whisper,
            model: SttProvider::Whisper.default_model().to_string(),
            language: None,
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Chat model identifier
    pub model: String,

    /// Reply length hint
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// System instruction template
    pub persona: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 150,
            temperature: None,
            persona: DEFAULT_PERSONA.to_string(),
        }
    }
}

/// TTS provider backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TtsProvider {
    #[default]
    OpenAI,
    ElevenLabs,
    /// Keyless Google Translate voice
    GoogleTranslate,
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "elevenlabs" => Ok(Self::ElevenLabs),
            "google" | "gtts" | "google-translate" => Ok(Self::GoogleTranslate),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

impl TtsProvider {
    /// Model used when none is configured
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => "tts-1",
            Self::ElevenLabs => "eleven_multilingual_v2",
            Self::GoogleTranslate => "",
        }
    }
}

/// Text-to-speech configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Provider backend
    pub provider: TtsProvider,

    /// Model (e.g. "tts-1", "eleven_multilingual_v2")
    pub model: String,

    /// Voice for English replies
    pub english_voice: String,

    /// Voice for Arabic replies
    pub arabic_voice: String,

    /// Speed multiplier (0.25 to 4.0, `OpenAI` only)
    pub speed: f32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::OpenAI,
            model: TtsProvider::OpenAI.default_model().to_string(),
            english_voice: "alloy".to_string(),
            arabic_voice: "nova".to_string(),
            speed: 1.0,
        }
    }
}

/// Canned-response lookup configuration
#[derive(Debug, Clone, Default)]
pub struct LookupConfig {
    /// `.json` table or `SQLite` database; `None` disables lookup
    pub path: Option<PathBuf>,
}

/// Pipeline policy configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    /// Text inspected to pick the reply voice
    pub language_source: LanguageSource,
}

impl Config {
    /// Load configuration from the environment and the TOML file
    ///
    /// # Errors
    ///
    /// Returns error if a value fails to parse or a required credential is missing
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = Self::load_unvalidated(config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration without checking credentials
    ///
    /// # Errors
    ///
    /// Returns error if a value fails to parse
    pub fn load_unvalidated(config_path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let fc = file::load_config_file(config_path.or(env_path.as_deref()));
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file overlay and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if an enum-valued setting cannot be parsed
    pub fn from_sources<F>(fc: file::GatewayConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |var: &str, fallback: Option<String>| {
            env(var)
                .or(fallback)
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from)
        };

        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            openai: secret("OPENAI_API_KEY", fc.api_keys.openai),
            deepgram: secret("DEEPGRAM_API_KEY", fc.api_keys.deepgram),
            elevenlabs: secret("ELEVENLABS_API_KEY", fc.api_keys.elevenlabs),
        };

        // Server config (env > toml > default)
        let defaults = ServerConfig::default();
        let cors_origins = env("VOICE_ASSISTANT_CORS_ORIGINS")
            .map(|s| s.split(',').map(|o| o.trim().to_string()).collect::<Vec<_>>())
            .or(fc.server.cors_origins)
            .unwrap_or_default()
            .into_iter()
            .filter(|o| !o.is_empty() && o != "*")
            .collect();
        let audio_transport = env("VOICE_ASSISTANT_AUDIO_TRANSPORT")
            .or(fc.server.audio_transport)
            .map(|s| s.parse::<AudioTransport>())
            .transpose()?
            .unwrap_or_default();
        let server = ServerConfig {
            port: env("VOICE_ASSISTANT_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(defaults.port),
            cors_origins,
            audio_transport,
            audio_cache_size: env("VOICE_ASSISTANT_AUDIO_CACHE_SIZE")
                .and_then(|s| s.parse().ok())
                .or(fc.server.audio_cache_size)
                .unwrap_or(defaults.audio_cache_size),
            max_audio_bytes: env("VOICE_ASSISTANT_MAX_AUDIO_BYTES")
                .and_then(|s| s.parse().ok())
                .or(fc.server.max_audio_bytes)
                .unwrap_or(defaults.max_audio_bytes),
            request_timeout: env("VOICE_ASSISTANT_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .or(fc.server.request_timeout_secs)
                .map_or(defaults.request_timeout, Duration::from_secs),
        };

        // STT config (env > toml > default)
        let stt_provider = env("VOICE_ASSISTANT_STT_PROVIDER")
            .or(fc.stt.provider)
            .map(|s| s.parse::<SttProvider>())
            .transpose()?
            .unwrap_or_default();
        let stt = SttConfig {
            provider: stt_provider,
            model: env("VOICE_ASSISTANT_STT_MODEL")
                .or(fc.stt.model)
                .unwrap_or_else(|| stt_provider.default_model().to_string()),
            language: env("VOICE_ASSISTANT_STT_LANGUAGE").or(fc.stt.language),
        };

        // LLM config (env > toml > default)
        let llm_defaults = LlmConfig::default();
        let llm = LlmConfig {
            model: env("VOICE_ASSISTANT_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or(llm_defaults.model),
            max_tokens: env("VOICE_ASSISTANT_MAX_TOKENS")
                .and_then(|s| s.parse().ok())
                .or(fc.llm.max_tokens)
                .unwrap_or(llm_defaults.max_tokens),
            temperature: env("VOICE_ASSISTANT_TEMPERATURE")
                .and_then(|s| s.parse().ok())
                .or(fc.llm.temperature),
            persona: env("VOICE_ASSISTANT_PERSONA")
                .or(fc.llm.persona)
                .unwrap_or(llm_defaults.persona),
        };

        // TTS config (env > toml > default)
        let tts_defaults = TtsConfig::default();
        let tts_provider = env("VOICE_ASSISTANT_TTS_PROVIDER")
            .or(fc.tts.provider)
            .map(|s| s.parse::<TtsProvider>())
            .transpose()?
            .unwrap_or_default();
        let tts = TtsConfig {
            provider: tts_provider,
            model: env("VOICE_ASSISTANT_TTS_MODEL")
                .or(fc.tts.model)
                .unwrap_or_else(|| tts_provider.default_model().to_string()),
            english_voice: env("VOICE_ASSISTANT_TTS_VOICE_EN")
                .or(fc.tts.english_voice)
                .unwrap_or(tts_defaults.english_voice),
            arabic_voice: env("VOICE_ASSISTANT_TTS_VOICE_AR")
                .or(fc.tts.arabic_voice)
                .unwrap_or(tts_defaults.arabic_voice),
            speed: env("VOICE_ASSISTANT_TTS_SPEED")
                .and_then(|s| s.parse().ok())
                .or(fc.tts.speed)
                .unwrap_or(tts_defaults.speed),
        };

        let lookup = LookupConfig {
            path: env("VOICE_ASSISTANT_LOOKUP_PATH")
                .or(fc.lookup.path)
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        };

        let pipeline = PipelineConfig {
            language_source: env("VOICE_ASSISTANT_LANGUAGE_SOURCE")
                .or(fc.pipeline.language_source)
                .map(|s| s.parse::<LanguageSource>())
                .transpose()?
                .unwrap_or_default(),
        };

        Ok(Self {
            api_keys,
            server,
            stt,
            llm,
            tts,
            lookup,
            pipeline,
        })
    }

    /// Check that every selected provider has its credential
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming each missing credential
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        // Generation always goes through OpenAI chat completions
        if self.api_keys.openai.is_none() {
            missing.push("OPENAI_API_KEY");
        }
        if self.stt.provider == SttProvider::Deepgram && self.api_keys.deepgram.is_none() {
            missing.push("DEEPGRAM_API_KEY");
        }
        if self.tts.provider == TtsProvider::ElevenLabs && self.api_keys.elevenlabs.is_none() {
            missing.push("ELEVENLABS_API_KEY");
        }

        if !(0.25..=4.0).contains(&self.tts.speed) {
            return Err(Error::Config(format!(
                "TTS speed {} outside 0.25..=4.0",
                self.tts.speed
            )));
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "missing required credentials: {}",
                missing.join(", ")
            )))
        }
    }
}
