//! TOML configuration file loading
//!
//! Supports `~/.config/voice-assistant/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct GatewayConfigFile {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Speech-to-text configuration
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Language model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Text-to-speech configuration
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// Canned-response lookup configuration
    #[serde(default)]
    pub lookup: LookupFileConfig,

    /// Pipeline policy configuration
    #[serde(default)]
    pub pipeline: PipelineFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Allowed CORS origins; `["*"]` or empty means open
    pub cors_origins: Option<Vec<String>>,

    /// "inline" or "reference"
    pub audio_transport: Option<String>,

    /// Number of synthesized clips kept for reference transport
    pub audio_cache_size: Option<usize>,

    /// Maximum accepted inbound audio size in bytes
    pub max_audio_bytes: Option<usize>,

    /// Per-request deadline in seconds
    pub request_timeout_secs: Option<u64>,
}

/// Speech-to-text configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// "whisper" or "deepgram"
    pub provider: Option<String>,

    /// Model (e.g. "whisper-1", "nova-2")
    pub model: Option<String>,

    /// Language hint (ISO 639-1)
    pub language: Option<String>,
}

/// Language model configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Model identifier (e.g. "gpt-3.5-turbo")
    pub model: Option<String>,

    /// Reply length hint
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// System instruction; `{language}` is replaced with the user's language
    pub persona: Option<String>,
}

/// Text-to-speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// "openai", "elevenlabs" or "google"
    pub provider: Option<String>,

    /// Model (e.g. "tts-1")
    pub model: Option<String>,

    /// Voice for English replies
    pub english_voice: Option<String>,

    /// Voice for Arabic replies
    pub arabic_voice: Option<String>,

    /// Speed multiplier
    pub speed: Option<f32>,
}

/// Lookup store configuration
#[derive(Debug, Default, Deserialize)]
pub struct LookupFileConfig {
    /// Path to a `.json` table or a `SQLite` database
    pub path: Option<String>,
}

/// Pipeline policy configuration
#[derive(Debug, Default, Deserialize)]
pub struct PipelineFileConfig {
    /// "transcript" or "response"
    pub language_source: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Load the TOML config file from `path`, or the standard location
///
/// Returns `GatewayConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file(path: Option<&Path>) -> GatewayConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return GatewayConfigFile::default();
    };

    if !path.exists() {
        return GatewayConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                GatewayConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            GatewayConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voice-assistant/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voice-assistant").join("config.toml"))
}
