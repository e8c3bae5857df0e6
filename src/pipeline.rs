//! Request pipeline: decode, transcribe, resolve, synthesize
//!
//! Each request runs the steps strictly in order. Provider calls are the
//! only suspension points and each is attempted exactly once; callers that
//! want retries wrap [`RequestPipeline::handle`] themselves.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::audio::{AudioPayload, DEFAULT_MAX_AUDIO_BYTES};
use crate::config::Config;
use crate::language::{LanguageSource, LanguageTag};
use crate::lookup::{self, LocalLookup};
use crate::providers::{
    self, GenerationRequest, Generator, SynthesizedAudio, Synthesizer, Transcriber,
};
use crate::{Error, Result};

/// Placeholder in the persona replaced with the user's language name
pub const LANGUAGE_PLACEHOLDER: &str = "{language}";

/// Inbound audio before decoding
#[derive(Debug, Clone)]
pub enum AudioInput {
    /// Base64 string, optionally a `data:` URL
    Base64(String),
    /// Uploaded binary with its declared content type
    Upload {
        data: Vec<u8>,
        content_type: Option<String>,
    },
}

/// Where the reply text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Lookup,
    Generated,
}

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct AssistantReply {
    /// Recognized speech
    pub transcript: String,
    /// Canned response verbatim, or generated text trimmed
    pub text: String,
    /// Whether the reply was canned or generated
    pub source: ReplySource,
    /// Language used to pick the voice
    pub language: LanguageTag,
    /// Spoken reply, absent when synthesis failed
    pub audio: Option<SynthesizedAudio>,
    /// Why audio is missing
    pub audio_error: Option<String>,
}

impl AssistantReply {
    /// Whether spoken audio accompanies the text
    #[must_use]
    pub const fn audio_available(&self) -> bool {
        self.audio.is_some()
    }
}

/// Per-deployment pipeline policy
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// System instruction template, may contain `{language}`
    pub persona: String,
    /// Reply length hint for the generator
    pub max_tokens: Option<u32>,
    /// Text inspected to pick the reply voice
    pub language_source: LanguageSource,
    /// Largest accepted inbound audio
    pub max_audio_bytes: usize,
    /// Deadline for one request; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            persona: crate::config::DEFAULT_PERSONA.to_string(),
            max_tokens: Some(150),
            language_source: LanguageSource::Transcript,
            max_audio_bytes: DEFAULT_MAX_AUDIO_BYTES,
            timeout: None,
        }
    }
}

impl PipelineOptions {
    /// Options taken from the loaded configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            persona: config.llm.persona.clone(),
            max_tokens: Some(config.llm.max_tokens),
            language_source: config.pipeline.language_source,
            max_audio_bytes: config.server.max_audio_bytes,
            timeout: Some(config.server.request_timeout),
        }
    }
}

/// Orchestrates one voice request end to end
#[derive(Clone)]
pub struct RequestPipeline {
    transcriber: Arc<dyn Transcriber>,
    lookup: Option<Arc<dyn LocalLookup>>,
    generator: Arc<dyn Generator>,
    synthesizer: Arc<dyn Synthesizer>,
    options: PipelineOptions,
}

impl RequestPipeline {
    /// Create a pipeline with no lookup store and default options
    #[must_use]
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn Generator>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            transcriber,
            lookup: None,
            generator,
            synthesizer,
            options: PipelineOptions::default(),
        }
    }

    /// Build providers and lookup store from configuration
    ///
    /// # Errors
    ///
    /// Returns error if a provider credential is missing or the lookup store
    /// cannot be opened
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut pipeline = Self::new(
            providers::build_transcriber(config)?,
            providers::build_generator(config)?,
            providers::build_synthesizer(config)?,
        )
        .with_options(PipelineOptions::from_config(config));

        if let Some(path) = &config.lookup.path {
            pipeline = pipeline.with_lookup(lookup::open(path)?);
        }

        tracing::info!(
            transcriber = pipeline.transcriber.name(),
            generator = pipeline.generator.name(),
            synthesizer = pipeline.synthesizer.name(),
            lookup = pipeline.lookup.as_ref().map(|l| l.name()),
            "pipeline ready"
        );
        Ok(pipeline)
    }

    /// Consult a canned-response store before generating
    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn LocalLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Replace the pipeline policy
    #[must_use]
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Pipeline policy
    #[must_use]
    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Names of the configured collaborators, for readiness reporting
    #[must_use]
    pub fn provider_names(&self) -> ProviderNames {
        ProviderNames {
            transcriber: self.transcriber.name(),
            generator: self.generator.name(),
            synthesizer: self.synthesizer.name(),
            lookup: self.lookup.as_ref().map(|l| l.name()),
        }
    }

    /// Run one request, bounded by the configured deadline
    ///
    /// The deadline covers decoding, transcription and reply resolution.
    /// Synthesis gets whatever time is left; running out there downgrades
    /// the reply to text only. Dropping the returned future abandons the
    /// request at its next provider call.
    ///
    /// # Errors
    ///
    /// Returns the first fatal stage error; synthesis failures are reported
    /// on the reply instead
    pub async fn handle(&self, input: AudioInput) -> Result<AssistantReply> {
        let deadline = self
            .options
            .timeout
            .map(|limit| (limit, tokio::time::Instant::now() + limit));

        let (transcript, text, source) = match deadline {
            Some((limit, at)) => tokio::time::timeout_at(at, self.answer(input))
                .await
                .map_err(|_| {
                    tracing::warn!(timeout = ?limit, "request deadline exceeded");
                    Error::Timeout(limit)
                })??,
            None => self.answer(input).await?,
        };

        let language = LanguageTag::detect(self.options.language_source.select(&transcript, &text));

        let synthesized = match deadline {
            Some((limit, at)) => {
                tokio::time::timeout_at(at, self.synthesizer.synthesize(&text, language))
                    .await
                    .unwrap_or(Err(Error::Timeout(limit)))
            }
            None => self.synthesizer.synthesize(&text, language).await,
        };

        let (audio, audio_error) = match synthesized {
            Ok(audio) => (Some(audio), None),
            Err(e) => {
                tracing::warn!(
                    synthesizer = self.synthesizer.name(),
                    error = %e,
                    "synthesis failed, returning text only"
                );
                (None, Some(e.to_string()))
            }
        };

        Ok(AssistantReply {
            transcript,
            text,
            source,
            language,
            audio,
            audio_error,
        })
    }

    /// Transcript plus reply text and where the reply came from
    async fn answer(&self, input: AudioInput) -> Result<(String, String, ReplySource)> {
        let audio = self.decode(input)?;
        let transcript = self.transcribe(audio).await?;
        let (text, source) = self.resolve(&transcript).await?;
        Ok((transcript, text, source))
    }

    fn decode(&self, input: AudioInput) -> Result<AudioPayload> {
        let max = self.options.max_audio_bytes;
        let audio = match input {
            AudioInput::Base64(encoded) => AudioPayload::from_base64(&encoded, max)?,
            AudioInput::Upload { data, content_type } => {
                AudioPayload::from_bytes(data, content_type.as_deref(), max)?
            }
        };

        tracing::debug!(
            audio_bytes = audio.len(),
            format = ?audio.format(),
            duration = ?audio.wav_duration(),
            "decoded audio"
        );
        Ok(audio)
    }

    /// The payload is consumed here and released once the provider returns
    async fn transcribe(&self, audio: AudioPayload) -> Result<String> {
        let raw = self.transcriber.transcribe(&audio).await?;
        drop(audio);

        let transcript = raw.trim();
        if transcript.is_empty() {
            tracing::info!(transcriber = self.transcriber.name(), "empty transcript");
            return Err(Error::EmptyTranscript);
        }

        tracing::debug!(transcript, "transcribed");
        Ok(transcript.to_string())
    }

    /// Canned answer if one matches, otherwise a generated reply
    async fn resolve(&self, transcript: &str) -> Result<(String, ReplySource)> {
        if let Some(lookup) = &self.lookup {
            match lookup.find(transcript).await {
                Ok(Some(response)) => {
                    tracing::info!(lookup = lookup.name(), "answered from lookup");
                    return Ok((response, ReplySource::Lookup));
                }
                Ok(None) => tracing::debug!(lookup = lookup.name(), "no lookup match"),
                Err(e) => {
                    tracing::warn!(lookup = lookup.name(), error = %e, "lookup failed, treating as no match");
                }
            }
        }

        let persona = render_persona(&self.options.persona, LanguageTag::detect(transcript));
        let reply = self
            .generator
            .generate(GenerationRequest {
                prompt: transcript,
                persona: &persona,
                max_tokens: self.options.max_tokens,
            })
            .await?;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(Error::Generation("empty reply".to_string()));
        }
        Ok((reply.to_string(), ReplySource::Generated))
    }
}

/// Collaborator names reported by readiness checks
#[derive(Debug, Clone, Serialize)]
pub struct ProviderNames {
    pub transcriber: &'static str,
    pub generator: &'static str,
    pub synthesizer: &'static str,
    pub lookup: Option<&'static str>,
}

/// Substitute the user's language into a persona template
#[must_use]
pub fn render_persona(template: &str, language: LanguageTag) -> String {
    template.replace(LANGUAGE_PLACEHOLDER, language.name())
}
