//! Voice Assistant Gateway - speech in, spoken answer out
//!
//! This library provides the request pipeline behind the voice assistant:
//! - Audio decoding (base64, data URLs, multipart uploads)
//! - Speech-to-text via Whisper or Deepgram
//! - Canned answers from a local lookup table, before any paid generation
//! - Reply generation via `OpenAI` chat completions
//! - Arabic/English voice selection and text-to-speech
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    HTTP API                          │
//! │   POST /  │  POST /api/assist  │  GET /api/audio/id │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                Request Pipeline                      │
//! │   Decode → Transcribe → Lookup/Generate → Speak     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Providers                          │
//! │   Whisper  │  Deepgram  │  OpenAI  │  TTS voices    │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod language;
pub mod lookup;
pub mod pipeline;
pub mod providers;

pub use api::{ApiServer, ApiServerBuilder, ApiState};
pub use audio::{AudioFormat, AudioPayload};
pub use config::Config;
pub use error::{Error, Result};
pub use language::{LanguageSource, LanguageTag};
pub use lookup::{LocalLookup, LookupEntry, LookupTable, SqliteLookup};
pub use pipeline::{AssistantReply, AudioInput, PipelineOptions, ReplySource, RequestPipeline};
pub use providers::{
    GenerationRequest, Generator, SynthesizedAudio, Synthesizer, Transcriber,
};
