//! Shared test utilities
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use voice_assistant_gateway::{
    AudioPayload, Error, GenerationRequest, Generator, LanguageTag, LookupEntry, LookupTable,
    RequestPipeline, Result, SynthesizedAudio, Synthesizer, Transcriber,
};

/// Bytes every stub synthesis returns, prefixed with an ID3 tag
pub const STUB_AUDIO: &[u8] = b"ID3stub-mp3-frames";

/// Transcriber returning a fixed transcript
pub struct StubTranscriber {
    transcript: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubTranscriber {
    pub fn says(transcript: &str) -> Arc<Self> {
        Arc::new(Self {
            transcript: Some(transcript.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            transcript: None,
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(transcript: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            transcript: Some(transcript.to_string()),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _audio: &AudioPayload) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.transcript
            .clone()
            .ok_or_else(|| Error::Transcription("stub transcriber down".to_string()))
    }

    fn name(&self) -> &'static str {
        "stub-stt"
    }
}

/// Generator returning a fixed reply and recording what it was asked
pub struct StubGenerator {
    reply: Option<String>,
    calls: AtomicUsize,
    last_persona: Mutex<Option<String>>,
    last_prompt: Mutex<Option<String>>,
    last_max_tokens: Mutex<Option<u32>>,
}

impl StubGenerator {
    pub fn replies(reply: &str) -> Arc<Self> {
        Self::build(Some(reply.to_string()))
    }

    pub fn failing() -> Arc<Self> {
        Self::build(None)
    }

    fn build(reply: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last_persona: Mutex::new(None),
            last_prompt: Mutex::new(None),
            last_max_tokens: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_persona(&self) -> Option<String> {
        self.last_persona.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }

    pub fn last_max_tokens(&self) -> Option<u32> {
        *self.last_max_tokens.lock().unwrap()
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_persona.lock().unwrap() = Some(request.persona.to_string());
        *self.last_prompt.lock().unwrap() = Some(request.prompt.to_string());
        *self.last_max_tokens.lock().unwrap() = request.max_tokens;
        self.reply
            .clone()
            .ok_or_else(|| Error::Generation("stub generator quota exceeded".to_string()))
    }

    fn name(&self) -> &'static str {
        "stub-llm"
    }
}

/// Synthesizer returning [`STUB_AUDIO`] and recording the language it was given
pub struct StubSynthesizer {
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_language: Mutex<Option<LanguageTag>>,
}

impl StubSynthesizer {
    pub fn working() -> Arc<Self> {
        Self::build(false, None)
    }

    pub fn failing() -> Arc<Self> {
        Self::build(true, None)
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Self::build(false, Some(delay))
    }

    fn build(fail: bool, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            fail,
            delay,
            calls: AtomicUsize::new(0),
            last_language: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_language(&self) -> Option<LanguageTag> {
        *self.last_language.lock().unwrap()
    }
}

#[async_trait]
impl Synthesizer for StubSynthesizer {
    async fn synthesize(&self, _text: &str, language: LanguageTag) -> Result<SynthesizedAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_language.lock().unwrap() = Some(language);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::Synthesis("stub voice offline".to_string()));
        }
        Ok(SynthesizedAudio {
            data: STUB_AUDIO.to_vec(),
            mime_type: "audio/mpeg",
            voice: language.code().to_string(),
            language,
        })
    }

    fn name(&self) -> &'static str {
        "stub-tts"
    }
}

/// Stub collaborators wired into a pipeline, kept for call assertions
pub struct Harness {
    pub transcriber: Arc<StubTranscriber>,
    pub generator: Arc<StubGenerator>,
    pub synthesizer: Arc<StubSynthesizer>,
}

impl Harness {
    pub fn new(transcript: &str, reply: &str) -> Self {
        Self::with(
            StubTranscriber::says(transcript),
            StubGenerator::replies(reply),
            StubSynthesizer::working(),
        )
    }

    pub fn with(
        transcriber: Arc<StubTranscriber>,
        generator: Arc<StubGenerator>,
        synthesizer: Arc<StubSynthesizer>,
    ) -> Self {
        Self {
            transcriber,
            generator,
            synthesizer,
        }
    }

    pub fn pipeline(&self) -> RequestPipeline {
        RequestPipeline::new(
            self.transcriber.clone(),
            self.generator.clone(),
            self.synthesizer.clone(),
        )
    }
}

/// Canned responses in store order
pub fn lookup_table(rows: &[(&str, &str)]) -> Arc<LookupTable> {
    Arc::new(LookupTable::new(
        rows.iter().map(|(q, r)| LookupEntry::new(*q, *r)).collect(),
    ))
}

/// A tenth of a second of 16 kHz mono silence
pub fn silent_wav() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for _ in 0..1_600 {
            writer.write_sample(0_i16).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

/// [`silent_wav`] encoded as standard base64
pub fn silent_wav_base64() -> String {
    base64::engine::general_purpose::STANDARD.encode(silent_wav())
}
