//! Inbound audio decoding
//!
//! Turns a base64 string or an uploaded binary into an [`AudioPayload`]
//! carrying a format hint for the transcription provider.

use std::io::Cursor;
use std::time::Duration;

use base64::Engine;

use crate::{Error, Result};

/// Default maximum accepted audio size (10 MiB)
pub const DEFAULT_MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

/// Container format hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Ogg,
    Webm,
    Flac,
    Mp4,
    Unknown,
}

impl AudioFormat {
    /// Detect format from leading magic bytes
    #[must_use]
    pub fn sniff(data: &[u8]) -> Self {
        match data {
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Self::Wav,
            [b'I', b'D', b'3', ..] | [0xFF, 0xE0..=0xFF, ..] => Self::Mp3,
            [b'O', b'g', b'g', b'S', ..] => Self::Ogg,
            [0x1A, 0x45, 0xDF, 0xA3, ..] => Self::Webm,
            [b'f', b'L', b'a', b'C', ..] => Self::Flac,
            [_, _, _, _, b'f', b't', b'y', b'p', ..] => Self::Mp4,
            _ => Self::Unknown,
        }
    }

    /// Map a declared MIME type to a format
    #[must_use]
    pub fn from_mime(mime_type: &str) -> Self {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "audio/wav" | "audio/wave" | "audio/x-wav" | "audio/vnd.wave" => Self::Wav,
            "audio/mpeg" | "audio/mp3" => Self::Mp3,
            "audio/ogg" | "application/ogg" => Self::Ogg,
            "audio/webm" | "video/webm" => Self::Webm,
            "audio/flac" | "audio/x-flac" => Self::Flac,
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Self::Mp4,
            _ => Self::Unknown,
        }
    }

    /// MIME type sent to providers
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Wav | Self::Unknown => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Webm => "audio/webm",
            Self::Flac => "audio/flac",
            Self::Mp4 => "audio/mp4",
        }
    }

    /// File extension used for multipart uploads
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Wav | Self::Unknown => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Webm => "webm",
            Self::Flac => "flac",
            Self::Mp4 => "m4a",
        }
    }
}

/// Raw encoded audio plus a format hint
#[derive(Debug, Clone)]
pub struct AudioPayload {
    data: Vec<u8>,
    format: AudioFormat,
}

impl AudioPayload {
    /// Wrap raw bytes, sniffing the format and falling back to a declared
    /// content type
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the audio is empty or larger than `max_bytes`
    pub fn from_bytes(data: Vec<u8>, content_type: Option<&str>, max_bytes: usize) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Decode("empty audio data".to_string()));
        }
        if data.len() > max_bytes {
            return Err(Error::Decode(format!(
                "audio is {} bytes, limit is {max_bytes}",
                data.len()
            )));
        }

        let format = match AudioFormat::sniff(&data) {
            AudioFormat::Unknown => content_type.map_or(AudioFormat::Unknown, AudioFormat::from_mime),
            sniffed => sniffed,
        };

        Ok(Self { data, format })
    }

    /// Decode a base64 string, optionally carrying a `data:<mime>;base64,`
    /// prefix
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` on malformed base64, empty or oversized audio
    pub fn from_base64(encoded: &str, max_bytes: usize) -> Result<Self> {
        let (declared, body) = split_data_url(encoded.trim());

        // Base64 inflates by 4/3; reject before allocating the decoded buffer
        if body.len() / 4 * 3 > max_bytes.saturating_add(3) {
            return Err(Error::Decode(format!("audio exceeds {max_bytes} byte limit")));
        }

        let data = base64::engine::general_purpose::STANDARD
            .decode(body)
            .map_err(|e| Error::Decode(format!("invalid base64 audio: {e}")))?;

        Self::from_bytes(data, declared, max_bytes)
    }

    /// Encoded audio bytes
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Format hint
    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    /// Size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload holds no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Playback duration, when the payload is a readable WAV file
    #[must_use]
    pub fn wav_duration(&self) -> Option<Duration> {
        if self.format != AudioFormat::Wav {
            return None;
        }
        let reader = hound::WavReader::new(Cursor::new(&self.data)).ok()?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return None;
        }
        let frames = reader.duration();
        Some(Duration::from_secs_f64(
            f64::from(frames) / f64::from(spec.sample_rate),
        ))
    }
}

/// Split `data:audio/webm;base64,XXXX` into (`Some("audio/webm")`, `"XXXX"`)
fn split_data_url(input: &str) -> (Option<&str>, &str) {
    let Some(rest) = input.strip_prefix("data:") else {
        return (None, input);
    };
    let Some((header, body)) = rest.split_once(',') else {
        return (None, input);
    };
    let mime = header.split(';').next().filter(|m| !m.is_empty());
    (mime, body)
}
