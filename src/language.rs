//! Script-based language detection used to route replies to a voice

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse language classification for voice/locale selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageTag {
    #[serde(rename = "ar")]
    Arabic,
    #[default]
    #[serde(rename = "en")]
    English,
}

impl LanguageTag {
    /// Classify text: Arabic if any character is an Arabic-script letter,
    /// English otherwise
    #[must_use]
    pub fn detect(text: &str) -> Self {
        if text.chars().any(is_arabic_letter) {
            Self::Arabic
        } else {
            Self::English
        }
    }

    /// ISO 639-1 code
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Arabic => "ar",
            Self::English => "en",
        }
    }

    /// English name, as used in persona instructions
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Arabic => "Arabic",
            Self::English => "English",
        }
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Arabic-script letter test. Digits, punctuation and tatweel inside the
/// Arabic blocks do not count.
#[must_use]
pub fn is_arabic_letter(c: char) -> bool {
    let in_block = matches!(
        c,
        '\u{0600}'..='\u{06FF}'
            | '\u{0750}'..='\u{077F}'
            | '\u{08A0}'..='\u{08FF}'
            | '\u{FB50}'..='\u{FDFF}'
            | '\u{FE70}'..='\u{FEFF}'
    );
    in_block && c.is_alphabetic() && c != '\u{0640}'
}

/// Which text feeds language detection for voice selection
///
/// Deployments differ: some pick the voice from what the user said, others
/// from what the assistant answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageSource {
    #[default]
    Transcript,
    Response,
}

impl LanguageSource {
    /// Pick the text to inspect
    #[must_use]
    pub const fn select<'a>(self, transcript: &'a str, response: &'a str) -> &'a str {
        match self {
            Self::Transcript => transcript,
            Self::Response => response,
        }
    }
}

impl FromStr for LanguageSource {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transcript" | "input" => Ok(Self::Transcript),
            "response" | "reply" | "output" => Ok(Self::Response),
            other => Err(crate::Error::Config(format!(
                "unknown language detection source: {other}"
            ))),
        }
    }
}
