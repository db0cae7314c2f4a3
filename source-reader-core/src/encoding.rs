//! Best-effort text encoding detection for repository files.
//!
//! Detection runs in tiers and the first one that succeeds wins:
//! 1. strict UTF-8,
//! 2. the `chardet` byte-frequency guesser, when it is confident enough,
//! 3. strict decodes against a fixed fallback list (GB18030, GBK, Latin-1),
//! 4. UTF-8 as a last resort.
//!
//! Nothing in here fails. A bad guess only shows up later, when
//! [`TextEncoding::decode_strict`] refuses the bytes.

use std::borrow::Cow;

use encoding_rs::Encoding;
use tracing::debug;

/// The guesser's confidence must exceed this before its answer is used.
pub const CONFIDENCE_THRESHOLD: f32 = 0.7;

/// An encoding the extractor knows how to decode strictly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// Any encoding from the WHATWG registry, as implemented by `encoding_rs`.
    Whatwg(&'static Encoding),
    /// True ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Whatwg(encoding) => encoding.name(),
            TextEncoding::Latin1 => "iso-8859-1",
        }
    }

    /// Decodes without replacement characters; `None` on any malformed sequence.
    pub fn decode_strict<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            TextEncoding::Whatwg(encoding) => {
                encoding.decode_without_bom_handling_and_without_replacement(bytes)
            }
            TextEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes)),
        }
    }
}

/// Which detection tier produced a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionTier {
    Strict,
    Statistical,
    Fallback,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub encoding: TextEncoding,
    pub tier: DetectionTier,
}

impl Detection {
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }
}

/// Guesses the encoding of a byte buffer.
#[derive(Debug, Clone)]
pub struct EncodingDetector {
    confidence_threshold: f32,
    fallbacks: Vec<TextEncoding>,
}

impl Default for EncodingDetector {
    fn default() -> Self {
        Self {
            confidence_threshold: CONFIDENCE_THRESHOLD,
            fallbacks: vec![
                TextEncoding::Whatwg(encoding_rs::GB18030),
                TextEncoding::Whatwg(encoding_rs::GBK),
                // ISO-8859-1, a.k.a. Latin-1. Decodes every input.
                TextEncoding::Latin1,
            ],
        }
    }
}

impl EncodingDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detect(&self, bytes: &[u8]) -> Detection {
        if std::str::from_utf8(bytes).is_ok() {
            return Detection {
                encoding: TextEncoding::Utf8,
                tier: DetectionTier::Strict,
            };
        }

        if let Some(encoding) = self.statistical_guess(bytes) {
            return Detection {
                encoding,
                tier: DetectionTier::Statistical,
            };
        }

        for candidate in &self.fallbacks {
            if candidate.decode_strict(bytes).is_some() {
                debug!(encoding = candidate.name(), "Fallback encoding decoded cleanly");
                return Detection {
                    encoding: *candidate,
                    tier: DetectionTier::Fallback,
                };
            }
        }

        Detection {
            encoding: TextEncoding::Utf8,
            tier: DetectionTier::Default,
        }
    }

    fn statistical_guess(&self, bytes: &[u8]) -> Option<TextEncoding> {
        let (charset, confidence, _language) = chardet::detect(&bytes.to_vec());
        debug!(charset = %charset, confidence, "chardet guess");
        if confidence <= self.confidence_threshold {
            return None;
        }
        text_encoding_for_label(chardet::charset2encoding(&charset))
    }
}

/// Maps a charset label to a decoder.
///
/// ISO-8859-1 labels stay true Latin-1; the WHATWG registry would treat them
/// as windows-1252, which turns `0x80..=0x9F` into punctuation.
pub fn text_encoding_for_label(label: &str) -> Option<TextEncoding> {
    let normalized = label.trim().to_ascii_lowercase();
    if matches!(
        normalized.as_str(),
        "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "l1"
    ) {
        return Some(TextEncoding::Latin1);
    }
    let encoding = Encoding::for_label(normalized.as_bytes())?;
    if encoding == encoding_rs::UTF_8 {
        Some(TextEncoding::Utf8)
    } else {
        Some(TextEncoding::Whatwg(encoding))
    }
}
