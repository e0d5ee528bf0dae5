//! # Character Sets
//!
//! Strict encoders and decoders for the character sets the string converters
//! support. Unmappable characters and malformed input are reported as
//! [`ConversionError`], never replaced.
//!
//! Coders are cached per thread and per charset, and are created lazily the
//! first time a thread uses a charset. A coder keeps its decode table
//! between calls, so it must never be shared across threads. Encoding needs
//! no cached state and writes straight into the returned buffer.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use crate::error::ConversionError;

/// Character sets understood by [`super::StringConverter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    Utf8,
    UsAscii,
    /// ISO-8859-1.
    Latin1,
}

impl Charset {
    /// Canonical charset name used in error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::UsAscii => "US-ASCII",
            Charset::Latin1 => "ISO-8859-1",
        }
    }

    /// Highest code point representable in a single byte, if any.
    fn single_byte_limit(self) -> Option<u32> {
        match self {
            Charset::Utf8 => None,
            Charset::UsAscii => Some(0x7F),
            Charset::Latin1 => Some(0xFF),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Per-thread coder
// =============================================================================

type DecodeTable = [Option<char>; 256];

struct CharsetCoder {
    charset: Charset,
    decode_table: Option<Box<DecodeTable>>,
}

impl CharsetCoder {
    fn new(charset: Charset) -> Self {
        Self {
            charset,
            decode_table: None,
        }
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, ConversionError> {
        let Some(limit) = self.charset.single_byte_limit() else {
            return Ok(text.as_bytes().to_vec());
        };

        let mut encoded = Vec::with_capacity(text.len());
        for (position, character) in text.char_indices() {
            let code = u32::from(character);
            if code > limit {
                return Err(ConversionError::Unmappable {
                    charset: self.charset.name(),
                    character,
                    position,
                });
            }
            // code <= 0xFF here
            encoded.push(code as u8);
        }
        Ok(encoded)
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<String, ConversionError> {
        let charset = self.charset;
        let Some(limit) = charset.single_byte_limit() else {
            return std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| ConversionError::Malformed {
                    charset: charset.name(),
                    position: e.valid_up_to(),
                });
        };

        let table = self
            .decode_table
            .get_or_insert_with(|| Box::new(build_decode_table(limit)));
        let mut text = String::with_capacity(bytes.len());
        for (position, byte) in bytes.iter().enumerate() {
            match table[usize::from(*byte)] {
                Some(character) => text.push(character),
                None => {
                    return Err(ConversionError::Malformed {
                        charset: charset.name(),
                        position,
                    })
                }
            }
        }
        Ok(text)
    }
}

fn build_decode_table(limit: u32) -> DecodeTable {
    let mut table = [None; 256];
    for (byte, slot) in table.iter_mut().enumerate() {
        let code = byte as u32;
        if code <= limit {
            *slot = char::from_u32(code);
        }
    }
    table
}

thread_local! {
    static CODERS: RefCell<HashMap<Charset, CharsetCoder>> = RefCell::new(HashMap::new());
}

fn with_coder<R>(charset: Charset, f: impl FnOnce(&mut CharsetCoder) -> R) -> R {
    CODERS.with(|coders| {
        let mut coders = coders.borrow_mut();
        let coder = coders
            .entry(charset)
            .or_insert_with(|| CharsetCoder::new(charset));
        f(coder)
    })
}

/// Encode `text` in `charset` using this thread's coder.
///
/// # Errors
///
/// Returns [`ConversionError::Unmappable`] for the first character the
/// charset cannot represent.
pub fn encode(charset: Charset, text: &str) -> Result<Vec<u8>, ConversionError> {
    with_coder(charset, |coder| coder.encode(text))
}

/// Decode `bytes` as `charset` using this thread's coder.
///
/// # Errors
///
/// Returns [`ConversionError::Malformed`] for the first byte sequence that is
/// not valid in the charset.
pub fn decode(charset: Charset, bytes: &[u8]) -> Result<String, ConversionError> {
    with_coder(charset, |coder| coder.decode(bytes))
}

#[cfg(test)]
fn cached_coders() -> usize {
    CODERS.with(|coders| coders.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_passthrough() {
        assert_eq!(encode(Charset::Utf8, "héllo").unwrap(), "héllo".as_bytes());
        assert_eq!(decode(Charset::Utf8, "日本".as_bytes()).unwrap(), "日本");
    }

    #[test]
    fn test_utf8_reports_malformed_position() {
        let err = decode(Charset::Utf8, &[b'a', b'b', 0xFF, b'c']).unwrap_err();
        assert!(matches!(err, ConversionError::Malformed { position: 2, .. }));
    }

    #[test]
    fn test_ascii_rejects_non_ascii() {
        let err = encode(Charset::UsAscii, "abç").unwrap_err();
        assert!(matches!(
            err,
            ConversionError::Unmappable { character: 'ç', position: 2, .. }
        ));

        let err = decode(Charset::UsAscii, &[0x41, 0x80]).unwrap_err();
        assert!(matches!(err, ConversionError::Malformed { position: 1, .. }));
    }

    #[test]
    fn test_latin1_maps_high_bytes() {
        assert_eq!(encode(Charset::Latin1, "é").unwrap(), vec![0xE9]);
        assert_eq!(decode(Charset::Latin1, &[0xE9, 0x41]).unwrap(), "éA");
        assert!(encode(Charset::Latin1, "€").is_err());
    }

    #[test]
    fn test_coders_are_created_lazily_per_thread() {
        std::thread::spawn(|| {
            assert_eq!(cached_coders(), 0);
            encode(Charset::UsAscii, "a").unwrap();
            encode(Charset::UsAscii, "b").unwrap();
            assert_eq!(cached_coders(), 1);
            decode(Charset::Latin1, b"c").unwrap();
            assert_eq!(cached_coders(), 2);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_encodings_are_independent_of_earlier_calls() {
        assert_eq!(encode(Charset::UsAscii, "longer text").unwrap(), b"longer text");
        assert!(encode(Charset::UsAscii, "half ünmappable").is_err());
        assert_eq!(encode(Charset::UsAscii, "ab").unwrap(), b"ab");
    }
}
