use std::str::FromStr;

use crate::config_store::ConfigError;

/// Text encodings accepted by [`LoadFileOptions::encoding`](super::LoadFileOptions).
///
/// Names follow the Node.js buffer encodings and are matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// `utf8` / `utf-8`; invalid sequences become U+FFFD.
    #[default]
    Utf8,
    /// `utf16le` / `utf-16le` / `ucs2` / `ucs-2`; a trailing odd byte is dropped.
    Utf16Le,
    /// `latin1` / `binary`; every byte maps to the code point of the same value.
    Latin1,
    /// `ascii`; the high bit of every byte is cleared.
    Ascii,
}

impl FromStr for Encoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Self::Utf16Le),
            "latin1" | "binary" => Ok(Self::Latin1),
            "ascii" => Ok(Self::Ascii),
            _ => Err(ConfigError::UnsupportedEncoding {
                encoding: s.to_string(),
            }),
        }
    }
}

impl Encoding {
    /// Decodes raw file bytes into text.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Utf16Le => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Self::Ascii => bytes.iter().map(|&b| char::from(b & 0x7f)).collect(),
        }
    }
}
