use crate::error::BloomError;
use std::fmt;
use std::str::FromStr;

/// Character encodings text values can be decomposed with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Charset {
    #[default]
    Utf8,
    /// Big-endian with a leading byte-order mark
    Utf16,
    Utf16Be,
    Utf16Le,
    Iso8859_1,
    UsAscii,
}

impl Charset {
    /// The encoding used when none is configured.
    pub fn platform_default() -> Self {
        Charset::Utf8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Utf16 => "UTF-16",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Utf16Le => "UTF-16LE",
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::UsAscii => "US-ASCII",
        }
    }

    /// Appends the encoded form of `text` to `out`.
    ///
    /// Characters the charset cannot represent are written as `?`.
    pub fn encode_into(&self, text: &str, out: &mut Vec<u8>) {
        match self {
            Charset::Utf8 => out.extend_from_slice(text.as_bytes()),
            Charset::Utf16 => {
                out.extend_from_slice(&[0xFE, 0xFF]);
                text.encode_utf16()
                    .for_each(|unit| out.extend_from_slice(&unit.to_be_bytes()));
            }
            Charset::Utf16Be => text
                .encode_utf16()
                .for_each(|unit| out.extend_from_slice(&unit.to_be_bytes())),
            Charset::Utf16Le => text
                .encode_utf16()
                .for_each(|unit| out.extend_from_slice(&unit.to_le_bytes())),
            Charset::Iso8859_1 => out.extend(
                text.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')),
            ),
            Charset::UsAscii => out.extend(
                text.chars()
                    .map(|c| if c.is_ascii() { c as u8 } else { b'?' }),
            ),
        }
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len());
        self.encode_into(text, &mut out);
        out
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = BloomError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(BloomError::InvalidArgument(
                "Charset name cannot be empty".to_string(),
            ));
        }

        let normalized: String = trimmed
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "utf8" => Ok(Charset::Utf8),
            "utf16" => Ok(Charset::Utf16),
            "utf16be" | "unicodebigunmarked" => Ok(Charset::Utf16Be),
            "utf16le" | "unicodelittleunmarked" => Ok(Charset::Utf16Le),
            "iso88591" | "latin1" | "l1" => Ok(Charset::Iso8859_1),
            "usascii" | "ascii" => Ok(Charset::UsAscii),
            _ => Err(BloomError::UnsupportedCharset(trimmed.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!("UTF-8".parse::<Charset>().unwrap(), Charset::Utf8);
        assert_eq!("utf8".parse::<Charset>().unwrap(), Charset::Utf8);
        assert_eq!("Latin1".parse::<Charset>().unwrap(), Charset::Iso8859_1);
        assert_eq!("ISO_8859_1".parse::<Charset>().unwrap(), Charset::Iso8859_1);
        assert_eq!("US-ASCII".parse::<Charset>().unwrap(), Charset::UsAscii);
        assert_eq!("utf-16le".parse::<Charset>().unwrap(), Charset::Utf16Le);
    }

    #[test]
    fn test_parse_rejects_unknown_and_empty() {
        assert!(matches!(
            "EBCDIC".parse::<Charset>(),
            Err(BloomError::UnsupportedCharset(name)) if name == "EBCDIC"
        ));
        assert!(matches!(
            "  ".parse::<Charset>(),
            Err(BloomError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_names_round_trip() {
        for charset in [
            Charset::Utf8,
            Charset::Utf16,
            Charset::Utf16Be,
            Charset::Utf16Le,
            Charset::Iso8859_1,
            Charset::UsAscii,
        ] {
            assert_eq!(charset.name().parse::<Charset>().unwrap(), charset);
        }
    }

    #[test]
    fn test_encodings() {
        assert_eq!(Charset::Utf8.encode("é"), vec![0xC3, 0xA9]);
        assert_eq!(Charset::Iso8859_1.encode("é€"), vec![0xE9, b'?']);
        assert_eq!(Charset::UsAscii.encode("aé"), vec![b'a', b'?']);
        assert_eq!(Charset::Utf16Be.encode("A"), vec![0x00, 0x41]);
        assert_eq!(Charset::Utf16Le.encode("A"), vec![0x41, 0x00]);
        assert_eq!(Charset::Utf16.encode("A"), vec![0xFE, 0xFF, 0x00, 0x41]);
    }
}
