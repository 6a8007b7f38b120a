//! Escape decoding for string and char literals.

use lazy_regex::regex;

use crate::diagnostic::{Diagnostic, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnescapeError {
    /// A backslash at the very end of the literal.
    UnmatchedBackslash(usize),
    InvalidEscape(String),
}

impl From<UnescapeError> for Diagnostic {
    fn from(err: UnescapeError) -> Self {
        Diagnostic::error(match err {
            UnescapeError::UnmatchedBackslash(_) => ErrorKind::InvalidEscapeSequence("\\".to_owned()),
            UnescapeError::InvalidEscape(seq) => ErrorKind::InvalidEscapeSequence(seq),
        })
    }
}

/// Decodes the escapes in `s` into raw bytes.
///
/// Supported: `\n \t \r \0 \\ \" \' \a \b \f \v`, `\xHH` and octal `\NNN`.
pub fn unescape(s: &str) -> Result<Vec<u8>, UnescapeError> {
    let escape = regex!(r"\\(?:x([0-9a-fA-F]{2})|([0-7]{1,3})|(.)|$)");

    let mut out = Vec::with_capacity(s.len());
    let mut last = 0;

    for cap in escape.captures_iter(s) {
        let Some(whole) = cap.get(0) else {
            continue;
        };
        out.extend_from_slice(s[last..whole.start()].as_bytes());
        last = whole.end();

        let byte = if let Some(hex) = cap.get(1) {
            u8::from_str_radix(hex.as_str(), 16)
                .map_err(|_| UnescapeError::InvalidEscape(whole.as_str().to_owned()))?
        } else if let Some(octal) = cap.get(2) {
            u16::from_str_radix(octal.as_str(), 8)
                .ok()
                .and_then(|value| u8::try_from(value).ok())
                .ok_or_else(|| UnescapeError::InvalidEscape(whole.as_str().to_owned()))?
        } else if let Some(simple) = cap.get(3) {
            match simple.as_str() {
                "n" => b'\n',
                "t" => b'\t',
                "r" => b'\r',
                "\\" => b'\\',
                "\"" => b'"',
                "'" => b'\'',
                "a" => 0x07,
                "b" => 0x08,
                "f" => 0x0C,
                "v" => 0x0B,
                _ => return Err(UnescapeError::InvalidEscape(whole.as_str().to_owned())),
            }
        } else {
            return Err(UnescapeError::UnmatchedBackslash(whole.start()));
        };
        out.push(byte);
    }

    out.extend_from_slice(s[last..].as_bytes());
    Ok(out)
}

/// Strips the surrounding quotes of a literal and decodes its escapes.
pub fn unquote(literal: &str) -> Result<Vec<u8>, Diagnostic> {
    let inner = literal
        .get(1..literal.len().saturating_sub(1))
        .filter(|_| literal.len() >= 2)
        .ok_or(ErrorKind::UnterminatedStringOrChar)?;
    Ok(unescape(inner)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_all() {
        let unescaped = unescape(r"\050 hello \x29 \t\n\0").unwrap();
        assert_eq!(unescaped, b"\x28 hello \x29 \t\n\0");
        assert_eq!(unescape(r#"\"\\\'"#).unwrap(), b"\"\\'");
        assert_eq!(unescape(r"\xff").unwrap(), vec![0xFF]);
    }

    #[test]
    fn failures() {
        assert_eq!(unescape(r"\050 \"), Err(UnescapeError::UnmatchedBackslash(5)));
        assert_eq!(
            unescape(r"\q"),
            Err(UnescapeError::InvalidEscape(r"\q".to_owned()))
        );
        assert!(unescape(r"\777").is_err());
    }

    #[test]
    fn unquoting() {
        assert_eq!(unquote(r#""hi\n""#).unwrap(), b"hi\n");
        assert_eq!(unquote("''").unwrap(), b"");
    }
}
