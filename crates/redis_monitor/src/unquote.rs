//! Decoder for the double-quoted, backslash-escaped strings of the monitor
//! trace format.
//!
//! The producer escapes `\\`, `\"`, `\n`, `\r`, `\t`, `\a` and `\b`, and
//! renders every other non-printable byte as `\xHH`. The common C escapes
//! `\'`, `\f` and `\v` are accepted as well.

use crate::error::UnquoteError;

/// Decodes a complete quoted token, delimiters included.
///
/// `\xHH` escapes produce raw bytes; byte sequences that are not valid UTF-8
/// are replaced with U+FFFD.
pub fn unquote(token: &str) -> Result<String, UnquoteError> {
    let inner = token
        .strip_prefix('"')
        .ok_or(UnquoteError::MissingOpeningQuote)?
        .strip_suffix('"')
        .ok_or(UnquoteError::MissingClosingQuote)?;

    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        // Indices reported in errors are relative to `token`, not `inner`.
        let index = i + 1;
        match bytes[i] {
            b'"' => return Err(UnquoteError::UnescapedQuote { index }),
            b'\n' => return Err(UnquoteError::RawNewline { index }),
            b'\\' => {
                let Some(&escape) = bytes.get(i + 1) else {
                    return Err(UnquoteError::DanglingBackslash);
                };
                if escape == b'x' {
                    let byte = bytes
                        .get(i + 2..i + 4)
                        .and_then(hex_byte)
                        .ok_or(UnquoteError::InvalidHexEscape { index })?;
                    out.push(byte);
                    i += 4;
                    continue;
                }
                let Some(decoded) = simple_escape(escape) else {
                    let escape = inner[i + 1..].chars().next().unwrap_or('\\');
                    return Err(UnquoteError::UnknownEscape { escape, index });
                };
                out.push(decoded);
                i += 2;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }

    Ok(match String::from_utf8(out) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}

fn simple_escape(escape: u8) -> Option<u8> {
    Some(match escape {
        b'\\' => b'\\',
        b'"' => b'"',
        b'\'' => b'\'',
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'a' => 0x07,
        b'b' => 0x08,
        b'f' => 0x0c,
        b'v' => 0x0b,
        _ => return None,
    })
}

fn hex_byte(digits: &[u8]) -> Option<u8> {
    let [hi, lo] = digits else {
        return None;
    };
    let hi = char::from(*hi).to_digit(16)?;
    let lo = char::from(*lo).to_digit(16)?;
    u8::try_from(hi * 16 + lo).ok()
}
