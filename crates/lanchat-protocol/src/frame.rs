//! Newline-delimited text framing.
//!
//! One application message is one line. The writer appends `\n`; the
//! reader strips the terminator (and a `\r` left by CRLF peers).

use thiserror::Error;

/// Upper bound for a single inbound line, terminator included.
///
/// A peer that streams more than this without a newline is dropped.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Longest message an operator may send, in characters.
pub const MAX_MESSAGE_CHARS: usize = 100;

/// Errors raised while framing chat text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("message too long: {len} characters (max: {max})")]
    MessageTooLong { len: usize, max: usize },

    #[error("message must not contain line breaks")]
    EmbeddedNewline,

    #[error("line exceeds {max} bytes without a newline")]
    LineTooLong { max: usize },
}

/// Frames an outgoing chat message as a single `\n`-terminated line.
pub fn encode_line(message: &str) -> Result<Vec<u8>, ProtocolError> {
    if message.contains(['\n', '\r']) {
        return Err(ProtocolError::EmbeddedNewline);
    }

    let len = message.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(ProtocolError::MessageTooLong {
            len,
            max: MAX_MESSAGE_CHARS,
        });
    }

    let mut frame = Vec::with_capacity(message.len() + 1);
    frame.extend_from_slice(message.as_bytes());
    frame.push(b'\n');
    Ok(frame)
}

/// Decodes one raw line read off the wire.
///
/// The trailing `\n` (and optional `\r`) are removed. Invalid UTF-8 is
/// replaced rather than rejected since the payload is only displayed.
pub fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_appends_newline() {
        assert_eq!(encode_line("hello").unwrap(), b"hello\n".to_vec());
        assert_eq!(encode_line("").unwrap(), b"\n".to_vec());
    }

    #[test]
    fn test_encode_rejects_line_breaks() {
        assert_eq!(encode_line("a\nb"), Err(ProtocolError::EmbeddedNewline));
        assert_eq!(encode_line("a\rb"), Err(ProtocolError::EmbeddedNewline));
    }

    #[test]
    fn test_encode_length_counts_characters() {
        let exact = "é".repeat(MAX_MESSAGE_CHARS);
        assert!(encode_line(&exact).is_ok());

        let over = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(
            encode_line(&over),
            Err(ProtocolError::MessageTooLong {
                len: MAX_MESSAGE_CHARS + 1,
                max: MAX_MESSAGE_CHARS,
            })
        );
    }

    #[test]
    fn test_decode_strips_terminators() {
        assert_eq!(decode_line(b"hello\n"), "hello");
        assert_eq!(decode_line(b"hello\r\n"), "hello");
        assert_eq!(decode_line(b"partial"), "partial");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[test]
    fn test_decode_is_lossy() {
        assert_eq!(decode_line(b"hi \xff\n"), "hi \u{fffd}");
    }

    #[test]
    fn test_error_display() {
        let err = ProtocolError::LineTooLong { max: MAX_LINE_BYTES };
        assert!(err.to_string().contains("65536"));
    }
}
