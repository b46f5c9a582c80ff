use std::collections::VecDeque;
use std::fmt;
use std::io::{ErrorKind, Read};

use crate::error::CursorError;

const CHUNK_SIZE_BYTES: usize = 8192;

/// Location of the next character a [`CharCursor`] will return.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Position {
    /// 1-based input line.
    pub line: usize,
    /// 0-based character offset from the start of the stream.
    pub offset: u64,
}

impl Position {
    pub const START: Position = Position { line: 1, offset: 0 };

    fn advance(&mut self, ch: char) {
        self.offset += 1;
        if ch == '\n' {
            self.line += 1;
        }
    }

    fn retreat(&mut self, ch: char) {
        self.offset = self.offset.saturating_sub(1);
        if ch == '\n' {
            self.line = self.line.saturating_sub(1).max(1);
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} (char {})", self.line, self.offset)
    }
}

/// Character-level reader over a UTF-8 byte stream with one character of
/// push back and an explicit replay queue.
///
/// Bytes are pulled from the underlying reader in fixed-size chunks; a
/// multi-byte character split across two chunks is reassembled.
pub struct CharCursor<R: Read> {
    reader: R,
    buffer: [u8; CHUNK_SIZE_BYTES],
    buffer_pos: usize,
    buffer_len: usize,
    replay: VecDeque<char>,
    last: Option<char>,
    position: Position,
    done: bool,
}

impl<R: Read> CharCursor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: [0u8; CHUNK_SIZE_BYTES],
            buffer_pos: 0,
            buffer_len: 0,
            replay: VecDeque::new(),
            last: None,
            position: Position::START,
            done: false,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Returns the next character, draining the replay queue before the
    /// underlying stream.
    pub fn next_char(&mut self) -> Result<char, CursorError> {
        self.last = None;
        let ch = match self.replay.pop_front() {
            Some(ch) => ch,
            None => self.decode_char()?,
        };
        self.position.advance(ch);
        self.last = Some(ch);
        Ok(ch)
    }

    /// Un-reads the character most recently returned by [`Self::next_char`].
    ///
    /// Only one character can be pushed back between two reads.
    pub fn push_back(&mut self) -> Result<(), CursorError> {
        let ch = self.last.take().ok_or(CursorError::InvalidPushback)?;
        self.position.retreat(ch);
        self.replay.push_front(ch);
        Ok(())
    }

    /// Re-injects already consumed characters so they are returned again, in
    /// order, before anything else.
    ///
    /// `chars` must be the characters most recently returned by
    /// [`Self::next_char`]; the position is rewound accordingly.
    pub fn replay(&mut self, chars: &[char]) {
        self.last = None;
        for &ch in chars.iter().rev() {
            self.position.retreat(ch);
            self.replay.push_front(ch);
        }
    }

    /// Whether the stream is exhausted. Does not consume anything.
    pub fn at_end(&mut self) -> Result<bool, CursorError> {
        match self.next_char() {
            Ok(_) => {
                self.push_back()?;
                Ok(false)
            }
            Err(CursorError::EndOfInput { .. }) => Ok(true),
            Err(err) => Err(err),
        }
    }

    fn fill_buffer(&mut self) -> Result<usize, CursorError> {
        loop {
            match self.reader.read(&mut self.buffer) {
                Ok(n) => {
                    self.buffer_pos = 0;
                    self.buffer_len = n;
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(CursorError::Io {
                        position: self.position,
                        source,
                    })
                }
            }
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>, CursorError> {
        if self.buffer_pos >= self.buffer_len {
            if self.done {
                return Ok(None);
            }
            if self.fill_buffer()? == 0 {
                self.done = true;
                return Ok(None);
            }
        }
        let byte = self.buffer[self.buffer_pos];
        self.buffer_pos += 1;
        Ok(Some(byte))
    }

    fn decode_char(&mut self) -> Result<char, CursorError> {
        let position = self.position;
        let Some(lead) = self.next_byte()? else {
            return Err(CursorError::EndOfInput { position });
        };
        if lead.is_ascii() {
            return Ok(char::from(lead));
        }

        let width = utf8_width(lead).ok_or(CursorError::InvalidUtf8 { position })?;
        let mut bytes = [lead, 0, 0, 0];
        for slot in bytes.iter_mut().take(width).skip(1) {
            *slot = self
                .next_byte()?
                .ok_or(CursorError::InvalidUtf8 { position })?;
        }
        std::str::from_utf8(&bytes[..width])
            .ok()
            .and_then(|text| text.chars().next())
            .ok_or(CursorError::InvalidUtf8 { position })
    }
}

fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind as Kind;

    /// Hands out one byte per `read` call so every character straddles a
    /// chunk boundary.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.split_first() {
                Some((first, rest)) if !buf.is_empty() => {
                    buf[0] = *first;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::BrokenPipe, "gone"))
        }
    }

    fn cursor(text: &str) -> CharCursor<std::io::Cursor<Vec<u8>>> {
        CharCursor::new(std::io::Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn reads_characters_then_end_of_input() {
        let mut c = cursor("ab");
        assert_eq!(c.next_char().unwrap(), 'a');
        assert_eq!(c.next_char().unwrap(), 'b');
        let err = c.next_char().unwrap_err();
        assert_eq!(err.kind(), Kind::EndOfInput);
        assert_eq!(c.next_char().unwrap_err().kind(), Kind::EndOfInput);
    }

    #[test]
    fn push_back_returns_the_same_character_once() {
        let mut c = cursor("xy");
        assert_eq!(c.next_char().unwrap(), 'x');
        c.push_back().unwrap();
        assert_eq!(c.push_back().unwrap_err().kind(), Kind::InvalidPushback);
        assert_eq!(c.next_char().unwrap(), 'x');
        assert_eq!(c.next_char().unwrap(), 'y');
    }

    #[test]
    fn push_back_before_any_read_is_rejected() {
        let mut c = cursor("x");
        assert!(matches!(c.push_back(), Err(CursorError::InvalidPushback)));
    }

    #[test]
    fn replay_reinjects_several_characters_in_order() {
        let mut c = cursor("OK!rest");
        let head: Vec<char> = (0..3).map(|_| c.next_char().unwrap()).collect();
        assert_eq!(c.position().offset, 3);
        c.replay(&head);
        assert_eq!(c.position(), Position::START);
        let all: String = (0..7).map(|_| c.next_char().unwrap()).collect();
        assert_eq!(all, "OK!rest");
    }

    #[test]
    fn position_tracks_lines_across_push_back() {
        let mut c = cursor("a\nb");
        c.next_char().unwrap();
        assert_eq!(c.next_char().unwrap(), '\n');
        assert_eq!(c.position(), Position { line: 2, offset: 2 });
        c.push_back().unwrap();
        assert_eq!(c.position(), Position { line: 1, offset: 1 });
    }

    #[test]
    fn multibyte_characters_survive_chunk_splits() {
        let text = "é→😀";
        let mut c = CharCursor::new(Trickle(text.as_bytes()));
        let decoded: String = (0..3).map(|_| c.next_char().unwrap()).collect();
        assert_eq!(decoded, text);
        assert!(c.at_end().unwrap());
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut c = CharCursor::new(std::io::Cursor::new(vec![b'a', 0xff]));
        c.next_char().unwrap();
        assert_eq!(c.next_char().unwrap_err().kind(), Kind::InvalidUtf8);

        let mut truncated = CharCursor::new(std::io::Cursor::new(vec![0xe2, 0x86]));
        assert_eq!(truncated.next_char().unwrap_err().kind(), Kind::InvalidUtf8);
    }

    #[test]
    fn read_failures_surface_as_stream_errors() {
        let mut c = CharCursor::new(Broken);
        assert_eq!(c.next_char().unwrap_err().kind(), Kind::StreamError);
    }

    #[test]
    fn at_end_does_not_consume() {
        let mut c = cursor("z");
        assert!(!c.at_end().unwrap());
        assert_eq!(c.next_char().unwrap(), 'z');
        assert!(c.at_end().unwrap());
    }
}
