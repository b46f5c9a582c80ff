//! Parser for the monitor trace line format:
//!
//! ```text
//! line      := timestamp ' ' '[' db ' ' source ']' ' ' command (' ' arg)* '\n'
//! timestamp := digit{1,10} '.' digit{6}
//! db        := digit+
//! source    := any char up to the `]` that is followed by a space
//! command   := quoted-string
//! arg       := quoted-string
//! ```
//!
//! For example:
//!
//! ```text
//! 1600535204.739027 [0 147.75.98.182:55466] "EVALSHA" "5526dff9" "1" "usage-stats"
//! 1600535204.739079 [0 lua] "EXISTS" "usage-stats"
//! ```

use std::io::Read;

use crate::config::{ParserConfig, QuoteScan};
use crate::cursor::{CharCursor, Position};
use crate::error::{ParseError, UnquoteError};
use crate::event::MonitorEvent;
use crate::unquote::unquote;

/// Seconds digits that still fit an `i64` nanosecond count.
const MAX_SECONDS_DIGITS: usize = 10;
const MICROS_DIGITS: usize = 6;
/// Digits of `u32::MAX`.
const MAX_DB_DIGITS: usize = 10;

/// Turns monitor trace lines into [`MonitorEvent`]s.
///
/// The parser keeps no state between events; the cursor's stream position is
/// the only thing carried from one call to the next.
#[derive(Debug, Clone, Default)]
pub struct EventParser {
    config: ParserConfig,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses one line, including its trailing newline.
    ///
    /// - Returns `Ok(None)` when the stream ends cleanly before the event.
    /// - Running out of input anywhere inside the event is an error.
    pub fn parse_event<R: Read>(
        &self,
        cursor: &mut CharCursor<R>,
    ) -> Result<Option<MonitorEvent>, ParseError> {
        if cursor.at_end()? {
            return Ok(None);
        }

        let timestamp = self.read_timestamp(cursor)?;
        expect(cursor, ' ')?;
        expect(cursor, '[')?;
        let db = self.read_db(cursor)?;
        expect(cursor, ' ')?;
        let source = self.read_source(cursor)?;
        expect(cursor, ']')?;
        expect(cursor, ' ')?;
        let command = self.read_quoted(cursor, "command")?;
        let args = self.read_args(cursor)?;
        expect(cursor, '\n')?;

        Ok(Some(MonitorEvent {
            timestamp,
            db,
            source,
            command,
            args,
        }))
    }

    /// `SSSSSSSSSS.UUUUUU` becomes `SSSSSSSSSSUUUUUU000`.
    fn read_timestamp<R: Read>(&self, cursor: &mut CharCursor<R>) -> Result<i64, ParseError> {
        let position = cursor.position();
        let mut text = String::with_capacity(MAX_SECONDS_DIGITS + MICROS_DIGITS + 4);
        let malformed = |text: String| ParseError::MalformedTimestamp { text, position };

        let mut seconds_digits = 0;
        loop {
            let ch = cursor.next_char()?;
            text.push(ch);
            match ch {
                '.' if seconds_digits > 0 => break,
                '0'..='9' if seconds_digits < MAX_SECONDS_DIGITS => seconds_digits += 1,
                _ => return Err(malformed(text)),
            }
        }
        for _ in 0..MICROS_DIGITS {
            let ch = cursor.next_char()?;
            text.push(ch);
            if !ch.is_ascii_digit() {
                return Err(malformed(text));
            }
        }

        let digits: String = text
            .chars()
            .filter(|ch| *ch != '.')
            .chain("000".chars())
            .collect();
        digits.parse::<i64>().map_err(|_| malformed(text))
    }

    /// Reads digits up to the separating space, which is left unread.
    fn read_db<R: Read>(&self, cursor: &mut CharCursor<R>) -> Result<u32, ParseError> {
        let position = cursor.position();
        let mut text = String::new();
        loop {
            let ch = cursor.next_char()?;
            if ch == ' ' {
                cursor.push_back()?;
                break;
            }
            text.push(ch);
            if !ch.is_ascii_digit() || text.len() > MAX_DB_DIGITS {
                return Err(ParseError::MalformedDb { text, position });
            }
        }
        text.parse::<u32>()
            .map_err(|_| ParseError::MalformedDb { text, position })
    }

    /// Reads the source verbatim, leaving the closing `]` unread.
    ///
    /// A `]` that is not followed by a space belongs to the source, which
    /// keeps bracketed IPv6 peers such as `[::1]:6379` intact.
    fn read_source<R: Read>(&self, cursor: &mut CharCursor<R>) -> Result<String, ParseError> {
        let start = cursor.position();
        let mut source = String::new();
        let mut chars = 0;
        loop {
            let position = cursor.position();
            let ch = cursor.next_char()?;
            match ch {
                ']' => {
                    let next = cursor.next_char()?;
                    if next == ' ' || next == '\n' {
                        cursor.replay(&[ch, next]);
                        return Ok(source);
                    }
                    cursor.push_back()?;
                }
                '\n' => {
                    return Err(ParseError::UnexpectedCharacter {
                        expected: ']',
                        found: ch,
                        position,
                    })
                }
                _ => {}
            }
            source.push(ch);
            chars += 1;
            self.check_limit("source", chars, start)?;
        }
    }

    /// Zero or more ` "arg"` groups, leaving the line's newline unread.
    fn read_args<R: Read>(&self, cursor: &mut CharCursor<R>) -> Result<Vec<String>, ParseError> {
        let mut args = Vec::new();
        loop {
            let position = cursor.position();
            match cursor.next_char()? {
                '\n' => {
                    cursor.push_back()?;
                    return Ok(args);
                }
                ' ' => args.push(self.read_quoted(cursor, "argument")?),
                found => {
                    return Err(ParseError::UnexpectedCharacter {
                        expected: ' ',
                        found,
                        position,
                    })
                }
            }
        }
    }

    fn read_quoted<R: Read>(
        &self,
        cursor: &mut CharCursor<R>,
        field: &'static str,
    ) -> Result<String, ParseError> {
        let position = cursor.position();
        let open = cursor.next_char()?;
        if open != '"' {
            return Err(ParseError::UnexpectedCharacter {
                expected: '"',
                found: open,
                position,
            });
        }

        let mut token = String::from(open);
        let mut chars = 0;
        let mut prev = open;
        let mut escaped = false;
        loop {
            let ch = cursor.next_char()?;
            if ch == '\n' {
                // The producer always escapes newlines, so this token is unterminated.
                let index = token.len();
                return Err(ParseError::MalformedQuoting {
                    token,
                    position,
                    source: UnquoteError::RawNewline { index },
                });
            }
            token.push(ch);
            let closes = ch == '"'
                && match self.config.quote_scan {
                    QuoteScan::PrecedingChar => prev != '\\',
                    QuoteScan::EscapeAware => !escaped,
                };
            if closes {
                break;
            }
            escaped = ch == '\\' && !escaped;
            prev = ch;
            chars += 1;
            self.check_limit(field, chars, position)?;
        }

        match unquote(&token) {
            Ok(text) => Ok(text),
            Err(source) => Err(ParseError::MalformedQuoting {
                token,
                position,
                source,
            }),
        }
    }

    fn check_limit(
        &self,
        field: &'static str,
        chars: usize,
        position: Position,
    ) -> Result<(), ParseError> {
        match self.config.limits.max_token_chars {
            Some(max_chars) if chars > max_chars => Err(ParseError::TokenTooLong {
                field,
                max_chars,
                position,
            }),
            _ => Ok(()),
        }
    }
}

fn expect<R: Read>(cursor: &mut CharCursor<R>, expected: char) -> Result<(), ParseError> {
    let position = cursor.position();
    let found = cursor.next_char()?;
    if found == expected {
        Ok(())
    } else {
        Err(ParseError::UnexpectedCharacter {
            expected,
            found,
            position,
        })
    }
}
