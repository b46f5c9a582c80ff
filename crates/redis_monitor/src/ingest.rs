use std::io::Read;

use tracing::debug;

use crate::config::{ConvertConfig, Preamble};
use crate::cursor::CharCursor;
use crate::error::{CursorError, ParseError};
use crate::event::MonitorEvent;
use crate::parser::EventParser;

/// Acknowledgement a client prints before the trace starts.
const ACK_PREAMBLE: [char; 3] = ['O', 'K', '\n'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// 1-based input line the event was read from.
    pub line_number: usize,
    pub event: MonitorEvent,
}

/// Pulls [`EventRecord`]s from a monitor stream, strictly in arrival order.
///
/// The first poll handles the optional `OK\n` preamble. The iterator is
/// fused: after the end of the stream or the first error it yields `None`.
pub struct EventIngestor<R: Read> {
    cursor: CharCursor<R>,
    parser: EventParser,
    preamble: Preamble,
    started: bool,
    preamble_skipped: bool,
    done: bool,
}

impl<R: Read> EventIngestor<R> {
    pub fn new(reader: R, config: ConvertConfig) -> Self {
        Self {
            cursor: CharCursor::new(reader),
            parser: EventParser::with_config(config.parser),
            preamble: config.preamble,
            started: false,
            preamble_skipped: false,
            done: false,
        }
    }

    /// Whether an `OK\n` acknowledgement was found and dropped.
    pub fn preamble_skipped(&self) -> bool {
        self.preamble_skipped
    }

    fn skip_preamble(&mut self) -> Result<(), ParseError> {
        let mut head = Vec::with_capacity(ACK_PREAMBLE.len());
        while head.len() < ACK_PREAMBLE.len() {
            match self.cursor.next_char() {
                Ok(ch) => head.push(ch),
                Err(CursorError::EndOfInput { .. }) => break,
                Err(err) => return Err(err.into()),
            }
        }

        if head == ACK_PREAMBLE {
            debug!("discarded OK preamble");
            self.preamble_skipped = true;
        } else {
            self.cursor.replay(&head);
        }
        Ok(())
    }

    fn next_record(&mut self) -> Result<Option<EventRecord>, ParseError> {
        if !self.started {
            self.started = true;
            if self.preamble == Preamble::DiscardAck {
                self.skip_preamble()?;
            }
        }

        let line_number = self.cursor.position().line;
        let Some(event) = self.parser.parse_event(&mut self.cursor)? else {
            return Ok(None);
        };
        debug!(
            line_number,
            db = event.db,
            cmd = %event.command,
            args = event.args.len(),
            "parsed monitor event"
        );
        Ok(Some(EventRecord { line_number, event }))
    }
}

impl<R: Read> Iterator for EventIngestor<R> {
    type Item = Result<EventRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
