use std::io::{Read, Write};

use tracing::info;

use crate::config::ConvertConfig;
use crate::error::ConvertError;
use crate::event::MonitorEvent;
use crate::ingest::EventIngestor;

/// Writes events as newline-delimited JSON, one flushed record at a time.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_event(
        &mut self,
        line_number: usize,
        event: &MonitorEvent,
    ) -> Result<(), ConvertError> {
        let mut bytes = serde_json::to_vec(event)
            .map_err(|source| ConvertError::Encode { line_number, source })?;
        bytes.push(b'\n');
        self.writer.write_all(&bytes).map_err(ConvertError::Write)?;
        self.writer.flush().map_err(ConvertError::Write)?;
        self.written += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ConvertSummary {
    pub events: usize,
    pub preamble_skipped: bool,
}

/// Transcodes a whole monitor stream from `reader` into JSON lines on
/// `writer`, stopping at the first failure.
pub fn convert<R: Read, W: Write>(
    reader: R,
    writer: W,
    config: ConvertConfig,
) -> Result<ConvertSummary, ConvertError> {
    let mut ingestor = EventIngestor::new(reader, config);
    let mut sink = JsonLinesSink::new(writer);

    for record in ingestor.by_ref() {
        let record = record?;
        sink.write_event(record.line_number, &record.event)?;
    }

    let summary = ConvertSummary {
        events: sink.written(),
        preamble_skipped: ingestor.preamble_skipped(),
    };
    info!(
        events = summary.events,
        preamble_skipped = summary.preamble_skipped,
        "monitor stream finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn run(input: &str) -> (Result<ConvertSummary, ConvertError>, String) {
        let mut out = Vec::new();
        let result = convert(input.as_bytes(), &mut out, ConvertConfig::default());
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn writes_one_json_object_per_line() {
        let (result, out) = run(concat!(
            "OK\n",
            "1600535204.739027 [0 147.75.98.182:55466] \"EVALSHA\" \"abc\" \"1\"\n",
            "1600535204.739079 [0 lua] \"EXISTS\"\n",
        ));
        let summary = result.unwrap();
        assert_eq!(summary.events, 2);
        assert!(summary.preamble_skipped);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"ts_nano":1600535204739027000,"db":0,"source":"147.75.98.182:55466","cmd":"EVALSHA","args":["abc","1"]}"#,
                r#"{"ts_nano":1600535204739079000,"db":0,"source":"lua","cmd":"EXISTS","args":[]}"#,
            ]
        );
    }

    #[test]
    fn embedded_quote_is_reencoded_for_json() {
        let (result, out) = run("1600535204.739027 [0 lua] \"SET\" \"a\\\"b\"\n");
        result.unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(value["args"][0], "a\"b");
    }

    #[test]
    fn records_before_a_failure_are_kept_and_nothing_partial_is_written() {
        let (result, out) = run(concat!(
            "1600535204.739027 [0 lua] \"GET\" \"a\"\n",
            "1600535204.739028 [zz lua] \"GET\" \"b\"\n",
        ));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::MalformedDb);
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn write_failures_are_stream_errors() {
        let err = convert(
            "1600535204.739027 [0 lua] \"GET\"\n".as_bytes(),
            FailingWriter,
            ConvertConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StreamError);
        assert!(matches!(err, ConvertError::Write(_)));
    }
}
