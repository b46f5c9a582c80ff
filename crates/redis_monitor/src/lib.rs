#![forbid(unsafe_code)]
//! Structured events from a data store's `MONITOR` command trace.
//!
//! The trace is one command per line:
//!
//! ```text
//! 1600535204.739027 [0 147.75.98.182:55466] "EVALSHA" "5526dff9" "1"
//! ```
//!
//! This crate provides:
//! - A character cursor with single-character push back and a replay queue.
//! - An exact parser for the trace line grammar and its quoting convention.
//! - An ingestion iterator that drops the optional `OK` acknowledgement.
//! - A JSON-lines sink and a `convert` driver tying the pieces together.

mod config;
mod cursor;
mod error;
mod event;
mod ingest;
mod parser;
mod sink;
mod unquote;

pub use config::{ConvertConfig, ParseLimits, ParserConfig, Preamble, QuoteScan};
pub use cursor::{CharCursor, Position};
pub use error::{ConvertError, CursorError, ErrorKind, ParseError, UnquoteError};
pub use event::{MonitorEvent, SourceKind};
pub use ingest::{EventIngestor, EventRecord};
pub use parser::EventParser;
pub use sink::{convert, ConvertSummary, JsonLinesSink};
pub use unquote::unquote;
