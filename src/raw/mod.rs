//! This module defines the raw, container-level view of a replay file.
//!
//! The types here correspond 1:1 to what is physically in the file: the
//! fixed header, the gzip envelope and its trailer, the length-prefixed
//! record stream and the optional footer region. No game semantics are
//! attached at this level — use [`process`][crate::process] (or
//! [`process_file`][crate::process_file]) to turn a [`Replay`] into a
//! [`Log`][crate::Log].

mod types;

pub use self::types::{EnvelopeInfo, FileHeader, GzipTrailer, Record, Replay};

pub mod parser;

pub use self::parser::{parse_bytes, parse_file, ParseError, ParseResult};
