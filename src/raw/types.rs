//! Plain data carried out of the container layer.

use serde::Serialize;

use crate::wire::Tree;

/// The fixed 20-byte header at the start of every replay file.
///
/// All values are little-endian. Apart from `changelist`, which identifies
/// the game-patch cohort a replay belongs to, the fields are carried through
/// opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
    pub data_offset: u32,
    /// Build identifier of the game client that recorded the replay.
    pub changelist: u32,
    pub flags: u32,
}

/// The 8-byte gzip trailer following the deflate stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GzipTrailer {
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Uncompressed size modulo 2^32.
    pub isize: u32,
}

/// Diagnostics about the compressed envelope, kept for the export document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnvelopeInfo {
    /// Length of the RFC 1952 header that was skipped.
    pub gzip_header_len: usize,
    /// The gzip trailer, when the payload was gzip-wrapped and long enough.
    pub trailer: Option<GzipTrailer>,
    /// Number of compressed-payload bytes the deflate stream did not consume
    /// (trailer plus footer region).
    pub unused_len: usize,
}

/// One length-prefixed record from the decompressed body.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The record's raw bytes, as declared by its length prefix.
    pub data: Vec<u8>,
    /// The decoded message tree, when the bytes decoded to at least one
    /// field.
    pub tree: Option<Tree>,
}

/// A completely parsed (raw) replay file.
///
/// This is the container-layer view: the header, every record of the body,
/// and whatever could be decoded from the footer region. Semantic meaning is
/// assigned later by [`process`][crate::process].
#[derive(Debug, Clone)]
pub struct Replay {
    /// The fixed file header.
    pub header: FileHeader,
    /// Envelope diagnostics (gzip header length, trailer, unused bytes).
    pub envelope: EnvelopeInfo,
    /// The records of the decompressed body, in file order.
    pub records: Vec<Record>,
    /// Trees decoded from the optional footer region. Empty when the region
    /// is absent or undecodable.
    pub footer: Vec<Tree>,
}
