//! This module contains functions to parse the replay file container.
//!
//! # Layout
//!
//! The general layout of a `.SGReplay` file is as follows:
//!
//! ```raw
//! magic number (u32)
//! format version (u32)
//! data offset (u32)
//! changelist (u32)
//! flags (u32)
//! compressed payload:
//!     RFC 1952 gzip header
//!     raw deflate stream
//!     8-byte gzip trailer: crc32 (u32), isize (u32)
//!     optional footer region (additional metadata)
//! ```
//!
//! All numbers are stored as little endian. The decompressed body is a
//! concatenation of `{varint length, length bytes}` records; each record is
//! decoded with the schema-less [`wire`][crate::wire] decoder.
//!
//! The footer region is decoded either as another length-prefixed record
//! stream (it must then consume the region exactly) or, failing that, as one
//! single message. Both attempts may legitimately fail — older game builds
//! do not write a footer at all.
//!
//! # Error handling
//!
//! Only two conditions fail the whole file: a header shorter than 20 bytes
//! ([`ParseError::MalformedHeader`]) and a deflate stream that rejects the
//! payload ([`ParseError::Decompression`]). Everything else degrades: a
//! malformed gzip header falls back to the fixed 10-byte skip, a truncated
//! record simply ends the record stream, and an undecodable footer yields no
//! footer trees.

use std::io::Read;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::{Decompress, FlushDecompress, Status};
use thiserror::Error;
use tracing::debug;

use super::{EnvelopeInfo, FileHeader, GzipTrailer, Record, Replay};
use crate::wire::{self, Tree};

/// Length of the fixed file header.
pub const HEADER_LEN: usize = 20;

/// The RFC 1952 magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Skip applied when the gzip header cannot be parsed.
const FALLBACK_GZIP_HEADER_LEN: usize = 10;

/// Any error that can occur while parsing the file container.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed file header")]
    MalformedHeader,
    #[error("malformed gzip header: {0}")]
    GzipHeader(&'static str),
    #[error("deflate stream rejected: {0}")]
    Decompression(#[from] flate2::DecompressError),
}

/// A type indicating the parse result.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parse the fixed 20-byte file header.
pub fn parse_header(data: &[u8]) -> ParseResult<FileHeader> {
    if data.len() < HEADER_LEN {
        return Err(ParseError::MalformedHeader);
    }
    let mut cursor = &data[..HEADER_LEN];
    let magic = cursor.read_u32::<LittleEndian>()?;
    let version = cursor.read_u32::<LittleEndian>()?;
    let data_offset = cursor.read_u32::<LittleEndian>()?;
    let changelist = cursor.read_u32::<LittleEndian>()?;
    let flags = cursor.read_u32::<LittleEndian>()?;
    Ok(FileHeader {
        magic,
        version,
        data_offset,
        changelist,
        flags,
    })
}

/// Determine the length of an RFC 1952 gzip header.
///
/// `data` must start at the gzip magic. Handles the optional extra-field,
/// original-filename, comment and header-CRC sections. Errors on a missing
/// magic, an unsupported compression method or a truncated header; the
/// caller is expected to fall back to a fixed 10-byte skip in that case.
pub fn gzip_header_len(data: &[u8]) -> ParseResult<usize> {
    if data.len() < 10 {
        return Err(ParseError::GzipHeader("not enough data for gzip header"));
    }
    if data[0..2] != GZIP_MAGIC {
        return Err(ParseError::GzipHeader("missing gzip magic"));
    }
    if data[2] != 8 {
        return Err(ParseError::GzipHeader("unsupported compression method"));
    }

    let flags = data[3];
    let mut pos = 10;

    // FEXTRA
    if flags & 0x04 != 0 {
        if pos + 2 > data.len() {
            return Err(ParseError::GzipHeader("truncated extra-field length"));
        }
        let xlen = u16::from_le_bytes([data[pos], data[pos + 1]]) as usize;
        pos += 2;
        if pos + xlen > data.len() {
            return Err(ParseError::GzipHeader("truncated extra field"));
        }
        pos += xlen;
    }

    // FNAME (zero-terminated)
    if flags & 0x08 != 0 {
        while pos < data.len() && data[pos] != 0 {
            pos += 1;
        }
        pos += 1;
    }

    // FCOMMENT (zero-terminated)
    if flags & 0x10 != 0 {
        while pos < data.len() && data[pos] != 0 {
            pos += 1;
        }
        pos += 1;
    }

    // FHCRC
    if flags & 0x02 != 0 {
        pos += 2;
    }

    if pos > data.len() {
        return Err(ParseError::GzipHeader("truncated gzip header"));
    }
    Ok(pos)
}

/// Inflate a raw deflate stream, reporting how much input was consumed.
///
/// Trailing bytes the stream does not consume (the gzip trailer and any
/// footer region) are the caller's business. A stream that runs out of
/// input before its end marker yields whatever decompressed cleanly.
fn inflate(data: &[u8]) -> ParseResult<(Vec<u8>, usize)> {
    let mut decompress = Decompress::new(false);
    let mut out = Vec::new();
    loop {
        let in_before = decompress.total_in();
        let out_before = decompress.total_out();
        if out.len() == out.capacity() {
            out.reserve(32 * 1024);
        }
        let status = decompress.decompress_vec(
            &data[in_before as usize..],
            &mut out,
            FlushDecompress::Finish,
        )?;
        if status == Status::StreamEnd {
            break;
        }
        if decompress.total_in() == in_before && decompress.total_out() == out_before {
            // No forward progress: the stream is truncated. Keep what we
            // have; the record stream below stops at the ragged edge anyway.
            debug!(
                consumed = in_before,
                produced = out_before,
                "deflate stream ended without stream-end marker"
            );
            break;
        }
    }
    let consumed = decompress.total_in() as usize;
    Ok((out, consumed))
}

/// Split the decompressed body into length-prefixed records.
///
/// Stops at a zero length or at a record whose declared length runs past the
/// end of the body; everything parsed up to that point is returned.
pub fn parse_records(body: &[u8]) -> Vec<Record> {
    let mut records = Vec::new();
    let mut pos = 0;
    while pos < body.len() {
        let (length, next) = wire::decode_varint(body, pos);
        if length == 0 || length > (body.len() - next) as u64 {
            break;
        }
        let length = length as usize;
        let data = body[next..next + length].to_vec();
        let tree = wire::decode_tree(&data).filter(|tree| !tree.is_empty());
        records.push(Record { data, tree });
        pos = next + length;
    }
    records
}

/// Decode the footer region.
///
/// The region is first treated as a length-prefixed record stream, which
/// must consume the region exactly; otherwise the entire region is decoded
/// as a single message. An undecodable region yields no trees.
pub fn parse_footer(region: &[u8]) -> Vec<Tree> {
    if region.is_empty() {
        return Vec::new();
    }
    if let Some(trees) = parse_footer_stream(region) {
        return trees;
    }
    match wire::decode_tree(region) {
        Some(tree) if !tree.is_empty() => vec![tree],
        _ => {
            debug!(len = region.len(), "footer region did not decode");
            Vec::new()
        }
    }
}

fn parse_footer_stream(region: &[u8]) -> Option<Vec<Tree>> {
    let mut trees = Vec::new();
    let mut pos = 0;
    while pos < region.len() {
        let (length, next) = wire::decode_varint(region, pos);
        if length == 0 || length > (region.len() - next) as u64 {
            return None;
        }
        let length = length as usize;
        let tree = wire::decode_tree(&region[next..next + length])?;
        if tree.is_empty() {
            return None;
        }
        trees.push(tree);
        pos = next + length;
    }
    if trees.is_empty() {
        None
    } else {
        Some(trees)
    }
}

/// Parse a complete replay file from memory.
pub fn parse_bytes(data: &[u8]) -> ParseResult<Replay> {
    let header = parse_header(data)?;
    let compressed = &data[HEADER_LEN..];
    let is_gzip = compressed.len() >= 2 && compressed[..2] == GZIP_MAGIC;

    let skip = gzip_header_len(compressed).unwrap_or(FALLBACK_GZIP_HEADER_LEN);
    let deflate_input = compressed.get(skip..).unwrap_or(&[]);

    let (body, consumed) = inflate(deflate_input)?;
    let unused = &deflate_input[consumed..];

    let (trailer, footer_region) = if is_gzip && unused.len() >= 8 {
        let mut cursor = &unused[..8];
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let isize = cursor.read_u32::<LittleEndian>()?;
        (Some(GzipTrailer { crc32, isize }), &unused[8..])
    } else {
        (None, unused)
    };

    let records = parse_records(&body);
    let footer = parse_footer(footer_region);

    Ok(Replay {
        header,
        envelope: EnvelopeInfo {
            gzip_header_len: skip,
            trailer,
            unused_len: unused.len(),
        },
        records,
        footer,
    })
}

/// Parse a complete replay file from disk.
pub fn parse_file<P: AsRef<Path>>(path: P) -> ParseResult<Replay> {
    let mut data = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut data)?;
    parse_bytes(&data)
}
