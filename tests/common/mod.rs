#![allow(dead_code)]
//! Helpers to synthesize replay files for the integration tests.
//!
//! The builders here produce the same wire format the parser consumes:
//! varint-tagged fields, length-prefixed records, and the full container
//! with gzip header, deflate body and trailer.

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};

/// Encode a varint.
pub fn varint(value: u64) -> Vec<u8> {
    sgreplay::wire::encode_varint(value)
}

/// A varint field `tag -> value`.
pub fn varint_field(tag: u32, value: u64) -> Vec<u8> {
    let mut out = varint(u64::from(tag) << 3);
    out.extend(varint(value));
    out
}

/// A length-delimited field `tag -> payload`.
pub fn delimited_field(tag: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = varint(u64::from(tag) << 3 | 2);
    out.extend(varint(payload.len() as u64));
    out.extend_from_slice(payload);
    out
}

/// A record envelope: frame at tag 1, actor at tag 2, content under
/// tag 3 → 1.
pub fn record(frame: u64, actor: u64, content: &[u8]) -> Vec<u8> {
    let mut out = varint_field(1, frame);
    out.extend(varint_field(2, actor));
    out.extend(delimited_field(3, &delimited_field(1, content)));
    out
}

/// A player-join record.
pub fn join_record(frame: u64, slot: u64, name: &str) -> Vec<u8> {
    let mut join = varint_field(2, slot);
    join.extend(delimited_field(3, name.as_bytes()));
    record(frame, slot, &delimited_field(37, &join))
}

/// A sync record carrying the in-game clock.
pub fn sync_record(frame: u64, actor: u64, clock: u64) -> Vec<u8> {
    record(frame, actor, &delimited_field(40, &varint_field(1, clock)))
}

/// A command record with an ability block (ability id, placement index,
/// build type and world coordinates in fixed-point units).
pub fn build_command_record(
    frame: u64,
    actor: u64,
    ability_id: u64,
    position_index: u64,
    build_type: u64,
    world_x: i64,
    world_y: i64,
) -> Vec<u8> {
    let mut coords = varint_field(1, (world_x * 4096) as u64);
    coords.extend(varint_field(2, (world_y * 4096) as u64));
    let mut ability = varint_field(1, ability_id);
    ability.extend(varint_field(2, position_index));
    ability.extend(varint_field(3, build_type));
    ability.extend(delimited_field(4, &coords));
    let mut command = varint_field(1, 1);
    command.extend(delimited_field(4, &ability));
    record(frame, actor, &delimited_field(7, &command))
}

/// A command record carrying only an ability id.
pub fn ability_command_record(frame: u64, actor: u64, ability_id: u64) -> Vec<u8> {
    let mut ability = varint_field(1, ability_id);
    ability.extend(varint_field(2, 0));
    let mut command = varint_field(1, 1);
    command.extend(delimited_field(4, &ability));
    record(frame, actor, &delimited_field(7, &command))
}

/// A record announcing the winning slot at top-level tag 31.
pub fn winner_record(frame: u64, slot: u64) -> Vec<u8> {
    let mut out = varint_field(1, frame);
    out.extend(delimited_field(31, &varint_field(1, slot)));
    out
}

/// A footer player-result entry: name at tag 2, then `(tag, value)` flags.
pub fn footer_player(name: &str, flags: &[(u32, u64)]) -> Vec<u8> {
    let mut entry = delimited_field(2, name.as_bytes());
    for &(tag, value) in flags {
        entry.extend(varint_field(tag, value));
    }
    entry
}

/// A footer region holding one length-prefixed message with the
/// player-result array at tag 3.
pub fn footer_region(players: &[Vec<u8>]) -> Vec<u8> {
    let mut message = Vec::new();
    for player in players {
        message.extend(delimited_field(3, player));
    }
    let mut out = varint(message.len() as u64);
    out.extend(message);
    out
}

/// Assemble a complete replay file: fixed header, gzip header, deflate
/// body, gzip trailer and optional footer region.
pub fn replay_file(changelist: u32, records: &[Vec<u8>], footer: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    for record in records {
        body.extend(varint(record.len() as u64));
        body.extend_from_slice(record);
    }

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&body).unwrap();
    let deflated = encoder.finish().unwrap();

    let mut crc = Crc::new();
    crc.update(&body);

    let mut file = Vec::new();
    for value in [0x52_47_53_46u32, 1, 20, changelist, 0] {
        file.extend_from_slice(&value.to_le_bytes());
    }
    // Minimal RFC 1952 header.
    file.extend_from_slice(&[0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0, 0, 0]);
    file.extend_from_slice(&deflated);
    file.extend_from_slice(&crc.sum().to_le_bytes());
    file.extend_from_slice(&(body.len() as u32).to_le_bytes());
    file.extend_from_slice(footer);
    file
}
