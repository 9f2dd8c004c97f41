//! End-to-end tests over synthetic replay files.

mod common;

use common::*;

use sgreplay::catalog::{AbilityCatalog, StructureCatalog};
use sgreplay::{process_bytes, raw, Catalogs};

fn ability_catalog() -> AbilityCatalog {
    AbilityCatalog::from_json_str(
        r#"{"archetypes": {
            "500": [101, {"id": "BarracksSpawn", "__base_type": "AbilityData"}],
            "600": [102, {"id": "Barracks", "__base_type": "UnitData"}],
            "700": [103, {"id": "attackData", "__base_type": "AbilityData"}]
        }}"#,
    )
    .unwrap()
}

fn structure_catalog() -> StructureCatalog {
    StructureCatalog::from_json_str(r#"{"600": {"id": "Barracks"}}"#).unwrap()
}

#[test]
fn test_minimal_file_with_player_join() {
    let file = replay_file(1, &[join_record(1024, 1, "Alice")], &[]);
    let log = process_bytes(&file, &Catalogs::default()).unwrap();

    assert_eq!(log.header().changelist, 1);
    assert_eq!(log.players().len(), 1);
    assert_eq!(log.players()[&1], "Alice");
    assert_eq!(log.record_count(), 1);
    assert_eq!(log.actions().len(), 1);

    let action = &log.actions()[0];
    assert_eq!(action.kind_label(), "PLAYER_JOIN");
    assert_eq!(action.frame, Some(1024));
    assert_eq!(
        sgreplay::analyzers::frame_to_time(action.frame),
        "00:01"
    );
    assert_eq!(log.action_stats()["PLAYER_JOIN"], 1);
}

#[test]
fn test_duration_from_sync_record() {
    let records = vec![
        join_record(1024, 1, "Alice"),
        sync_record(10240, 1, 20480),
    ];
    let file = replay_file(1, &records, &[]);
    let log = process_bytes(&file, &Catalogs::default()).unwrap();

    assert_eq!(log.duration_seconds(), 20.0);
}

#[test]
fn test_build_order_deduplicates_repeated_clicks() {
    let records = vec![
        join_record(10, 1, "Alice"),
        build_command_record(5000, 1, 500, 3, 600, 10, 20),
        build_command_record(5100, 1, 500, 3, 600, 10, 20),
        build_command_record(5200, 1, 500, 3, 600, 10, 20),
    ];
    let file = replay_file(1, &records, &[]);
    let catalogs = Catalogs {
        abilities: Some(ability_catalog()),
        structures: Some(structure_catalog()),
    };
    let log = process_bytes(&file, &catalogs).unwrap();

    let orders = &log.building_orders()[&1];
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].frame, Some(5000));
    assert_eq!(orders[0].building_name, "Barracks");
    assert_eq!(orders[0].x, Some(10.0));
    assert_eq!(orders[0].y, Some(20.0));
    assert!(!orders[0].inferred);
}

#[test]
fn test_inferred_barracks_from_spawn_activity() {
    let records = vec![
        join_record(10, 1, "Alice"),
        ability_command_record(8000, 1, 500),
    ];
    let file = replay_file(1, &records, &[]);
    let catalogs = Catalogs {
        abilities: Some(ability_catalog()),
        structures: Some(structure_catalog()),
    };
    let log = process_bytes(&file, &catalogs).unwrap();

    // The spawn marker also identifies the faction.
    assert_eq!(log.factions()[&1], sgreplay::Faction::Vanguard);

    let orders = &log.building_orders()[&1];
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].building_name, "Barracks");
    assert_eq!(orders[0].frame, Some(8000));
    assert!(orders[0].inferred);
}

#[test]
fn test_outcome_from_footer_and_winner_record() {
    let records = vec![
        join_record(10, 1, "Alice"),
        join_record(20, 2, "Bob"),
        winner_record(90000, 1),
    ];
    let footer = footer_region(&[
        footer_player("Alice", &[(5, 1)]),
        footer_player("Bob", &[(5, 2)]),
    ]);
    let file = replay_file(7, &records, &footer);
    let log = process_bytes(&file, &Catalogs::default()).unwrap();

    assert_eq!(log.teams()[&1], 1);
    assert_eq!(log.teams()[&2], 2);

    let result = log.result();
    assert_eq!(result.result, "complete");
    assert_eq!(result.winners, vec!["Alice".to_owned()]);
    assert_eq!(result.losers, vec!["Bob".to_owned()]);
    assert_eq!(result.winner_team, Some(1));
}

#[test]
fn test_truncated_header_fails() {
    let file = replay_file(1, &[join_record(10, 1, "Alice")], &[]);
    assert!(process_bytes(&file[..10], &Catalogs::default()).is_err());
}

#[test]
fn test_envelope_diagnostics() {
    let footer = footer_region(&[footer_player("Alice", &[(5, 1)])]);
    let records = vec![join_record(10, 1, "Alice")];
    let file = replay_file(1, &records, &footer);
    let parsed = raw::parse_bytes(&file).unwrap();

    assert_eq!(parsed.envelope.gzip_header_len, 10);
    let trailer = parsed.envelope.trailer.unwrap();
    // isize is the uncompressed body length.
    let body_len: usize = parsed
        .records
        .iter()
        .map(|record| {
            record.data.len() + sgreplay::wire::encode_varint(record.data.len() as u64).len()
        })
        .sum();
    assert_eq!(trailer.isize as usize, body_len);
    assert_eq!(parsed.envelope.unused_len, 8 + footer.len());
    assert_eq!(parsed.footer.len(), 1);
}

#[test]
fn test_gzip_header_with_filename_section() {
    // Splice a gzip header that carries an original-filename section into a
    // synthesized file and make sure the parser still finds the stream.
    let plain = replay_file(1, &[join_record(1024, 1, "Alice")], &[]);
    let mut file = plain[..20].to_vec();
    file.extend_from_slice(&[0x1f, 0x8b, 0x08, 0x08, 0, 0, 0, 0, 0, 0]);
    file.extend_from_slice(b"game.SGReplay\0");
    file.extend_from_slice(&plain[30..]);

    let log = process_bytes(&file, &Catalogs::default()).unwrap();
    assert_eq!(log.players()[&1], "Alice");
    assert_eq!(log.envelope().gzip_header_len, 24);
}

#[test]
fn test_report_survives_empty_body() {
    // A file whose body holds no records still yields a complete log.
    let file = replay_file(1, &[], &[]);
    let log = process_bytes(&file, &Catalogs::default()).unwrap();
    assert_eq!(log.record_count(), 0);
    assert!(log.players().is_empty());
    assert_eq!(log.duration_seconds(), 0.0);
    assert_eq!(log.result().result, "unknown");
}
