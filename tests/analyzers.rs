//! Analyzer tests over synthesized record streams.

mod common;

use common::*;

use sgreplay::catalog::AbilityCatalog;
use sgreplay::{process_bytes, Catalogs, Faction};

fn catalog() -> AbilityCatalog {
    AbilityCatalog::from_json_str(
        r#"{"archetypes": {
            "500": [1, {"id": "BarracksSpawn", "__base_type": "AbilityData"}],
            "510": [2, {"id": "Arcship_Spawn", "__base_type": "AbilityData"}],
            "520": [3, {"id": "Shrine_Spawn", "__base_type": "AbilityData"}],
            "530": [4, {"id": "moveData", "__base_type": "AbilityData"}],
            "540": [5, {"id": "MorphToHQTier2", "__base_type": "AbilityData"}],
            "550": [6, {"id": "StormgateAbilityCreateTier1Healer", "__base_type": "AbilityData"}],
            "560": [7, {"id": "Hellforge_Research", "__base_type": "AbilityData"}]
        }}"#,
    )
    .unwrap()
}

fn catalogs() -> Catalogs {
    Catalogs {
        abilities: Some(catalog()),
        structures: None,
    }
}

#[test]
fn test_faction_detection_per_marker() {
    let records = vec![
        join_record(1, 1, "Alice"),
        join_record(2, 2, "Bob"),
        join_record(3, 3, "Carol"),
        join_record(4, 4, "Dave"),
        ability_command_record(100, 1, 500),
        ability_command_record(110, 2, 510),
        ability_command_record(120, 3, 520),
        ability_command_record(130, 4, 530),
    ];
    let file = replay_file(1, &records, &[]);
    let log = process_bytes(&file, &catalogs()).unwrap();

    assert_eq!(log.factions()[&1], Faction::Vanguard);
    assert_eq!(log.factions()[&2], Faction::Celestial);
    assert_eq!(log.factions()[&3], Faction::Infernal);
    // moveData carries no marker.
    assert!(!log.factions().contains_key(&4));
}

#[test]
fn test_upgrades_and_rewards_separated() {
    let records = vec![
        join_record(1, 1, "Alice"),
        ability_command_record(1024, 1, 540),
        ability_command_record(2048, 1, 550),
        ability_command_record(3072, 1, 560),
        // Re-issues collapse.
        ability_command_record(4096, 1, 540),
        ability_command_record(5120, 1, 550),
    ];
    let file = replay_file(1, &records, &[]);
    let log = process_bytes(&file, &catalogs()).unwrap();

    let upgrades = &log.upgrades()[&1];
    assert_eq!(upgrades.len(), 2);
    assert_eq!(upgrades[0].upgrade_name, "Upgrade to HQ Tier 2");
    assert_eq!(upgrades[0].time, "00:01");
    assert_eq!(upgrades[1].upgrade_name, "Hellforge Research");

    let rewards = &log.rewards()[&1];
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0].reward_name, "Tier 1: Healer");
}

#[test]
fn test_production_counted_per_building() {
    let records = vec![
        join_record(1, 1, "Alice"),
        ability_command_record(100, 1, 500),
        ability_command_record(200, 1, 500),
        ability_command_record(300, 1, 520),
    ];
    let file = replay_file(1, &records, &[]);
    let log = process_bytes(&file, &catalogs()).unwrap();

    let per_player = &log.production().per_player[&1];
    assert_eq!(per_player["Barracks"], 2);
    assert_eq!(per_player["Shrine"], 1);
    assert_eq!(log.production().timeline.len(), 3);
}

#[test]
fn test_outcome_fallback_win_flag() {
    // No winner record and no team data: the footer's win flag decides.
    let records = vec![join_record(1, 1, "Alice"), join_record(2, 2, "Bob")];
    let footer = footer_region(&[
        footer_player("Alice", &[(3, 1)]),
        footer_player("Bob", &[(3, 0)]),
    ]);
    let file = replay_file(1, &records, &footer);
    let log = process_bytes(&file, &Catalogs::default()).unwrap();

    let result = log.result();
    assert_eq!(result.result, "complete");
    assert_eq!(result.winners, vec!["Alice".to_owned()]);
    assert_eq!(result.losers, vec!["Bob".to_owned()]);
}

#[test]
fn test_outcome_fallback_win_flag_absent_on_loser() {
    // The loser's footer entry carries no win flag at all; it still lands
    // in the losers list.
    let records = vec![join_record(1, 1, "Alice"), join_record(2, 2, "Bob")];
    let footer = footer_region(&[
        footer_player("Alice", &[(3, 1)]),
        footer_player("Bob", &[]),
    ]);
    let file = replay_file(1, &records, &footer);
    let log = process_bytes(&file, &Catalogs::default()).unwrap();

    let result = log.result();
    assert_eq!(result.result, "complete");
    assert_eq!(result.winners, vec!["Alice".to_owned()]);
    assert_eq!(result.losers, vec!["Bob".to_owned()]);
}

#[test]
fn test_outcome_fallback_result_code() {
    let records = vec![join_record(1, 1, "Alice"), join_record(2, 2, "Bob")];
    let footer = footer_region(&[
        footer_player("Alice", &[(4, 2)]),
        footer_player("Bob", &[(4, 1)]),
    ]);
    let file = replay_file(1, &records, &footer);
    let log = process_bytes(&file, &Catalogs::default()).unwrap();

    let result = log.result();
    assert_eq!(result.result, "complete");
    assert_eq!(result.winners, vec!["Bob".to_owned()]);
    assert_eq!(result.losers, vec!["Alice".to_owned()]);
}

#[test]
fn test_outcome_unknown_without_footer() {
    let records = vec![join_record(1, 1, "Alice")];
    let file = replay_file(1, &records, &[]);
    let log = process_bytes(&file, &Catalogs::default()).unwrap();

    let result = log.result();
    assert_eq!(result.result, "unknown");
    assert!(result.winners.is_empty());
    assert!(result.losers.is_empty());
}

#[test]
fn test_entity_tracking_through_commands() {
    let mut target = varint_field(1, 9001);
    target.extend(varint_field(2, 500));
    let mut command = varint_field(1, 1);
    command.extend(delimited_field(9, &target));

    let records = vec![
        join_record(1, 1, "Alice"),
        record(100, 1, &delimited_field(7, &command)),
        record(300, 1, &delimited_field(7, &command)),
        record(200, 2, &delimited_field(7, &command)),
    ];
    let file = replay_file(1, &records, &[]);
    let log = process_bytes(&file, &catalogs()).unwrap();

    let entity = &log.tracker().entities()[&9001];
    assert_eq!(entity.action_count(), 3);
    assert_eq!(entity.first_seen(), Some(100));
    assert_eq!(entity.last_seen(), Some(300));
    // Slot 1 touched it twice, slot 2 once.
    assert_eq!(entity.owner(), Some(1));
    // BarracksSpawn used on it identifies the entity.
    assert_eq!(entity.kind().to_string(), "Barracks");
    assert_eq!(log.target_type_stats()["BarracksSpawn"], 3);
}

#[test]
fn test_chat_extraction_end_to_end() {
    let chat_content = delimited_field(50, &delimited_field(1, b"good luck have fun"));
    let records = vec![
        join_record(1, 1, "Alice"),
        record(2048, 1, &chat_content),
    ];
    let file = replay_file(1, &records, &[]);
    let log = process_bytes(&file, &Catalogs::default()).unwrap();

    assert_eq!(log.chat().len(), 1);
    assert_eq!(log.chat()[0].text, "good luck have fun");
    assert_eq!(log.chat()[0].player, "Alice");
}
