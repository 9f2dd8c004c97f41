//! The export surface: a JSON-serializable document for one analyzed
//! replay.
//!
//! The document always has the same shape; fields the file did not yield
//! evidence for are empty rather than absent. The (large) action stream and
//! raw record trees are opt-in.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::analyzers::helpers::frame_to_time;
use crate::analyzers::{BuildEvent, ChatMessage, GameResult, ProductionEvent, RewardEvent, UpgradeEvent};
use crate::event::{Action, ActionKind};
use crate::gamedata::Faction;
use crate::processing::Log;
use crate::raw::{self, EnvelopeInfo, FileHeader};
use crate::wire::{self, SimplifyOptions};

/// Controls the optional, potentially large parts of the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Include the full projected action stream.
    pub include_actions: bool,
    /// Include the simplified tree of every record (requires the raw
    /// replay).
    pub include_messages: bool,
    /// Byte-blob handling for simplified trees.
    pub simplify: SimplifyOptions,
}

/// Per-entity block of the document.
#[derive(Debug, Clone, Serialize)]
pub struct EntityExport {
    pub target_id: u64,
    pub inferred_type: String,
    pub inferred_owner: Option<u64>,
    pub owner_name: Option<String>,
    pub first_seen: Option<u64>,
    pub first_seen_time: String,
    pub last_seen: Option<u64>,
    pub last_seen_time: String,
    pub action_count: u64,
    pub players: Vec<u64>,
    pub abilities_used: BTreeMap<String, u64>,
    pub abilities_cast: BTreeMap<String, u64>,
}

/// The full export document.
#[derive(Debug, Serialize)]
pub struct Document {
    pub file: Option<String>,
    pub header: FileHeader,
    pub map: Option<String>,
    pub players: BTreeMap<u64, String>,
    pub player_teams: BTreeMap<u64, u32>,
    pub player_factions: BTreeMap<u64, Faction>,
    pub game_result: GameResult,
    pub building_orders: BTreeMap<u64, Vec<BuildEvent>>,
    pub upgrades: BTreeMap<u64, Vec<UpgradeEvent>>,
    pub stormgate_rewards: BTreeMap<u64, Vec<RewardEvent>>,
    pub production_summary: BTreeMap<u64, BTreeMap<String, u64>>,
    pub production_timeline: Vec<ProductionEvent>,
    pub total_messages: usize,
    pub total_actions: usize,
    pub action_types: BTreeMap<String, u64>,
    pub chat: Vec<ChatMessage>,
    pub duration_seconds: f64,
    pub target_type_stats: BTreeMap<String, u64>,
    pub ability_stats: BTreeMap<String, u64>,
    pub entities: BTreeMap<String, EntityExport>,
    pub envelope: EnvelopeInfo,
    pub footer: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Value>>,
}

impl Document {
    /// Build the document for a log.
    ///
    /// `raw` is only consulted when `include_messages` is set; passing
    /// `None` silently omits the record trees.
    pub fn new(log: &Log, raw: Option<&raw::Replay>, opts: &ExportOptions) -> Document {
        let entities = log
            .tracker()
            .entities()
            .iter()
            .map(|(&id, entity)| {
                let export = EntityExport {
                    target_id: id,
                    inferred_type: entity.kind().to_string(),
                    inferred_owner: entity.owner(),
                    owner_name: entity.owner().map(|owner| log.player_name(owner)),
                    first_seen: entity.first_seen(),
                    first_seen_time: frame_to_time(entity.first_seen()),
                    last_seen: entity.last_seen(),
                    last_seen_time: frame_to_time(entity.last_seen()),
                    action_count: entity.action_count(),
                    players: entity.actors().keys().copied().collect(),
                    abilities_used: entity.used_on().clone(),
                    abilities_cast: entity.cast_by().clone(),
                };
                (id.to_string(), export)
            })
            .collect();

        let actions: Option<Vec<Value>> = opts.include_actions.then(|| {
            log.actions()
                .iter()
                .map(|action| action_value(action, log, &opts.simplify))
                .collect()
        });
        let messages: Option<Vec<Value>> = match (opts.include_messages, raw) {
            (true, Some(raw)) => Some(
                raw.records
                    .iter()
                    .map(|record| match record.tree.as_ref() {
                        Some(tree) => wire::simplify_tree(tree, &opts.simplify),
                        None => json!({ "_bytes": record.data.len() }),
                    })
                    .collect(),
            ),
            _ => None,
        };

        Document {
            file: log.file_name().clone(),
            header: log.header(),
            map: log.map_name().clone(),
            players: log.players().clone(),
            player_teams: log.teams().clone(),
            player_factions: log.factions().clone(),
            game_result: log.result().clone(),
            building_orders: log.building_orders().clone(),
            upgrades: log.upgrades().clone(),
            stormgate_rewards: log.rewards().clone(),
            production_summary: log.production().per_player.clone(),
            production_timeline: log.production().timeline.clone(),
            total_messages: log.record_count(),
            total_actions: log.actions().len(),
            action_types: log.action_stats().clone(),
            chat: log.chat().clone(),
            duration_seconds: log.duration_seconds(),
            target_type_stats: log.target_type_stats().clone(),
            ability_stats: log.ability_stats().clone(),
            entities,
            envelope: log.envelope(),
            footer: log
                .footer()
                .iter()
                .map(|tree| wire::simplify_tree(tree, &opts.simplify))
                .collect(),
            actions,
            messages,
        }
    }
}

/// Flatten one action into its JSON form.
fn action_value(action: &Action, log: &Log, simplify: &SimplifyOptions) -> Value {
    let mut map = Map::new();
    map.insert("frame".to_owned(), json!(action.frame));
    map.insert("time".to_owned(), json!(frame_to_time(action.frame)));
    map.insert("player_id".to_owned(), json!(action.actor));
    if let Some(actor) = action.actor {
        map.insert("player".to_owned(), json!(log.player_name(actor)));
    }
    map.insert("type".to_owned(), json!(action.kind_label()));

    match &action.kind {
        ActionKind::Command {
            command_kind,
            ability,
            position_index,
            build,
            target,
            position,
        } => {
            if let Some(kind) = command_kind {
                map.insert("cmd_type".to_owned(), json!(kind));
            }
            if let Some(ability) = ability {
                map.insert("ability_id".to_owned(), json!(ability.id));
                if let Some(name) = &ability.name {
                    map.insert("ability_name".to_owned(), json!(name));
                }
            }
            if let Some(index) = position_index {
                map.insert("position_index".to_owned(), json!(index));
            }
            if let Some(build) = build {
                map.insert("build_type".to_owned(), json!(build.id));
                map.insert("build_name".to_owned(), json!(build.display_name()));
            }
            if let Some(target) = target {
                if let Some(id) = target.id {
                    map.insert("target_id".to_owned(), json!(id));
                }
                if let Some(type_id) = target.type_id {
                    map.insert("target_type".to_owned(), json!(type_id));
                }
                if let Some(name) = &target.type_name {
                    map.insert("target_type_name".to_owned(), json!(name));
                }
                if let Some(f3) = target.f3 {
                    map.insert("target_f3".to_owned(), json!(f3));
                }
                if let Some(f4) = target.f4 {
                    map.insert("target_f4".to_owned(), json!(f4));
                }
            }
            if let Some(position) = position {
                map.insert("x".to_owned(), json!(position.x));
                map.insert("y".to_owned(), json!(position.y));
            }
        }
        ActionKind::Spawn { owner, unit_type } => {
            if let Some(owner) = owner {
                map.insert("owner".to_owned(), json!(owner));
            }
            if let Some(unit_type) = unit_type {
                map.insert("unit_type".to_owned(), json!(unit_type));
            }
        }
        ActionKind::Sync { values } => {
            for (tag, value) in values {
                map.insert(format!("sync_{}", tag), json!(value));
            }
        }
        ActionKind::PlayerJoin { slot, name } => {
            if let Some(slot) = slot {
                map.insert("slot".to_owned(), json!(slot));
            }
            if let Some(name) = name {
                map.insert("name".to_owned(), json!(name));
            }
        }
        ActionKind::Profile | ActionKind::Other(_) => {}
    }

    map.insert(
        "raw".to_owned(),
        wire::simplify_tree(&action.source, simplify),
    );
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{process, Catalogs};
    use crate::raw::{EnvelopeInfo, FileHeader, Record, Replay};
    use crate::wire::{decode_tree, encode_varint};

    fn varint_field(tag: u32, value: u64) -> Vec<u8> {
        let mut out = encode_varint(u64::from(tag) << 3);
        out.extend(encode_varint(value));
        out
    }

    fn delimited_field(tag: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = encode_varint(u64::from(tag) << 3 | 2);
        out.extend(encode_varint(payload.len() as u64));
        out.extend_from_slice(payload);
        out
    }

    fn join_record(frame: u64, slot: u64, name: &str) -> Record {
        let mut join = varint_field(2, slot);
        join.extend(delimited_field(3, name.as_bytes()));
        let mut bytes = varint_field(1, frame);
        bytes.extend(varint_field(2, slot));
        bytes.extend(delimited_field(
            3,
            &delimited_field(1, &delimited_field(37, &join)),
        ));
        let tree = decode_tree(&bytes);
        Record { data: bytes, tree }
    }

    fn replay() -> Replay {
        Replay {
            header: FileHeader {
                magic: 1,
                version: 2,
                data_offset: 20,
                changelist: 99,
                flags: 0,
            },
            envelope: EnvelopeInfo {
                gzip_header_len: 10,
                trailer: None,
                unused_len: 0,
            },
            records: vec![join_record(1024, 1, "Alice")],
            footer: Vec::new(),
        }
    }

    #[test]
    fn test_document_shape() {
        let raw = replay();
        let log = process(&raw, &Catalogs::default());
        let doc = Document::new(&log, Some(&raw), &ExportOptions::default());
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["header"]["changelist"], json!(99));
        assert_eq!(value["players"]["1"], json!("Alice"));
        assert_eq!(value["total_messages"], json!(1));
        assert_eq!(value["total_actions"], json!(1));
        assert_eq!(value["action_types"]["PLAYER_JOIN"], json!(1));
        assert_eq!(value["game_result"]["result"], json!("unknown"));
        // Optional blocks absent by default.
        assert!(value.get("actions").is_none());
        assert!(value.get("messages").is_none());
    }

    #[test]
    fn test_document_with_actions_and_messages() {
        let raw = replay();
        let log = process(&raw, &Catalogs::default());
        let opts = ExportOptions {
            include_actions: true,
            include_messages: true,
            simplify: SimplifyOptions::default(),
        };
        let doc = Document::new(&log, Some(&raw), &opts);
        let value = serde_json::to_value(&doc).unwrap();

        let actions = value["actions"].as_array().unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0]["type"], json!("PLAYER_JOIN"));
        assert_eq!(actions[0]["name"], json!("Alice"));
        assert_eq!(actions[0]["time"], json!("00:01"));

        let messages = value["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
    }
}
