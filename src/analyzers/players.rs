//! Player identification, faction detection, map name and chat.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::event::Action;
use crate::gamedata::{self, Faction};
use crate::raw::Record;
use crate::wire;

use super::helpers::frame_to_time;

/// Session metadata is written near the start of the file; only this many
/// records need to be probed for players and the map name.
pub const EARLY_RECORD_WINDOW: usize = 50;

/// Identify players from the early records and the footer.
///
/// Three evidence sources are merged, first binding wins:
///
/// 1. profile records (content tag 45) bind the record's actor to the name
///    under child path 5 → 1,
/// 2. join records (content tag 37) carry slot and name directly,
/// 3. the footer's player-result array fills names for slots still missing.
pub fn identify_players(records: &[Record], footer: &[wire::Tree]) -> BTreeMap<u64, String> {
    let mut players = BTreeMap::new();

    for record in records.iter().take(EARLY_RECORD_WINDOW) {
        let tree = match record.tree.as_ref() {
            Some(tree) => tree,
            None => continue,
        };
        let content = match tree.tree_at(&[3, 1]) {
            Some(content) => content,
            None => continue,
        };

        if let Some(actor) = tree.u64_at(&[2]) {
            if actor != gamedata::NEUTRAL_ACTOR && !players.contains_key(&actor) {
                for entry in content.entries(45) {
                    let name = entry
                        .as_tree()
                        .and_then(|sub| sub.str_at(&[5, 1]));
                    if let Some(name) = name {
                        players.insert(actor, name.to_owned());
                        break;
                    }
                }
            }
        }

        for entry in content.entries(37) {
            let sub = match entry.as_tree() {
                Some(sub) => sub,
                None => continue,
            };
            if let (Some(slot), Some(name)) = (sub.u64_at(&[2]), sub.str_at(&[3])) {
                players.entry(slot).or_insert_with(|| name.to_owned());
            }
        }
    }

    if let Some(results) = super::outcome::footer_results(footer) {
        for entry in results.entries(3) {
            let sub = match entry.as_tree() {
                Some(sub) => sub,
                None => continue,
            };
            if let (Some(slot), Some(name)) = (sub.u64_at(&[1]), sub.str_at(&[2])) {
                players.entry(slot).or_insert_with(|| name.to_owned());
            }
        }
    }

    players
}

/// Detect each actor's faction from its first faction-marked capability.
pub fn detect_factions(actions: &[Action]) -> BTreeMap<u64, Faction> {
    let mut factions = BTreeMap::new();
    for action in actions {
        let actor = match action.actor {
            Some(actor) if actor != gamedata::NEUTRAL_ACTOR => actor,
            _ => continue,
        };
        if factions.contains_key(&actor) {
            continue;
        }
        let mut names = Vec::new();
        if let Some(name) = action.ability_name() {
            names.push(name);
        }
        if let Some(name) = action.target().and_then(|t| t.type_name.as_deref()) {
            names.push(name);
        }
        for name in names {
            if let Some(faction) = Faction::detect(name) {
                factions.insert(actor, faction);
                break;
            }
        }
    }
    factions
}

/// Probe the early records for the map name.
///
/// Several candidate paths exist because the layout moved between game
/// builds; the first sufficiently long string wins.
pub fn map_name(records: &[Record]) -> Option<String> {
    const PATHS: &[&[u32]] = &[&[3, 1, 3, 2], &[3, 1, 1, 3, 2], &[3, 1, 1, 2]];

    for record in records.iter().take(EARLY_RECORD_WINDOW) {
        let tree = match record.tree.as_ref() {
            Some(tree) => tree,
            None => continue,
        };
        for path in PATHS {
            if let Some(name) = tree.str_at(path) {
                if name.len() > 3 {
                    return Some(name.to_owned());
                }
            }
        }
    }
    None
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub frame: Option<u64>,
    pub time: String,
    pub actor: Option<u64>,
    pub player: String,
    pub text: String,
}

/// Extract chat messages from all records.
///
/// There is no dedicated chat tag; instead every string leaf is considered
/// and known non-chat strings (player names, the map name, engine markers
/// starting with `:`) are filtered out.
pub fn chat(
    records: &[Record],
    players: &BTreeMap<u64, String>,
    map: Option<&str>,
) -> Vec<ChatMessage> {
    let mut skip: HashSet<&str> = players.values().map(String::as_str).collect();
    if let Some(map) = map {
        skip.insert(map);
    }

    let mut messages = Vec::new();
    for record in records {
        let tree = match record.tree.as_ref() {
            Some(tree) => tree,
            None => continue,
        };
        let frame = tree.u64_at(&[1]);
        let actor = tree.u64_at(&[2]);
        for text in wire::find_strings(tree) {
            if text.len() <= 3 || text.starts_with(':') || skip.contains(text.as_str()) {
                continue;
            }
            let player = actor
                .and_then(|actor| players.get(&actor).cloned())
                .unwrap_or_else(|| match actor {
                    Some(actor) => format!("P{}", actor),
                    None => "P?".to_owned(),
                });
            messages.push(ChatMessage {
                frame,
                time: frame_to_time(frame),
                actor,
                player,
                text,
            });
        }
    }
    messages
}
