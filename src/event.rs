//! Action events and the record projector.
//!
//! Records in the decompressed body share one envelope: a frame counter at
//! tag 1, the acting player at tag 2 and the content message at tag 3 → 1.
//! Every message entry under the content is projected into one
//! [`Action`]; multi-valued tags produce multiple actions.
//!
//! The content tag determines the action category:
//!
//! | tag | category    |
//! |-----|-------------|
//! | 7   | command     |
//! | 4   | spawn       |
//! | 40  | sync        |
//! | 37  | player join |
//! | 45  | profile     |
//! | *   | other       |
//!
//! Capability ids are resolved against the [`AbilityCatalog`] at projection
//! time, when one is available.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::AbilityCatalog;
use crate::raw::Record;
use crate::wire::{self, Leaf, Tree};

/// A numeric capability reference with its resolved name, if known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityRef {
    pub id: u64,
    pub name: Option<String>,
}

impl CapabilityRef {
    fn resolve(id: u64, catalog: Option<&AbilityCatalog>) -> CapabilityRef {
        let name = catalog.and_then(|c| c.get(id)).map(|a| a.name.clone());
        CapabilityRef { id, name }
    }

    /// The resolved name, or the stringified id.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.id.to_string(),
        }
    }
}

/// The entity-target block of a command.
///
/// Commands may carry several target entries; later entries overwrite the
/// fields they provide, so this holds the folded result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TargetRef {
    /// The targeted entity.
    pub id: Option<u64>,
    /// The capability used on the target.
    pub type_id: Option<u64>,
    /// Resolved name of `type_id`.
    pub type_name: Option<String>,
    /// Auxiliary field 3, meaning unknown.
    pub f3: Option<u64>,
    /// Auxiliary field 4, meaning unknown.
    pub f4: Option<u64>,
}

/// A position on the map, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorldPos {
    pub x: f64,
    pub y: f64,
}

/// The category-specific payload of an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ActionKind {
    /// A player-issued command.
    Command {
        command_kind: Option<u64>,
        ability: Option<CapabilityRef>,
        /// Identifies one on-map placement; repeated clicks on the same
        /// placement share the index.
        position_index: Option<u64>,
        build: Option<CapabilityRef>,
        target: Option<TargetRef>,
        position: Option<WorldPos>,
    },
    /// A unit entering the game.
    Spawn {
        owner: Option<u64>,
        unit_type: Option<u64>,
    },
    /// A heartbeat record; tag 1 carries the in-game clock.
    Sync { values: BTreeMap<u32, u64> },
    /// A player joining the session.
    PlayerJoin {
        slot: Option<u64>,
        name: Option<String>,
    },
    /// Profile data for the record's actor.
    Profile,
    /// A content tag without further known semantics.
    Other(u32),
}

/// One semantic operation extracted from a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Frame counter from the record envelope (1024 Hz ticks).
    pub frame: Option<u64>,
    /// The acting player's slot, or the system sentinel.
    pub actor: Option<u64>,
    pub kind: ActionKind,
    /// The projected subtree, kept for debugging exports.
    pub source: Tree,
}

impl Action {
    /// Histogram label for the action's category.
    pub fn kind_label(&self) -> String {
        match &self.kind {
            ActionKind::Command { .. } => "COMMAND".to_owned(),
            ActionKind::Spawn { .. } => "SPAWN".to_owned(),
            ActionKind::Sync { .. } => "SYNC".to_owned(),
            ActionKind::PlayerJoin { .. } => "PLAYER_JOIN".to_owned(),
            ActionKind::Profile => "PROFILE".to_owned(),
            ActionKind::Other(tag) => format!("FIELD_{}", tag),
        }
    }

    /// Whether this is a command action.
    pub fn is_command(&self) -> bool {
        matches!(self.kind, ActionKind::Command { .. })
    }

    /// The ability block reference of a command.
    pub fn ability(&self) -> Option<&CapabilityRef> {
        match &self.kind {
            ActionKind::Command { ability, .. } => ability.as_ref(),
            _ => None,
        }
    }

    /// The resolved ability name of a command.
    pub fn ability_name(&self) -> Option<&str> {
        self.ability().and_then(|a| a.name.as_deref())
    }

    /// The build-type reference of a command.
    pub fn build(&self) -> Option<&CapabilityRef> {
        match &self.kind {
            ActionKind::Command { build, .. } => build.as_ref(),
            _ => None,
        }
    }

    /// The folded target block of a command.
    pub fn target(&self) -> Option<&TargetRef> {
        match &self.kind {
            ActionKind::Command { target, .. } => target.as_ref(),
            _ => None,
        }
    }

    /// The placement index of a command.
    pub fn position_index(&self) -> Option<u64> {
        match &self.kind {
            ActionKind::Command { position_index, .. } => *position_index,
            _ => None,
        }
    }

    /// The world position of a command.
    pub fn position(&self) -> Option<WorldPos> {
        match &self.kind {
            ActionKind::Command { position, .. } => *position,
            _ => None,
        }
    }

    /// The sync value at the given tag, for sync actions.
    pub fn sync_value(&self, tag: u32) -> Option<u64> {
        match &self.kind {
            ActionKind::Sync { values } => values.get(&tag).copied(),
            _ => None,
        }
    }
}

/// Project one record into its action events.
pub fn project_record(record: &Record, catalog: Option<&AbilityCatalog>) -> Vec<Action> {
    match record.tree.as_ref() {
        Some(tree) => project_tree(tree, catalog),
        None => Vec::new(),
    }
}

/// Project a decoded record tree into its action events.
pub fn project_tree(tree: &Tree, catalog: Option<&AbilityCatalog>) -> Vec<Action> {
    let frame = tree.u64_at(&[1]);
    let actor = tree.u64_at(&[2]);
    let content = match tree.tree_at(&[3, 1]) {
        Some(content) => content,
        None => return Vec::new(),
    };

    let mut actions = Vec::new();
    for (tag, leaves) in content.iter() {
        for leaf in leaves {
            let data = match leaf.as_tree() {
                Some(data) => data,
                None => continue,
            };
            let kind = match tag {
                7 => project_command(data, catalog),
                4 => ActionKind::Spawn {
                    owner: data.u64_at(&[1]),
                    unit_type: data.u64_at(&[3]),
                },
                40 => ActionKind::Sync {
                    values: data
                        .iter()
                        .filter_map(|(sync_tag, entries)| {
                            entries
                                .first()
                                .and_then(Leaf::as_u64)
                                .map(|value| (sync_tag, value))
                        })
                        .collect(),
                },
                37 => ActionKind::PlayerJoin {
                    slot: data.u64_at(&[2]),
                    name: data.str_at(&[3]).map(str::to_owned),
                },
                45 => ActionKind::Profile,
                other => ActionKind::Other(other),
            };
            actions.push(Action {
                frame,
                actor,
                kind,
                source: data.clone(),
            });
        }
    }
    actions
}

fn project_command(data: &Tree, catalog: Option<&AbilityCatalog>) -> ActionKind {
    let command_kind = data.u64_at(&[1]);

    // Target block: repeated submessages under tag 9, folded so that later
    // entries overwrite the fields they carry.
    let mut target: Option<TargetRef> = None;
    let mut target_pos = None;
    for entry in data.entries(9) {
        let sub = match entry.as_tree() {
            Some(sub) => sub,
            None => continue,
        };
        let folded = target.get_or_insert_with(TargetRef::default);
        if let Some(id) = sub.u64_at(&[1]) {
            folded.id = Some(id);
        }
        if let Some(type_id) = sub.u64_at(&[2]) {
            folded.type_id = Some(type_id);
            folded.type_name = catalog.and_then(|c| c.get(type_id)).map(|a| a.name.clone());
        }
        if let Some(f3) = sub.u64_at(&[3]) {
            folded.f3 = Some(f3);
        }
        if let Some(f4) = sub.u64_at(&[4]) {
            folded.f4 = Some(f4);
        }
        // Fields 5 and 6 carry a fixed-point world position in some record
        // layouts; in others they hold unrelated data that simply fails the
        // fixed-point interpretation.
        if let (Some(x), Some(y)) = (
            sub.at(&[5]).and_then(wire::fixed_to_world),
            sub.at(&[6]).and_then(wire::fixed_to_world),
        ) {
            target_pos = Some(WorldPos { x, y });
        }
    }

    // Ability block at tag 4.
    let mut ability = None;
    let mut position_index = None;
    let mut build = None;
    let mut ability_pos = None;
    if let Some(block) = data.tree_at(&[4]) {
        ability = block
            .u64_at(&[1])
            .map(|id| CapabilityRef::resolve(id, catalog));
        position_index = block.u64_at(&[2]);
        build = block
            .u64_at(&[3])
            .map(|id| CapabilityRef::resolve(id, catalog));
        if let Some(coords) = block.tree_at(&[4]) {
            if let (Some(x), Some(y)) = (
                coords.at(&[1]).and_then(wire::fixed_to_world),
                coords.at(&[2]).and_then(wire::fixed_to_world),
            ) {
                ability_pos = Some(WorldPos { x, y });
            }
        }
    }

    ActionKind::Command {
        command_kind,
        ability,
        position_index,
        build,
        target,
        position: ability_pos.or(target_pos),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AbilityCatalog;
    use crate::wire::encode_varint;

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

    fn record_tree(frame: u64, actor: u64, content: Vec<u8>) -> Tree {
        let mut bytes = varint_field(1, frame);
        bytes.extend(varint_field(2, actor));
        bytes.extend(delimited_field(3, &delimited_field(1, &content)));
        wire::decode_tree(&bytes).unwrap()
    }

    fn catalog() -> AbilityCatalog {
        AbilityCatalog::from_json_str(
            r#"{"archetypes": {
                "500": [1, {"id": "BarracksSpawn", "__base_type": "AbilityData"}],
                "600": [2, {"id": "Barracks", "__base_type": "UnitData"}]
            }}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_project_player_join() {
        let mut join = varint_field(2, 1);
        join.extend(delimited_field(3, b"Alice"));
        let tree = record_tree(1024, 1, delimited_field(37, &join));

        let actions = project_tree(&tree, None);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].frame, Some(1024));
        assert_eq!(actions[0].actor, Some(1));
        assert_eq!(
            actions[0].kind,
            ActionKind::PlayerJoin {
                slot: Some(1),
                name: Some("Alice".to_owned()),
            }
        );
    }

    #[test]
    fn test_project_sync() {
        let sync = varint_field(1, 20480);
        let tree = record_tree(10240, 1, delimited_field(40, &sync));

        let actions = project_tree(&tree, None);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].sync_value(1), Some(20480));
        assert_eq!(actions[0].kind_label(), "SYNC");
    }

    #[test]
    fn test_project_command_with_ability() {
        let mut ability = varint_field(1, 500);
        ability.extend(varint_field(2, 9));
        ability.extend(varint_field(3, 600));

        let mut target = varint_field(1, 777);
        target.extend(varint_field(2, 500));

        let mut command = varint_field(1, 3);
        command.extend(delimited_field(4, &ability));
        command.extend(delimited_field(9, &target));

        let tree = record_tree(5000, 2, delimited_field(7, &command));
        let catalog = catalog();
        let actions = project_tree(&tree, Some(&catalog));
        assert_eq!(actions.len(), 1);

        let action = &actions[0];
        assert!(action.is_command());
        assert_eq!(action.ability_name(), Some("BarracksSpawn"));
        assert_eq!(action.position_index(), Some(9));
        assert_eq!(action.build().map(|b| b.display_name()), Some("Barracks".to_owned()));

        let target = action.target().unwrap();
        assert_eq!(target.id, Some(777));
        assert_eq!(target.type_id, Some(500));
        assert_eq!(target.type_name.as_deref(), Some("BarracksSpawn"));
    }

    #[test]
    fn test_project_command_coordinates() {
        let x = (10 * 4096i64) as u64;
        let y = (20 * 4096i64) as u64;
        let mut coords = varint_field(1, x);
        coords.extend(varint_field(2, y));
        let mut ability = varint_field(1, 500);
        ability.extend(delimited_field(4, &coords));
        let command = delimited_field(4, &ability);

        let tree = record_tree(100, 1, delimited_field(7, &command));
        let actions = project_tree(&tree, None);
        let position = actions[0].position().unwrap();
        assert!((position.x - 10.0).abs() < 1e-9);
        assert!((position.y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_multiple_entries_per_tag() {
        let mut content = delimited_field(7, &varint_field(1, 1));
        content.extend(delimited_field(7, &varint_field(1, 2)));
        let tree = record_tree(50, 1, content);
        let actions = project_tree(&tree, None);
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_unknown_tag_is_other() {
        let tree = record_tree(1, 1, delimited_field(99, &varint_field(1, 1)));
        let actions = project_tree(&tree, None);
        assert_eq!(actions[0].kind, ActionKind::Other(99));
        assert_eq!(actions[0].kind_label(), "FIELD_99");
    }

    #[test]
    fn test_record_without_content_yields_nothing() {
        let bytes = varint_field(1, 10);
        let tree = wire::decode_tree(&bytes).unwrap();
        assert!(project_tree(&tree, None).is_empty());
    }
}
