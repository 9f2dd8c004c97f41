//! Build-order extraction.
//!
//! A build order is the chronological list of structure placements per
//! player. Commands carry a build-type capability even for things that are
//! not placements, and a single placement generates one command per click,
//! so the raw stream has to be filtered and deduplicated. On top of the
//! explicit placements, spawn activity is used to synthesize structures
//! whose placement happened before recording picked them up (or was lost to
//! schema drift).

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::catalog::{AbilityCatalog, StructureCatalog};
use crate::event::Action;
use crate::gamedata::{self, Faction};

use super::helpers::frame_to_time;

/// One structure placement in a player's build order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildEvent {
    pub frame: Option<u64>,
    pub time: String,
    /// Numeric build-type id; absent for inferred entries, which are known
    /// only by structure name.
    pub building_type: Option<u64>,
    pub building_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Whether the entry was synthesized from spawn activity rather than an
    /// observed placement command.
    pub inferred: bool,
}

/// Extract per-player build orders from the projected actions.
///
/// `factions` is consulted to suppress inferred entries for each faction's
/// starting structure.
pub fn build_orders(
    actions: &[Action],
    abilities: Option<&AbilityCatalog>,
    structures: Option<&StructureCatalog>,
    factions: &BTreeMap<u64, Faction>,
) -> BTreeMap<u64, Vec<BuildEvent>> {
    let mut orders: BTreeMap<u64, Vec<BuildEvent>> = BTreeMap::new();
    // One event per placement: repeated clicks share the dedup key, and the
    // earliest click wins.
    let mut placements: HashMap<(u64, Option<u64>, u64), (u64, usize)> = HashMap::new();

    for action in actions {
        let actor = match action.actor {
            Some(actor) if actor != gamedata::NEUTRAL_ACTOR => actor,
            _ => continue,
        };
        let build = match action.build() {
            Some(build) => build,
            None => continue,
        };
        let name = build.display_name();
        if gamedata::NON_BUILD_CAPABILITIES.contains(&name.as_str()) {
            continue;
        }

        let position = action.position();
        let building_name = match structures {
            Some(structures) => match structures.name(build.id) {
                Some(known) => known.to_owned(),
                // With a structure dictionary at hand, ids it does not list
                // are not placements.
                None => continue,
            },
            None => {
                if position.is_none() {
                    let base_type = abilities
                        .and_then(|catalog| catalog.get(build.id))
                        .map(|archetype| archetype.base_type.as_str());
                    let is_structure = base_type
                        .map(|base| gamedata::STRUCTURE_BASE_TYPES.contains(&base))
                        .unwrap_or(false);
                    if !is_structure {
                        continue;
                    }
                }
                name.clone()
            }
        };

        let event = BuildEvent {
            frame: action.frame,
            time: frame_to_time(action.frame),
            building_type: Some(build.id),
            building_name,
            x: position.map(|p| p.x),
            y: position.map(|p| p.y),
            inferred: false,
        };

        let key = (actor, action.position_index(), build.id);
        let frame = action.frame.unwrap_or(0);
        let entries = orders.entry(actor).or_default();
        match placements.get(&key).copied() {
            Some((existing_frame, index)) => {
                if frame < existing_frame {
                    entries[index] = event;
                    placements.insert(key, (frame, index));
                }
            }
            None => {
                placements.insert(key, (frame, entries.len()));
                entries.push(event);
            }
        }
    }

    infer_missing_structures(actions, factions, &mut orders);

    for entries in orders.values_mut() {
        entries.sort_by_key(|event| event.frame.unwrap_or(0));
    }
    orders
}

/// Synthesize build entries for structures proven by spawn activity.
///
/// A `BarracksSpawn` at frame F means a Barracks existed at F; when no
/// explicit placement precedes F (and the structure is not the faction's
/// starting building), an inferred entry at F is added.
fn infer_missing_structures(
    actions: &[Action],
    factions: &BTreeMap<u64, Faction>,
    orders: &mut BTreeMap<u64, Vec<BuildEvent>>,
) {
    let mut first_spawn: BTreeMap<(u64, gamedata::Structure), u64> = BTreeMap::new();
    for action in actions {
        let actor = match action.actor {
            Some(actor) if actor != gamedata::NEUTRAL_ACTOR => actor,
            _ => continue,
        };
        let structure = match action.ability_name().and_then(gamedata::spawn_structure) {
            Some(structure) => structure,
            None => continue,
        };
        let frame = action.frame.unwrap_or(0);
        first_spawn
            .entry((actor, structure))
            .and_modify(|existing| *existing = (*existing).min(frame))
            .or_insert(frame);
    }

    for (&(actor, structure), &frame) in &first_spawn {
        // An actor without a detected faction is assumed to play the
        // faction the structure belongs to, so starting structures stay
        // suppressed either way.
        let faction = factions
            .get(&actor)
            .copied()
            .unwrap_or_else(|| structure.faction());
        if faction.starting_structure() == Some(structure) {
            continue;
        }
        let name = structure.to_string();
        let entries = orders.entry(actor).or_default();
        let first_explicit = entries
            .iter()
            .filter(|event| event.building_name == name)
            .filter_map(|event| event.frame)
            .min();
        let needs_inference = match first_explicit {
            Some(explicit) => explicit > frame,
            None => true,
        };
        if needs_inference {
            entries.push(BuildEvent {
                frame: Some(frame),
                time: frame_to_time(Some(frame)),
                building_type: None,
                building_name: name,
                x: None,
                y: None,
                inferred: true,
            });
        }
    }
}
