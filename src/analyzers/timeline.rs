//! Upgrade, reward and production timelines.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::event::Action;
use crate::gamedata;

use super::helpers::{frame_to_time, humanize_reward, humanize_upgrade};

/// One research/upgrade event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeEvent {
    pub frame: Option<u64>,
    pub time: String,
    pub upgrade_id: Option<u64>,
    pub upgrade_name: String,
}

/// One stormgate reward selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardEvent {
    pub frame: Option<u64>,
    pub time: String,
    pub reward_id: Option<u64>,
    pub reward_name: String,
}

/// One unit-production event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionEvent {
    pub frame: Option<u64>,
    pub time: String,
    pub actor: u64,
    /// Friendly name of the producing building.
    pub building: String,
    pub ability_name: String,
}

/// Per-player production counts plus the flat event timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductionSummary {
    /// `actor -> building -> units queued`.
    pub per_player: BTreeMap<u64, BTreeMap<String, u64>>,
    pub timeline: Vec<ProductionEvent>,
}

fn player_actor(action: &Action) -> Option<u64> {
    match action.actor {
        Some(actor) if actor != gamedata::NEUTRAL_ACTOR => Some(actor),
        _ => None,
    }
}

/// Extract research/upgrade events per player.
///
/// An ability counts as an upgrade when its name carries one of the
/// research keywords but is not a stormgate reward; repeats of the same
/// ability by the same player (queue re-issues, cancels) collapse to one
/// event.
pub fn upgrades(actions: &[Action]) -> BTreeMap<u64, Vec<UpgradeEvent>> {
    let mut result: BTreeMap<u64, Vec<UpgradeEvent>> = BTreeMap::new();
    let mut seen: HashSet<(u64, Option<u64>)> = HashSet::new();

    for action in actions {
        if !action.is_command() {
            continue;
        }
        let actor = match player_actor(action) {
            Some(actor) => actor,
            None => continue,
        };
        let name = action.ability_name().unwrap_or("");
        let is_upgrade = gamedata::UPGRADE_KEYWORDS
            .iter()
            .any(|keyword| name.contains(keyword));
        if !is_upgrade || name.starts_with(gamedata::REWARD_PREFIX) {
            continue;
        }

        let id = action.ability().map(|a| a.id);
        if !seen.insert((actor, id)) {
            continue;
        }

        result.entry(actor).or_default().push(UpgradeEvent {
            frame: action.frame,
            time: frame_to_time(action.frame),
            upgrade_id: id,
            upgrade_name: humanize_upgrade(name),
        });
    }

    for events in result.values_mut() {
        events.sort_by_key(|event| event.frame.unwrap_or(0));
    }
    result
}

/// Extract stormgate reward selections per player.
pub fn rewards(actions: &[Action]) -> BTreeMap<u64, Vec<RewardEvent>> {
    let mut result: BTreeMap<u64, Vec<RewardEvent>> = BTreeMap::new();
    let mut seen: HashSet<(u64, Option<u64>)> = HashSet::new();

    for action in actions {
        if !action.is_command() {
            continue;
        }
        let actor = match player_actor(action) {
            Some(actor) => actor,
            None => continue,
        };
        let name = action.ability_name().unwrap_or("");
        if !name.starts_with(gamedata::REWARD_PREFIX) {
            continue;
        }

        let id = action.ability().map(|a| a.id);
        if !seen.insert((actor, id)) {
            continue;
        }

        result.entry(actor).or_default().push(RewardEvent {
            frame: action.frame,
            time: frame_to_time(action.frame),
            reward_id: id,
            reward_name: humanize_reward(name),
        });
    }

    for events in result.values_mut() {
        events.sort_by_key(|event| event.frame.unwrap_or(0));
    }
    result
}

/// Summarize unit production per player and building.
///
/// Any command whose ability name contains `spawn` (case-insensitive) is a
/// production order; it is attributed to the building class the capability
/// belongs to.
pub fn production(actions: &[Action]) -> ProductionSummary {
    let mut summary = ProductionSummary::default();

    for action in actions {
        if !action.is_command() {
            continue;
        }
        let actor = match player_actor(action) {
            Some(actor) => actor,
            None => continue,
        };
        let name = match action.ability_name() {
            Some(name) if name.to_lowercase().contains("spawn") => name,
            _ => continue,
        };

        let building = gamedata::spawn_source_building(name);
        *summary
            .per_player
            .entry(actor)
            .or_default()
            .entry(building.clone())
            .or_insert(0) += 1;
        summary.timeline.push(ProductionEvent {
            frame: action.frame,
            time: frame_to_time(action.frame),
            actor,
            building,
            ability_name: name.to_owned(),
        });
    }

    summary.timeline.sort_by_key(|event| event.frame.unwrap_or(0));
    summary
}
