//! Team assignment, game-result reconciliation and duration.
//!
//! The result of a game is recorded redundantly and inconsistently across
//! game builds, so the verdict is reconciled from several evidence sources
//! in decreasing order of trust:
//!
//! 1. a record carrying a top-level tag-31 message naming a slot on the
//!    winning team, combined with the footer's team assignments,
//! 2. the footer's per-player win flag (child tag 3),
//! 3. the footer's per-player result code (child tag 4, 1 = win, 2 = loss).
//!
//! When none of the sources resolves, the result is `unknown` with empty
//! winner/loser lists rather than an error.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::event::Action;
use crate::gamedata::FRAME_RATE_HZ;
use crate::raw::Record;
use crate::wire::Tree;

/// Per-player verdict.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerOutcome {
    Win,
    Loss,
}

/// The reconciled result of a game.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameResult {
    /// `"complete"` when a winner was determined, `"unknown"` otherwise.
    pub result: String,
    pub winners: Vec<String>,
    pub losers: Vec<String>,
    /// Verdict per player slot, where derivable.
    pub player_results: BTreeMap<u64, PlayerOutcome>,
    pub winner_team: Option<u32>,
}

impl GameResult {
    fn unknown() -> GameResult {
        GameResult {
            result: "unknown".to_owned(),
            ..GameResult::default()
        }
    }
}

/// The footer tree holding the player-result array, if any.
pub fn footer_results(footer: &[Tree]) -> Option<&Tree> {
    footer.iter().find(|tree| tree.has(3))
}

/// Read team assignments from the footer's player-result array.
///
/// Each entry carries the player name at child tag 2 and the team at child
/// tag 5; names map back to slots through the current player map. Older
/// game builds do not write teams at all, in which case the map is empty.
pub fn teams(footer: &[Tree], players: &BTreeMap<u64, String>) -> BTreeMap<u64, u32> {
    let mut name_to_team: BTreeMap<&str, u32> = BTreeMap::new();
    if let Some(results) = footer_results(footer) {
        for entry in results.entries(3) {
            let sub = match entry.as_tree() {
                Some(sub) => sub,
                None => continue,
            };
            if let (Some(name), Some(team)) = (sub.str_at(&[2]), sub.u64_at(&[5])) {
                name_to_team.insert(name, team as u32);
            }
        }
    }

    let mut result = BTreeMap::new();
    for (&slot, name) in players {
        if let Some(&team) = name_to_team.get(name.as_str()) {
            result.insert(slot, team);
        }
    }
    result
}

/// Find the winning slot announced by a tag-31 record, if any.
pub fn winner_slot(records: &[Record]) -> Option<u64> {
    records
        .iter()
        .filter_map(|record| record.tree.as_ref())
        .find_map(|tree| tree.u64_at(&[31, 1]))
}

/// Reconcile the game result from all evidence sources.
pub fn game_result(
    winning_slot: Option<u64>,
    footer: &[Tree],
    players: &BTreeMap<u64, String>,
    teams: &BTreeMap<u64, u32>,
) -> GameResult {
    let distinct_teams = {
        let mut values: Vec<u32> = teams.values().copied().collect();
        values.sort_unstable();
        values.dedup();
        values.len()
    };

    // Primary: the tag-31 winner slot labels whole teams.
    if distinct_teams >= 2 {
        if let Some(winning_team) = winning_slot.and_then(|slot| teams.get(&slot)).copied() {
            let mut result = GameResult {
                result: "complete".to_owned(),
                winner_team: Some(winning_team),
                ..GameResult::default()
            };
            for (&slot, &team) in teams {
                let outcome = if team == winning_team {
                    PlayerOutcome::Win
                } else {
                    PlayerOutcome::Loss
                };
                result.player_results.insert(slot, outcome);
                if let Some(name) = players.get(&slot) {
                    match outcome {
                        PlayerOutcome::Win => result.winners.push(name.clone()),
                        PlayerOutcome::Loss => result.losers.push(name.clone()),
                    }
                }
            }
            return result;
        }
    }

    // Fallbacks read the footer's per-player entries directly.
    let results = match footer_results(footer) {
        Some(results) => results,
        None => return GameResult::unknown(),
    };
    let name_to_slot: BTreeMap<&str, u64> = players
        .iter()
        .map(|(&slot, name)| (name.as_str(), slot))
        .collect();

    for flag_tag in [3u32, 4u32] {
        let mut result = GameResult::unknown();
        for entry in results.entries(3) {
            let sub = match entry.as_tree() {
                Some(sub) => sub,
                None => continue,
            };
            let name = match sub.str_at(&[2]) {
                Some(name) => name,
                None => continue,
            };
            // The win flag divides entries into the flagged winners and
            // everyone else; the result code only means something for the
            // two known values.
            let outcome = match (flag_tag, sub.u64_at(&[flag_tag])) {
                (3, Some(1)) => PlayerOutcome::Win,
                (3, _) => PlayerOutcome::Loss,
                (4, Some(1)) => PlayerOutcome::Win,
                (4, Some(2)) => PlayerOutcome::Loss,
                _ => continue,
            };
            match outcome {
                PlayerOutcome::Win => {
                    result.winners.push(name.to_owned());
                    if result.winner_team.is_none() {
                        result.winner_team = sub.u64_at(&[5]).map(|team| team as u32);
                    }
                }
                PlayerOutcome::Loss => result.losers.push(name.to_owned()),
            }
            if let Some(&slot) = name_to_slot.get(name) {
                result.player_results.insert(slot, outcome);
            }
        }
        if !result.winners.is_empty() {
            result.result = "complete".to_owned();
            return result;
        }
    }

    GameResult::unknown()
}

/// Game duration in seconds.
///
/// Sync records carry the in-game clock (excluding loading time) in their
/// tag-1 value; the maximum observed value is authoritative. Files without
/// sync records fall back to the highest record frame.
pub fn duration_seconds(actions: &[Action]) -> f64 {
    let max_sync = actions
        .iter()
        .filter_map(|action| action.sync_value(1))
        .max();
    let ticks = match max_sync {
        Some(ticks) => ticks,
        None => actions.iter().filter_map(|action| action.frame).max().unwrap_or(0),
    };
    ticks as f64 / FRAME_RATE_HZ as f64
}
