//! Turning a raw replay into an analyzed [`Log`].

use std::collections::BTreeMap;
use std::path::Path;

use getset::{CopyGetters, Getters, Setters};

use crate::analyzers::{self, BuildEvent, ChatMessage, GameResult, ProductionSummary, RewardEvent, UpgradeEvent};
use crate::catalog::{AbilityCatalog, StructureCatalog};
use crate::event::{self, Action};
use crate::gamedata::Faction;
use crate::raw::{self, EnvelopeInfo, FileHeader};
use crate::tracker::EntityTracker;
use crate::wire::Tree;
use crate::ReplayError;

/// The optional dictionaries consulted during processing.
///
/// Each parser invocation gets its own (shared-nothing) set, so concurrent
/// parses never touch common mutable state. Missing dictionaries degrade
/// name resolution to stringified ids.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub abilities: Option<AbilityCatalog>,
    pub structures: Option<StructureCatalog>,
}

/// A fully analyzed replay.
///
/// Everything derivable from one file: identification, per-player
/// timelines, the reconciled result, per-entity activity and the envelope
/// diagnostics. Obtain one through [`process`], [`process_bytes`] or
/// [`process_file`].
#[derive(Debug, Getters, CopyGetters, Setters)]
pub struct Log {
    /// File name of the source, when parsed from disk.
    #[get = "pub"]
    #[set = "pub"]
    file_name: Option<String>,
    /// The fixed file header.
    #[get_copy = "pub"]
    header: FileHeader,
    /// Envelope diagnostics.
    #[get_copy = "pub"]
    envelope: EnvelopeInfo,
    /// The map the game was played on, when identified.
    #[get = "pub"]
    map_name: Option<String>,
    /// Player names by slot.
    #[get = "pub"]
    players: BTreeMap<u64, String>,
    /// Team numbers by slot, from the footer.
    #[get = "pub"]
    teams: BTreeMap<u64, u32>,
    /// Detected faction by slot.
    #[get = "pub"]
    factions: BTreeMap<u64, Faction>,
    /// The reconciled game result.
    #[get = "pub"]
    result: GameResult,
    /// Build order per player.
    #[get = "pub"]
    building_orders: BTreeMap<u64, Vec<BuildEvent>>,
    /// Upgrade timeline per player.
    #[get = "pub"]
    upgrades: BTreeMap<u64, Vec<UpgradeEvent>>,
    /// Stormgate reward selections per player.
    #[get = "pub"]
    rewards: BTreeMap<u64, Vec<RewardEvent>>,
    /// Unit production summary and timeline.
    #[get = "pub"]
    production: ProductionSummary,
    /// Game duration in seconds, excluding loading time where sync records
    /// are available.
    #[get_copy = "pub"]
    duration_seconds: f64,
    /// Chat messages.
    #[get = "pub"]
    chat: Vec<ChatMessage>,
    /// Action count per category label.
    #[get = "pub"]
    action_stats: BTreeMap<String, u64>,
    /// Usage count per target capability name.
    #[get = "pub"]
    target_type_stats: BTreeMap<String, u64>,
    /// Usage count per ability name.
    #[get = "pub"]
    ability_stats: BTreeMap<String, u64>,
    /// Per-entity activity.
    #[get = "pub"]
    tracker: EntityTracker,
    /// Number of records in the body.
    #[get_copy = "pub"]
    record_count: usize,
    /// The decoded footer trees.
    #[get = "pub"]
    footer: Vec<Tree>,
    /// The full projected action stream.
    #[get = "pub"]
    actions: Vec<Action>,
}

impl Log {
    /// Display name for a slot: the player name, or `P<slot>`.
    pub fn player_name(&self, slot: u64) -> String {
        match self.players.get(&slot) {
            Some(name) => name.clone(),
            None => format!("P{}", slot),
        }
    }
}

/// Main function to turn a raw [`Replay`][raw::Replay] into an analyzed
/// [`Log`].
///
/// Projection and every analyzer are best-effort: the returned log is
/// always complete in shape, with empty maps and `unknown` labels where the
/// file did not yield evidence.
pub fn process(data: &raw::Replay, catalogs: &Catalogs) -> Log {
    let abilities = catalogs.abilities.as_ref();

    let actions: Vec<Action> = data
        .records
        .iter()
        .flat_map(|record| event::project_record(record, abilities))
        .collect();

    let players = analyzers::identify_players(&data.records, &data.footer);
    let map_name = analyzers::map_name(&data.records);
    let factions = analyzers::detect_factions(&actions);

    let mut tracker = EntityTracker::new();
    for action in &actions {
        tracker.record(action);
    }
    tracker.infer_owners();

    let teams = analyzers::teams(&data.footer, &players);
    let winning_slot = analyzers::winner_slot(&data.records);
    let result = analyzers::game_result(winning_slot, &data.footer, &players, &teams);

    let building_orders = analyzers::build_orders(
        &actions,
        abilities,
        catalogs.structures.as_ref(),
        &factions,
    );
    let upgrades = analyzers::upgrades(&actions);
    let rewards = analyzers::rewards(&actions);
    let production = analyzers::production(&actions);
    let duration_seconds = analyzers::duration_seconds(&actions);
    let chat = analyzers::chat(&data.records, &players, map_name.as_deref());

    let mut action_stats: BTreeMap<String, u64> = BTreeMap::new();
    let mut target_type_stats: BTreeMap<String, u64> = BTreeMap::new();
    let mut ability_stats: BTreeMap<String, u64> = BTreeMap::new();
    for action in &actions {
        *action_stats.entry(action.kind_label()).or_insert(0) += 1;
        if let Some(target) = action.target() {
            if let Some(type_id) = target.type_id {
                let name = target
                    .type_name
                    .clone()
                    .unwrap_or_else(|| type_id.to_string());
                *target_type_stats.entry(name).or_insert(0) += 1;
            }
        }
        if let Some(ability) = action.ability() {
            *ability_stats.entry(ability.display_name()).or_insert(0) += 1;
        }
    }

    Log {
        file_name: None,
        header: data.header,
        envelope: data.envelope,
        map_name,
        players,
        teams,
        factions,
        result,
        building_orders,
        upgrades,
        rewards,
        production,
        duration_seconds,
        chat,
        action_stats,
        target_type_stats,
        ability_stats,
        tracker,
        record_count: data.records.len(),
        footer: data.footer.clone(),
        actions,
    }
}

/// Convenience function to parse and process a replay from memory.
pub fn process_bytes(data: &[u8], catalogs: &Catalogs) -> Result<Log, ReplayError> {
    let raw = raw::parse_bytes(data)?;
    Ok(process(&raw, catalogs))
}

/// Convenience function to parse and process a replay file.
///
/// This also records the file name in the resulting log, which ends up in
/// the export document.
pub fn process_file<P: AsRef<Path>>(path: P, catalogs: &Catalogs) -> Result<Log, ReplayError> {
    let path = path.as_ref();
    let raw = raw::parse_file(path)?;
    let mut log = process(&raw, catalogs);
    log.set_file_name(
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned()),
    );
    Ok(log)
}
