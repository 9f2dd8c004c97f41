//! This module contains some low-level game data, such as faction markers
//! and the capability-name tables used to assign meaning to otherwise opaque
//! ability identifiers.
//!
//! Replays reference game content almost exclusively by numeric id. The
//! tables here operate on the *diagnostic names* those ids resolve to via
//! the capability dictionary (`BarracksSpawn`, `MorphToHQTier2`, ...), which
//! have been stable across game patches even when the ids themselves were
//! not.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Actor id reserved for system/neutral events.
///
/// Events attributed to this actor are excluded from all per-player
/// roll-ups.
pub const NEUTRAL_ACTOR: u64 = 64;

/// Replay frames tick at 1024 Hz.
///
/// Older parser revisions treated frames as milliseconds; the tick
/// interpretation is the one that matches the in-game clock.
pub const FRAME_RATE_HZ: u64 = 1024;

/// The generic attack capability, observed on every combat-capable entity.
pub const ATTACK_CAPABILITY: &str = "attackData";

/// Capabilities that carry a build-type field but never place a structure.
pub const NON_BUILD_CAPABILITIES: &[&str] = &["attackData", "CloneData", "FightData"];

/// Substrings that mark an ability as research/upgrade.
pub const UPGRADE_KEYWORDS: &[&str] = &["Research", "Upgrade", "MorphTo", "Tier2", "Tier3"];

/// Prefix of every stormgate-reward ability.
pub const REWARD_PREFIX: &str = "StormgateAbility";

/// Prefix of the reward abilities that create a reward unit.
pub const REWARD_CREATE_PREFIX: &str = "StormgateAbilityCreate";

/// Dictionary base types that describe placeable structures.
///
/// Used to filter build-order candidates when no structure dictionary is
/// available and the command carries no placement coordinates.
pub const STRUCTURE_BASE_TYPES: &[&str] = &["UnitData", "ResourceGeneratorData"];

/// Error for when converting a string to a faction fails.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Error)]
#[error("Invalid faction identifier: {0}")]
pub struct ParseFactionError(String);

/// The three playable factions.
///
/// `Unknown` is included so that actors without any faction-identifying
/// activity still get a stable label; this makes downstream aggregation
/// easier, the same way the raw combat enums in similar parsers carry a
/// `None` variant.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize)]
pub enum Faction {
    Vanguard,
    Celestial,
    Infernal,
    Unknown,
}

const VANGUARD_MARKERS: &[&str] = &[
    "Barracks",
    "HQ",
    "MunitionsFactory",
    "Habitat",
    "Lancer",
    "Exo",
    "Vulcan",
    "MedTech",
];

const CELESTIAL_MARKERS: &[&str] = &[
    "Arcship",
    "CreationChamber",
    "CollectionArray",
    "PowerBank",
    "Celestial",
    "Argent",
    "Kri",
    "Vector",
];

const INFERNAL_MARKERS: &[&str] = &[
    "Shrine",
    "Conclave",
    "IronVault",
    "Hellforge",
    "Imp",
    "Brute",
    "Fiend",
    "Gaunt",
];

impl Faction {
    /// Capability-name substrings that identify this faction.
    ///
    /// The three lists are disjoint; an actor is assigned the faction of the
    /// first marker found in any of its capability names.
    pub fn markers(self) -> &'static [&'static str] {
        match self {
            Faction::Vanguard => VANGUARD_MARKERS,
            Faction::Celestial => CELESTIAL_MARKERS,
            Faction::Infernal => INFERNAL_MARKERS,
            Faction::Unknown => &[],
        }
    }

    /// Detect a faction from a capability name, if the name carries a
    /// marker.
    pub fn detect(name: &str) -> Option<Faction> {
        for faction in [Faction::Vanguard, Faction::Celestial, Faction::Infernal] {
            if faction.markers().iter().any(|marker| name.contains(marker)) {
                return Some(faction);
            }
        }
        None
    }

    /// The structure every player of this faction starts the game with.
    ///
    /// The starting structure is never synthesized as an inferred build,
    /// since its existence proves nothing about the player's choices.
    pub fn starting_structure(self) -> Option<Structure> {
        match self {
            Faction::Vanguard => Some(Structure::Hq),
            Faction::Celestial => Some(Structure::Arcship),
            Faction::Infernal => Some(Structure::Shrine),
            Faction::Unknown => None,
        }
    }
}

impl FromStr for Faction {
    type Err = ParseFactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.to_lowercase() as &str {
            "vanguard" => Ok(Faction::Vanguard),
            "celestial" => Ok(Faction::Celestial),
            "infernal" => Ok(Faction::Infernal),
            "unknown" => Ok(Faction::Unknown),

            _ => Err(ParseFactionError(s.to_owned())),
        }
    }
}

impl Display for Faction {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match *self {
            Faction::Vanguard => "Vanguard",
            Faction::Celestial => "Celestial",
            Faction::Infernal => "Infernal",
            Faction::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// The structures that entity inference can identify.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Structure {
    Hq,
    Barracks,
    Shrine,
    Conclave,
    IronVault,
    CreationChamber,
    Arcship,
}

impl Structure {
    /// The faction this structure belongs to.
    pub fn faction(self) -> Faction {
        match self {
            Structure::Hq | Structure::Barracks => Faction::Vanguard,
            Structure::Shrine | Structure::Conclave | Structure::IronVault => Faction::Infernal,
            Structure::CreationChamber | Structure::Arcship => Faction::Celestial,
        }
    }
}

impl Display for Structure {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match *self {
            Structure::Hq => "HQ",
            Structure::Barracks => "Barracks",
            Structure::Shrine => "Shrine",
            Structure::Conclave => "Conclave",
            Structure::IronVault => "IronVault",
            Structure::CreationChamber => "CreationChamber",
            Structure::Arcship => "Arcship",
        };
        write!(f, "{}", name)
    }
}

/// The worker class of each faction.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize)]
pub enum WorkerClass {
    /// The Vanguard construction bot.
    Bob,
    /// The Infernal worker.
    Imp,
    /// The Celestial builder.
    Architect,
}

impl Display for WorkerClass {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match *self {
            WorkerClass::Bob => "Worker",
            WorkerClass::Imp => "Imp",
            WorkerClass::Architect => "Architect",
        };
        write!(f, "{}", name)
    }
}

/// Structure implied by a spawn capability.
///
/// A `BarracksSpawn` command can only be issued at a Barracks, so observing
/// the capability proves the structure exists.
pub fn spawn_structure(name: &str) -> Option<Structure> {
    match name {
        "HQSpawn" => Some(Structure::Hq),
        "Shrine_Spawn" => Some(Structure::Shrine),
        "BarracksSpawn" => Some(Structure::Barracks),
        "IronVault_Spawn" => Some(Structure::IronVault),
        "CreationChamber_Spawn" => Some(Structure::CreationChamber),
        "Arcship_Spawn" => Some(Structure::Arcship),
        "Conclave_Spawn" => Some(Structure::Conclave),
        _ => None,
    }
}

/// Structure implied by a morph/tier-up capability.
pub fn morph_structure(name: &str) -> Option<Structure> {
    match name {
        "ArcshipTier1Land" | "ArcshipTier1Liftoff" | "MorphToArcshipTier2"
        | "MorphToArcshipTier3" => Some(Structure::Arcship),
        "MorphToHQTier2" => Some(Structure::Hq),
        "MorphToGreaterShrine" => Some(Structure::Shrine),
        _ => None,
    }
}

/// Worker class implied by a construct capability.
pub fn construct_worker(name: &str) -> Option<WorkerClass> {
    match name {
        "WorkerConstructAbilityData" => Some(WorkerClass::Bob),
        "Imp_Construct" => Some(WorkerClass::Imp),
        "Celestial_Construct" => Some(WorkerClass::Architect),
        _ => None,
    }
}

/// Friendly name for a research/upgrade capability, when one is known.
pub fn upgrade_friendly_name(name: &str) -> Option<&'static str> {
    match name {
        "MorphToGreaterShrine" => Some("Upgrade to Greater Shrine"),
        "MorphToElderShrine" => Some("Upgrade to Elder Shrine"),
        "MorphToHQTier2" => Some("Upgrade to HQ Tier 2"),
        "MorphToHQTier3" => Some("Upgrade to HQ Tier 3"),
        "Hellforge_Research" => Some("Hellforge Research"),
        "MunitionsFactoryResearch" => Some("Munitions Factory Research"),
        "ResearchLabResearch" => Some("Research Lab Research"),
        _ => None,
    }
}

/// Friendly name for a stormgate reward, when one is known.
pub fn reward_friendly_name(name: &str) -> Option<&'static str> {
    match name {
        "StormgateAbilityCreateTier1Healer" => Some("Tier 1: Healer"),
        "StormgateAbilityCreateTier1Ooze" => Some("Tier 1: Ooze"),
        "StormgateAbilityCreateTier1Frost" => Some("Tier 1: Frost"),
        "StormgateAbilityCreateTier2Exploder" => Some("Tier 2: Exploder"),
        "StormgateAbilityCreateTier2Fortress" => Some("Tier 2: Fortress"),
        "StormgateAbilityCreateTier2Wisp" => Some("Tier 2: Wisp"),
        "StormgateAbilityCreateTier3ShadowDemon" => Some("Tier 3: Shadow Demon"),
        "StormgateAbilityCreateTier3Quake" => Some("Tier 3: Quake"),
        _ => None,
    }
}

/// Friendly name of the building a spawn capability is issued from.
///
/// Falls back to stripping the `Spawn` suffix conventions when the
/// capability is not one of the known indicators.
pub fn spawn_source_building(name: &str) -> String {
    if let Some(structure) = spawn_structure(name) {
        return structure.to_string();
    }
    for suffix in ["_Spawn", "Spawn"] {
        if let Some(stripped) = name.strip_suffix(suffix) {
            if !stripped.is_empty() {
                return stripped.to_owned();
            }
        }
    }
    name.to_owned()
}
