//! Semantic analyzers over the projected action stream.
//!
//! Each analyzer consumes the flat list of [`Action`][crate::Action]s (and,
//! where needed, the raw records and footer) and derives one aspect of the
//! game: who played, what they built and researched, who won, how long the
//! game ran. Analyzers are independent of each other and all of them are
//! best-effort — missing evidence degrades the respective output to empty
//! maps or `unknown` labels, never to an error.
//!
//! The implementations are split across submodules:
//! * [`players`] for player identification, factions, map name and chat.
//! * [`build`] for build orders, including inferred early structures.
//! * [`timeline`] for upgrades, stormgate rewards and unit production.
//! * [`outcome`] for team assignment, the game verdict and duration.

pub mod build;
pub mod helpers;
pub mod outcome;
pub mod players;
pub mod timeline;

pub use build::{build_orders, BuildEvent};
pub use helpers::{frame_to_seconds, frame_to_time};
pub use outcome::{duration_seconds, game_result, teams, winner_slot, GameResult, PlayerOutcome};
pub use players::{chat, detect_factions, identify_players, map_name, ChatMessage};
pub use timeline::{
    production, rewards, upgrades, ProductionEvent, ProductionSummary, RewardEvent, UpgradeEvent,
};
