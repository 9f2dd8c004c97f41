//! `sgreplay` is a crate aimed at making Stormgate replay files (`.SGReplay`)
//! accessible: it decodes the container, reconstructs the schema-less wire
//! format inside, and derives per-player analytics — build orders, upgrades,
//! reward picks, unit production, factions, teams and the game result.
//!
//! Replays are command streams: they record player *inputs*, not game
//! state, and their wire schema is unpublished and drifts between game
//! patches. Everything above the container layer is therefore best-effort.
//! A file either fails outright (truncated header, broken deflate stream)
//! or produces a complete [`Log`] in which individual aspects may be empty
//! or `unknown`.
//!
//! # Quick start
//!
//! ```no_run
//! # fn main() -> Result<(), sgreplay::ReplayError> {
//! use sgreplay::Catalogs;
//!
//! let log = sgreplay::process_file("game.SGReplay", &Catalogs::default())?;
//! for (slot, name) in log.players() {
//!     println!("Slot {}: {}", slot, name);
//! }
//! println!("Duration: {:.0}s", log.duration_seconds());
//! # Ok(()) }
//! ```
//!
//! Passing a capability dictionary (the game's `runtime_session.json`)
//! through [`Catalogs`] upgrades opaque numeric ids to diagnostic names and
//! unlocks the name-based analyzers (upgrades, rewards, factions, entity
//! type inference):
//!
//! ```no_run
//! # fn main() -> Result<(), sgreplay::ReplayError> {
//! use sgreplay::{catalog::AbilityCatalog, Catalogs};
//!
//! let catalogs = Catalogs {
//!     abilities: Some(AbilityCatalog::from_path("runtime_session.json")?),
//!     structures: None,
//! };
//! let log = sgreplay::process_file("game.SGReplay", &catalogs)?;
//! # Ok(()) }
//! ```
//!
//! # Layers
//!
//! * [`raw`] — the container: header, gzip envelope, record stream, footer.
//! * [`wire`] — the schema-less message-tree decoder.
//! * [`event`] — projection of records into [`Action`]s.
//! * [`analyzers`] — the semantic layer deriving the per-player analytics.
//! * [`export`] — the JSON document for downstream consumers.

use thiserror::Error;

pub mod analyzers;
pub mod catalog;
pub mod event;
pub mod export;
pub mod gamedata;
mod processing;
pub mod raw;
pub mod tracker;
pub mod wire;

pub use analyzers::{ChatMessage, GameResult, PlayerOutcome};
pub use event::{Action, ActionKind, CapabilityRef, TargetRef, WorldPos};
pub use gamedata::Faction;
pub use processing::{process, process_bytes, process_file, Catalogs, Log};

/// Any error that can occur during parsing or dictionary loading.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The file container could not be parsed.
    #[error("parsing error: {0}")]
    Parse(#[from] raw::ParseError),
    /// A dictionary failed to load.
    #[error("dictionary error: {0}")]
    Catalog(#[from] catalog::CatalogError),
}
