//! Per-entity activity tracking.
//!
//! Commands reference entities (units and buildings) only by an opaque
//! target id. By indexing every command by its target and accumulating
//! histograms of the capabilities observed *on* and *cast by* each entity,
//! the tracker can infer what each id most likely is and who owns it.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use getset::{CopyGetters, Getters};

use crate::event::Action;
use crate::gamedata::{self, Structure, WorkerClass};

/// The inferred type of a tracked entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntityKind {
    /// A placeable structure.
    Structure(Structure),
    /// A faction worker.
    Worker(WorkerClass),
    /// Mostly used with the generic attack capability.
    CombatUnit,
    /// Nothing conclusive observed.
    Unknown,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            EntityKind::Structure(structure) => structure.fmt(f),
            EntityKind::Worker(worker) => worker.fmt(f),
            EntityKind::CombatUnit => write!(f, "CombatUnit"),
            EntityKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Accumulated activity for one target id.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct Entity {
    /// The entity's target id.
    #[get_copy = "pub"]
    id: u64,
    /// Earliest frame at which the entity was referenced.
    #[get_copy = "pub"]
    first_seen: Option<u64>,
    /// Latest frame at which the entity was referenced.
    #[get_copy = "pub"]
    last_seen: Option<u64>,
    /// Number of actions referencing the entity.
    #[get_copy = "pub"]
    action_count: u64,
    /// Touch count per actor.
    #[get = "pub"]
    actors: BTreeMap<u64, u64>,
    /// Capabilities used *on* this entity, by name.
    #[get = "pub"]
    used_on: BTreeMap<String, u64>,
    /// Capabilities cast *by* this entity, by name.
    #[get = "pub"]
    cast_by: BTreeMap<String, u64>,
    /// The inferred entity type.
    #[get_copy = "pub"]
    kind: EntityKind,
    /// The inferred owner, set by [`EntityTracker::infer_owners`].
    #[get_copy = "pub"]
    owner: Option<u64>,
}

impl Entity {
    fn new(id: u64) -> Entity {
        Entity {
            id,
            first_seen: None,
            last_seen: None,
            action_count: 0,
            actors: BTreeMap::new(),
            used_on: BTreeMap::new(),
            cast_by: BTreeMap::new(),
            kind: EntityKind::Unknown,
            owner: None,
        }
    }

    /// Re-derive the entity type from the capability histograms.
    ///
    /// First match wins: spawn indicator, morph indicator, construct
    /// indicator, then the attack-usage majority check.
    fn infer_kind(&self) -> EntityKind {
        for name in self.used_on.keys() {
            if let Some(structure) = gamedata::spawn_structure(name) {
                return EntityKind::Structure(structure);
            }
            if let Some(structure) = gamedata::morph_structure(name) {
                return EntityKind::Structure(structure);
            }
        }
        for name in self.cast_by.keys() {
            if let Some(structure) = gamedata::spawn_structure(name) {
                return EntityKind::Structure(structure);
            }
            if let Some(worker) = gamedata::construct_worker(name) {
                return EntityKind::Worker(worker);
            }
        }
        let attacks = self
            .used_on
            .get(gamedata::ATTACK_CAPABILITY)
            .copied()
            .unwrap_or(0);
        if attacks * 2 > self.action_count {
            return EntityKind::CombatUnit;
        }
        EntityKind::Unknown
    }
}

/// Indexes actions by target id and accumulates per-entity state.
#[derive(Debug, Default)]
pub struct EntityTracker {
    entities: BTreeMap<u64, Entity>,
}

impl EntityTracker {
    pub fn new() -> EntityTracker {
        EntityTracker::default()
    }

    /// Record one action against its target entity, if it has one.
    pub fn record(&mut self, action: &Action) {
        let target = match action.target() {
            Some(target) => target,
            None => return,
        };
        let target_id = match target.id {
            Some(id) => id,
            None => return,
        };

        let entity = self
            .entities
            .entry(target_id)
            .or_insert_with(|| Entity::new(target_id));

        if let Some(frame) = action.frame {
            entity.first_seen = Some(entity.first_seen.map_or(frame, |f| f.min(frame)));
            entity.last_seen = Some(entity.last_seen.map_or(frame, |f| f.max(frame)));
        }
        entity.action_count += 1;

        if let Some(actor) = action.actor {
            *entity.actors.entry(actor).or_insert(0) += 1;
        }

        if let Some(type_id) = target.type_id {
            let name = target
                .type_name
                .clone()
                .unwrap_or_else(|| type_id.to_string());
            *entity.used_on.entry(name).or_insert(0) += 1;
        }
        if let Some(ability) = action.ability() {
            *entity.cast_by.entry(ability.display_name()).or_insert(0) += 1;
        }

        entity.kind = entity.infer_kind();
    }

    /// Assign every entity to the actor that touched it most.
    ///
    /// Ties break towards the lowest slot number.
    pub fn infer_owners(&mut self) {
        for entity in self.entities.values_mut() {
            entity.owner = entity
                .actors
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                .map(|(&id, _)| id);
        }
    }

    /// All tracked entities, keyed by target id.
    pub fn entities(&self) -> &BTreeMap<u64, Entity> {
        &self.entities
    }

    /// Entities ordered by activity, busiest first.
    pub fn by_activity(&self) -> Vec<&Entity> {
        let mut entities: Vec<&Entity> = self.entities.values().collect();
        entities.sort_by(|a, b| b.action_count.cmp(&a.action_count).then(a.id.cmp(&b.id)));
        entities
    }
}
