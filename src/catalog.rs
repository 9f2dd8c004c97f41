//! Capability and structure dictionaries.
//!
//! Replays reference game content by numeric id only. The game install
//! ships a `runtime_session.json` describing every archetype of the current
//! patch; indexing it by primary id and by its secondary hash lets the
//! parser resolve ids to diagnostic names like `BarracksSpawn`.
//!
//! Both dictionaries are optional collaborators: when one is missing or an
//! id is unknown, callers fall back to the stringified id and the output
//! degrades gracefully instead of failing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Any error that can occur while loading a dictionary.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no archetypes table found")]
    MissingArchetypes,
}

/// One archetype definition from the runtime session dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archetype {
    /// Primary numeric identifier.
    pub key: u64,
    /// Secondary 32-bit hash; some replay fields reference content by hash
    /// instead of key.
    pub hash: u64,
    /// Human-readable diagnostic name.
    pub name: String,
    /// Category tag, e.g. `UnitData` or `AbilityData`.
    pub base_type: String,
}

/// Lookup table from numeric capability ids to archetype definitions.
#[derive(Debug, Clone, Default)]
pub struct AbilityCatalog {
    entries: Vec<Archetype>,
    by_key: HashMap<u64, usize>,
    by_hash: HashMap<u64, usize>,
}

impl AbilityCatalog {
    /// Load the catalog from a runtime session JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<AbilityCatalog, CatalogError> {
        let text = fs::read_to_string(path)?;
        AbilityCatalog::from_json_str(&text)
    }

    /// Load the catalog from JSON text.
    ///
    /// A UTF-8 byte-order mark is tolerated, since the game writes one.
    pub fn from_json_str(text: &str) -> Result<AbilityCatalog, CatalogError> {
        let root: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
        let archetypes = root
            .get("archetypes")
            .and_then(Value::as_object)
            .ok_or(CatalogError::MissingArchetypes)?;

        let mut catalog = AbilityCatalog::default();
        for (key, value) in archetypes {
            let Ok(key) = key.parse::<u64>() else {
                continue;
            };
            // Each entry is a two-element array [hash, info]; anything else
            // is schema drift and gets skipped.
            let Some(items) = value.as_array() else {
                continue;
            };
            if items.len() < 2 {
                continue;
            }
            let Some(info) = items[1].as_object() else {
                continue;
            };
            let name = info
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_owned();
            let base_type = info
                .get("__base_type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_owned();
            let hash = items[0].as_u64().unwrap_or(0);

            let index = catalog.entries.len();
            catalog.entries.push(Archetype {
                key,
                hash,
                name,
                base_type,
            });
            catalog.by_key.insert(key, index);
            if items[0].is_u64() {
                catalog.by_hash.insert(hash, index);
            }
        }
        debug!(entries = catalog.entries.len(), "loaded ability catalog");
        Ok(catalog)
    }

    /// Number of archetypes in the catalog.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an archetype by primary id, falling back to the hash index.
    pub fn get(&self, id: u64) -> Option<&Archetype> {
        self.by_key
            .get(&id)
            .or_else(|| self.by_hash.get(&id))
            .map(|&index| &self.entries[index])
    }

    /// The name for an id, or the stringified id if unknown.
    pub fn name(&self, id: u64) -> String {
        match self.get(id) {
            Some(archetype) => archetype.name.clone(),
            None => id.to_string(),
        }
    }

    /// `(name, base_type)` for an id, with stringified-id/`unknown`
    /// fallbacks.
    pub fn full(&self, id: u64) -> (String, String) {
        match self.get(id) {
            Some(archetype) => (archetype.name.clone(), archetype.base_type.clone()),
            None => (id.to_string(), "unknown".to_owned()),
        }
    }
}

/// Lookup table of the numeric ids that denote placeable structures.
///
/// Used to separate build-order events from combat commands that also carry
/// a build-type field.
#[derive(Debug, Clone, Default)]
pub struct StructureCatalog {
    by_id: HashMap<u64, String>,
}

impl StructureCatalog {
    /// Load the structure table from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<StructureCatalog, CatalogError> {
        let text = fs::read_to_string(path)?;
        StructureCatalog::from_json_str(&text)
    }

    /// Load the structure table from JSON text.
    pub fn from_json_str(text: &str) -> Result<StructureCatalog, CatalogError> {
        let root: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
        let mut by_id = HashMap::new();
        if let Some(object) = root.as_object() {
            for (key, value) in object {
                let Ok(key) = key.parse::<u64>() else {
                    continue;
                };
                let Some(name) = value.get("id").and_then(Value::as_str) else {
                    continue;
                };
                by_id.insert(key, name.to_owned());
            }
        }
        Ok(StructureCatalog { by_id })
    }

    /// Number of known structure ids.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Whether the id denotes a placeable structure.
    pub fn contains(&self, id: u64) -> bool {
        self.by_id.contains_key(&id)
    }

    /// The structure name for an id.
    pub fn name(&self, id: u64) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }
}
