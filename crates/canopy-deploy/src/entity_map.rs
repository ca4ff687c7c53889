//! Per-run table of deployed results.

use canopy_types::{Coordinate, ResolvedEntity};
use std::collections::{HashMap, HashSet};

/// Append-only table built during a single environment's deployment.
///
/// Maps every processed coordinate to its resolved entity, and tracks the
/// names already used per API type so duplicate names on unique-name APIs
/// are caught before the upsert.
#[derive(Debug, Default)]
pub struct EntityMap {
    resolved: HashMap<Coordinate, ResolvedEntity>,
    known_names: HashMap<String, HashSet<String>>,
}

impl EntityMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of one configuration.
    ///
    /// Entities with a name also register it under their coordinate's type.
    pub fn put_resolved(&mut self, entity: ResolvedEntity) {
        if !entity.entity_name.is_empty() {
            self.known_names
                .entry(entity.coordinate.config_type.clone())
                .or_default()
                .insert(entity.entity_name.clone());
        }
        self.resolved.insert(entity.coordinate.clone(), entity);
    }

    /// The full table of resolved entities, for parameter resolution
    pub fn resolved(&self) -> &HashMap<Coordinate, ResolvedEntity> {
        &self.resolved
    }

    /// Look up the result of one coordinate
    pub fn get(&self, coordinate: &Coordinate) -> Option<&ResolvedEntity> {
        self.resolved.get(coordinate)
    }

    /// Whether a name was already produced for the given API type
    pub fn is_known_name(&self, api_id: &str, name: &str) -> bool {
        self.known_names
            .get(api_id)
            .is_some_and(|names| names.contains(name))
    }
}
