//! Resolved deployment results.

use crate::coordinate::Coordinate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Resolved parameter values of one configuration, keyed by property name.
pub type Properties = HashMap<String, Value>;

/// Result of deploying a single configuration.
///
/// After a successful upsert the properties always contain `id` and `name`
/// as reported by the tenant. A skipped configuration is recorded with empty
/// properties so that later references to it can be rejected explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    /// Coordinate of the deployed configuration
    pub coordinate: Coordinate,

    /// Human-readable name of the tenant-side entity
    pub entity_name: String,

    /// Resolved properties, including tenant-assigned `id` and `name`
    pub properties: Properties,

    /// Whether deployment of this configuration was skipped
    pub skip: bool,
}

impl ResolvedEntity {
    /// Create the record for a configuration that was skipped by its flag
    pub fn skipped(coordinate: Coordinate) -> Self {
        Self {
            entity_name: coordinate.config_id.clone(),
            coordinate,
            properties: Properties::new(),
            skip: true,
        }
    }
}
