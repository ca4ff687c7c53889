//! The configuration record.

use crate::coordinate::Coordinate;
use crate::parameter::Parameter;
use crate::template::Template;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved parameter holding the human-readable entity name
pub const NAME_PARAMETER: &str = "name";

/// Reserved parameter holding the owning entity of a settings object
pub const SCOPE_PARAMETER: &str = "scope";

/// Property under which the tenant-assigned identifier is recorded
pub const ID_PARAMETER: &str = "id";

/// Discriminates how a configuration is applied to a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigType {
    /// Classic configuration API, addressed by API identifier
    Api {
        /// API identifier, e.g. `dashboard`
        api: String,
    },

    /// Settings 2.0 object, addressed by schema and scope
    Settings {
        /// Schema identifier, e.g. `builtin:alerting.profile`
        schema_id: String,
        /// Schema version the template was written against
        schema_version: String,
    },

    /// Read-only monitored entities; never deployed
    Entities {
        /// Entity type, e.g. `HOST`
        entities_type: String,
    },
}

impl ConfigType {
    /// Whether this is a settings 2.0 object
    pub fn is_settings(&self) -> bool {
        matches!(self, Self::Settings { .. })
    }

    /// Whether this is a read-only entities type
    pub fn is_entities(&self) -> bool {
        matches!(self, Self::Entities { .. })
    }
}

/// A templated desired-state document plus its parameters.
///
/// Configurations are created by the loader and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Identity of this configuration
    pub coordinate: Coordinate,

    /// How this configuration is applied
    pub config_type: ConfigType,

    /// Template rendered into the upsert payload
    pub template: Template,

    /// Parameters supplying the template's slots, keyed by property name
    pub parameters: HashMap<String, Parameter>,

    /// Whether deployment of this configuration is skipped
    pub skip: bool,

    /// Tenant-side object id preserved across download and redeploy
    #[serde(default)]
    pub origin_object_id: Option<String>,
}

impl Configuration {
    /// All coordinates referenced by this configuration's parameters
    pub fn references(&self) -> Vec<Coordinate> {
        self.parameters
            .values()
            .flat_map(Parameter::dependencies)
            .collect()
    }
}
