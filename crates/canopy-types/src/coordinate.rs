//! Configuration identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Globally unique identity of a configuration.
///
/// Coordinates are immutable and serve as keys wherever deployed results are
/// tracked. The derived ordering is lexicographic over `(project, type, id)`
/// and is relied on for deterministic tie-breaking during sorting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    /// Project the configuration belongs to
    pub project: String,

    /// API identifier or settings schema identifier
    pub config_type: String,

    /// Identifier of the configuration within its project and type
    pub config_id: String,
}

impl Coordinate {
    /// Create a new coordinate
    pub fn new(
        project: impl Into<String>,
        config_type: impl Into<String>,
        config_id: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            config_type: config_type.into(),
            config_id: config_id.into(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.project, self.config_type, self.config_id)
    }
}
