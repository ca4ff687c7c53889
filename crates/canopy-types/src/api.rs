//! Classic configuration API descriptors.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Capability flags of one classic configuration API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
    /// API identifier, doubles as the URL path segment
    pub id: String,

    /// Whether the API permits several configurations with the same name.
    /// Non-unique-name APIs are upserted by a stable id instead of by name.
    pub non_unique_name: bool,

    /// Identifier of the API that supersedes this one, if deprecated
    pub deprecated_by: Option<String>,
}

impl ApiDescriptor {
    /// Create a descriptor for a unique-name API
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            non_unique_name: false,
            deprecated_by: None,
        }
    }

    /// Mark the API as permitting non-unique names
    pub fn non_unique(mut self) -> Self {
        self.non_unique_name = true;
        self
    }

    /// Mark the API as deprecated in favour of a successor
    pub fn deprecated_by(mut self, successor: impl Into<String>) -> Self {
        self.deprecated_by = Some(successor.into());
        self
    }
}

/// Lookup table of known classic APIs, keyed by API identifier
#[derive(Debug, Clone, Default)]
pub struct ApiRegistry {
    apis: HashMap<String, ApiDescriptor>,
}

impl ApiRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard set of classic APIs understood by the engine
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.insert(ApiDescriptor::new("alerting-profile"));
        registry.insert(ApiDescriptor::new("auto-tag"));
        registry.insert(ApiDescriptor::new("dashboard").non_unique());
        registry.insert(ApiDescriptor::new("management-zone"));
        registry.insert(ApiDescriptor::new("notification"));
        registry.insert(ApiDescriptor::new("request-naming-service").non_unique());
        registry.insert(ApiDescriptor::new("synthetic-location"));
        registry.insert(ApiDescriptor::new("synthetic-monitor"));
        registry.insert(
            ApiDescriptor::new("anomaly-detection-metrics")
                .deprecated_by("builtin:anomaly-detection.metric-events"),
        );
        registry
    }

    /// Add or replace a descriptor
    pub fn insert(&mut self, descriptor: ApiDescriptor) {
        self.apis.insert(descriptor.id.clone(), descriptor);
    }

    /// Look up a descriptor by API identifier
    pub fn get(&self, id: &str) -> Option<&ApiDescriptor> {
        self.apis.get(id)
    }

    /// Whether the registry knows the given API identifier
    pub fn contains(&self, id: &str) -> bool {
        self.apis.contains_key(id)
    }

    /// All known API identifiers, unordered
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.apis.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_flags() {
        let registry = ApiRegistry::standard();
        assert!(registry.get("dashboard").unwrap().non_unique_name);
        assert!(!registry.get("management-zone").unwrap().non_unique_name);
        assert_eq!(
            registry
                .get("anomaly-detection-metrics")
                .unwrap()
                .deprecated_by
                .as_deref(),
            Some("builtin:anomaly-detection.metric-events")
        );
    }

    #[test]
    fn test_insert_replaces_descriptor() {
        let mut registry = ApiRegistry::new();
        registry.insert(ApiDescriptor::new("dashboard"));
        registry.insert(ApiDescriptor::new("dashboard").non_unique());
        assert!(registry.get("dashboard").unwrap().non_unique_name);
    }
}
