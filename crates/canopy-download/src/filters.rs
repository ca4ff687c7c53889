//! Per-schema download filters.
//!
//! Some tenant objects need special treatment on download and are skipped:
//! they are either provided by the platform itself or cannot be redeployed.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Decision function over a parsed object value; `Some(reason)` discards
pub type DiscardFn = fn(&Map<String, Value>) -> Option<String>;

/// Discard rule for the objects of one schema
#[derive(Debug, Clone, Copy)]
pub struct SettingsFilter {
    /// Inspects the parsed object value
    pub should_discard: DiscardFn,
}

impl SettingsFilter {
    /// Evaluate the rule, returning the discard flag and its reason
    pub fn evaluate(&self, value: &Map<String, Value>) -> (bool, String) {
        match (self.should_discard)(value) {
            Some(reason) => (true, reason),
            None => (false, String::new()),
        }
    }
}

/// Schema-keyed filter table
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: HashMap<String, SettingsFilter>,
}

impl FilterSet {
    /// A set that discards nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// The default rules: preset dashboards and private synthetic locations
    /// are discarded
    pub fn standard() -> Self {
        let mut set = Self::default();
        set.insert(
            "builtin:dashboards",
            SettingsFilter {
                should_discard: discard_preset_dashboards,
            },
        );
        set.insert(
            "builtin:synthetic.locations",
            SettingsFilter {
                should_discard: discard_private_locations,
            },
        );
        set
    }

    /// Add or replace the rule for one schema
    pub fn insert(&mut self, schema_id: &str, filter: SettingsFilter) {
        self.filters.insert(schema_id.to_string(), filter);
    }

    /// Rule for one schema, if any
    pub fn get(&self, schema_id: &str) -> Option<&SettingsFilter> {
        self.filters.get(schema_id)
    }
}

fn discard_preset_dashboards(value: &Map<String, Value>) -> Option<String> {
    let preset = value
        .get("dashboardMetadata")
        .and_then(|metadata| metadata.get("preset"))
        .or_else(|| value.get("preset"));
    if preset == Some(&Value::Bool(true)) {
        Some("preset dashboards are provided by the platform".to_string())
    } else {
        None
    }
}

fn discard_private_locations(value: &Map<String, Value>) -> Option<String> {
    if value.get("type") == Some(&Value::String("PRIVATE".to_string())) {
        Some("private synthetic locations cannot be redeployed".to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("test value is an object")
    }

    #[test]
    fn test_preset_dashboards_are_discarded() {
        let filters = FilterSet::standard();
        let filter = filters.get("builtin:dashboards").unwrap();

        let (discard, reason) =
            filter.evaluate(&object(json!({"dashboardMetadata": {"preset": true}})));
        assert!(discard);
        assert!(!reason.is_empty());

        let (discard, _) =
            filter.evaluate(&object(json!({"dashboardMetadata": {"preset": false}})));
        assert!(!discard);

        let (discard, _) = filter.evaluate(&object(json!({"preset": true})));
        assert!(discard);
    }

    #[test]
    fn test_private_synthetic_locations_are_discarded() {
        let filters = FilterSet::standard();
        let filter = filters.get("builtin:synthetic.locations").unwrap();

        let (discard, _) = filter.evaluate(&object(json!({"type": "PRIVATE"})));
        assert!(discard);

        let (discard, _) = filter.evaluate(&object(json!({"type": "PUBLIC"})));
        assert!(!discard);
    }

    #[test]
    fn test_unknown_schema_has_no_rule() {
        assert!(FilterSet::standard().get("builtin:unheard.of").is_none());
        assert!(FilterSet::none().get("builtin:dashboards").is_none());
    }
}
