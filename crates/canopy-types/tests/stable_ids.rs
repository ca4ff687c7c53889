//! Property tests: stable identifiers must be pure and bounded.
//!
//! Deterministic ids are what make reruns idempotent; the external id length
//! bound is what tenants enforce on reconciliation.

use canopy_types::ids::{external_id, stable_uuid, uuid_from_name};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Schema-shaped identifiers, including the `builtin:` prefix family.
fn arb_schema() -> impl Strategy<Value = String> {
    "(builtin:)?[a-z][a-z.-]{0,40}"
}

/// Arbitrary printable identifiers, long enough to force truncation sometimes.
fn arb_identifier() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[ -~]{0,600}").expect("valid regex")
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

proptest! {
    /// The external id always carries the prefix and never exceeds 500 chars.
    #[test]
    fn external_id_is_bounded(schema in arb_schema(), id in arb_identifier()) {
        let external = external_id(&schema, &id);
        prop_assert!(external.starts_with("monaco:"));
        prop_assert!(external.len() <= 500);
    }

    /// The external id is a pure function of its inputs.
    #[test]
    fn external_id_is_pure(schema in arb_schema(), id in arb_identifier()) {
        prop_assert_eq!(external_id(&schema, &id), external_id(&schema, &id));
    }

    /// Stable UUIDs are pure and valid version-3 UUIDs.
    #[test]
    fn stable_uuid_is_pure(project in "[a-z][a-z0-9-]{0,30}", config_id in "[a-z][a-z0-9-]{0,30}") {
        let first = stable_uuid(&project, &config_id);
        let second = stable_uuid(&project, &config_id);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first.get_version_num(), 3);
    }

    /// Distinct names yield distinct UUIDs in practice.
    #[test]
    fn uuid_from_name_separates_names(a in "[a-z0-9-]{1,30}", b in "[a-z0-9-]{1,30}") {
        prop_assume!(a != b);
        prop_assert_ne!(uuid_from_name(&a), uuid_from_name(&b));
    }
}
