//! Stable identifier derivation.
//!
//! Tenants key non-unique-name configurations by id, so reruns must derive
//! the same id for the same configuration on every host. All functions here
//! are pure.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use uuid::Uuid;

const EXTERNAL_ID_PREFIX: &str = "monaco:";
const EXTERNAL_ID_MAX_LENGTH: usize = 500;

/// External identifier used to reconcile settings 2.0 objects across runs.
///
/// Format is `monaco:<base64(schema "$" id)>`. When the encoded payload
/// exceeds the length budget its prefix is discarded, which keeps the result
/// within 500 characters but makes collisions possible for long identifiers
/// sharing a suffix.
pub fn external_id(schema_id: &str, config_id: &str) -> String {
    let encoded = STANDARD.encode(format!("{schema_id}${config_id}"));

    let budget = EXTERNAL_ID_MAX_LENGTH - EXTERNAL_ID_PREFIX.len();
    let encoded = if encoded.len() > budget {
        &encoded[encoded.len() - budget..]
    } else {
        encoded.as_str()
    };

    format!("{EXTERNAL_ID_PREFIX}{encoded}")
}

/// Deterministic UUID for a configuration without a tenant-recognised id.
///
/// A pure function of `(project, config_id)`: reruns and parallel
/// deployments of the same project derive the same upsert id everywhere.
pub fn stable_uuid(project: &str, config_id: &str) -> Uuid {
    uuid_from_name(&format!("{project}-{config_id}"))
}

/// Deterministic name-based (version 3) UUID
pub fn uuid_from_name(name: &str) -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_DNS, name.as_bytes())
}

/// Whether the candidate already is a UUID and can be used as an id verbatim
pub fn is_uuid(candidate: &str) -> bool {
    Uuid::try_parse(candidate).is_ok()
}

/// Whether the candidate is a monitored-entity id of the form `TYPE-16HEX`
pub fn is_me_id(candidate: &str) -> bool {
    let Some((kind, id)) = candidate.rsplit_once('-') else {
        return false;
    };
    let kind_valid = kind
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
        && kind
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    let id_valid =
        id.len() == 16 && id.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
    kind_valid && id_valid
}
