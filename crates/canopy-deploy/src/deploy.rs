//! The per-environment deployment loop.
//!
//! Walks configurations in sort order, resolves each one's parameters
//! against the entity map, renders the template and upserts through the
//! tenant client, threading the returned identifiers forward so later
//! configurations can reference earlier ones.

use crate::entity_map::EntityMap;
use crate::error::{DeployAction, DeployError, DeployErrorKind};
use canopy_client::{SettingsObject, TenantClient};
use canopy_types::ids;
use canopy_types::{
    ApiRegistry, ConfigType, Configuration, Properties, ResolveContext, ResolvedEntity,
    ID_PARAMETER, NAME_PARAMETER, SCOPE_PARAMETER,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Options controlling a deployment run
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployOptions {
    /// Keep going after a configuration fails, collecting all errors
    pub continue_on_error: bool,

    /// Validation run: the caller passes a dry-run client, and the loop
    /// never stops on the first error
    pub dry_run: bool,
}

/// Deploy the given configurations against one tenant.
///
/// The configurations must already be sorted (see
/// [`crate::graph::sort_configurations`]); references cannot resolve
/// otherwise. Returns every deployment error encountered; an empty vector
/// means full success. A resolved entity is recorded only for
/// configurations that succeeded or were explicitly skipped, so references
/// to a failed configuration surface as resolution errors downstream.
#[instrument(skip_all, fields(configs = sorted_configs.len(), dry_run = options.dry_run))]
pub async fn deploy_configurations(
    client: &dyn TenantClient,
    apis: &ApiRegistry,
    sorted_configs: &[Configuration],
    options: DeployOptions,
) -> Vec<DeployError> {
    let mut entity_map = EntityMap::new();
    let mut errors: Vec<DeployError> = Vec::new();
    let action = if options.dry_run {
        DeployAction::Validate
    } else {
        DeployAction::Deploy
    };

    for config in sorted_configs {
        if config.skip {
            info!(coordinate = %config.coordinate, "Skipping deployment of configuration");
            entity_map.put_resolved(ResolvedEntity::skipped(config.coordinate.clone()));
            continue;
        }

        info!(coordinate = %config.coordinate, "{} configuration", action.gerund());

        let outcome = match &config.config_type {
            ConfigType::Entities { entities_type } => {
                debug!(
                    coordinate = %config.coordinate,
                    %entities_type,
                    "Entities are read-only, nothing to deploy"
                );
                continue;
            }
            ConfigType::Settings {
                schema_id,
                schema_version,
            } => deploy_settings(client, &entity_map, config, schema_id, schema_version).await,
            ConfigType::Api { api } => deploy_classic(client, apis, &entity_map, config, api).await,
        };

        match outcome {
            Ok(entity) => entity_map.put_resolved(entity),
            Err(kinds) => {
                errors.extend(kinds.into_iter().map(|kind| DeployError {
                    coordinate: config.coordinate.clone(),
                    action,
                    kind,
                }));
                if !options.continue_on_error && !options.dry_run {
                    return errors;
                }
            }
        }
    }

    errors
}

async fn deploy_classic(
    client: &dyn TenantClient,
    apis: &ApiRegistry,
    entity_map: &EntityMap,
    config: &Configuration,
    api_id: &str,
) -> Result<ResolvedEntity, Vec<DeployErrorKind>> {
    let api = apis.get(api_id).ok_or_else(|| {
        vec![DeployErrorKind::UnknownApi {
            api: api_id.to_string(),
        }]
    })?;

    let mut properties = resolve_properties(config, entity_map)?;

    let name = extract_name(&properties).map_err(|kind| vec![kind])?;
    if !api.non_unique_name && entity_map.is_known_name(&api.id, &name) {
        return Err(vec![DeployErrorKind::DuplicateName {
            api: api.id.clone(),
            name,
        }]);
    }

    let payload = config
        .template
        .render(&properties)
        .map_err(|e| vec![e.into()])?;

    if let Some(successor) = &api.deprecated_by {
        warn!(api = %api.id, %successor, "API is deprecated, consider migrating");
    }

    let entity = if api.non_unique_name {
        let entity_id = upsert_id_for(config);
        client
            .upsert_by_non_unique_name_and_id(api, &entity_id, &name, &payload)
            .await
    } else {
        client.upsert_by_name(api, &name, &payload).await
    }
    .map_err(|e| vec![DeployErrorKind::Client(e)])?;

    properties.insert(ID_PARAMETER.to_string(), Value::String(entity.id));
    properties.insert(
        NAME_PARAMETER.to_string(),
        Value::String(entity.name.clone()),
    );

    Ok(ResolvedEntity {
        coordinate: config.coordinate.clone(),
        entity_name: entity.name,
        properties,
        skip: false,
    })
}

async fn deploy_settings(
    client: &dyn TenantClient,
    entity_map: &EntityMap,
    config: &Configuration,
    schema_id: &str,
    schema_version: &str,
) -> Result<ResolvedEntity, Vec<DeployErrorKind>> {
    let mut properties = resolve_properties(config, entity_map)?;

    let scope = extract_scope(&properties).map_err(|kind| vec![kind])?;

    let content = config
        .template
        .render(&properties)
        .map_err(|e| vec![e.into()])?;

    let entity = client
        .upsert_settings(SettingsObject {
            id: config.coordinate.config_id.clone(),
            schema_id: schema_id.to_string(),
            schema_version: schema_version.to_string(),
            scope,
            content,
            origin_object_id: config.origin_object_id.clone(),
        })
        .await
        .map_err(|e| vec![DeployErrorKind::Client(e)])?;

    properties.insert(ID_PARAMETER.to_string(), Value::String(entity.id));
    properties.insert(
        NAME_PARAMETER.to_string(),
        Value::String(entity.name.clone()),
    );

    Ok(ResolvedEntity {
        coordinate: config.coordinate.clone(),
        entity_name: entity.name,
        properties,
        skip: false,
    })
}

/// Stable upsert id for a configuration of a non-unique-name API.
///
/// A config id that already is a UUID or a monitored-entity id is used
/// verbatim; anything else derives the same UUID on every rerun.
fn upsert_id_for(config: &Configuration) -> String {
    let config_id = &config.coordinate.config_id;
    if ids::is_uuid(config_id) || ids::is_me_id(config_id) {
        config_id.clone()
    } else {
        ids::stable_uuid(&config.coordinate.project, config_id).to_string()
    }
}

/// Resolve all parameters of one configuration.
///
/// Parameters are independent of each other, so every failure is collected
/// instead of stopping at the first.
fn resolve_properties(
    config: &Configuration,
    entity_map: &EntityMap,
) -> Result<Properties, Vec<DeployErrorKind>> {
    let ctx = ResolveContext {
        entities: entity_map.resolved(),
    };
    let mut properties = Properties::with_capacity(config.parameters.len());
    let mut failures: Vec<DeployErrorKind> = Vec::new();

    for (name, parameter) in &config.parameters {
        match parameter.resolve(&ctx) {
            Ok(value) => {
                properties.insert(name.clone(), value);
            }
            Err(e) => failures.push(e.into()),
        }
    }

    if failures.is_empty() {
        Ok(properties)
    } else {
        Err(failures)
    }
}

fn extract_name(properties: &Properties) -> Result<String, DeployErrorKind> {
    match properties.get(NAME_PARAMETER) {
        Some(Value::String(name)) if !name.is_empty() => Ok(name.clone()),
        _ => Err(DeployErrorKind::MissingParameter {
            parameter: NAME_PARAMETER.to_string(),
        }),
    }
}

fn extract_scope(properties: &Properties) -> Result<String, DeployErrorKind> {
    let scope = properties
        .get(SCOPE_PARAMETER)
        .ok_or_else(|| DeployErrorKind::MissingParameter {
            parameter: SCOPE_PARAMETER.to_string(),
        })?;
    let scope = match scope {
        Value::String(scope) => scope.clone(),
        other => other.to_string(),
    };
    if scope.is_empty() {
        return Err(DeployErrorKind::EmptyScope);
    }
    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_types::Coordinate;

    #[test]
    fn test_upsert_id_uses_uuid_config_id_verbatim() {
        let config = Configuration {
            coordinate: Coordinate::new("p", "dashboard", "ed92b9cd-9c28-4a21-b3a0-b9d7b96ab2ec"),
            config_type: ConfigType::Api {
                api: "dashboard".into(),
            },
            template: canopy_types::Template::new("d", "{}"),
            parameters: Default::default(),
            skip: false,
            origin_object_id: None,
        };
        assert_eq!(
            upsert_id_for(&config),
            "ed92b9cd-9c28-4a21-b3a0-b9d7b96ab2ec"
        );
    }

    #[test]
    fn test_upsert_id_derivation_is_stable() {
        let config = Configuration {
            coordinate: Coordinate::new("p", "dashboard", "main"),
            config_type: ConfigType::Api {
                api: "dashboard".into(),
            },
            template: canopy_types::Template::new("d", "{}"),
            parameters: Default::default(),
            skip: false,
            origin_object_id: None,
        };
        let first = upsert_id_for(&config);
        assert_eq!(first, upsert_id_for(&config));
        assert_eq!(first, ids::stable_uuid("p", "main").to_string());
    }

    #[test]
    fn test_extract_name_requires_non_empty_string() {
        let mut properties = Properties::new();
        assert!(extract_name(&properties).is_err());

        properties.insert(NAME_PARAMETER.into(), Value::String(String::new()));
        assert!(extract_name(&properties).is_err());

        properties.insert(NAME_PARAMETER.into(), Value::String("Dashboard".into()));
        assert_eq!(extract_name(&properties).unwrap(), "Dashboard");
    }

    #[test]
    fn test_extract_scope_distinguishes_missing_and_empty() {
        let mut properties = Properties::new();
        assert!(matches!(
            extract_scope(&properties),
            Err(DeployErrorKind::MissingParameter { .. })
        ));

        properties.insert(SCOPE_PARAMETER.into(), Value::String(String::new()));
        assert!(matches!(
            extract_scope(&properties),
            Err(DeployErrorKind::EmptyScope)
        ));

        properties.insert(SCOPE_PARAMETER.into(), Value::String("environment".into()));
        assert_eq!(extract_scope(&properties).unwrap(), "environment");
    }
}
