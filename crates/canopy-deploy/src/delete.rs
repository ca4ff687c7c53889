//! The delete path.
//!
//! Given `(apiType, name)` pointers from a parsed delete file, asks the
//! tenant client of every selected environment to remove the named
//! configurations. Errors are collected per environment and summarised; the
//! caller maps a non-zero count to a non-zero exit.

use canopy_client::{ClientError, TenantClient};
use canopy_types::{ApiRegistry, EnvironmentDefinition};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// One configuration to delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePointer {
    /// API the configuration belongs to
    pub api_id: String,
    /// Name of the configuration on the tenant
    pub name: String,
}

/// Errors produced by the delete path
#[derive(Debug, Error)]
pub enum DeleteError {
    /// The delete file could not be parsed
    #[error("failed to parse delete file: {0}")]
    ParseFile(String),

    /// An entry did not have the `api-type/name` shape
    #[error("invalid delete entry `{entry}`, expected `api-type/name`")]
    InvalidEntry {
        /// The offending entry
        entry: String,
    },

    /// An entry names an API the registry does not know
    #[error("unknown api `{api}` in delete entry")]
    UnknownApi {
        /// The unknown API identifier
        api: String,
    },

    /// A client for an environment could not be created
    #[error("could not create client for environment `{environment}`: {source}")]
    ClientSetup {
        /// The environment the client was meant for
        environment: String,
        /// Why creation failed
        #[source]
        source: ClientError,
    },

    /// The tenant refused or failed a deletion
    #[error("failed to delete `{api}/{name}` from environment `{environment}`: {source}")]
    Delete {
        /// Environment the deletion targeted
        environment: String,
        /// API of the configuration
        api: String,
        /// Name of the configuration
        name: String,
        /// Why deletion failed
        #[source]
        source: ClientError,
    },
}

/// Serde model of a delete file: a single `delete` list of
/// `api-type/name` entries.
#[derive(Debug, Deserialize)]
struct DeleteFile {
    delete: Vec<String>,
}

/// Parse the body of a delete file into pointers.
///
/// Collects every problem instead of stopping at the first, so the operator
/// sees all malformed entries in one pass.
pub fn parse_delete_file(
    content: &str,
    apis: &ApiRegistry,
) -> Result<Vec<DeletePointer>, Vec<DeleteError>> {
    let file: DeleteFile = serde_yaml::from_str(content)
        .map_err(|e| vec![DeleteError::ParseFile(e.to_string())])?;

    let mut pointers = Vec::with_capacity(file.delete.len());
    let mut errors = Vec::new();

    for entry in &file.delete {
        match parse_delete_entry(entry, apis) {
            Ok(pointer) => pointers.push(pointer),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(pointers)
    } else {
        Err(errors)
    }
}

fn parse_delete_entry(entry: &str, apis: &ApiRegistry) -> Result<DeletePointer, DeleteError> {
    let Some((api_id, name)) = entry.split_once('/') else {
        return Err(DeleteError::InvalidEntry {
            entry: entry.to_string(),
        });
    };
    if api_id.is_empty() || name.is_empty() {
        return Err(DeleteError::InvalidEntry {
            entry: entry.to_string(),
        });
    }
    if !apis.contains(api_id) {
        return Err(DeleteError::UnknownApi {
            api: api_id.to_string(),
        });
    }
    Ok(DeletePointer {
        api_id: api_id.to_string(),
        name: name.to_string(),
    })
}

/// Delete the pointed-at configurations from one tenant
pub async fn delete_configs(
    client: &dyn TenantClient,
    environment: &str,
    apis: &ApiRegistry,
    pointers: &[DeletePointer],
) -> Vec<DeleteError> {
    let mut errors = Vec::new();

    for pointer in pointers {
        let Some(api) = apis.get(&pointer.api_id) else {
            errors.push(DeleteError::UnknownApi {
                api: pointer.api_id.clone(),
            });
            continue;
        };

        info!(%environment, api = %api.id, name = %pointer.name, "Deleting configuration");
        if let Err(e) = client.delete_by_name(api, &pointer.name).await {
            errors.push(DeleteError::Delete {
                environment: environment.to_string(),
                api: api.id.clone(),
                name: pointer.name.clone(),
                source: e,
            });
        }
    }

    errors
}

/// Delete the pointed-at configurations from every selected environment.
///
/// One client is created per environment; a client that cannot be created
/// fails that environment but not its siblings. All errors are logged and
/// returned.
pub async fn delete_for_environments<F>(
    environments: &[EnvironmentDefinition],
    apis: &ApiRegistry,
    pointers: &[DeletePointer],
    make_client: F,
) -> Vec<DeleteError>
where
    F: Fn(&EnvironmentDefinition) -> Result<Arc<dyn TenantClient>, ClientError>,
{
    let mut errors = Vec::new();

    for environment in environments {
        info!(environment = %environment.name, "Deleting configurations for environment");

        let client = match make_client(environment) {
            Ok(client) => client,
            Err(e) => {
                errors.push(DeleteError::ClientSetup {
                    environment: environment.name.clone(),
                    source: e,
                });
                continue;
            }
        };

        errors.extend(delete_configs(client.as_ref(), &environment.name, apis, pointers).await);
    }

    for e in &errors {
        error!(error = %e, "Deletion error");
    }
    errors
}
