//! Deployment manifest model.
//!
//! The manifest names the tenants configuration is applied to. Loading the
//! file from disk is the caller's concern; this module only models the
//! parsed document and the environment selection used by the delete and
//! deploy entry points.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Manifest errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// An environment name filter did not match any environment
    #[error("no environment named `{name}` in manifest")]
    UnknownEnvironment {
        /// The unmatched name
        name: String,
    },

    /// The token variable for an environment is not set
    #[error("environment variable `{variable}` holding the token for `{environment}` is not set")]
    TokenNotSet {
        /// Environment whose token was requested
        environment: String,
        /// Name of the unset variable
        variable: String,
    },
}

/// One target tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDefinition {
    /// Environment name, unique within the manifest
    pub name: String,

    /// Optional group the environment belongs to
    #[serde(default)]
    pub group: Option<String>,

    /// Base URL of the tenant API
    pub url: String,

    /// Name of the environment variable holding the API token
    pub token: String,
}

impl EnvironmentDefinition {
    /// Read the API token from the process environment
    pub fn token_value(&self) -> Result<String, ManifestError> {
        std::env::var(&self.token).map_err(|_| ManifestError::TokenNotSet {
            environment: self.name.clone(),
            variable: self.token.clone(),
        })
    }
}

/// The parsed deployment manifest
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// All environments the manifest knows about
    pub environments: Vec<EnvironmentDefinition>,
}

impl Manifest {
    /// Environments belonging to the given group
    pub fn filter_by_group(&self, group: &str) -> Vec<EnvironmentDefinition> {
        self.environments
            .iter()
            .filter(|e| e.group.as_deref() == Some(group))
            .cloned()
            .collect()
    }

    /// Environments matching the given names, in the order of `names`.
    ///
    /// A name without a matching environment is an error.
    pub fn filter_by_names(
        &self,
        names: &[String],
    ) -> Result<Vec<EnvironmentDefinition>, ManifestError> {
        names
            .iter()
            .map(|name| {
                self.environments
                    .iter()
                    .find(|e| &e.name == name)
                    .cloned()
                    .ok_or_else(|| ManifestError::UnknownEnvironment { name: name.clone() })
            })
            .collect()
    }
}
