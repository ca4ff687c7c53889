//! Typed configuration parameters.
//!
//! A parameter supplies one slot of a configuration's template. The variants
//! form a closed sum type: each knows which coordinates it depends on and how
//! to resolve itself against the entities deployed so far.

use crate::coordinate::Coordinate;
use crate::entity::{Properties, ResolvedEntity};
use crate::template::{self, RenderError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Errors produced while resolving a parameter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// An environment variable reference had no value and no default
    #[error("environment variable `{name}` is not set and no default was given")]
    UnsetEnvironmentVariable {
        /// Name of the missing variable
        name: String,
    },

    /// A reference points at a coordinate that has not been deployed.
    ///
    /// With correctly sorted configurations this indicates a reference to a
    /// configuration that failed to deploy, or a sorting bug.
    #[error("referenced configuration {coordinate} has not been deployed")]
    UnresolvedReference {
        /// The missing coordinate
        coordinate: Coordinate,
    },

    /// A reference points through a configuration that was skipped
    #[error("cannot resolve property `{property}` of {coordinate}: deployment was skipped")]
    SkippedReference {
        /// The skipped coordinate
        coordinate: Coordinate,
        /// The property that was requested
        property: String,
    },

    /// The referenced entity exists but does not expose the property
    #[error("referenced configuration {coordinate} has no property `{property}`")]
    MissingProperty {
        /// The resolved coordinate
        coordinate: Coordinate,
        /// The property that was requested
        property: String,
    },

    /// A compound parameter's format string could not be rendered
    #[error("compound parameter: {0}")]
    CompoundFormat(#[from] RenderError),
}

/// Entities visible to parameter resolution.
///
/// Holds the table of configurations deployed earlier in the current run;
/// the deployment engine owns the table and lends it out per configuration.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Entities deployed so far, keyed by coordinate
    pub entities: &'a HashMap<Coordinate, ResolvedEntity>,
}

/// A typed value supplying one slot of a configuration template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Parameter {
    /// Literal value used verbatim
    Value {
        /// The literal value
        value: Value,
    },

    /// Value read from the process environment
    Environment {
        /// Name of the environment variable
        name: String,
        /// Fallback when the variable is unset
        #[serde(default)]
        default: Option<String>,
    },

    /// Property of another configuration's deployment result
    Reference {
        /// Coordinate of the referenced configuration
        coordinate: Coordinate,
        /// Property produced by its deployment, such as `id` or `name`
        property: String,
    },

    /// Format string built from recursively resolved named parts
    Compound {
        /// Format string with `{{ part }}` slots
        format: String,
        /// Constituent parameters, keyed by slot name
        parts: HashMap<String, Parameter>,
    },

    /// JSON array of recursively resolved elements
    List {
        /// Constituent parameters in order
        items: Vec<Parameter>,
    },
}

impl Parameter {
    /// Shorthand for a literal string parameter
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value {
            value: value.into(),
        }
    }

    /// Shorthand for a reference parameter
    pub fn reference(coordinate: Coordinate, property: impl Into<String>) -> Self {
        Self::Reference {
            coordinate,
            property: property.into(),
        }
    }

    /// Coordinates this parameter depends on, in no particular order
    pub fn dependencies(&self) -> Vec<Coordinate> {
        match self {
            Self::Value { .. } | Self::Environment { .. } => Vec::new(),
            Self::Reference { coordinate, .. } => vec![coordinate.clone()],
            Self::Compound { parts, .. } => {
                parts.values().flat_map(Parameter::dependencies).collect()
            }
            Self::List { items } => items.iter().flat_map(Parameter::dependencies).collect(),
        }
    }

    /// Resolve this parameter to a concrete JSON value.
    ///
    /// References are looked up in the context; a missing target or a target
    /// that was skipped is an error. Compound and list parameters resolve
    /// their constituents recursively.
    pub fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<Value, ResolveError> {
        match self {
            Self::Value { value } => Ok(value.clone()),

            Self::Environment { name, default } => match std::env::var(name) {
                Ok(value) => Ok(Value::String(value)),
                Err(_) => default
                    .clone()
                    .map(Value::String)
                    .ok_or_else(|| ResolveError::UnsetEnvironmentVariable { name: name.clone() }),
            },

            Self::Reference {
                coordinate,
                property,
            } => {
                let entity = ctx.entities.get(coordinate).ok_or_else(|| {
                    ResolveError::UnresolvedReference {
                        coordinate: coordinate.clone(),
                    }
                })?;
                if entity.skip {
                    return Err(ResolveError::SkippedReference {
                        coordinate: coordinate.clone(),
                        property: property.clone(),
                    });
                }
                entity.properties.get(property).cloned().ok_or_else(|| {
                    ResolveError::MissingProperty {
                        coordinate: coordinate.clone(),
                        property: property.clone(),
                    }
                })
            }

            Self::Compound { format, parts } => {
                let mut resolved = Properties::with_capacity(parts.len());
                for (name, part) in parts {
                    resolved.insert(name.clone(), part.resolve(ctx)?);
                }
                let rendered = template::substitute(format, &resolved, "compound")?;
                Ok(Value::String(rendered))
            }

            Self::List { items } => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    resolved.push(item.resolve(ctx)?);
                }
                Ok(Value::Array(resolved))
            }
        }
    }
}
