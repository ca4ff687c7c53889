//! Deployment error types

use canopy_client::ClientError;
use canopy_types::{Coordinate, RenderError, ResolveError};
use std::fmt;
use thiserror::Error;

/// What the engine was doing when a configuration failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployAction {
    /// A real deployment run
    Deploy,
    /// A dry run
    Validate,
}

impl DeployAction {
    /// Progressive form used in per-configuration log lines
    pub fn gerund(&self) -> &'static str {
        match self {
            Self::Deploy => "Deploying",
            Self::Validate => "Validating",
        }
    }
}

impl fmt::Display for DeployAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy => write!(f, "deploy"),
            Self::Validate => write!(f, "validate"),
        }
    }
}

/// Failure of a single configuration, annotated with its coordinate and the
/// action that was attempted
#[derive(Debug, Error)]
#[error("failed to {action} configuration {coordinate}: {kind}")]
pub struct DeployError {
    /// Coordinate of the failing configuration
    pub coordinate: Coordinate,
    /// Whether the run was deploying or validating
    pub action: DeployAction,
    /// What went wrong
    #[source]
    pub kind: DeployErrorKind,
}

/// The ways deploying one configuration can fail
#[derive(Debug, Error)]
pub enum DeployErrorKind {
    /// The configuration names an API the registry does not know
    #[error("unknown api `{api}`, this is most likely a loader bug")]
    UnknownApi {
        /// The unknown API identifier
        api: String,
    },

    /// Another configuration of the same unique-name API already produced
    /// this name
    #[error("duplicate name `{name}` for api `{api}`")]
    DuplicateName {
        /// API the name collides within
        api: String,
        /// The colliding name
        name: String,
    },

    /// A reserved parameter is absent or did not resolve to a usable string
    #[error("required parameter `{parameter}` did not resolve to a non-empty string")]
    MissingParameter {
        /// Name of the reserved parameter
        parameter: String,
    },

    /// The scope of a settings object resolved to an empty string
    #[error("resolved scope is empty")]
    EmptyScope,

    /// A parameter failed to resolve
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The template could not be rendered
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The tenant client reported a failure
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Errors produced while ordering configurations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortError {
    /// Two configurations share one coordinate
    #[error("duplicate coordinate {coordinate} in project")]
    DuplicateCoordinate {
        /// The coordinate appearing twice
        coordinate: Coordinate,
    },

    /// Reference dependencies form a cycle
    #[error("configuration dependencies form a cycle: {}", format_cycle(.path))]
    Cycle {
        /// Every coordinate on the cycle, in dependency order
        path: Vec<Coordinate>,
    },
}

fn format_cycle(path: &[Coordinate]) -> String {
    let mut names: Vec<String> = path.iter().map(Coordinate::to_string).collect();
    if let Some(first) = names.first().cloned() {
        names.push(first);
    }
    names.join(" -> ")
}
