//! Canopy Deploy - the deployment pipeline
//!
//! Turns a loaded project model into a correct sequence of side-effecting
//! calls against a tenant: configurations are topologically ordered so every
//! reference resolves before use, rendered, and upserted idempotently, with
//! resolved identifiers threaded forward through the entity map.
//!
//! ## Architectural Boundaries
//!
//! - `canopy-deploy` owns: ordering, per-run resolution state, upsert
//!   dispatch, the delete path
//! - `canopy-client` owns: the wire, retries, rate limiting
//! - `canopy-types` owns: the immutable configuration model
//!
//! ## Key Principle
//!
//! One environment is deployed strictly in sort order on a single task, so
//! the observable order of upserts equals the sort order. Environments are
//! independent: each gets its own entity map and client.
//!
//! ## Usage
//!
//! ```no_run
//! use canopy_client::DryRunClient;
//! use canopy_deploy::{deploy_configurations, sort_configurations, DeployOptions};
//! use canopy_types::{ApiRegistry, Configuration};
//!
//! # async fn example(configs: Vec<Configuration>) -> Result<(), Box<dyn std::error::Error>> {
//! let sorted = sort_configurations(&configs)?;
//!
//! // validate the whole project without touching the tenant
//! let client = DryRunClient::new();
//! let errors = deploy_configurations(
//!     &client,
//!     &ApiRegistry::standard(),
//!     &sorted,
//!     DeployOptions { continue_on_error: false, dry_run: true },
//! )
//! .await;
//! assert!(errors.is_empty());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod delete;
pub mod deploy;
pub mod entity_map;
pub mod error;
pub mod graph;

// Re-exports
pub use delete::{
    delete_configs, delete_for_environments, parse_delete_file, DeleteError, DeletePointer,
};
pub use deploy::{deploy_configurations, DeployOptions};
pub use entity_map::EntityMap;
pub use error::{DeployAction, DeployError, DeployErrorKind, SortError};
pub use graph::sort_configurations;
