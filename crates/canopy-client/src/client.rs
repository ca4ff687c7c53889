//! The tenant client contract.
//!
//! A narrow set of operations over configs and settings; everything the
//! engines know about a tenant goes through this trait.

use crate::error::Result;
use async_trait::async_trait;
use canopy_types::ApiDescriptor;
use serde::{Deserialize, Serialize};

/// Identifier and name of a tenant-side entity, as returned by an upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantEntity {
    /// Tenant-assigned identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
}

/// A settings 2.0 object to upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsObject {
    /// Configuration id within its project, used for reconciliation
    pub id: String,
    /// Schema the object instantiates
    pub schema_id: String,
    /// Schema version the content was written against
    pub schema_version: String,
    /// Owning entity of the object
    pub scope: String,
    /// Rendered JSON content
    pub content: String,
    /// Tenant-side object id preserved across download and redeploy
    pub origin_object_id: Option<String>,
}

/// A settings 2.0 object as listed by a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSettingsObject {
    /// Tenant-side object id
    pub object_id: String,
    /// Raw JSON value of the object
    pub value: String,
    /// Schema the object instantiates
    pub schema_id: String,
    /// Version of the schema
    pub schema_version: String,
    /// Owning entity of the object
    pub scope: String,
}

/// A settings schema known to the tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaStub {
    /// Schema identifier
    pub schema_id: String,
}

/// Options for listing settings objects
#[derive(Debug, Clone, Default)]
pub struct ListSettingsOptions {
    /// Page size requested from the tenant; `None` uses the tenant default
    pub page_size: Option<u32>,
}

/// Operations the engines need from a tenant.
///
/// Implementations must be safe for concurrent use; the download engine
/// shares one client across all its tasks.
#[async_trait]
pub trait TenantClient: Send + Sync {
    /// Create or update a classic configuration, keyed by its name.
    /// Idempotent for unique-name APIs.
    async fn upsert_by_name(
        &self,
        api: &ApiDescriptor,
        name: &str,
        payload: &str,
    ) -> Result<TenantEntity>;

    /// Create or update a classic configuration of a non-unique-name API,
    /// keyed by a caller-provided stable id.
    async fn upsert_by_non_unique_name_and_id(
        &self,
        api: &ApiDescriptor,
        entity_id: &str,
        name: &str,
        payload: &str,
    ) -> Result<TenantEntity>;

    /// Create or update a settings 2.0 object
    async fn upsert_settings(&self, object: SettingsObject) -> Result<TenantEntity>;

    /// List all settings schemas the tenant knows
    async fn list_schemas(&self) -> Result<Vec<SchemaStub>>;

    /// List all settings objects of one schema
    async fn list_settings(
        &self,
        schema_id: &str,
        opts: ListSettingsOptions,
    ) -> Result<Vec<DownloadSettingsObject>>;

    /// Delete a classic configuration by name
    async fn delete_by_name(&self, api: &ApiDescriptor, name: &str) -> Result<()>;
}
