//! Dry-run client.
//!
//! Satisfies the tenant contract without touching a tenant. Returned
//! entities are synthetic but stable, so a validation run resolves
//! cross-configuration references exactly like a real deployment. All
//! received mutations are recorded for inspection.

use crate::client::{
    DownloadSettingsObject, ListSettingsOptions, SchemaStub, SettingsObject, TenantClient,
    TenantEntity,
};
use crate::error::Result;
use async_trait::async_trait;
use canopy_types::ids::uuid_from_name;
use canopy_types::ApiDescriptor;
use dashmap::DashMap;

/// One upsert received by the dry-run client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpsert {
    /// Synthetic id handed back to the caller
    pub entity_id: String,
    /// Name (classic) or configuration id (settings) of the upsert
    pub name: String,
    /// Rendered payload as received
    pub payload: String,
}

/// Tenant client for validation runs
#[derive(Debug, Default)]
pub struct DryRunClient {
    upserts: DashMap<String, Vec<RecordedUpsert>>,
    deletes: DashMap<String, Vec<String>>,
}

impl DryRunClient {
    /// Create a new dry-run client
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts received for one API or schema, in call order
    pub fn upserts(&self, key: &str) -> Vec<RecordedUpsert> {
        self.upserts.get(key).map(|u| u.clone()).unwrap_or_default()
    }

    /// Names whose deletion was requested for one API
    pub fn deletes(&self, api_id: &str) -> Vec<String> {
        self.deletes
            .get(api_id)
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    fn record(&self, key: &str, upsert: RecordedUpsert) {
        self.upserts.entry(key.to_string()).or_default().push(upsert);
    }
}

#[async_trait]
impl TenantClient for DryRunClient {
    async fn upsert_by_name(
        &self,
        api: &ApiDescriptor,
        name: &str,
        payload: &str,
    ) -> Result<TenantEntity> {
        let id = uuid_from_name(&format!("{}/{}", api.id, name)).to_string();
        self.record(
            &api.id,
            RecordedUpsert {
                entity_id: id.clone(),
                name: name.to_string(),
                payload: payload.to_string(),
            },
        );
        Ok(TenantEntity {
            id,
            name: name.to_string(),
        })
    }

    async fn upsert_by_non_unique_name_and_id(
        &self,
        api: &ApiDescriptor,
        entity_id: &str,
        name: &str,
        payload: &str,
    ) -> Result<TenantEntity> {
        self.record(
            &api.id,
            RecordedUpsert {
                entity_id: entity_id.to_string(),
                name: name.to_string(),
                payload: payload.to_string(),
            },
        );
        Ok(TenantEntity {
            id: entity_id.to_string(),
            name: name.to_string(),
        })
    }

    async fn upsert_settings(&self, object: SettingsObject) -> Result<TenantEntity> {
        let id = object
            .origin_object_id
            .clone()
            .unwrap_or_else(|| {
                uuid_from_name(&format!("{}${}", object.schema_id, object.id)).to_string()
            });
        self.record(
            &object.schema_id,
            RecordedUpsert {
                entity_id: id.clone(),
                name: object.id.clone(),
                payload: object.content.clone(),
            },
        );
        Ok(TenantEntity {
            id,
            name: object.id,
        })
    }

    async fn list_schemas(&self) -> Result<Vec<SchemaStub>> {
        Ok(Vec::new())
    }

    async fn list_settings(
        &self,
        _schema_id: &str,
        _opts: ListSettingsOptions,
    ) -> Result<Vec<DownloadSettingsObject>> {
        Ok(Vec::new())
    }

    async fn delete_by_name(&self, api: &ApiDescriptor, name: &str) -> Result<()> {
        self.deletes
            .entry(api.id.clone())
            .or_default()
            .push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_synthetic_entities_are_stable_across_calls() {
        let client = DryRunClient::new();
        let api = ApiDescriptor::new("alerting-profile");

        let first = client.upsert_by_name(&api, "On-call", "{}").await.unwrap();
        let second = client.upsert_by_name(&api, "On-call", "{}").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.name, "On-call");
    }

    #[tokio::test]
    async fn test_upserts_are_recorded_in_call_order() {
        let client = DryRunClient::new();
        let api = ApiDescriptor::new("dashboard");

        client.upsert_by_name(&api, "First", "{}").await.unwrap();
        client.upsert_by_name(&api, "Second", "{}").await.unwrap();

        let recorded = client.upserts("dashboard");
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].name, "First");
        assert_eq!(recorded[1].name, "Second");
    }

    #[tokio::test]
    async fn test_settings_upsert_prefers_origin_object_id() {
        let client = DryRunClient::new();
        let object = SettingsObject {
            id: "profile-1".into(),
            schema_id: "builtin:alerting.profile".into(),
            schema_version: "1.0".into(),
            scope: "environment".into(),
            content: "{}".into(),
            origin_object_id: Some("obj-42".into()),
        };

        let entity = client.upsert_settings(object).await.unwrap();
        assert_eq!(entity.id, "obj-42");
        assert_eq!(entity.name, "profile-1");
    }
}
