//! Download/redeploy round-trip: objects keep their tenant-side identity.
//!
//! Downloading a tenant and deploying the result against an equivalent
//! empty tenant must upsert objects with identical origin object ids.

use async_trait::async_trait;
use canopy_client::{
    DownloadSettingsObject, ListSettingsOptions, Result as ClientResult, SchemaStub,
    SettingsObject, TenantClient, TenantEntity,
};
use canopy_deploy::{deploy_configurations, sort_configurations, DeployOptions};
use canopy_download::Downloader;
use canopy_types::{ApiDescriptor, ApiRegistry};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Tenant double that lists canned objects and records settings upserts.
#[derive(Debug, Default)]
struct RoundTripTenant {
    listings: DashMap<String, Vec<DownloadSettingsObject>>,
    received: DashMap<String, Vec<SettingsObject>>,
}

#[async_trait]
impl TenantClient for RoundTripTenant {
    async fn upsert_by_name(
        &self,
        _api: &ApiDescriptor,
        name: &str,
        _payload: &str,
    ) -> ClientResult<TenantEntity> {
        Ok(TenantEntity {
            id: format!("{name}-id"),
            name: name.to_string(),
        })
    }

    async fn upsert_by_non_unique_name_and_id(
        &self,
        _api: &ApiDescriptor,
        entity_id: &str,
        name: &str,
        _payload: &str,
    ) -> ClientResult<TenantEntity> {
        Ok(TenantEntity {
            id: entity_id.to_string(),
            name: name.to_string(),
        })
    }

    async fn upsert_settings(&self, object: SettingsObject) -> ClientResult<TenantEntity> {
        let id = object
            .origin_object_id
            .clone()
            .unwrap_or_else(|| format!("new-{}", object.id));
        self.received
            .entry(object.schema_id.clone())
            .or_default()
            .push(object.clone());
        Ok(TenantEntity {
            id,
            name: object.id,
        })
    }

    async fn list_schemas(&self) -> ClientResult<Vec<SchemaStub>> {
        Ok(self
            .listings
            .iter()
            .map(|entry| SchemaStub {
                schema_id: entry.key().clone(),
            })
            .collect())
    }

    async fn list_settings(
        &self,
        schema_id: &str,
        _opts: ListSettingsOptions,
    ) -> ClientResult<Vec<DownloadSettingsObject>> {
        Ok(self
            .listings
            .get(schema_id)
            .map(|objects| objects.clone())
            .unwrap_or_default())
    }

    async fn delete_by_name(&self, _api: &ApiDescriptor, _name: &str) -> ClientResult<()> {
        Ok(())
    }
}

fn object(schema_id: &str, object_id: &str, value: &str) -> DownloadSettingsObject {
    DownloadSettingsObject {
        object_id: object_id.to_string(),
        value: value.to_string(),
        schema_id: schema_id.to_string(),
        schema_version: "1.0".to_string(),
        scope: "environment".to_string(),
    }
}

#[tokio::test]
async fn test_redeploying_a_download_preserves_origin_object_ids() {
    let schema = "builtin:alerting.profile";
    let source = Arc::new(RoundTripTenant::default());
    source.listings.insert(
        schema.to_string(),
        vec![
            object(schema, "obj-1", r#"{"displayName": "On-call"}"#),
            object(schema, "obj-2", r#"{"displayName": "Fallback"}"#),
        ],
    );

    let downloaded = Downloader::new(source).download_all("infra").await;
    let configs = downloaded[schema].clone();
    assert_eq!(configs.len(), 2);

    let sorted = sort_configurations(&configs).unwrap();
    let target = RoundTripTenant::default();
    let errors = deploy_configurations(
        &target,
        &ApiRegistry::standard(),
        &sorted,
        DeployOptions::default(),
    )
    .await;
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");

    let received_origins: BTreeSet<String> = target
        .received
        .get(schema)
        .map(|objects| {
            objects
                .iter()
                .filter_map(|o| o.origin_object_id.clone())
                .collect()
        })
        .unwrap_or_default();
    assert_eq!(
        received_origins,
        BTreeSet::from(["obj-1".to_string(), "obj-2".to_string()])
    );

    // content survives the round trip as well
    let received = target.received.get(schema).unwrap();
    assert!(received
        .iter()
        .all(|o| o.content.contains("displayName") && o.scope == "environment"));
}
