//! The concurrent download engine.
//!
//! One task per schema fetches, filters and converts that schema's objects;
//! the shared result map is locked only for the final assignment. A failing
//! schema logs and yields nothing, without cancelling its siblings.

use crate::filters::FilterSet;
use canopy_client::{DownloadSettingsObject, ListSettingsOptions, TenantClient};
use canopy_types::ids::uuid_from_name;
use canopy_types::{
    ConfigType, Configuration, Coordinate, Parameter, Template, NAME_PARAMETER, SCOPE_PARAMETER,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Download settings 2.0 objects of the given schemas into configurations
pub async fn download(
    client: Arc<dyn TenantClient>,
    schema_ids: &[String],
    project: &str,
) -> HashMap<String, Vec<Configuration>> {
    Downloader::new(client).download(schema_ids, project).await
}

/// Download settings 2.0 objects of every schema the tenant knows
pub async fn download_all(
    client: Arc<dyn TenantClient>,
    project: &str,
) -> HashMap<String, Vec<Configuration>> {
    Downloader::new(client).download_all(project).await
}

/// Settings 2.0 download engine
pub struct Downloader {
    client: Arc<dyn TenantClient>,
    filters: FilterSet,
}

impl Downloader {
    /// Create a downloader with the standard filter set
    pub fn new(client: Arc<dyn TenantClient>) -> Self {
        Self {
            client,
            filters: FilterSet::standard(),
        }
    }

    /// Replace the filter set
    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    /// Download all objects of every schema the tenant knows.
    ///
    /// A failing schema listing skips the download entirely.
    pub async fn download_all(&self, project: &str) -> HashMap<String, Vec<Configuration>> {
        debug!("Fetching all schemas to download");
        let schemas = match self.client.list_schemas().await {
            Ok(schemas) => schemas,
            Err(e) => {
                error!(error = %e, "Failed to fetch schemas, skipping settings download");
                return HashMap::new();
            }
        };
        let ids: Vec<String> = schemas.into_iter().map(|schema| schema.schema_id).collect();
        self.download(&ids, project).await
    }

    /// Download all objects of the given schemas, one concurrent task per
    /// schema. Schemas without surviving objects get no entry in the result.
    pub async fn download(
        &self,
        schema_ids: &[String],
        project: &str,
    ) -> HashMap<String, Vec<Configuration>> {
        let results: Arc<Mutex<HashMap<String, Vec<Configuration>>>> =
            Arc::new(Mutex::new(HashMap::with_capacity(schema_ids.len())));
        let mut tasks = Vec::with_capacity(schema_ids.len());

        for schema_id in schema_ids {
            let client = Arc::clone(&self.client);
            let filters = self.filters.clone();
            let results = Arc::clone(&results);
            let schema_id = schema_id.clone();
            let project = project.to_string();

            tasks.push(tokio::spawn(async move {
                debug!(schema = %schema_id, "Downloading all settings for schema");
                let objects = match client
                    .list_settings(&schema_id, ListSettingsOptions::default())
                    .await
                {
                    Ok(objects) => objects,
                    Err(e) => {
                        error!(schema = %schema_id, error = %e, "Failed to fetch settings for schema");
                        return;
                    }
                };
                if objects.is_empty() {
                    return;
                }

                let configs = convert_objects(&objects, &project, &filters);
                if configs.is_empty() {
                    return;
                }

                results.lock().await.insert(schema_id, configs);
            }));
        }

        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Download task failed");
            }
        }

        let mut results = results.lock().await;
        std::mem::take(&mut *results)
    }
}

/// Convert listed objects into configurations that redeploy cleanly.
///
/// A JSON parse failure truncates the schema's result at that point; the
/// objects converted so far are kept.
fn convert_objects(
    objects: &[DownloadSettingsObject],
    project: &str,
    filters: &FilterSet,
) -> Vec<Configuration> {
    let mut result = Vec::with_capacity(objects.len());

    for object in objects {
        let parsed: Map<String, Value> = match serde_json::from_str(&object.value) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(
                    schema = %object.schema_id,
                    error = %e,
                    "Unable to parse JSON value of settings object"
                );
                return result;
            }
        };

        if let Some(filter) = filters.get(&object.schema_id) {
            let (discard, reason) = filter.evaluate(&parsed);
            if discard {
                warn!(
                    schema = %object.schema_id,
                    %reason,
                    "Downloaded settings object will be discarded"
                );
                continue;
            }
        }

        let content = serde_json::to_string_pretty(&parsed)
            .unwrap_or_else(|_| object.value.clone());
        let config_id = uuid_from_name(&object.object_id).to_string();

        result.push(Configuration {
            coordinate: Coordinate::new(project, &object.schema_id, &config_id),
            config_type: ConfigType::Settings {
                schema_id: object.schema_id.clone(),
                schema_version: object.schema_version.clone(),
            },
            template: Template::new(&config_id, content),
            parameters: HashMap::from([
                (
                    NAME_PARAMETER.to_string(),
                    Parameter::value(config_id.clone()),
                ),
                (
                    SCOPE_PARAMETER.to_string(),
                    Parameter::value(object.scope.clone()),
                ),
            ]),
            skip: false,
            origin_object_id: Some(object.object_id.clone()),
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use canopy_client::{
        ClientError, Result as ClientResult, SchemaStub, SettingsObject, TenantEntity,
    };
    use canopy_types::ApiDescriptor;
    use dashmap::DashMap;

    /// Tenant double serving canned settings listings.
    #[derive(Debug, Default)]
    struct ListingTenant {
        settings: DashMap<String, Vec<DownloadSettingsObject>>,
        failing_schemas: DashMap<String, ()>,
    }

    impl ListingTenant {
        fn with_objects(schema_id: &str, objects: Vec<DownloadSettingsObject>) -> Self {
            let tenant = Self::default();
            tenant.settings.insert(schema_id.to_string(), objects);
            tenant
        }

        fn add(&self, schema_id: &str, objects: Vec<DownloadSettingsObject>) {
            self.settings.insert(schema_id.to_string(), objects);
        }

        fn fail(&self, schema_id: &str) {
            self.failing_schemas.insert(schema_id.to_string(), ());
        }
    }

    #[async_trait]
    impl TenantClient for ListingTenant {
        async fn upsert_by_name(
            &self,
            _api: &ApiDescriptor,
            _name: &str,
            _payload: &str,
        ) -> ClientResult<TenantEntity> {
            Err(ClientError::MalformedResponse("read-only double".into()))
        }

        async fn upsert_by_non_unique_name_and_id(
            &self,
            _api: &ApiDescriptor,
            _entity_id: &str,
            _name: &str,
            _payload: &str,
        ) -> ClientResult<TenantEntity> {
            Err(ClientError::MalformedResponse("read-only double".into()))
        }

        async fn upsert_settings(&self, _object: SettingsObject) -> ClientResult<TenantEntity> {
            Err(ClientError::MalformedResponse("read-only double".into()))
        }

        async fn list_schemas(&self) -> ClientResult<Vec<SchemaStub>> {
            Ok(self
                .settings
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
            if self.failing_schemas.contains_key(schema_id) {
                return Err(ClientError::Api {
                    status: 500,
                    message: "listing failed".into(),
                });
            }
            Ok(self
                .settings
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
            schema_version: "1.2".to_string(),
            scope: "environment".to_string(),
        }
    }

    #[tokio::test]
    async fn test_objects_convert_into_redeployable_configurations() {
        let schema = "builtin:alerting.profile";
        let tenant = ListingTenant::with_objects(
            schema,
            vec![object(schema, "obj-1", r#"{"displayName":"On-call"}"#)],
        );

        let results = Downloader::new(Arc::new(tenant))
            .download(&[schema.to_string()], "infra")
            .await;

        let configs = &results[schema];
        assert_eq!(configs.len(), 1);

        let config = &configs[0];
        let expected_id = uuid_from_name("obj-1").to_string();
        assert_eq!(config.coordinate, Coordinate::new("infra", schema, &expected_id));
        assert_eq!(config.origin_object_id.as_deref(), Some("obj-1"));
        assert_eq!(
            config.template.content(),
            "{\n  \"displayName\": \"On-call\"\n}"
        );
        assert_eq!(
            config.parameters.get(NAME_PARAMETER),
            Some(&Parameter::value(expected_id))
        );
        assert_eq!(
            config.parameters.get(SCOPE_PARAMETER),
            Some(&Parameter::value("environment"))
        );
    }

    #[tokio::test]
    async fn test_parse_failure_truncates_the_schema_result() {
        let schema = "builtin:alerting.profile";
        let tenant = ListingTenant::with_objects(
            schema,
            vec![
                object(schema, "obj-1", r#"{"ok": true}"#),
                object(schema, "obj-2", "not json at all"),
                object(schema, "obj-3", r#"{"ok": true}"#),
            ],
        );

        let results = Downloader::new(Arc::new(tenant))
            .download(&[schema.to_string()], "infra")
            .await;

        let configs = &results[schema];
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].origin_object_id.as_deref(), Some("obj-1"));
    }

    #[tokio::test]
    async fn test_filtered_objects_are_discarded() {
        let schema = "builtin:dashboards";
        let tenant = ListingTenant::with_objects(
            schema,
            vec![
                object(
                    schema,
                    "preset-1",
                    r#"{"dashboardMetadata": {"preset": true}}"#,
                ),
                object(schema, "own-1", r#"{"dashboardMetadata": {"preset": false}}"#),
            ],
        );

        let results = Downloader::new(Arc::new(tenant))
            .download(&[schema.to_string()], "infra")
            .await;

        let configs = &results[schema];
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].origin_object_id.as_deref(), Some("own-1"));
    }

    #[tokio::test]
    async fn test_schemas_without_surviving_objects_are_omitted() {
        let empty_schema = "builtin:empty";
        let filtered_schema = "builtin:synthetic.locations";
        let tenant = ListingTenant::with_objects(empty_schema, Vec::new());
        tenant.add(
            filtered_schema,
            vec![object(filtered_schema, "loc-1", r#"{"type": "PRIVATE"}"#)],
        );

        let results = Downloader::new(Arc::new(tenant))
            .download(
                &[empty_schema.to_string(), filtered_schema.to_string()],
                "infra",
            )
            .await;

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_failing_schema_does_not_cancel_siblings() {
        let good = "builtin:alerting.profile";
        let bad = "builtin:broken";
        let tenant =
            ListingTenant::with_objects(good, vec![object(good, "obj-1", r#"{"ok": true}"#)]);
        tenant.fail(bad);
        tenant.add(bad, Vec::new());

        let results = Downloader::new(Arc::new(tenant))
            .download(&[bad.to_string(), good.to_string()], "infra")
            .await;

        assert_eq!(results.len(), 1);
        assert!(results.contains_key(good));
    }

    #[tokio::test]
    async fn test_download_all_covers_every_listed_schema() {
        let tenant = ListingTenant::with_objects(
            "builtin:alerting.profile",
            vec![object(
                "builtin:alerting.profile",
                "obj-1",
                r#"{"ok": true}"#,
            )],
        );
        tenant.add(
            "builtin:problem.notifications",
            vec![object(
                "builtin:problem.notifications",
                "obj-2",
                r#"{"ok": true}"#,
            )],
        );

        let results = Downloader::new(Arc::new(tenant)).download_all("infra").await;

        assert_eq!(results.len(), 2);
        assert!(results.contains_key("builtin:alerting.profile"));
        assert!(results.contains_key("builtin:problem.notifications"));
    }
}
