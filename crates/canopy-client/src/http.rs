//! HTTP implementation of the tenant client.
//!
//! Classic configurations live under `/api/config/v1/<api>`, settings 2.0
//! objects under `/api/v2/settings`. Every request passes through the
//! rate-limit strategy; settings upserts carry the computed external id so
//! the tenant reconciles objects across runs.

use crate::client::{
    DownloadSettingsObject, ListSettingsOptions, SchemaStub, SettingsObject, TenantClient,
    TenantEntity,
};
use crate::error::{ClientError, Result};
use crate::rate_limit::{ApiResponse, RateLimitStrategy, Timeline};
use async_trait::async_trait;
use canopy_types::ids::external_id;
use canopy_types::ApiDescriptor;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SETTINGS_OBJECTS_PATH: &str = "/api/v2/settings/objects";
const SETTINGS_SCHEMAS_PATH: &str = "/api/v2/settings/schemas";
const SETTINGS_LIST_FIELDS: &str = "objectId,value,schemaId,schemaVersion,scope";

/// Tenant client talking to a real tenant over HTTP
pub struct HttpTenantClient {
    client: Client,
    base_url: String,
    token: String,
    strategy: RateLimitStrategy,
}

impl HttpTenantClient {
    /// Create a client for the given tenant
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            strategy: RateLimitStrategy::system(),
        })
    }

    /// Replace the timeline driving retry sleeps
    pub fn with_timeline(mut self, timeline: Arc<dyn Timeline>) -> Self {
        self.strategy = RateLimitStrategy::new(timeline);
        self
    }

    // ========== Internal HTTP helpers ==========

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<String>,
    ) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .strategy
            .execute(|| {
                let mut request = self
                    .client
                    .request(method.clone(), &url)
                    .bearer_auth(&self.token);
                if !query.is_empty() {
                    request = request.query(query);
                }
                if let Some(body) = &body {
                    request = request
                        .header(reqwest::header::CONTENT_TYPE, "application/json")
                        .body(body.clone());
                }
                async move {
                    let response = request.send().await?;
                    let status = response.status().as_u16();
                    let headers = response
                        .headers()
                        .iter()
                        .filter_map(|(name, value)| {
                            value
                                .to_str()
                                .ok()
                                .map(|v| (name.as_str().to_string(), v.to_string()))
                        })
                        .collect();
                    let body = response.text().await?;
                    Ok(ApiResponse {
                        status,
                        headers,
                        body,
                    })
                }
            })
            .await?;

        if !response.is_success() {
            return Err(ClientError::Api {
                status: response.status,
                message: response.body,
            });
        }
        Ok(response)
    }

    fn config_path(&self, api: &ApiDescriptor) -> String {
        format!("/api/config/v1/{}", api.id)
    }

    /// Find an existing classic configuration by name
    async fn find_by_name(&self, api: &ApiDescriptor, name: &str) -> Result<Option<String>> {
        let response = self
            .execute(Method::GET, &self.config_path(api), &[], None)
            .await?;
        let values: ValuesResponse = parse_body(&response.body)?;
        Ok(values
            .values
            .into_iter()
            .find(|value| value.name.as_deref() == Some(name))
            .map(|value| value.id))
    }
}

#[async_trait]
impl TenantClient for HttpTenantClient {
    async fn upsert_by_name(
        &self,
        api: &ApiDescriptor,
        name: &str,
        payload: &str,
    ) -> Result<TenantEntity> {
        match self.find_by_name(api, name).await? {
            Some(id) => {
                debug!(api = %api.id, %name, %id, "Updating existing configuration");
                let path = format!("{}/{}", self.config_path(api), id);
                let response = self
                    .execute(Method::PUT, &path, &[], Some(payload.to_string()))
                    .await?;
                Ok(entity_from_response(&response.body, &id, name))
            }
            None => {
                debug!(api = %api.id, %name, "Creating new configuration");
                let response = self
                    .execute(
                        Method::POST,
                        &self.config_path(api),
                        &[],
                        Some(payload.to_string()),
                    )
                    .await?;
                let entity: EntityResponse = parse_body(&response.body)?;
                Ok(TenantEntity {
                    id: entity.id,
                    name: entity.name.unwrap_or_else(|| name.to_string()),
                })
            }
        }
    }

    async fn upsert_by_non_unique_name_and_id(
        &self,
        api: &ApiDescriptor,
        entity_id: &str,
        name: &str,
        payload: &str,
    ) -> Result<TenantEntity> {
        let path = format!("{}/{}", self.config_path(api), entity_id);
        let response = self
            .execute(Method::PUT, &path, &[], Some(payload.to_string()))
            .await?;
        Ok(entity_from_response(&response.body, entity_id, name))
    }

    async fn upsert_settings(&self, object: SettingsObject) -> Result<TenantEntity> {
        let value: Value = serde_json::from_str(&object.content).map_err(|e| {
            ClientError::InvalidPayload(format!(
                "settings content for `{}` is not valid JSON: {e}",
                object.id
            ))
        })?;

        let request = SettingsUpsertRequest {
            schema_id: &object.schema_id,
            schema_version: &object.schema_version,
            scope: &object.scope,
            external_id: external_id(&object.schema_id, &object.id),
            object_id: object.origin_object_id.as_deref(),
            value,
        };
        let body = serde_json::to_string(&[request])
            .map_err(|e| ClientError::InvalidPayload(e.to_string()))?;

        let response = self
            .execute(Method::POST, SETTINGS_OBJECTS_PATH, &[], Some(body))
            .await?;
        let mut outcomes: Vec<SettingsUpsertOutcome> = parse_body(&response.body)?;
        let outcome = outcomes.pop().ok_or_else(|| {
            ClientError::MalformedResponse("settings upsert returned no objects".into())
        })?;

        Ok(TenantEntity {
            id: outcome.object_id,
            name: object.id,
        })
    }

    async fn list_schemas(&self) -> Result<Vec<SchemaStub>> {
        let response = self
            .execute(Method::GET, SETTINGS_SCHEMAS_PATH, &[], None)
            .await?;
        let schemas: SchemaListResponse = parse_body(&response.body)?;
        Ok(schemas
            .items
            .into_iter()
            .map(|item| SchemaStub {
                schema_id: item.schema_id,
            })
            .collect())
    }

    async fn list_settings(
        &self,
        schema_id: &str,
        opts: ListSettingsOptions,
    ) -> Result<Vec<DownloadSettingsObject>> {
        let mut objects = Vec::new();
        let mut next_page_key: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = Vec::new();
            match &next_page_key {
                // Follow-up pages may only carry the page key
                Some(key) => query.push(("nextPageKey", key.clone())),
                None => {
                    query.push(("schemaIds", schema_id.to_string()));
                    query.push(("fields", SETTINGS_LIST_FIELDS.to_string()));
                    if let Some(page_size) = opts.page_size {
                        query.push(("pageSize", page_size.to_string()));
                    }
                }
            }

            let response = self
                .execute(Method::GET, SETTINGS_OBJECTS_PATH, &query, None)
                .await?;
            let page: SettingsListResponse = parse_body(&response.body)?;

            objects.extend(page.items.into_iter().map(|item| DownloadSettingsObject {
                object_id: item.object_id,
                value: item.value.to_string(),
                schema_id: item.schema_id,
                schema_version: item.schema_version,
                scope: item.scope,
            }));

            match page.next_page_key {
                Some(key) if !key.is_empty() => next_page_key = Some(key),
                _ => return Ok(objects),
            }
        }
    }

    async fn delete_by_name(&self, api: &ApiDescriptor, name: &str) -> Result<()> {
        match self.find_by_name(api, name).await? {
            Some(id) => {
                let path = format!("{}/{}", self.config_path(api), id);
                self.execute(Method::DELETE, &path, &[], None).await?;
                Ok(())
            }
            None => {
                debug!(api = %api.id, %name, "Nothing to delete, configuration does not exist");
                Ok(())
            }
        }
    }
}

// ========== Wire records ==========

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsUpsertRequest<'a> {
    schema_id: &'a str,
    schema_version: &'a str,
    scope: &'a str,
    external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    object_id: Option<&'a str>,
    value: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsUpsertOutcome {
    object_id: String,
}

#[derive(Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<ValueStub>,
}

#[derive(Deserialize)]
struct ValueStub {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct EntityResponse {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaListResponse {
    #[serde(default)]
    items: Vec<SchemaItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaItem {
    schema_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsListResponse {
    #[serde(default)]
    items: Vec<SettingsItem>,
    #[serde(default)]
    next_page_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsItem {
    object_id: String,
    #[serde(default)]
    value: Value,
    schema_id: String,
    #[serde(default)]
    schema_version: String,
    #[serde(default)]
    scope: String,
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ClientError::MalformedResponse(e.to_string()))
}

/// Update responses may come back empty; fall back to what was sent.
fn entity_from_response(body: &str, id: &str, name: &str) -> TenantEntity {
    serde_json::from_str::<EntityResponse>(body)
        .map(|entity| TenantEntity {
            id: entity.id,
            name: entity.name.unwrap_or_else(|| name.to_string()),
        })
        .unwrap_or_else(|_| TenantEntity {
            id: id.to_string(),
            name: name.to_string(),
        })
}
