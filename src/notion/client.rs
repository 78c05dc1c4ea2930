//! HTTP client for the Notion REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    EncodedValue, FieldDescription, FieldKind, FieldValues, RecordId, RecordStore, StoreError,
};

/// Default timeout for API requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`NotionClient`].
#[derive(Debug, Clone)]
pub struct NotionConfig {
    /// Integration token; `None` makes every call fail with `NotConfigured`
    pub token: Option<String>,
    pub base_url: String,
    pub api_version: String,
}

/// Notion API client implementing [`RecordStore`].
#[derive(Debug, Clone)]
pub struct NotionClient {
    client: reqwest::Client,
    config: NotionConfig,
}

impl NotionClient {
    pub fn new(config: NotionConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        if config.token.is_none() {
            tracing::warn!("NOTION_TOKEN not set, records cannot be saved");
        }

        Ok(Self { client, config })
    }

    fn token(&self) -> Result<&str, StoreError> {
        self.config
            .token
            .as_deref()
            .ok_or_else(|| StoreError::NotConfigured("NOTION_TOKEN".to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send a request and decode the JSON body, mapping non-2xx statuses to `StoreError::Api`.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, StoreError> {
        let token = self.token()?;
        let response = request
            .header("Authorization", format!("Bearer {}", token))
            .header("Notion-Version", &self.config.api_version)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl RecordStore for NotionClient {
    async fn describe_field(
        &self,
        store_id: &str,
        field_name: &str,
    ) -> Result<Option<FieldDescription>, StoreError> {
        let database = self
            .send(self.client.get(self.url(&format!("databases/{}", store_id))))
            .await?;

        Ok(parse_field_description(&database, field_name))
    }

    async fn create_record(
        &self,
        store_id: &str,
        title_field: &str,
        title_value: &str,
    ) -> Result<RecordId, StoreError> {
        let body = json!({
            "parent": { "database_id": store_id },
            "properties": {
                title_field: { "title": rich_text(title_value) }
            }
        });

        let page = self
            .send(self.client.post(self.url("pages")).json(&body))
            .await?;

        let id = page["id"]
            .as_str()
            .ok_or_else(|| StoreError::InvalidResponse("page without id".to_string()))?;

        tracing::info!("Created Notion page {}", id);
        Ok(RecordId(id.to_string()))
    }

    async fn update_record(
        &self,
        record_id: &RecordId,
        fields: &FieldValues,
    ) -> Result<(), StoreError> {
        let properties: serde_json::Map<String, Value> = fields
            .iter()
            .map(|(name, value)| (name.clone(), encode_value(value)))
            .collect();

        self.send(
            self.client
                .patch(self.url(&format!("pages/{}", record_id)))
                .json(&json!({ "properties": properties })),
        )
        .await?;

        tracing::info!("Updated properties of page {}", record_id);
        Ok(())
    }

    async fn append_content_blocks(
        &self,
        record_id: &RecordId,
        paragraphs: &[String],
    ) -> Result<(), StoreError> {
        let children: Vec<Value> = paragraphs
            .iter()
            .map(|p| {
                json!({
                    "object": "block",
                    "type": "paragraph",
                    "paragraph": { "rich_text": rich_text(p) }
                })
            })
            .collect();

        self.send(
            self.client
                .patch(self.url(&format!("blocks/{}/children", record_id)))
                .json(&json!({ "children": children })),
        )
        .await?;

        tracing::info!("Appended {} paragraph(s) to page {}", paragraphs.len(), record_id);
        Ok(())
    }
}

fn rich_text(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": content } }])
}

/// Notion property payload for an encoded value.
fn encode_value(value: &EncodedValue) -> Value {
    match value {
        EncodedValue::SingleChoice(name) => json!({ "select": { "name": name } }),
        EncodedValue::MultiChoice(names) => json!({
            "multi_select": names.iter().map(|n| json!({ "name": n })).collect::<Vec<_>>()
        }),
        EncodedValue::Url(url) => json!({ "url": url }),
        EncodedValue::Raw(raw) => raw.clone(),
    }
}

/// Extract the kind and option labels of `field_name` from a database object.
fn parse_field_description(database: &Value, field_name: &str) -> Option<FieldDescription> {
    let property = database.get("properties")?.get(field_name)?;
    let type_name = property.get("type")?.as_str()?;
    let kind = FieldKind::from_type_name(type_name);

    let options = if kind.is_discrete() {
        property[type_name]["options"]
            .as_array()
            .map(|opts| {
                opts.iter()
                    .filter_map(|o| o["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    Some(FieldDescription { kind, options })
}
