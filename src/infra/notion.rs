//! Notion REST client backing [`ContentSource`].

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, Method, Response, Url,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::application::repos::{
    ContentSource, PropertyMap, PropertyValue, QueryFilter, QuerySpec, RawRecord, SortDirection,
    SourceError,
};
use crate::infra::error::InfraError;

const NOTION_VERSION_HEADER: &str = "notion-version";
const PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct NotionClient {
    client: Client,
    base: Url,
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

/// One page of a paginated list response.
#[derive(Debug, Deserialize)]
struct ListPage<T> {
    results: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
}

impl NotionClient {
    pub fn new(
        base: Url,
        api_key: &str,
        version: &str,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|err| InfraError::configuration(format!("invalid notion api key: {err}")))?;
        headers.insert(AUTHORIZATION, bearer);
        let version = HeaderValue::from_str(version)
            .map_err(|err| InfraError::configuration(format!("invalid notion version: {err}")))?;
        headers.insert(NOTION_VERSION_HEADER, version);

        let client = Client::builder()
            .user_agent(concat!("sitesync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;

        Ok(Self { client, base })
    }

    fn url(&self, path: &str) -> Result<Url, SourceError> {
        self.base.join(path).map_err(SourceError::malformed)
    }

    async fn send(&self, method: Method, url: Url, body: Option<Value>) -> Result<Value, SourceError> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(SourceError::unavailable)?;
        Self::handle(response).await
    }

    async fn handle(response: Response) -> Result<Value, SourceError> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(SourceError::unavailable)?;
        if !status.is_success() {
            return Err(SourceError::Rejected {
                status: status.as_u16(),
                message: error_message(&bytes),
            });
        }
        serde_json::from_slice(&bytes).map_err(SourceError::malformed)
    }

    async fn list_page<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<ListPage<T>, SourceError> {
        let value = self.send(method, url, body).await?;
        serde_json::from_value(value).map_err(SourceError::malformed)
    }
}

#[async_trait]
impl ContentSource for NotionClient {
    async fn query(&self, spec: &QuerySpec) -> Result<Vec<RawRecord>, SourceError> {
        let url = self.url(&format!("databases/{}/query", spec.database_id))?;
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let body = query_body(spec, cursor.as_deref());
            let page: ListPage<RawRecord> =
                self.list_page(Method::POST, url.clone(), Some(body)).await?;
            records.extend(page.results);

            cursor = next_cursor(&mut seen, page.has_more, page.next_cursor);
            if cursor.is_none() {
                break;
            }
        }

        debug!(
            target = "sitesync::infra::notion",
            database = %spec.database_id,
            records = records.len(),
            "database query complete"
        );
        Ok(records)
    }

    async fn block_children(&self, record_id: &str) -> Result<Vec<Value>, SourceError> {
        let base = self.url(&format!("blocks/{record_id}/children"))?;
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let mut url = base.clone();
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("page_size", &PAGE_SIZE.to_string());
                if let Some(cursor) = cursor.as_deref() {
                    pairs.append_pair("start_cursor", cursor);
                }
            }
            let page: ListPage<Value> = self.list_page(Method::GET, url, None).await?;
            blocks.extend(page.results);

            cursor = next_cursor(&mut seen, page.has_more, page.next_cursor);
            if cursor.is_none() {
                break;
            }
        }

        Ok(blocks)
    }

    async fn create_record(
        &self,
        database_id: &str,
        properties: PropertyMap,
    ) -> Result<String, SourceError> {
        let url = self.url("pages")?;
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": properties_body(&properties),
        });
        let value = self.send(Method::POST, url, Some(body)).await?;
        let created: CreatedPage = serde_json::from_value(value).map_err(SourceError::malformed)?;
        Ok(created.id)
    }
}

/// Cursor for the next page. `None` once the listing is exhausted or the
/// server hands back a cursor it already gave out.
fn next_cursor(
    seen: &mut HashSet<String>,
    has_more: bool,
    next: Option<String>,
) -> Option<String> {
    let next = next.filter(|_| has_more)?;
    if !seen.insert(next.clone()) {
        warn!(
            target = "sitesync::infra::notion",
            cursor = next.as_str(),
            "pagination cursor repeated, stopping"
        );
        return None;
    }
    Some(next)
}

fn query_body(spec: &QuerySpec, cursor: Option<&str>) -> Value {
    let mut body = Map::new();
    body.insert("page_size".to_string(), json!(PAGE_SIZE));

    if let Some(QueryFilter::CheckboxEquals { property, value }) = spec.filter.as_ref() {
        body.insert(
            "filter".to_string(),
            json!({ "property": property, "checkbox": { "equals": value } }),
        );
    }

    if !spec.sorts.is_empty() {
        let sorts: Vec<Value> = spec
            .sorts
            .iter()
            .map(|sort| {
                let direction = match sort.direction {
                    SortDirection::Ascending => "ascending",
                    SortDirection::Descending => "descending",
                };
                json!({ "property": sort.property, "direction": direction })
            })
            .collect();
        body.insert("sorts".to_string(), Value::Array(sorts));
    }

    if let Some(cursor) = cursor {
        body.insert("start_cursor".to_string(), json!(cursor));
    }

    Value::Object(body)
}

fn properties_body(properties: &PropertyMap) -> Value {
    let encoded: Map<String, Value> = properties
        .iter()
        .map(|(name, value)| (name.clone(), property_json(value)))
        .collect();
    Value::Object(encoded)
}

fn property_json(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Title(text) => json!({ "title": [{ "text": { "content": text } }] }),
        PropertyValue::RichText(text) => {
            json!({ "rich_text": [{ "text": { "content": text } }] })
        }
        PropertyValue::Email(email) => json!({ "email": email }),
        PropertyValue::Phone(phone) => json!({ "phone_number": phone }),
        PropertyValue::Select(name) => json!({ "select": { "name": name } }),
    }
}

/// Notion error bodies carry a `message`; fall back to the raw text.
fn error_message(bytes: &[u8]) -> String {
    serde_json::from_slice::<Value>(bytes)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
}
