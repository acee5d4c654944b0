use crate::config::Settings;
use crate::storage::{Page, QueryPage, RecordStore};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

const NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_BASE_URL: &str = "https://api.notion.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl NotionClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_notion_api_key()?.to_string();
        let base_url =
            std::env::var("NOTION_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(api_key, base_url, Duration::from_secs(timeout_secs))
    }

    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Notion http client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert("Notion-Version", HeaderValue::from_static(NOTION_VERSION));
        Ok(headers)
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<Value> {
        let res = req
            .headers(self.headers()?)
            .send()
            .await
            .with_context(|| format!("Notion {what} request failed"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read Notion {what} response"))?;

        if !status.is_success() {
            // Notion errors look like {"object":"error","code":"...","message":"..."}.
            let detail = serde_json::from_str::<NotionError>(&text)
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or(text);
            anyhow::bail!("Notion {what} failed: HTTP {status} ({detail})");
        }

        serde_json::from_str::<Value>(&text)
            .with_context(|| format!("Notion {what} response is not valid JSON"))
    }
}

#[derive(Debug, Deserialize)]
struct NotionError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: Uuid,
}

pub(crate) fn created_since_filter(since: DateTime<Utc>, cursor: Option<&str>) -> Value {
    let mut body = json!({
        "filter": {
            "timestamp": "created_time",
            "created_time": {"on_or_after": since.to_rfc3339_opts(SecondsFormat::Secs, true)}
        },
        "page_size": PAGE_SIZE,
    });
    if let Some(cursor) = cursor {
        body["start_cursor"] = json!(cursor);
    }
    body
}

#[async_trait::async_trait]
impl RecordStore for NotionClient {
    async fn retrieve_database(&self, database_id: Uuid) -> Result<()> {
        let req = self.http.get(self.url(&format!("/databases/{database_id}")));
        self.send(req, "retrieve database").await?;
        Ok(())
    }

    async fn query_created_since(
        &self,
        database_id: Uuid,
        since: DateTime<Utc>,
        cursor: Option<&str>,
    ) -> Result<QueryPage> {
        let req = self
            .http
            .post(self.url(&format!("/databases/{database_id}/query")))
            .json(&created_since_filter(since, cursor));
        let raw = self.send(req, "query database").await?;

        let parsed = serde_json::from_value::<QueryResponse>(raw)
            .context("failed to decode Notion query response")?;
        Ok(QueryPage {
            results: parsed.results,
            next_cursor: parsed.next_cursor.filter(|_| parsed.has_more),
        })
    }

    async fn create_page(
        &self,
        database_id: Uuid,
        properties: Value,
        children: Vec<Value>,
    ) -> Result<Uuid> {
        let mut body = json!({
            "parent": {"database_id": database_id.to_string()},
            "properties": properties,
        });
        if !children.is_empty() {
            body["children"] = Value::Array(children);
        }

        let req = self.http.post(self.url("/pages")).json(&body);
        let raw = self.send(req, "create page").await?;
        let created = serde_json::from_value::<CreatedPage>(raw)
            .context("failed to decode Notion create page response")?;
        Ok(created.id)
    }
}
