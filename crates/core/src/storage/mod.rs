pub mod dry_run;
pub mod notion;
pub mod schema;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// A database row as returned by a query.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: Uuid,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// One page of query results. `next_cursor` is set only when more results remain.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub results: Vec<Page>,
    pub next_cursor: Option<String>,
}

/// The hosted database. Every method is exactly one remote call.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn retrieve_database(&self, database_id: Uuid) -> Result<()>;

    async fn query_created_since(
        &self,
        database_id: Uuid,
        since: DateTime<Utc>,
        cursor: Option<&str>,
    ) -> Result<QueryPage>;

    async fn create_page(
        &self,
        database_id: Uuid,
        properties: Value,
        children: Vec<Value>,
    ) -> Result<Uuid>;
}
