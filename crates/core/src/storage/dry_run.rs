use crate::storage::{QueryPage, RecordStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Reads go to the wrapped store; writes are logged and dropped.
pub struct DryRunStore<S> {
    inner: S,
}

impl<S: RecordStore> DryRunStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl<S: RecordStore> RecordStore for DryRunStore<S> {
    async fn retrieve_database(&self, database_id: Uuid) -> Result<()> {
        self.inner.retrieve_database(database_id).await
    }

    async fn query_created_since(
        &self,
        database_id: Uuid,
        since: DateTime<Utc>,
        cursor: Option<&str>,
    ) -> Result<QueryPage> {
        self.inner
            .query_created_since(database_id, since, cursor)
            .await
    }

    async fn create_page(
        &self,
        database_id: Uuid,
        properties: Value,
        children: Vec<Value>,
    ) -> Result<Uuid> {
        let page_id = Uuid::new_v4();
        tracing::info!(
            %database_id,
            %page_id,
            dry_run = true,
            children = children.len(),
            properties = %properties,
            "skipping page creation"
        );
        Ok(page_id)
    }
}
