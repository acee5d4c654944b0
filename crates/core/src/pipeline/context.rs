use crate::config::DatabaseIds;
use crate::ingest::feeds::FeedClient;
use crate::ingest::market::{DailyClose, PriceHistoryProvider};
use crate::llm::rate_limit::RateLimiter;
use crate::llm::LlmClient;
use crate::pipeline::options::PipelineOptions;
use crate::storage::{Page, RecordStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Gemini,
    Notion,
    MarketData,
    Feed,
}

impl Service {
    pub const ALL: [Service; 4] = [
        Service::Gemini,
        Service::Notion,
        Service::MarketData,
        Service::Feed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Gemini => "gemini",
            Service::Notion => "notion",
            Service::MarketData => "market_data",
            Service::Feed => "feed",
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

/// External calls made during one run. Attempts are counted, whether or not they succeed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounter {
    counts: [u64; 4],
}

impl CallCounter {
    pub fn record(&mut self, service: Service) {
        self.counts[service.slot()] += 1;
    }

    pub fn get(&self, service: Service) -> u64 {
        self.counts[service.slot()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn log_summary(&self) {
        for service in Service::ALL {
            tracing::info!(service = service.as_str(), calls = self.get(service), "external calls");
        }
        tracing::info!(total = self.total(), "external calls total");
    }
}

/// Everything one run needs. Owned by the caller and threaded through each stage.
pub struct RunContext {
    pub llm: Box<dyn LlmClient>,
    pub store: Box<dyn RecordStore>,
    pub market: Box<dyn PriceHistoryProvider>,
    pub feeds: Box<dyn FeedClient>,
    pub limiter: RateLimiter,
    pub calls: CallCounter,
    pub databases: DatabaseIds,
    pub options: PipelineOptions,
}

impl RunContext {
    /// One model call, after waiting on the rate limiter.
    pub async fn generate(&mut self, prompt: &str) -> Result<String> {
        let waited = self.limiter.acquire().await;
        if !waited.is_zero() {
            tracing::debug!(waited_ms = waited.as_millis() as u64, "rate limiter released");
        }
        self.calls.record(Service::Gemini);
        self.llm.generate_text(prompt).await
    }

    pub async fn retrieve_database(&mut self, database_id: Uuid) -> Result<()> {
        self.calls.record(Service::Notion);
        self.store.retrieve_database(database_id).await
    }

    pub async fn create_page(
        &mut self,
        database_id: Uuid,
        properties: Value,
        children: Vec<Value>,
    ) -> Result<Uuid> {
        self.calls.record(Service::Notion);
        self.store
            .create_page(database_id, properties, children)
            .await
    }

    /// All rows created at or after `since`, following pagination. Each page fetched is one call.
    pub async fn query_all(&mut self, database_id: Uuid, since: DateTime<Utc>) -> Result<Vec<Page>> {
        let mut rows = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            self.calls.record(Service::Notion);
            let page = self
                .store
                .query_created_since(database_id, since, cursor.as_deref())
                .await?;
            rows.extend(page.results);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(rows),
            }
        }
    }

    pub async fn daily_closes(&mut self, ticker: &str) -> Result<Vec<DailyClose>> {
        self.calls.record(Service::MarketData);
        self.market.daily_closes(ticker).await
    }

    pub async fn fetch_feed(&mut self, url: &str) -> Result<Vec<u8>> {
        self.calls.record(Service::Feed);
        self.feeds.fetch(url).await
    }
}
