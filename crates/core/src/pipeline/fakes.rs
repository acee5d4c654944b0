//! In-memory stand-ins for the external services, sharing one call journal.

use crate::config::DatabaseIds;
use crate::domain::verdict::Verdict;
use crate::ingest::feeds::{FeedClient, FeedSource};
use crate::ingest::market::{DailyClose, PriceHistoryProvider};
use crate::llm::rate_limit::RateLimiter;
use crate::llm::{LlmClient, Provider};
use crate::pipeline::context::{CallCounter, RunContext};
use crate::pipeline::options::PipelineOptions;
use crate::storage::schema::{self, analysis};
use crate::storage::{Page, QueryPage, RecordStore};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const ANALYSIS_DB: Uuid = Uuid::from_u128(0xa1);
pub const FEEDBACK_DB: Uuid = Uuid::from_u128(0xf2);
pub const REPORT_DB: Uuid = Uuid::from_u128(0xc3);

pub type Journal = Arc<Mutex<Vec<String>>>;

fn db_name(id: Uuid) -> &'static str {
    if id == ANALYSIS_DB {
        "analysis"
    } else if id == FEEDBACK_DB {
        "feedback"
    } else if id == REPORT_DB {
        "report"
    } else {
        "unknown"
    }
}

fn note(journal: &Journal, entry: String) {
    journal.lock().unwrap().push(entry);
}

#[derive(Clone, Default)]
pub struct FakeLlm {
    journal: Journal,
    replies: Arc<Mutex<VecDeque<Result<String, String>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl FakeLlm {
    pub fn reply(&self, text: &str) {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn fail(&self, message: &str) {
        self.replies.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for FakeLlm {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        note(&self.journal, "llm".to_string());
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted reply")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Created {
    pub database_id: Uuid,
    pub properties: Value,
    pub children: Vec<Value>,
}

#[derive(Default)]
struct StoreState {
    rows: HashMap<Uuid, Vec<Page>>,
    created: Vec<Created>,
    unreachable: HashSet<Uuid>,
    failing_queries: HashSet<Uuid>,
    fail_creates: bool,
    page_size: Option<usize>,
}

#[derive(Clone, Default)]
pub struct FakeStore {
    journal: Journal,
    state: Arc<Mutex<StoreState>>,
}

impl FakeStore {
    pub fn with_page_size(self, n: usize) -> Self {
        self.state.lock().unwrap().page_size = Some(n);
        self
    }

    pub fn seed(&self, database_id: Uuid, properties: Map<String, Value>) {
        let page = Page {
            id: Uuid::new_v4(),
            created_time: Some(Utc::now()),
            properties,
        };
        self.state
            .lock()
            .unwrap()
            .rows
            .entry(database_id)
            .or_default()
            .push(page);
    }

    pub fn unreachable(&self, database_id: Uuid) {
        self.state.lock().unwrap().unreachable.insert(database_id);
    }

    pub fn fail_queries(&self, database_id: Uuid) {
        self.state.lock().unwrap().failing_queries.insert(database_id);
    }

    pub fn fail_creates(&self) {
        self.state.lock().unwrap().fail_creates = true;
    }

    pub fn created_in(&self, database_id: Uuid) -> Vec<Created> {
        self.state
            .lock()
            .unwrap()
            .created
            .iter()
            .filter(|c| c.database_id == database_id)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl RecordStore for FakeStore {
    async fn retrieve_database(&self, database_id: Uuid) -> Result<()> {
        note(&self.journal, format!("retrieve {}", db_name(database_id)));
        if self.state.lock().unwrap().unreachable.contains(&database_id) {
            return Err(anyhow!("Notion retrieve database failed: HTTP 404 Not Found"));
        }
        Ok(())
    }

    async fn query_created_since(
        &self,
        database_id: Uuid,
        _since: DateTime<Utc>,
        cursor: Option<&str>,
    ) -> Result<QueryPage> {
        note(&self.journal, format!("query {}", db_name(database_id)));
        let state = self.state.lock().unwrap();
        if state.failing_queries.contains(&database_id) {
            return Err(anyhow!("Notion query database failed: HTTP 500"));
        }

        let rows = state.rows.get(&database_id).cloned().unwrap_or_default();
        let start = cursor.map(|c| c.parse::<usize>().unwrap()).unwrap_or(0);
        let end = match state.page_size {
            Some(n) => (start + n).min(rows.len()),
            None => rows.len(),
        };
        Ok(QueryPage {
            results: rows[start..end].to_vec(),
            next_cursor: (end < rows.len()).then(|| end.to_string()),
        })
    }

    async fn create_page(
        &self,
        database_id: Uuid,
        properties: Value,
        children: Vec<Value>,
    ) -> Result<Uuid> {
        note(&self.journal, format!("create {}", db_name(database_id)));
        let mut state = self.state.lock().unwrap();
        if state.fail_creates {
            return Err(anyhow!("Notion create page failed: HTTP 400 (validation_error)"));
        }
        state.created.push(Created {
            database_id,
            properties,
            children,
        });
        Ok(Uuid::new_v4())
    }
}

#[derive(Clone, Default)]
pub struct FakeMarket {
    journal: Journal,
    closes: Arc<Mutex<HashMap<String, Vec<f64>>>>,
}

impl FakeMarket {
    pub fn set(&self, ticker: &str, closes: &[f64]) {
        self.closes
            .lock()
            .unwrap()
            .insert(ticker.to_string(), closes.to_vec());
    }
}

#[async_trait::async_trait]
impl PriceHistoryProvider for FakeMarket {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn daily_closes(&self, ticker: &str) -> Result<Vec<DailyClose>> {
        note(&self.journal, format!("market {ticker}"));
        let closes = self
            .closes
            .lock()
            .unwrap()
            .get(ticker)
            .cloned()
            .ok_or_else(|| anyhow!("no chart data for {ticker}"))?;
        let start = Utc.with_ymd_and_hms(2026, 10, 15, 20, 0, 0).unwrap();
        Ok(closes
            .into_iter()
            .enumerate()
            .map(|(i, close)| DailyClose {
                at: start + Duration::days(i as i64),
                close,
            })
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct FakeFeeds {
    journal: Journal,
    bodies: Arc<Mutex<HashMap<String, String>>>,
}

impl FakeFeeds {
    pub fn serve(&self, url: &str, body: String) {
        self.bodies.lock().unwrap().insert(url.to_string(), body);
    }
}

#[async_trait::async_trait]
impl FeedClient for FakeFeeds {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        note(&self.journal, format!("feed {url}"));
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .map(|b| b.clone().into_bytes())
            .ok_or_else(|| anyhow!("feed request failed: {url}"))
    }
}

/// One set of fakes whose calls all land in the same journal.
pub struct Fakes {
    pub journal: Journal,
    pub llm: FakeLlm,
    pub store: FakeStore,
    pub market: FakeMarket,
    pub feeds: FakeFeeds,
}

impl Default for Fakes {
    fn default() -> Self {
        let journal = Journal::default();
        Self {
            llm: FakeLlm {
                journal: journal.clone(),
                ..FakeLlm::default()
            },
            store: FakeStore {
                journal: journal.clone(),
                ..FakeStore::default()
            },
            market: FakeMarket {
                journal: journal.clone(),
                ..FakeMarket::default()
            },
            feeds: FakeFeeds {
                journal: journal.clone(),
                ..FakeFeeds::default()
            },
            journal,
        }
    }
}

impl Fakes {
    pub fn context(&self) -> RunContext {
        self.context_with(PipelineOptions {
            feeds: vec![
                FeedSource::new("A", "https://a.test/rss"),
                FeedSource::new("B", "https://b.test/rss"),
            ],
            ..PipelineOptions::default()
        })
    }

    pub fn context_with(&self, options: PipelineOptions) -> RunContext {
        RunContext {
            llm: Box::new(self.llm.clone()),
            store: Box::new(self.store.clone()),
            market: Box::new(self.market.clone()),
            feeds: Box::new(self.feeds.clone()),
            limiter: RateLimiter::per_minute(6000, 100).unwrap(),
            calls: CallCounter::default(),
            databases: DatabaseIds {
                analysis: ANALYSIS_DB,
                feedback: FEEDBACK_DB,
                report: REPORT_DB,
            },
            options,
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

/// A row of the analysis database as Notion returns it.
pub fn prediction_row(tickers: &str, sentiment: Option<&str>) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(
        analysis::TICKERS.to_string(),
        json!({"type": "rich_text", "rich_text": [{"plain_text": tickers}]}),
    );
    props.insert(
        analysis::SENTIMENT.to_string(),
        json!({"type": "select", "select": sentiment.map(|s| json!({"name": s}))}),
    );
    props
}

pub fn verdict_row(verdict: &Verdict) -> Map<String, Value> {
    match schema::verdict_properties(verdict) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}
