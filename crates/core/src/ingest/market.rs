use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RANGE: &str = "2d";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; marketlens/0.1)";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyClose {
    pub at: DateTime<Utc>,
    pub close: f64,
}

/// Two most recent closes as (previous, last), if there are at least two.
pub fn last_two_closes(history: &[DailyClose]) -> Option<(f64, f64)> {
    match history {
        [.., prev, last] => Some((prev.close, last.close)),
        _ => None,
    }
}

#[async_trait::async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Daily closes in ascending time order. Bars without a close are dropped.
    async fn daily_closes(&self, ticker: &str) -> Result<Vec<DailyClose>>;
}

#[derive(Debug, Clone)]
pub struct YahooChartClient {
    http: reqwest::Client,
    base_url: String,
    range: String,
}

impl YahooChartClient {
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("MARKET_DATA_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(base_url, Duration::from_secs(timeout_secs))
    }

    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            range: DEFAULT_RANGE.to_string(),
        })
    }

    fn url(&self, ticker: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            ticker
        )
    }
}

#[async_trait::async_trait]
impl PriceHistoryProvider for YahooChartClient {
    fn provider_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn daily_closes(&self, ticker: &str) -> Result<Vec<DailyClose>> {
        validate_ticker(ticker)?;

        let res = self
            .http
            .get(self.url(ticker))
            .query(&[("range", self.range.as_str()), ("interval", "1d")])
            .send()
            .await
            .context("market data request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;
        if !status.is_success() {
            anyhow::bail!("market data HTTP {status} for {ticker}: {text}");
        }

        let parsed = serde_json::from_str::<ChartResponse>(&text)
            .with_context(|| format!("market data response is not a chart payload: {text}"))?;
        parsed.into_closes(ticker)
    }
}

fn validate_ticker(ticker: &str) -> Result<()> {
    anyhow::ensure!(!ticker.is_empty(), "ticker must be non-empty");
    anyhow::ensure!(
        ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')),
        "ticker contains unsupported characters: {ticker:?}"
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResponse {
    fn into_closes(self, ticker: &str) -> Result<Vec<DailyClose>> {
        if let Some(err) = self.chart.error.filter(|e| !e.is_null()) {
            anyhow::bail!("market data error for {ticker}: {err}");
        }

        let result = self
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .with_context(|| format!("no chart data for {ticker}"))?;
        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        let mut out: Vec<DailyClose> = result
            .timestamp
            .iter()
            .zip(closes)
            .filter_map(|(ts, close)| {
                let close = close.filter(|c| c.is_finite())?;
                let at = DateTime::from_timestamp(*ts, 0)?;
                Some(DailyClose { at, close })
            })
            .collect();
        out.sort_by_key(|c| c.at);
        Ok(out)
    }
}
