use crate::domain::article::Article;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = "Mozilla/5.0 (compatible; marketlens/0.1; +rss)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

pub fn default_sources() -> Vec<FeedSource> {
    vec![
        FeedSource::new("Yahoo Finance", "https://finance.yahoo.com/rss/topstories"),
        FeedSource::new("CNBC", "https://www.cnbc.com/id/100003114/device/rss/rss.html"),
        FeedSource::new("MarketWatch", "http://feeds.marketwatch.com/marketwatch/topstories/"),
        FeedSource::new("Seeking Alpha", "https://seekingalpha.com/feed.xml"),
    ]
}

/// Parse `Name=url,Name=url`. Order is preserved.
pub fn parse_sources(list: &str) -> Result<Vec<FeedSource>> {
    let mut out = Vec::new();
    for part in list.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (name, url) = part
            .split_once('=')
            .with_context(|| format!("feed entry must be Name=url (got {part:?})"))?;
        let (name, url) = (name.trim(), url.trim());
        anyhow::ensure!(!name.is_empty(), "feed name must be non-empty in {part:?}");
        anyhow::ensure!(
            url.starts_with("http://") || url.starts_with("https://"),
            "feed url must be http(s) in {part:?}"
        );
        out.push(FeedSource::new(name, url));
    }
    anyhow::ensure!(!out.is_empty(), "feed list is empty");
    Ok(out)
}

#[async_trait::async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    http: reqwest::Client,
}

impl HttpFeedClient {
    pub fn from_env() -> Result<Self> {
        let timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build feed http client")?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("feed request failed: {url}"))?;

        let status = res.status();
        anyhow::ensure!(status.is_success(), "feed HTTP {status}: {url}");

        let bytes = res
            .bytes()
            .await
            .with_context(|| format!("failed to read feed body: {url}"))?;
        Ok(bytes.to_vec())
    }
}

/// Parse an RSS/Atom body into at most `max_items` articles, in feed order.
pub fn parse_articles(
    source: &str,
    body: &[u8],
    max_items: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Article>> {
    let feed = feed_rs::parser::parse(body).with_context(|| format!("failed to parse feed {source}"))?;

    let articles = feed
        .entries
        .into_iter()
        .take(max_items)
        .map(|entry| {
            let title = entry
                .title
                .map(|t| strip_html(&t.content))
                .unwrap_or_default();
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .map(|s| strip_html(&s))
                .unwrap_or_default();

            Article {
                source: source.to_string(),
                title,
                link,
                summary,
                published: entry.published.or(entry.updated).unwrap_or(now),
            }
        })
        .collect();

    Ok(articles)
}

/// Strip HTML tags and collapse whitespace.
pub(crate) fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
