use crate::ingest::feeds::{default_sources, parse_sources, FeedSource};
use crate::time::schedule::parse_weekday;
use chrono::Weekday;

const DEFAULT_FEED_MAX_ITEMS: usize = 10;
const DEFAULT_BATCH_SIZE: usize = 4;
const DEFAULT_MIN_CONVICTION: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub feeds: Vec<FeedSource>,
    /// Entries kept per feed.
    pub feed_max_items: usize,
    /// Articles per model call.
    pub batch_size: usize,
    /// Results scoring below this are not published.
    pub min_conviction: u8,
    pub weekly_report_weekday: Weekday,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            feeds: default_sources(),
            feed_max_items: DEFAULT_FEED_MAX_ITEMS,
            batch_size: DEFAULT_BATCH_SIZE,
            min_conviction: DEFAULT_MIN_CONVICTION,
            weekly_report_weekday: Weekday::Mon,
        }
    }
}

impl PipelineOptions {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let feeds = match std::env::var("RSS_FEEDS").ok().filter(|s| !s.trim().is_empty()) {
            Some(list) => parse_sources(&list)?,
            None => defaults.feeds,
        };
        let weekly_report_weekday = match std::env::var("WEEKLY_REPORT_WEEKDAY")
            .ok()
            .filter(|s| !s.trim().is_empty())
        {
            Some(s) => parse_weekday(&s)?,
            None => defaults.weekly_report_weekday,
        };

        let options = Self {
            feeds,
            feed_max_items: std::env::var("FEED_MAX_ITEMS")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.feed_max_items),
            batch_size: std::env::var("ANALYSIS_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.batch_size),
            min_conviction: std::env::var("PUBLISH_MIN_CONVICTION")
                .ok()
                .and_then(|s| s.parse::<u8>().ok())
                .unwrap_or(defaults.min_conviction),
            weekly_report_weekday,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.feeds.is_empty(), "at least one feed is required");
        anyhow::ensure!(self.feed_max_items >= 1, "FEED_MAX_ITEMS must be >= 1");
        anyhow::ensure!(self.batch_size >= 1, "ANALYSIS_BATCH_SIZE must be >= 1");
        anyhow::ensure!(
            self.min_conviction <= 10,
            "PUBLISH_MIN_CONVICTION must be 0..=10 (got {})",
            self.min_conviction
        );
        Ok(())
    }
}
