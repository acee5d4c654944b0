use crate::domain::article::Article;
use serde::{Deserialize, Serialize};

/// Notion rejects rich text longer than this per text object.
pub const MAX_BODY_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }

    /// Case-insensitive label match. Also accepts the bullish/bearish spelling models sometimes
    /// fall back to.
    pub fn parse_label(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "bullish" => Some(Sentiment::Positive),
            "negative" | "bearish" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    pub fn is_directional(&self) -> bool {
        !matches!(self, Sentiment::Neutral)
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated per-article output of one batch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Index as returned by the model, relative to its batch.
    pub article_index: Option<i64>,
    pub translated_title: Option<String>,
    pub tickers: Vec<String>,
    pub sentiment: Sentiment,
    pub conviction_score: u8,
    pub summary: String,
    pub risk: Option<String>,
    pub category: Option<String>,
    /// `None` when the index was missing or outside the batch.
    pub article: Option<Article>,
}

impl AnalysisResult {
    pub fn is_publishable(&self, min_conviction: u8) -> bool {
        !self.tickers.is_empty() && self.conviction_score >= min_conviction
    }
}

/// The store-facing shape of a publishable [`AnalysisResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedRecord {
    pub title: String,
    pub tickers: Vec<String>,
    pub sentiment: Sentiment,
    pub conviction_score: u8,
    pub summary: String,
    pub risk: Option<String>,
    pub category: Option<String>,
    pub link: Option<String>,
    pub article_summary: String,
}

impl PublishedRecord {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let article = result.article.as_ref();

        let title = result
            .translated_title
            .clone()
            .or_else(|| article.map(|a| a.title.clone()))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "N/A".to_string());

        let link = article
            .map(|a| a.link.trim().to_string())
            .filter(|s| !s.is_empty());

        let article_summary = article
            .map(|a| a.summary.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("N/A");

        Self {
            title,
            tickers: result.tickers.clone(),
            sentiment: result.sentiment,
            conviction_score: result.conviction_score,
            summary: result.summary.clone(),
            risk: result.risk.clone(),
            category: result.category.clone(),
            link,
            article_summary: truncate_chars(article_summary, MAX_BODY_CHARS),
        }
    }

    pub fn tickers_text(&self) -> String {
        self.tickers.join(", ")
    }
}

/// Char-boundary safe truncation (titles and summaries are often Korean).
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
