use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One news entry pulled from a feed. Lives for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub source: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: DateTime<Utc>,
}
