use crate::domain::article::Article;
use crate::ingest::feeds::parse_articles;
use crate::pipeline::context::RunContext;
use chrono::{DateTime, Utc};

/// Fetch every configured feed in order. A source that fails to fetch or parse is skipped.
pub async fn collect_articles(ctx: &mut RunContext, now: DateTime<Utc>) -> Vec<Article> {
    let sources = ctx.options.feeds.clone();
    let max_items = ctx.options.feed_max_items;

    let mut articles = Vec::new();
    for source in &sources {
        let fetched = ctx
            .fetch_feed(&source.url)
            .await
            .and_then(|body| parse_articles(&source.name, &body, max_items, now));

        match fetched {
            Ok(items) => {
                tracing::info!(source = %source.name, items = items.len(), "collected feed");
                articles.extend(items);
            }
            Err(err) => {
                tracing::warn!(source = %source.name, url = %source.url, error = %format!("{err:#}"), "feed skipped");
            }
        }
    }

    tracing::info!(sources = sources.len(), articles = articles.len(), "collection finished");
    articles
}
