use crate::domain::analysis::{AnalysisResult, PublishedRecord};
use crate::pipeline::context::RunContext;
use crate::storage::schema::{analysis_children, analysis_properties};

/// Create one analysis page per publishable result. Returns how many were created.
pub async fn publish_results(ctx: &mut RunContext, results: &[AnalysisResult]) -> usize {
    let min_conviction = ctx.options.min_conviction;
    let database_id = ctx.databases.analysis;

    let publishable: Vec<&AnalysisResult> = results
        .iter()
        .filter(|r| r.is_publishable(min_conviction))
        .collect();
    tracing::info!(
        results = results.len(),
        publishable = publishable.len(),
        min_conviction,
        "publishing results"
    );

    let mut created = 0;
    for result in publishable {
        let record = PublishedRecord::from_result(result);
        let properties = analysis_properties(&record);
        let children = analysis_children(&record);

        match ctx.create_page(database_id, properties, children).await {
            Ok(page_id) => {
                created += 1;
                tracing::info!(%page_id, tickers = %record.tickers_text(), score = record.conviction_score, "published");
            }
            Err(err) => {
                tracing::error!(title = %record.title, error = %format!("{err:#}"), "publish failed");
            }
        }
    }
    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::Sentiment;
    use crate::llm::json::parse_analysis_batch;
    use crate::pipeline::fakes::{Fakes, ANALYSIS_DB};
    use crate::storage::schema::analysis;

    fn result(tickers: &[&str], score: u8) -> AnalysisResult {
        AnalysisResult {
            article_index: Some(0),
            translated_title: Some(format!("score {score}")),
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            sentiment: Sentiment::Negative,
            conviction_score: score,
            summary: "요약".to_string(),
            risk: None,
            category: None,
            article: None,
        }
    }

    #[tokio::test]
    async fn publishes_only_at_or_above_cutoff_with_tickers() {
        let fakes = Fakes::default();
        let mut ctx = fakes.context();

        let results = vec![
            result(&["AAPL"], 5),
            result(&["AAPL"], 6),
            result(&["NVDA", "AMD"], 9),
            result(&[], 10),
        ];
        assert_eq!(publish_results(&mut ctx, &results).await, 2);

        let created = fakes.store.created_in(ANALYSIS_DB);
        let titles: Vec<_> = created
            .iter()
            .map(|c| c.properties[analysis::TITLE]["title"][0]["text"]["content"].clone())
            .collect();
        assert_eq!(titles, vec!["score 6", "score 9"]);
        assert_eq!(
            created[1].properties[analysis::TICKERS]["rich_text"][0]["text"]["content"],
            "NVDA, AMD"
        );
        assert_eq!(created[0].properties[analysis::SENTIMENT]["select"]["name"], "Negative");
        assert_eq!(created[0].children.len(), 2);
    }

    #[tokio::test]
    async fn fractional_score_under_cutoff_is_not_published() {
        let fakes = Fakes::default();
        let mut ctx = fakes.context();

        let results = parse_analysis_batch(
            r#"[{"article_index": 0, "mentioned_tickers": ["AAPL"], "sentiment": "Positive", "conviction_score": 5.5},
                {"article_index": 1, "mentioned_tickers": ["MSFT"], "sentiment": "Positive", "conviction_score": 6.0}]"#,
        )
        .unwrap();
        assert_eq!(publish_results(&mut ctx, &results).await, 1);

        let created = fakes.store.created_in(ANALYSIS_DB);
        assert_eq!(created[0].properties[analysis::TICKERS]["rich_text"][0]["text"]["content"], "MSFT");
    }

    #[tokio::test]
    async fn create_failures_are_skipped() {
        let fakes = Fakes::default();
        fakes.store.fail_creates();
        let mut ctx = fakes.context();

        let created = publish_results(&mut ctx, &[result(&["AAPL"], 8), result(&["MSFT"], 8)]).await;
        assert_eq!(created, 0);
        assert_eq!(fakes.journal().len(), 2);
    }
}
