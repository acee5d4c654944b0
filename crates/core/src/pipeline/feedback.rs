use crate::domain::verdict::{percent_change, Verdict};
use crate::ingest::market::last_two_closes;
use crate::pipeline::context::RunContext;
use crate::storage::schema::{decode_prediction, verdict_properties, PublishedPrediction};
use crate::time::schedule::RunClock;
use anyhow::Context;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackOutcome {
    /// Analysis rows found in the window.
    pub checked: usize,
    pub written: usize,
    pub correct: usize,
    /// Rows without a ticker or a directional prediction.
    pub skipped: usize,
    /// Rows dropped on market data or write errors.
    pub failed: usize,
}

/// Score yesterday's published predictions against the latest daily close.
///
/// Errors only when the analysis database cannot be queried. Per-row problems are logged.
pub async fn verify_predictions(ctx: &mut RunContext, clock: &RunClock) -> anyhow::Result<FeedbackOutcome> {
    let since = clock.yesterday_cutoff();
    let database_id = ctx.databases.analysis;
    let rows = ctx
        .query_all(database_id, since)
        .await
        .context("failed to query published analyses")?;
    tracing::info!(rows = rows.len(), %since, "verifying predictions");

    let mut outcome = FeedbackOutcome {
        checked: rows.len(),
        ..FeedbackOutcome::default()
    };
    for page in &rows {
        let prediction = decode_prediction(page);
        match verify_one(ctx, &prediction).await {
            Ok(Some(correct)) => {
                outcome.written += 1;
                if correct {
                    outcome.correct += 1;
                }
            }
            Ok(None) => outcome.skipped += 1,
            Err(err) => {
                outcome.failed += 1;
                tracing::warn!(page_id = %prediction.page_id, error = %format!("{err:#}"), "verification skipped");
            }
        }
    }

    tracing::info!(
        checked = outcome.checked,
        written = outcome.written,
        correct = outcome.correct,
        skipped = outcome.skipped,
        failed = outcome.failed,
        "verification finished"
    );
    Ok(outcome)
}

/// `Ok(None)` when the row has nothing to score.
async fn verify_one(ctx: &mut RunContext, prediction: &PublishedPrediction) -> anyhow::Result<Option<bool>> {
    let Some(ticker) = prediction.first_ticker() else {
        return Ok(None);
    };
    let Some(predicted) = prediction.sentiment().filter(|s| s.is_directional()) else {
        tracing::debug!(ticker, "non-directional prediction");
        return Ok(None);
    };

    let closes = ctx.daily_closes(ticker).await?;
    let Some((prev, last)) = last_two_closes(&closes) else {
        tracing::warn!(ticker, closes = closes.len(), "not enough price history");
        return Ok(None);
    };
    let change = percent_change(prev, last)
        .with_context(|| format!("unusable closes for {ticker}: {prev} -> {last}"))?;

    let Some(verdict) = Verdict::evaluate(ticker, predicted, change) else {
        return Ok(None);
    };
    let database_id = ctx.databases.feedback;
    let page_id = ctx
        .create_page(database_id, verdict_properties(&verdict), Vec::new())
        .await?;
    tracing::info!(
        %page_id,
        ticker,
        predicted = %predicted,
        change_pct = verdict.actual_change_pct,
        correct = verdict.correct,
        "verdict recorded"
    );
    Ok(Some(verdict.correct))
}
