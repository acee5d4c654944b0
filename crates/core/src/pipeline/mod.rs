//! The daily run: stages in a fixed order over one [`RunContext`].

pub mod analyze;
pub mod collect;
pub mod context;
pub mod feedback;
pub mod options;
pub mod publish;
pub mod weekly;

#[cfg(test)]
pub(crate) mod fakes;

pub use context::{CallCounter, RunContext, Service};
pub use options::PipelineOptions;

use crate::time::schedule::RunClock;
use feedback::FeedbackOutcome;
use weekly::WeeklyOutcome;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// `None` when today is not the report day or the reporter failed.
    pub weekly: Option<WeeklyOutcome>,
    pub feedback: FeedbackOutcome,
    pub articles_collected: usize,
    pub results_analyzed: usize,
    pub records_published: usize,
    pub calls: CallCounter,
}

/// Retrieve every database once. Any failure aborts the run after all three are tried.
pub async fn check_connections(ctx: &mut RunContext) -> anyhow::Result<()> {
    let mut failed = Vec::new();
    for (name, database_id) in ctx.databases.named() {
        match ctx.retrieve_database(database_id).await {
            Ok(()) => tracing::info!(database = name, %database_id, "database reachable"),
            Err(err) => {
                tracing::error!(database = name, %database_id, error = %format!("{err:#}"), "database unreachable");
                failed.push(name);
            }
        }
    }
    anyhow::ensure!(
        failed.is_empty(),
        "database connectivity check failed: {}",
        failed.join(", ")
    );
    Ok(())
}

/// One full run. Only the connectivity check is fatal; the call summary is logged either way.
pub async fn run_daily(ctx: &mut RunContext, clock: &RunClock) -> anyhow::Result<RunReport> {
    tracing::info!(
        now = %clock.now,
        today = %clock.today,
        llm = ?ctx.llm.provider(),
        market_data = ctx.market.provider_name(),
        "run started"
    );
    let result = run_stages(ctx, clock).await;
    ctx.calls.log_summary();
    let mut report = result?;
    report.calls = ctx.calls.clone();
    tracing::info!(
        articles = report.articles_collected,
        results = report.results_analyzed,
        published = report.records_published,
        verdicts = report.feedback.written,
        "run finished"
    );
    Ok(report)
}

async fn run_stages(ctx: &mut RunContext, clock: &RunClock) -> anyhow::Result<RunReport> {
    check_connections(ctx).await?;

    let mut report = RunReport::default();

    let report_day = ctx.options.weekly_report_weekday;
    if clock.is_report_day(report_day) {
        match weekly::write_weekly_report(ctx, clock).await {
            Ok(outcome) => report.weekly = Some(outcome),
            Err(err) => tracing::error!(error = %format!("{err:#}"), "weekly report failed"),
        }
    } else {
        tracing::debug!(today = %clock.today, weekday = %report_day, "not a report day");
    }

    match feedback::verify_predictions(ctx, clock).await {
        Ok(outcome) => report.feedback = outcome,
        Err(err) => tracing::error!(error = %format!("{err:#}"), "feedback verification failed"),
    }

    let articles = collect::collect_articles(ctx, clock.now).await;
    report.articles_collected = articles.len();
    if articles.is_empty() {
        tracing::warn!("no articles collected");
        return Ok(report);
    }

    let results = analyze::analyze_articles(ctx, &articles).await;
    report.results_analyzed = results.len();
    if results.is_empty() {
        tracing::warn!("no analysis results");
        return Ok(report);
    }

    report.records_published = publish::publish_results(ctx, &results).await;
    Ok(report)
}
