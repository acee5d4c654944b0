use crate::domain::verdict::{accuracy_rate, VerdictEntry};
use crate::llm::json::parse_weekly_report;
use crate::llm::prompts::weekly_review_prompt;
use crate::pipeline::context::RunContext;
use crate::storage::schema::{decode_verdict, weekly_summary_properties};
use crate::time::schedule::{weekly_report_title, RunClock};
use anyhow::Context;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeeklyOutcome {
    /// No verdicts in the last seven days; the model was not called.
    NoData,
    /// The model saw no systematic failure pattern.
    NotNeeded { accuracy_rate: String },
    Written { page_id: Uuid, accuracy_rate: String },
}

/// Review the last seven days of verdicts and record a summary when the model asks for a change.
pub async fn write_weekly_report(ctx: &mut RunContext, clock: &RunClock) -> anyhow::Result<WeeklyOutcome> {
    let since = clock.last_week_cutoff();
    let feedback_db = ctx.databases.feedback;
    let rows = ctx
        .query_all(feedback_db, since)
        .await
        .context("failed to query verdicts")?;
    if rows.is_empty() {
        tracing::info!(%since, "no verdicts this week; skipping weekly report");
        return Ok(WeeklyOutcome::NoData);
    }

    let (successful, failed): (Vec<VerdictEntry>, Vec<VerdictEntry>) =
        rows.iter().map(decode_verdict).partition(|v| v.correct);
    let accuracy = accuracy_rate(successful.len(), failed.len());
    tracing::info!(
        successful = successful.len(),
        failed = failed.len(),
        accuracy = %accuracy,
        "reviewing weekly verdicts"
    );

    let prompt = weekly_review_prompt(&failed, &successful, &accuracy);
    let text = ctx.generate(&prompt).await.context("weekly review call failed")?;
    let report = parse_weekly_report(&text)?;

    let title = weekly_report_title(clock.today);
    let Some(summary) = report
        .validate_and_into_summary(title, accuracy.clone())
        .context("weekly review output rejected")?
    else {
        tracing::info!(accuracy = %accuracy, "no actionable improvement; summary not written");
        return Ok(WeeklyOutcome::NotNeeded {
            accuracy_rate: accuracy,
        });
    };

    let report_db = ctx.databases.report;
    let page_id = ctx
        .create_page(report_db, weekly_summary_properties(&summary), Vec::new())
        .await
        .context("failed to write weekly summary")?;
    tracing::info!(%page_id, title = %summary.title, accuracy = %accuracy, "weekly summary written");

    Ok(WeeklyOutcome::Written {
        page_id,
        accuracy_rate: accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::Sentiment;
    use crate::domain::verdict::Verdict;
    use crate::llm::error::{LlmDiagnosticsError, Stage};
    use crate::pipeline::fakes::{verdict_row, Fakes, FEEDBACK_DB, REPORT_DB};
    use crate::storage::schema::report;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn clock() -> RunClock {
        RunClock {
            now: Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap(),
            today: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        }
    }

    fn seed_week(fakes: &Fakes, hits: usize, misses: usize) {
        for _ in 0..hits {
            let v = Verdict::evaluate("AAPL", Sentiment::Positive, 1.5).unwrap();
            fakes.store.seed(FEEDBACK_DB, verdict_row(&v));
        }
        for _ in 0..misses {
            let v = Verdict::evaluate("TSLA", Sentiment::Negative, 0.8).unwrap();
            fakes.store.seed(FEEDBACK_DB, verdict_row(&v));
        }
    }

    const NEEDED: &str = r#"```json
{
  "weekly_summary": {"key_takeaway": "규제 뉴스 과대평가", "accuracy_rate": "99%"},
  "failure_analysis": {"recurring_theme": "규제 뉴스", "root_cause": "이미 가격에 반영"},
  "success_analysis": {"common_pattern": "실적 발표"},
  "actionable_improvement": {"needed": true, "problem": "규제 과민", "solution": "규제 뉴스는 확신 점수를 낮춘다", "expected_impact": "+5%p"}
}
```"#;

    #[tokio::test]
    async fn writes_summary_with_local_accuracy() {
        let fakes = Fakes::default();
        seed_week(&fakes, 7, 3);
        fakes.llm.reply(NEEDED);
        let mut ctx = fakes.context();

        let outcome = write_weekly_report(&mut ctx, &clock()).await.unwrap();
        assert!(matches!(outcome, WeeklyOutcome::Written { ref accuracy_rate, .. } if accuracy_rate == "70.0%"));

        let prompt = &fakes.llm.prompts()[0];
        assert!(prompt.contains("70.0%"));

        let created = fakes.store.created_in(REPORT_DB);
        assert_eq!(created.len(), 1);
        let props = &created[0].properties;
        assert_eq!(props[report::ACCURACY]["rich_text"][0]["text"]["content"], "70.0%");
        assert_eq!(
            props[report::TITLE]["title"][0]["text"]["content"],
            "주간 피드백 보고서 (2026년 10월 19일)"
        );
        assert_eq!(
            props[report::FAILURE]["rich_text"][0]["text"]["content"],
            "규제 뉴스\n근본 원인: 이미 가격에 반영"
        );
    }

    #[tokio::test]
    async fn not_needed_writes_nothing() {
        let fakes = Fakes::default();
        seed_week(&fakes, 2, 1);
        fakes.llm.reply(r#"{"actionable_improvement": {"needed": false}}"#);
        let mut ctx = fakes.context();

        let outcome = write_weekly_report(&mut ctx, &clock()).await.unwrap();
        assert_eq!(
            outcome,
            WeeklyOutcome::NotNeeded {
                accuracy_rate: "66.7%".to_string()
            }
        );
        assert!(fakes.store.created_in(REPORT_DB).is_empty());
    }

    #[tokio::test]
    async fn needed_without_solution_is_still_written() {
        let fakes = Fakes::default();
        seed_week(&fakes, 1, 4);
        fakes.llm.reply(r#"{"failure_analysis": {"recurring_theme": "금리"}, "actionable_improvement": {"needed": true}}"#);
        let mut ctx = fakes.context();

        let outcome = write_weekly_report(&mut ctx, &clock()).await.unwrap();
        assert!(matches!(outcome, WeeklyOutcome::Written { ref accuracy_rate, .. } if accuracy_rate == "20.0%"));

        let created = fakes.store.created_in(REPORT_DB);
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].properties[report::PROMPT]["rich_text"][0]["text"]["content"], "N/A");
    }

    #[tokio::test]
    async fn empty_week_skips_the_model() {
        let fakes = Fakes::default();
        let mut ctx = fakes.context();

        let outcome = write_weekly_report(&mut ctx, &clock()).await.unwrap();
        assert_eq!(outcome, WeeklyOutcome::NoData);
        assert!(fakes.llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn malformed_review_is_reported_as_diagnostics() {
        let fakes = Fakes::default();
        seed_week(&fakes, 1, 1);
        fakes.llm.reply("{\"weekly_summary\": {}}");
        let mut ctx = fakes.context();

        let err = write_weekly_report(&mut ctx, &clock()).await.unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, Stage::Schema);
        assert!(fakes.store.created_in(REPORT_DB).is_empty());
    }
}
