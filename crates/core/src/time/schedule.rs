use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc, Weekday};

const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

/// "Now" for one run, fixed at startup so every stage sees the same cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    pub now: DateTime<Utc>,
    /// Calendar date in the reporting timezone.
    pub today: NaiveDate,
}

impl RunClock {
    /// Feedback window: everything published in the last 24 hours.
    pub fn yesterday_cutoff(&self) -> DateTime<Utc> {
        self.now - Duration::days(1)
    }

    pub fn last_week_cutoff(&self) -> DateTime<Utc> {
        self.now - Duration::days(7)
    }

    pub fn is_report_day(&self, weekday: Weekday) -> bool {
        self.today.weekday() == weekday
    }
}

pub fn reporting_offset_from_env() -> anyhow::Result<FixedOffset> {
    let hours = std::env::var("REPORT_UTC_OFFSET_HOURS")
        .ok()
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or(DEFAULT_UTC_OFFSET_HOURS);
    FixedOffset::east_opt(hours * 3600)
        .with_context(|| format!("invalid REPORT_UTC_OFFSET_HOURS: {hours}"))
}

/// With a `YYYY-MM-DD` override the clock keeps the current local time of day on that date.
pub fn resolve_run_clock(
    date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
    offset: FixedOffset,
) -> anyhow::Result<RunClock> {
    let now_local = now_utc.with_timezone(&offset);

    let Some(s) = date_arg else {
        return Ok(RunClock {
            now: now_utc,
            today: now_local.date_naive(),
        });
    };

    let today = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid --date (expected YYYY-MM-DD): {s}"))?;
    let now = offset
        .from_local_datetime(&today.and_time(now_local.time()))
        .single()
        .with_context(|| format!("ambiguous local time for {today}"))?
        .with_timezone(&Utc);

    Ok(RunClock { now, today })
}

pub fn parse_weekday(s: &str) -> anyhow::Result<Weekday> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| anyhow::anyhow!("invalid weekday: {s:?}"))
}

pub fn weekly_report_title(today: NaiveDate) -> String {
    format!("주간 피드백 보고서 ({})", today.format("%Y년 %m월 %d일"))
}
