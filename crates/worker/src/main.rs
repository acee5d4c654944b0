use clap::Parser;
use marketlens_core::config::Settings;
use marketlens_core::ingest::feeds::HttpFeedClient;
use marketlens_core::ingest::market::YahooChartClient;
use marketlens_core::llm::gemini::GeminiClient;
use marketlens_core::llm::rate_limit::RateLimiter;
use marketlens_core::pipeline::{self, CallCounter, PipelineOptions, RunContext};
use marketlens_core::storage::dry_run::DryRunStore;
use marketlens_core::storage::notion::NotionClient;
use marketlens_core::storage::RecordStore;
use marketlens_core::time::schedule;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "marketlens_worker")]
struct Args {
    /// Run date (YYYY-MM-DD) in the reporting timezone. Defaults to today.
    #[arg(long)]
    date: Option<String>,

    /// Read and analyze as usual but only log database writes.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(&settings, &args).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "run aborted");
        return Err(err);
    }
    Ok(())
}

async fn run(settings: &Settings, args: &Args) -> anyhow::Result<()> {
    settings.require_all()?;
    let databases = settings.require_database_ids()?;

    let offset = schedule::reporting_offset_from_env()?;
    let clock = schedule::resolve_run_clock(args.date.as_deref(), chrono::Utc::now(), offset)?;

    let notion = NotionClient::from_settings(settings)?;
    let store: Box<dyn RecordStore> = if args.dry_run {
        tracing::info!(dry_run = true, "database writes disabled");
        Box::new(DryRunStore::new(notion))
    } else {
        Box::new(notion)
    };

    let mut ctx = RunContext {
        llm: Box::new(GeminiClient::from_settings(settings)?),
        store,
        market: Box::new(YahooChartClient::from_env()?),
        feeds: Box::new(HttpFeedClient::from_env()?),
        limiter: RateLimiter::from_env()?,
        calls: CallCounter::default(),
        databases,
        options: PipelineOptions::from_env()?,
    };

    let report = pipeline::run_daily(&mut ctx, &clock).await?;
    tracing::info!(
        today = %clock.today,
        dry_run = args.dry_run,
        weekly = ?report.weekly,
        verdicts = report.feedback.written,
        published = report.records_published,
        calls = report.calls.total(),
        "daily run complete"
    );
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
