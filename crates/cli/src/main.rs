use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fitscore_core::auth::OAuthClient;
use fitscore_core::domain::chart::{ChartSeries, SeriesKind};
use fitscore_core::domain::sample::MetricSample;
use fitscore_core::ingest::fitbit::FitbitClient;
use fitscore_core::pipeline::{chart_series, fetch_and_score};
use fitscore_core::score::{score, window::window};
use fitscore_core::storage::credentials::store_from_settings;
use fitscore_core::time::range::{resolve_end_date, DateRange};

#[derive(Debug, Parser)]
#[command(name = "fitscore", about = "Fitbit wellness score from the command line")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the consent-screen URL to open in a browser.
    AuthorizeUrl,

    /// Trade an authorization code for tokens and store them.
    Exchange {
        #[arg(long)]
        code: String,
    },

    /// Fetch, score and print the trailing window.
    Score {
        /// Days to display. Defaults to FITSCORE_DISPLAY_DAYS.
        #[arg(long)]
        days: Option<usize>,

        /// Days fetched before the end date. Defaults to FITSCORE_LOOKBACK_DAYS.
        #[arg(long)]
        lookback: Option<u32>,

        /// Last day of the range (YYYY-MM-DD). Defaults to today's UTC date.
        #[arg(long)]
        end_date: Option<String>,

        /// `score` or a channel name.
        #[arg(long, default_value = "score")]
        series: SeriesKind,

        #[arg(long)]
        json: bool,
    },

    /// Score a JSON array of daily samples without touching the network.
    ScoreFile {
        path: std::path::PathBuf,

        #[arg(long)]
        days: Option<usize>,

        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fitscore_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(args.command, &settings).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
    }
    result
}

async fn run(command: Command, settings: &fitscore_core::config::Settings) -> anyhow::Result<()> {
    match command {
        Command::AuthorizeUrl => {
            let oauth = OAuthClient::from_settings(settings)?;
            println!("{}", oauth.authorize_url()?);
        }
        Command::Exchange { code } => {
            let oauth = OAuthClient::from_settings(settings)?;
            let store = store_from_settings(settings).await?;
            oauth.exchange_and_store(store.as_ref(), &code).await?;
            println!("credentials stored");
        }
        Command::Score {
            days,
            lookback,
            end_date,
            series,
            json,
        } => {
            let days = resolve_days(days, settings.display_days)?;
            let end = resolve_end_date(end_date.as_deref(), chrono::Utc::now())?;
            let range = DateRange::trailing(end, lookback.unwrap_or(settings.lookback_days))?;

            let oauth = OAuthClient::from_settings(settings)?;
            let source = FitbitClient::from_settings(settings)?;
            let store = store_from_settings(settings).await?;

            let batch = fetch_and_score(&source, &oauth, store.as_ref(), range)
                .await
                .with_context(|| format!("scoring {range} failed"))?;

            print_series(&chart_series(&batch, days, series), json)?;
        }
        Command::ScoreFile { path, days, json } => {
            let days = resolve_days(days, settings.display_days)?;
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let samples = parse_samples(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;

            let scored = score(&samples);
            tracing::debug!(samples = scored.len(), "scored samples from file");
            let series = ChartSeries::from_scored(window(&scored, days), SeriesKind::Score);
            print_series(&series, json)?;
        }
    }
    Ok(())
}

fn resolve_days(days_arg: Option<usize>, default_days: usize) -> anyhow::Result<usize> {
    let days = days_arg.unwrap_or(default_days);
    anyhow::ensure!(days > 0, "--days must be at least 1");
    Ok(days)
}

fn parse_samples(raw: &str) -> anyhow::Result<Vec<MetricSample>> {
    let mut samples: Vec<MetricSample> = serde_json::from_str(raw)?;
    samples.sort_by_key(|s| s.date);
    Ok(samples)
}

fn print_series(series: &ChartSeries, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(series)?);
        return Ok(());
    }
    print!("{}", render_table(series));
    Ok(())
}

fn render_table(series: &ChartSeries) -> String {
    let mut out = format!("{:<12}{}\n", "date", series.label);
    for point in &series.points {
        let value = match point.value {
            Some(v) => format!("{v}"),
            None => "-".to_string(),
        };
        out.push_str(&format!("{:<12}{}\n", point.label, value));
    }
    out
}

fn init_sentry(settings: &fitscore_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
