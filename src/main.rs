//! CLI entry point for the vacancy digest job.
//!
//! Provides subcommands for the monthly report, the daily digest, offline
//! analysis of an exported JSON file, and listing the configured cities.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use vacancy_digest::analyzers::analyzer::{RunSummary, run_daily, run_monthly};
use vacancy_digest::config::{City, ConfigError, Credentials, ReportConfig};
use vacancy_digest::infra::file::FileSource;
use vacancy_digest::infra::supabase::SupabaseSource;
use vacancy_digest::infra::telegram::TelegramSink;
use vacancy_digest::output::StdoutSink;
use vacancy_digest::services::record_source::RecordSource;
use vacancy_digest::services::report_sink::ReportSink;

#[derive(Parser)]
#[command(name = "vacancy_digest")]
#[command(about = "Monthly and daily vacancy analytics for city channels", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RunArgs {
    /// JSON file overriding the built-in report configuration
    #[arg(short, long)]
    config: Option<String>,

    /// Log digests instead of sending them to Telegram
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Report as if run at the end of this date (YYYY-MM-DD)
    #[arg(short, long)]
    reference: Option<NaiveDate>,

    /// Only process these city slugs
    #[arg(long = "city")]
    cities: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the previous calendar month and compare it with the month before
    Monthly(RunArgs),
    /// Digest of the rolling week ending today
    Daily(RunArgs),
    /// Analyze a JSON export of vacancy rows and log the reports
    Analyze {
        /// Path to a JSON array of vacancy rows
        #[arg(value_name = "FILE")]
        input: String,

        /// JSON file overriding the built-in report configuration
        #[arg(short, long)]
        config: Option<String>,

        /// Report as if run at the end of this date (YYYY-MM-DD)
        #[arg(short, long)]
        reference: Option<NaiveDate>,

        /// Only process these city slugs
        #[arg(long = "city")]
        cities: Vec<String>,

        /// Build the daily digest instead of the monthly report
        #[arg(long, default_value_t = false)]
        daily: bool,
    },
    /// List the configured cities and their channels
    ListCities {
        /// JSON file overriding the built-in report configuration
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[derive(Clone, Copy)]
enum Mode {
    Monthly,
    Daily,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/vacancy_digest.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("vacancy_digest.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Monthly(args) => run_remote(Mode::Monthly, args).await?,
        Commands::Daily(args) => run_remote(Mode::Daily, args).await?,
        Commands::Analyze {
            input,
            config,
            reference,
            cities,
            daily,
        } => {
            let config = load_config(config.as_deref())?;
            let tz = config.timezone()?;
            let source = FileSource::load(&input, config.page_size)?;

            let present = source.cities();
            let cities: Vec<City> = select_cities(&config, &cities)?
                .into_iter()
                .filter(|c| present.contains(&c.slug))
                .collect();
            for slug in present.iter().filter(|s| config.city(s).is_none()) {
                warn!(slug = %slug, "Rows for unconfigured city ignored");
            }

            let mode = if daily { Mode::Daily } else { Mode::Monthly };
            let reference = reference_instant(reference, tz)?;
            run(mode, &source, &StdoutSink, &config, &cities, reference).await?;
        }
        Commands::ListCities { config } => {
            let config = load_config(config.as_deref())?;
            info!(total = config.cities.len(), "Configured cities");
            for city in &config.cities {
                info!(slug = %city.slug, name = %city.name, channel = %city.channel, "City");
            }
        }
    }

    Ok(())
}

/// Reads from Supabase and delivers to Telegram, or to the log on a dry run.
///
/// Configuration and credential problems abort before any city is touched.
#[tracing::instrument(skip_all, fields(dry_run = args.dry_run))]
async fn run_remote(mode: Mode, args: RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let tz = config.timezone()?;
    let cities = select_cities(&config, &args.cities)?;
    let credentials = Credentials::from_env(!args.dry_run)?;

    let source = SupabaseSource::connect(
        &credentials.supabase_url,
        &credentials.supabase_key,
        &config.table,
        config.page_size,
    )?;
    let sink: Box<dyn ReportSink> = match (&credentials.bot_token, args.dry_run) {
        (Some(token), false) => Box::new(TelegramSink::new(token)?),
        _ => {
            info!("Dry run, digests will be logged only");
            Box::new(StdoutSink)
        }
    };

    let reference = reference_instant(args.reference, tz)?;
    run(mode, &source, sink.as_ref(), &config, &cities, reference).await?;
    Ok(())
}

async fn run(
    mode: Mode,
    source: &dyn RecordSource,
    sink: &dyn ReportSink,
    config: &ReportConfig,
    cities: &[City],
    reference: DateTime<FixedOffset>,
) -> Result<RunSummary> {
    match mode {
        Mode::Monthly => run_monthly(source, sink, config, cities, reference).await,
        Mode::Daily => run_daily(source, sink, config, cities, reference).await,
    }
}

fn load_config(path: Option<&str>) -> Result<ReportConfig, ConfigError> {
    match path {
        Some(path) => ReportConfig::load(path),
        None => {
            let config = ReportConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn select_cities(config: &ReportConfig, slugs: &[String]) -> Result<Vec<City>> {
    if slugs.is_empty() {
        return Ok(config.cities.clone());
    }
    slugs
        .iter()
        .map(|slug| match config.city(slug) {
            Some(city) => Ok(city.clone()),
            None => bail!("unknown city '{slug}'"),
        })
        .collect()
}

/// End of `date` in the reporting timezone, or the current instant.
fn reference_instant(date: Option<NaiveDate>, tz: FixedOffset) -> Result<DateTime<FixedOffset>> {
    let Some(date) = date else {
        return Ok(Utc::now().with_timezone(&tz));
    };
    let local = date
        .and_hms_opt(23, 59, 59)
        .context("invalid reference time")?;
    tz.from_local_datetime(&local)
        .single()
        .with_context(|| format!("reference {date} does not map to a single instant"))
}
