//! Per-city report runs.
//!
//! Cities are processed one after another. A failure in one city is logged
//! and counted, and the loop moves on to the next.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, Utc};
use tracing::{Instrument, error, info, info_span, warn};

use crate::analyzers::compare::{Period, compare_periods};
use crate::analyzers::daily::build_daily_digest;
use crate::analyzers::window::{Window, month_window, rolling_week_window};
use crate::config::{City, ReportConfig};
use crate::output::{format_duration, print_pretty, render_daily_caption, render_monthly_caption};
use crate::records::{RawVacancy, Vacancy, ingest};
use crate::services::record_source::RecordSource;
use crate::services::report_sink::{Digest, ReportSink};

/// Counters for one run over the configured cities.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RunSummary {
    pub successful: usize,
    pub failed: usize,
    /// Cities with no records in the reporting window.
    pub skipped: usize,
    pub total: usize,
    pub started_at: String,
    pub finished_at: String,
}

impl RunSummary {
    fn start(total: usize) -> Self {
        Self {
            total,
            started_at: Utc::now().to_rfc3339(),
            ..Default::default()
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = Utc::now().to_rfc3339();
        self
    }

    pub fn duration(&self) -> String {
        format_duration(&self.started_at, &self.finished_at)
    }

    fn record(&mut self, city: &City, outcome: Result<Outcome>) {
        match outcome {
            Ok(Outcome::Delivered) => self.successful += 1,
            Ok(Outcome::Skipped) => self.skipped += 1,
            Err(e) => {
                error!(city = %city.slug, error = %format!("{e:#}"), "City failed");
                self.failed += 1;
            }
        }
    }

    /// Fails the run when cities failed and none was delivered.
    fn into_result(self) -> Result<Self> {
        info!(
            successful = self.successful,
            failed = self.failed,
            skipped = self.skipped,
            total = self.total,
            duration = %self.duration(),
            "Run finished"
        );
        if self.successful == 0 && self.failed > 0 {
            bail!("all {} attempted cities failed", self.failed);
        }
        Ok(self)
    }
}

enum Outcome {
    Delivered,
    Skipped,
}

/// Fetches `city` rows in `window` and re-checks the bounds locally.
async fn load(
    source: &dyn RecordSource,
    city: &City,
    window: &Window,
    config: &ReportConfig,
    tz: FixedOffset,
) -> Result<Vec<Vacancy>> {
    let mut rows = source.fetch_window(&city.slug, window).await?;
    rows.retain(|r| r.published_at.is_none_or(|at| window.contains(at)));
    Ok(ingest(rows, config, tz))
}

fn raw_rows(vacancies: &[Vacancy]) -> Vec<RawVacancy> {
    vacancies.iter().map(|v| v.raw.clone()).collect()
}

async fn monthly_city(
    source: &dyn RecordSource,
    sink: &dyn ReportSink,
    config: &ReportConfig,
    city: &City,
    reference: DateTime<FixedOffset>,
) -> Result<Outcome> {
    let tz = *reference.offset();
    let current_window = month_window(reference, 0);
    let previous_window = month_window(reference, 1);

    let current = load(source, city, &current_window, config, tz)
        .await
        .context("failed to load reporting month")?;
    if current.is_empty() {
        warn!(window = %current_window, "No data for city");
        return Ok(Outcome::Skipped);
    }
    info!(records = current.len(), "Reporting month loaded");

    let previous = match load(source, city, &previous_window, config, tz).await {
        Ok(previous) => previous,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Comparison month unavailable");
            Vec::new()
        }
    };

    let report = compare_periods(
        &city.slug,
        Period {
            window: current_window,
            vacancies: &current,
        },
        Period {
            window: previous_window,
            vacancies: &previous,
        },
        config,
    );
    print_pretty(&report);

    let generated_at = Utc::now().with_timezone(&tz);
    let digest = Digest {
        city: city.clone(),
        caption: render_monthly_caption(city, &report, generated_at),
        markdown: true,
        payload: serde_json::to_value(&report)?,
        records: raw_rows(&current),
    };
    sink.deliver(&digest).await?;

    Ok(Outcome::Delivered)
}

async fn daily_city(
    source: &dyn RecordSource,
    sink: &dyn ReportSink,
    config: &ReportConfig,
    city: &City,
    reference: DateTime<FixedOffset>,
) -> Result<Outcome> {
    let window = rolling_week_window(reference);
    let week = load(source, city, &window, config, *reference.offset())
        .await
        .context("failed to load rolling week")?;
    if week.is_empty() {
        warn!(window = %window, "No data for city");
        return Ok(Outcome::Skipped);
    }

    let daily = build_daily_digest(&city.slug, reference.date_naive(), window, &week, config);
    print_pretty(&daily);

    let digest = Digest {
        city: city.clone(),
        caption: render_daily_caption(city, &daily, reference),
        markdown: false,
        payload: serde_json::to_value(&daily)?,
        records: raw_rows(&week),
    };
    sink.deliver(&digest).await?;

    Ok(Outcome::Delivered)
}

/// Builds and delivers the report for the month preceding `reference`,
/// compared against the month before it.
pub async fn run_monthly(
    source: &dyn RecordSource,
    sink: &dyn ReportSink,
    config: &ReportConfig,
    cities: &[City],
    reference: DateTime<FixedOffset>,
) -> Result<RunSummary> {
    info!(
        current = %month_window(reference, 0),
        previous = %month_window(reference, 1),
        cities = cities.len(),
        "Starting monthly run"
    );

    let mut summary = RunSummary::start(cities.len());
    for city in cities {
        let span = info_span!("monthly_city", slug = %city.slug, name = %city.name);
        let outcome = monthly_city(source, sink, config, city, reference)
            .instrument(span)
            .await;
        summary.record(city, outcome);
    }

    summary.finish().into_result()
}

/// Builds and delivers the daily digest over the week ending at `reference`.
pub async fn run_daily(
    source: &dyn RecordSource,
    sink: &dyn ReportSink,
    config: &ReportConfig,
    cities: &[City],
    reference: DateTime<FixedOffset>,
) -> Result<RunSummary> {
    info!(
        window = %rolling_week_window(reference),
        cities = cities.len(),
        "Starting daily run"
    );

    let mut summary = RunSummary::start(cities.len());
    for city in cities {
        let span = info_span!("daily_city", slug = %city.slug, name = %city.name);
        let outcome = daily_city(source, sink, config, city, reference)
            .instrument(span)
            .await;
        summary.record(city, outcome);
    }

    summary.finish().into_result()
}
