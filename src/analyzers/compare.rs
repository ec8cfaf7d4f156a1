//! Period-over-period comparison.

use tracing::debug;

use crate::analyzers::aggregate::aggregate_metrics;
use crate::analyzers::types::MetricsReport;
use crate::analyzers::window::Window;
use crate::config::ReportConfig;
use crate::records::Vacancy;

/// One window and the city's vacancies that fall inside it.
#[derive(Debug, Clone, Copy)]
pub struct Period<'a> {
    pub window: Window,
    pub vacancies: &'a [Vacancy],
}

/// Aggregates `current`, attaching growth against `previous` when the
/// comparison window has any vacancies.
pub fn compare_periods(
    city: &str,
    current: Period<'_>,
    previous: Period<'_>,
    config: &ReportConfig,
) -> MetricsReport {
    let prior = if previous.vacancies.is_empty() {
        debug!(city, "No comparison data, growth omitted");
        None
    } else {
        Some(aggregate_metrics(
            city,
            previous.window,
            previous.vacancies,
            None,
            config,
        ))
    };

    aggregate_metrics(
        city,
        current.window,
        current.vacancies,
        prior.as_ref(),
        config,
    )
}
