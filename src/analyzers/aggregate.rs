use crate::analyzers::normalize::normalize_text;
use crate::analyzers::trend::{analyze_trend, daily_mean_salary};
use crate::analyzers::types::{
    CategoryCount, EmployerSalary, Growth, MetricsReport, SalaryDistribution, SalaryGrowth,
    SalaryRange, WeekdayCount,
};
use crate::analyzers::utility::{mean, median_sorted, pct, quantile_sorted, sample_stddev, sorted};
use crate::analyzers::window::Window;
use crate::config::ReportConfig;
use crate::records::Vacancy;
use chrono::Weekday;
use std::cmp::Ordering;
use std::collections::BTreeMap;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Vacancies sharing one normalized key.
pub(crate) struct Group<'a> {
    pub(crate) count: usize,
    pub(crate) first: &'a Vacancy,
    pub(crate) salaries: Vec<f64>,
}

/// Groups vacancies by `key`, skipping those without one. Each group keeps
/// its earliest observed vacancy so display labels do not depend on input order.
pub(crate) fn group_by<'a, I, F>(vacancies: I, key: F) -> BTreeMap<String, Group<'a>>
where
    I: IntoIterator<Item = &'a Vacancy>,
    F: Fn(&Vacancy) -> Option<String>,
{
    let mut groups: BTreeMap<String, Group<'a>> = BTreeMap::new();

    for v in vacancies {
        let Some(k) = key(v) else { continue };
        let group = groups.entry(k).or_insert_with(|| Group {
            count: 0,
            first: v,
            salaries: Vec::new(),
        });
        group.count += 1;
        if v.observed_order(group.first) == Ordering::Less {
            group.first = v;
        }
        if let Some(net) = v.monthly_net() {
            group.salaries.push(net);
        }
    }

    groups
}

/// Top `n` groups by count; ties go to the smaller key.
pub(crate) fn top_by_count<F>(
    groups: &BTreeMap<String, Group<'_>>,
    n: usize,
    label: F,
) -> Vec<CategoryCount>
where
    F: Fn(&Vacancy) -> String,
{
    let mut ranked: Vec<(&String, &Group<'_>)> = groups.iter().collect();
    ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(n)
        .map(|(key, group)| CategoryCount {
            key: key.clone(),
            label: label(group.first),
            count: group.count,
        })
        .collect()
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn salary_distribution(values: &[f64]) -> Option<SalaryDistribution> {
    let mean = mean(values)?;
    let s = sorted(values);

    Some(SalaryDistribution {
        mean,
        median: median_sorted(&s)?,
        std_dev: sample_stddev(values, mean),
        q10: quantile_sorted(&s, 0.10)?,
        q25: quantile_sorted(&s, 0.25)?,
        q75: quantile_sorted(&s, 0.75)?,
        q90: quantile_sorted(&s, 0.90)?,
    })
}

fn salary_range(subset: &[&Vacancy]) -> SalaryRange {
    let spreads: Vec<f64> = subset
        .iter()
        .filter_map(|v| Some(v.raw.salary_to_net? - v.raw.salary_from_net?))
        .collect();

    SalaryRange {
        avg_range: mean(&spreads).unwrap_or(0.0),
        with_range: spreads.len(),
    }
}

fn weekday_histogram(vacancies: &[Vacancy]) -> (Vec<WeekdayCount>, Option<Weekday>) {
    let mut counts = [0usize; 7];
    for v in vacancies {
        counts[v.weekday.num_days_from_monday() as usize] += 1;
    }

    // strict comparison keeps the earliest weekday on ties
    let mut top: Option<(Weekday, usize)> = None;
    for (weekday, &count) in WEEKDAYS.iter().zip(&counts) {
        if count > 0 && top.is_none_or(|(_, best)| count > best) {
            top = Some((*weekday, count));
        }
    }

    let histogram = WEEKDAYS
        .iter()
        .zip(counts)
        .map(|(&weekday, count)| WeekdayCount { weekday, count })
        .collect();

    (histogram, top.map(|(w, _)| w))
}

/// Aggregates one city's vacancies within `window` into a [`MetricsReport`].
///
/// Every statistic tolerates an empty input; missing data shows up as `None`
/// or an empty table. When `prior` is given, growth against it is attached.
pub fn aggregate_metrics(
    city: &str,
    window: Window,
    vacancies: &[Vacancy],
    prior: Option<&MetricsReport>,
    config: &ReportConfig,
) -> MetricsReport {
    let total = vacancies.len();

    let salary_subset: Vec<&Vacancy> = vacancies
        .iter()
        .filter(|v| v.monthly_net().is_some())
        .collect();
    let salaries: Vec<f64> = salary_subset.iter().filter_map(|v| v.monthly_net()).collect();

    let salary = salary_distribution(&salaries);
    let salary_range = salary.as_ref().map(|_| salary_range(&salary_subset));
    let trend = analyze_trend(
        &daily_mean_salary(salary_subset.iter().copied()),
        config.min_trend_days,
        config.ema_span,
    );

    let schedules = group_by(vacancies, |v| v.schedule_key.clone());
    let top_schedules = top_by_count(&schedules, config.top_schedules, |v| {
        trimmed(v.raw.schedule_name.as_deref()).unwrap_or_default()
    });

    let unspecified_key = normalize_text(&config.unspecified_employer);
    let employers = group_by(vacancies, |v| {
        Some(v.employer_key.clone().unwrap_or_else(|| unspecified_key.clone()))
    });
    let employer_label = |v: &Vacancy| {
        trimmed(v.raw.employer.as_deref()).unwrap_or_else(|| config.unspecified_employer.clone())
    };
    let top_employers_by_count = top_by_count(&employers, config.top_employers, employer_label);

    let mut top_employers_by_salary: Vec<EmployerSalary> = employers
        .iter()
        .filter(|(_, g)| g.salaries.len() >= config.min_employer_salary_records)
        .filter_map(|(key, g)| {
            Some(EmployerSalary {
                key: key.clone(),
                label: employer_label(g.first),
                avg_salary: mean(&g.salaries)?.round(),
                vacancies: g.salaries.len(),
            })
        })
        .collect();
    top_employers_by_salary.sort_by(|a, b| {
        b.avg_salary
            .total_cmp(&a.avg_salary)
            .then_with(|| a.key.cmp(&b.key))
    });
    top_employers_by_salary.truncate(config.top_employers);

    let (weekday_counts, top_weekday) = weekday_histogram(vacancies);

    let mut weekly_counts = BTreeMap::new();
    for v in vacancies {
        *weekly_counts.entry(v.iso_week).or_insert(0) += 1;
    }

    let report = MetricsReport {
        city: city.to_string(),
        window,
        total,
        with_monthly_salary: salary_subset.len(),
        salary_percentage: pct(salary_subset.len() as f64, total as f64),
        salary,
        salary_range,
        trend,
        top_schedules,
        total_schedules: schedules.len(),
        top_employers_by_count,
        top_employers_by_salary,
        weekday_counts,
        top_weekday,
        weekly_counts,
        growth: None,
    };

    match prior {
        Some(prior) => report.with_growth(prior),
        None => report,
    }
}

impl Growth {
    /// Deltas of `current` against `prior`. Zero denominators yield 0%.
    pub fn between(current: &MetricsReport, prior: &MetricsReport) -> Self {
        let total_growth = current.total as i64 - prior.total as i64;

        let salary = match (&current.salary, &prior.salary) {
            (Some(cur), Some(prev)) => {
                let growth = cur.mean - prev.mean;
                Some(SalaryGrowth {
                    prev_avg_salary: prev.mean,
                    growth,
                    growth_pct: pct(growth, prev.mean),
                })
            }
            _ => None,
        };

        Growth {
            prev_total: prior.total,
            total_growth,
            total_growth_pct: pct(total_growth as f64, prior.total as f64),
            salary,
        }
    }
}

impl MetricsReport {
    /// Attaches growth against `prior`, consuming the report.
    pub fn with_growth(mut self, prior: &MetricsReport) -> Self {
        self.growth = Some(Growth::between(&self, prior));
        self
    }
}
