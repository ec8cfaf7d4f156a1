//! Day-level digest over the rolling week.

use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

use crate::analyzers::aggregate::{group_by, top_by_count};
use crate::analyzers::types::{DailyDigest, DailySalary, DailySalaryPoint, DayOverDay};
use crate::analyzers::utility::{mean, median_sorted, pct, quantile_sorted, sorted};
use crate::analyzers::window::Window;
use crate::config::ReportConfig;
use crate::records::Vacancy;

fn salary_summary(values: &[f64]) -> Option<DailySalary> {
    let mean = mean(values)?;
    let s = sorted(values);
    let q25 = quantile_sorted(&s, 0.25)?;
    let q75 = quantile_sorted(&s, 0.75)?;

    Some(DailySalary {
        count: values.len(),
        mean,
        median: median_sorted(&s)?,
        q25,
        q75,
        spread: q75 - q25,
    })
}

/// Builds the digest for `today` from the city's vacancies in `window`.
///
/// Today is a partial day, so the day-over-day comparison uses yesterday
/// against the day before, and only when both days have vacancies.
pub fn build_daily_digest(
    city: &str,
    today: NaiveDate,
    window: Window,
    vacancies: &[Vacancy],
    config: &ReportConfig,
) -> DailyDigest {
    let yesterday = today - Days::new(1);
    let day_before = today - Days::new(2);
    let week_start = today - Days::new(6);

    let week: Vec<&Vacancy> = vacancies
        .iter()
        .filter(|v| v.local_date >= week_start && v.local_date <= today)
        .collect();

    let mut daily_counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut salaries_by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for v in &week {
        *daily_counts.entry(v.local_date).or_insert(0) += 1;
        if let Some(net) = v.monthly_net() {
            salaries_by_date.entry(v.local_date).or_default().push(net);
        }
    }

    let count_on = |date: NaiveDate| daily_counts.get(&date).copied().unwrap_or(0);
    let today_count = count_on(today);
    let yesterday_count = count_on(yesterday);
    let day_before_count = count_on(day_before);

    let day_over_day = (yesterday_count > 0 && day_before_count > 0).then(|| {
        let growth = yesterday_count as i64 - day_before_count as i64;
        DayOverDay {
            growth,
            growth_pct: pct(growth as f64, day_before_count as f64),
        }
    });

    let week_salaries: Vec<f64> = salaries_by_date.values().flatten().copied().collect();
    let salary_today = salaries_by_date
        .get(&today)
        .and_then(|values| salary_summary(values));

    let today_vacancies = week.iter().copied().filter(|v| v.local_date == today);
    let employers = group_by(today_vacancies, |v| v.employer_key.clone());
    let top_employers_today = top_by_count(&employers, config.daily_top_employers, |v| {
        v.raw
            .employer
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    });

    let daily_salary = salaries_by_date
        .iter()
        .filter_map(|(date, values)| {
            let s = sorted(values);
            Some(DailySalaryPoint {
                date: *date,
                mean: mean(values)?,
                median: median_sorted(&s)?,
                count: values.len(),
            })
        })
        .collect();

    DailyDigest {
        city: city.to_string(),
        window,
        today,
        today_count,
        yesterday_count,
        day_before_count,
        day_over_day,
        week_count: week.len(),
        week_salary_count: week_salaries.len(),
        week_avg_salary: mean(&week_salaries),
        salary_today,
        top_employers_today,
        first_date: daily_counts.keys().next().copied(),
        daily_counts,
        daily_salary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::window::rolling_week_window;
    use crate::records::{RawVacancy, RecordId, ingest};
    use chrono::{FixedOffset, TimeZone, Utc};

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn row(id: i64, day: u32, employer: Option<&str>, salary: Option<f64>) -> RawVacancy {
        RawVacancy {
            id: RecordId::Int(id),
            city_slug: "spb".to_string(),
            employer: employer.map(str::to_string),
            schedule_name: None,
            salary_period_name: salary.map(|_| "в месяц".to_string()),
            salary_to_net: salary,
            salary_from_net: None,
            published_at: Some(Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap()),
        }
    }

    fn digest(rows: Vec<RawVacancy>) -> DailyDigest {
        let config = ReportConfig::default();
        let reference = tz().with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        let vacancies = ingest(rows, &config, tz());
        build_daily_digest(
            "spb",
            reference.date_naive(),
            rolling_week_window(reference),
            &vacancies,
            &config,
        )
    }

    #[test]
    fn test_empty_week() {
        let d = digest(vec![]);
        assert_eq!(d.today_count, 0);
        assert_eq!(d.week_count, 0);
        assert!(d.day_over_day.is_none());
        assert!(d.salary_today.is_none());
        assert!(d.week_avg_salary.is_none());
        assert!(d.first_date.is_none());
        assert!(d.top_employers_today.is_empty());
    }

    #[test]
    fn test_day_over_day_uses_full_days() {
        let rows = vec![
            row(1, 8, None, None),
            row(2, 8, None, None),
            row(3, 9, None, None),
            row(4, 9, None, None),
            row(5, 9, None, None),
            row(6, 10, None, None),
            // outside the week
            row(7, 2, None, None),
        ];
        let d = digest(rows);

        assert_eq!(d.today_count, 1);
        assert_eq!(d.yesterday_count, 3);
        assert_eq!(d.day_before_count, 2);
        assert_eq!(d.week_count, 6);
        let dod = d.day_over_day.unwrap();
        assert_eq!(dod.growth, 1);
        assert_eq!(dod.growth_pct, 50.0);
        assert_eq!(d.first_date, NaiveDate::from_ymd_opt(2024, 3, 8));
    }

    #[test]
    fn test_no_comparison_when_day_before_empty() {
        let d = digest(vec![row(1, 9, None, None)]);
        assert!(d.day_over_day.is_none());
    }

    #[test]
    fn test_salary_today_and_employers() {
        let rows = vec![
            row(1, 10, Some("Самокат"), Some(100_000.0)),
            row(2, 10, Some("самокат "), Some(120_000.0)),
            row(3, 10, Some("Купер"), Some(80_000.0)),
            row(4, 10, None, None),
            row(5, 9, Some("Купер"), Some(60_000.0)),
        ];
        let d = digest(rows);

        let salary = d.salary_today.unwrap();
        assert_eq!(salary.count, 3);
        assert_eq!(salary.median, 100_000.0);
        assert_eq!(salary.q25, 90_000.0);
        assert_eq!(salary.q75, 110_000.0);
        assert_eq!(salary.spread, 20_000.0);

        assert_eq!(d.top_employers_today.len(), 2);
        assert_eq!(d.top_employers_today[0].label, "Самокат");
        assert_eq!(d.top_employers_today[0].count, 2);
        assert_eq!(d.week_salary_count, 4);
        assert_eq!(d.week_avg_salary, Some(90_000.0));
        assert_eq!(d.daily_salary.len(), 2);
    }
}
