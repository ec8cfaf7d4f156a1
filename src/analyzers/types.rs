//! Data types produced by the aggregation pipeline.

use chrono::{NaiveDate, Weekday};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::analyzers::trend::TrendAnalysis;
use crate::analyzers::window::Window;

/// Distribution of monthly net salaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryDistribution {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; absent for a single value.
    pub std_dev: Option<f64>,
    pub q10: f64,
    pub q25: f64,
    pub q75: f64,
    pub q90: f64,
}

/// Average spread between the upper and lower net bound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryRange {
    pub avg_range: f64,
    pub with_range: usize,
}

/// A ranked categorical value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub key: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployerSalary {
    pub key: String,
    pub label: String,
    pub avg_salary: f64,
    pub vacancies: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayCount {
    #[serde(serialize_with = "weekday_name")]
    pub weekday: Weekday,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryGrowth {
    pub prev_avg_salary: f64,
    pub growth: f64,
    pub growth_pct: f64,
}

/// Period-over-period deltas against the comparison window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Growth {
    pub prev_total: usize,
    pub total_growth: i64,
    pub total_growth_pct: f64,
    pub salary: Option<SalaryGrowth>,
}

/// Complete aggregation result for one city and one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub city: String,
    pub window: Window,
    pub total: usize,
    pub with_monthly_salary: usize,
    pub salary_percentage: f64,
    pub salary: Option<SalaryDistribution>,
    pub salary_range: Option<SalaryRange>,
    pub trend: Option<TrendAnalysis>,
    pub top_schedules: Vec<CategoryCount>,
    pub total_schedules: usize,
    pub top_employers_by_count: Vec<CategoryCount>,
    pub top_employers_by_salary: Vec<EmployerSalary>,
    pub weekday_counts: Vec<WeekdayCount>,
    #[serde(serialize_with = "opt_weekday_name")]
    pub top_weekday: Option<Weekday>,
    pub weekly_counts: BTreeMap<u32, usize>,
    pub growth: Option<Growth>,
}

/// Today's salary figures in the daily digest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySalary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub q25: f64,
    pub q75: f64,
    pub spread: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayOverDay {
    pub growth: i64,
    pub growth_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySalaryPoint {
    pub date: NaiveDate,
    pub mean: f64,
    pub median: f64,
    pub count: usize,
}

/// Day-level summary over the rolling week ending today.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDigest {
    pub city: String,
    pub window: Window,
    pub today: NaiveDate,
    pub today_count: usize,
    pub yesterday_count: usize,
    pub day_before_count: usize,
    pub day_over_day: Option<DayOverDay>,
    pub week_count: usize,
    pub week_salary_count: usize,
    pub week_avg_salary: Option<f64>,
    pub salary_today: Option<DailySalary>,
    pub top_employers_today: Vec<CategoryCount>,
    pub first_date: Option<NaiveDate>,
    pub daily_counts: BTreeMap<NaiveDate, usize>,
    pub daily_salary: Vec<DailySalaryPoint>,
}

fn weekday_name<S: Serializer>(weekday: &Weekday, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(weekday_label(*weekday))
}

fn opt_weekday_name<S: Serializer>(weekday: &Option<Weekday>, s: S) -> Result<S::Ok, S::Error> {
    match weekday {
        Some(w) => s.serialize_some(weekday_label(*w)),
        None => s.serialize_none(),
    }
}

/// English weekday name, as used in the JSON payload.
pub fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
