//! Vacancy records as stored remotely, and their ingested form.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::warn;

use crate::analyzers::normalize::{is_monthly_salary, normalize_opt};
use crate::config::ReportConfig;

/// Store-side primary key. PostgREST returns it as a number or a string
/// depending on the column type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{id}"),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

/// A single vacancy row as returned by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVacancy {
    pub id: RecordId,
    pub city_slug: String,
    #[serde(default)]
    pub employer: Option<String>,
    #[serde(default)]
    pub schedule_name: Option<String>,
    #[serde(default)]
    pub salary_period_name: Option<String>,
    #[serde(default)]
    pub salary_to_net: Option<f64>,
    #[serde(default)]
    pub salary_from_net: Option<f64>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// A vacancy with its derived attributes computed once at ingestion.
#[derive(Debug, Clone)]
pub struct Vacancy {
    pub raw: RawVacancy,
    pub published_at: DateTime<Utc>,
    pub employer_key: Option<String>,
    pub schedule_key: Option<String>,
    pub salary_period_key: Option<String>,
    pub monthly_salary: bool,
    pub local_date: NaiveDate,
    pub day: u32,
    pub iso_week: u32,
    pub weekday: Weekday,
}

impl Vacancy {
    /// Derives normalized labels and civil-calendar attributes.
    pub fn from_raw(
        raw: RawVacancy,
        published_at: DateTime<Utc>,
        tz: FixedOffset,
        keywords: &[String],
    ) -> Self {
        let local = published_at.with_timezone(&tz);
        let local_date = local.date_naive();
        let salary_period_key = normalize_opt(raw.salary_period_name.as_deref());
        let monthly_salary = is_monthly_salary(salary_period_key.as_deref(), keywords);

        Self {
            employer_key: normalize_opt(raw.employer.as_deref()).filter(|e| !e.is_empty()),
            schedule_key: normalize_opt(raw.schedule_name.as_deref()).filter(|s| !s.is_empty()),
            salary_period_key,
            monthly_salary,
            published_at,
            local_date,
            day: local_date.day(),
            iso_week: local_date.iso_week().week(),
            weekday: local_date.weekday(),
            raw,
        }
    }

    /// Net upper bound when this vacancy counts toward monthly salary stats.
    pub fn monthly_net(&self) -> Option<f64> {
        if self.monthly_salary {
            self.raw.salary_to_net
        } else {
            None
        }
    }

    /// Order of first observation: publication instant, then id.
    pub fn observed_order(&self, other: &Vacancy) -> Ordering {
        self.published_at
            .cmp(&other.published_at)
            .then_with(|| self.raw.id.cmp(&other.raw.id))
    }
}

/// Converts store rows into [`Vacancy`] values.
///
/// Rows without a publication timestamp cannot be placed in the calendar and
/// are dropped with a warning.
pub fn ingest(rows: Vec<RawVacancy>, config: &ReportConfig, tz: FixedOffset) -> Vec<Vacancy> {
    let mut out = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;

    for raw in rows {
        match raw.published_at {
            Some(published_at) => out.push(Vacancy::from_raw(
                raw,
                published_at,
                tz,
                &config.monthly_keywords,
            )),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, "Dropped records without publication time");
    }

    out
}
